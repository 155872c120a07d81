use anyhow::Context;
use serde::Deserialize;

/// Longest accepted session lifetime: one year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: lookup("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "mesa".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "mesa-directiva".into()),
            ttl_minutes: parse_ttl_minutes(lookup("JWT_TTL_MINUTES"))?,
        };
        let host = lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("APP_PORT") {
            Some(v) => v.parse::<u16>().context("APP_PORT must be a port number")?,
            None => 8080,
        };
        Ok(Self {
            database_url,
            jwt,
            host,
            port,
        })
    }
}

fn parse_ttl_minutes(raw: Option<String>) -> anyhow::Result<i64> {
    let Some(raw) = raw else {
        return Ok(60 * 24 * 7);
    };
    let minutes = raw
        .trim()
        .parse::<i64>()
        .context("JWT_TTL_MINUTES must be a whole number of minutes")?;
    if !(1..=MAX_TTL_MINUTES).contains(&minutes) {
        anyhow::bail!("JWT_TTL_MINUTES must be between 1 and {MAX_TTL_MINUTES}, got {minutes}");
    }
    Ok(minutes)
}
