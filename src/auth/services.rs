use crate::auth::dto::{JwtKeys, MesaSession, SessionClaims, TokenKind, UserClaims};
use crate::config::{JwtConfig, MAX_TTL_MINUTES};
use crate::state::AppState;
use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

impl From<&JwtConfig> for JwtKeys {
    fn from(cfg: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs((cfg.ttl_minutes.clamp(1, MAX_TTL_MINUTES) as u64) * 60),
        }
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from(&state.config.jwt)
    }
}

impl JwtKeys {
    /// (iat, exp) for a token issued now.
    fn window(&self) -> (usize, usize) {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        (now.unix_timestamp() as usize, exp.unix_timestamp() as usize)
    }

    fn decode_claims<C: DeserializeOwned>(&self, token: &str) -> anyhow::Result<C> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        Ok(decode::<C>(token, &self.decoding, &validation)?.claims)
    }

    fn sign<C: Serialize>(&self, claims: &C) -> anyhow::Result<String> {
        Ok(encode(&Header::default(), claims, &self.encoding)?)
    }

    pub fn sign_session(&self, session: &MesaSession) -> anyhow::Result<String> {
        let (iat, exp) = self.window();
        let token = self.sign(&SessionClaims {
            rol: session.rol.clone(),
            whatsapp: session.whatsapp.clone(),
            iat,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind: TokenKind::Mesa,
        })?;
        debug!(rol = %session.rol, "session token signed");
        Ok(token)
    }

    pub fn verify_session(&self, token: &str) -> anyhow::Result<MesaSession> {
        let claims: SessionClaims = self.decode_claims(token)?;
        if claims.kind != TokenKind::Mesa {
            anyhow::bail!("not a mesa session token");
        }
        Ok(MesaSession {
            rol: claims.rol,
            whatsapp: claims.whatsapp,
        })
    }

    /// Issues a user token the way the identity provider does.
    #[cfg(test)]
    pub fn sign_auth_user(&self, user_id: Uuid) -> anyhow::Result<String> {
        let (iat, exp) = self.window();
        let token = self.sign(&UserClaims {
            sub: user_id,
            iat,
            exp,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind: TokenKind::User,
        })?;
        debug!(user_id = %user_id, "user token signed");
        Ok(token)
    }

    pub fn verify_auth_user(&self, token: &str) -> anyhow::Result<Uuid> {
        let claims: UserClaims = self.decode_claims(token)?;
        if claims.kind != TokenKind::User {
            anyhow::bail!("not a user token");
        }
        debug!(user_id = %claims.sub, "user token verified");
        Ok(claims.sub)
    }
}
