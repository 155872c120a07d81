use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use crate::auth::dto::{JwtKeys, MesaSession};
use crate::error::AppError;

/// Board-member session from a bearer session token.
pub struct MesaSessionAuth(pub MesaSession);

/// Externally authenticated user from a bearer user token.
pub struct AuthUser(pub Uuid);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth_header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))
}

#[async_trait]
impl<S> FromRequestParts<S> for MesaSessionAuth
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let keys = JwtKeys::from_ref(state);
        match keys.verify_session(token) {
            Ok(session) => Ok(MesaSessionAuth(session)),
            Err(e) => {
                warn!(error = %e, "invalid session token");
                Err(AppError::Unauthorized("Sesion invalida o expirada.".into()))
            }
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let keys = JwtKeys::from_ref(state);
        match keys.verify_auth_user(token) {
            Ok(user_id) => Ok(AuthUser(user_id)),
            Err(e) => {
                warn!(error = %e, "invalid user token");
                Err(AppError::Unauthorized("Sesion invalida o expirada.".into()))
            }
        }
    }
}
