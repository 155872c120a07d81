use axum::{routing::get, Json, Router};
use tracing::{info, instrument};

use crate::{
    auth::{dto::MesaSession, extractors::MesaSessionAuth},
    state::AppState,
};

pub fn session_routes() -> Router<AppState> {
    Router::new().route("/mesa/session", get(get_session))
}

/// Echoes the session carried by a valid session token.
#[instrument(skip_all)]
pub async fn get_session(MesaSessionAuth(session): MesaSessionAuth) -> Json<MesaSession> {
    info!(rol = %session.rol, "session checked");
    Json(session)
}
