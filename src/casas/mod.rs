use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod handlers;
pub mod id_unico;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::mesa_routes())
        .merge(handlers::vecino_routes())
}
