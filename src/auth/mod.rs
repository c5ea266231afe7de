use crate::state::AppState;
use axum::Router;

pub mod cookies;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod sessions;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::auth_routes())
}
