use axum::{routing::{get, post}, Router};
use crate::config::state::AppState;
use super::handler;

/// Account routes, nested under `/auth`
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handler::register))
        .route("/login", post(handler::login))
        .route("/me", get(handler::me))
}
