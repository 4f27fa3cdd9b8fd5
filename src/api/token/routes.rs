use axum::{routing::post, Router};
use crate::config::state::AppState;
use super::handler;

/// Token refresh, nested under `/auth` next to the account routes
pub fn token_routes() -> Router<AppState> {
    Router::new().route("/refresh", post(handler::refresh))
}
