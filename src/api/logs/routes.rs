use axum::{routing::get, Router};
use crate::config::state::AppState;
use super::handler;

/// Request log routes; mounted without a prefix
pub fn logs_routes() -> Router<AppState> {
    Router::new().route("/logs", get(handler::recent_logs))
}
