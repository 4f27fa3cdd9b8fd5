use axum::{routing::{get, post}, Router};
use crate::config::state::AppState;
use super::handler;

/// Threat detection routes; mounted without a prefix
pub fn ml_threat_routes() -> Router<AppState> {
    Router::new()
        .route("/ml/threats", get(handler::list_threats))
        .route("/ml/threats/analyze", post(handler::analyze))
}
