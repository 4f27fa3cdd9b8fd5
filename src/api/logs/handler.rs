use axum::{extract::{Query, State}, http::StatusCode};
use serde::Deserialize;
use serde_json::json;

use crate::api::middleware::{request_logger::RequestLogEntry, AuthUser};
use crate::config::state::AppState;
use crate::utils::HandlerResponse;

const DEFAULT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

/// Most recent request log entries, newest first
pub async fn recent_logs(
    State(state): State<AppState>,
    _caller: AuthUser,
    Query(query): Query<LogsQuery>,
) -> HandlerResponse {
    let limit: usize = query
        .limit
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(1, state.request_log.capacity());
    let entries: Vec<RequestLogEntry> = state.request_log.recent(limit);

    HandlerResponse::new(StatusCode::OK)
        .data(json!({ "logs": entries, "count": entries.len(), "limit": limit }))
}
