use axum::{extract::{Query, State}, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{instrument, warn};

use crate::api::middleware::AuthUser;
use crate::config::state::AppState;
use crate::security::{threat_detector::ThreatRecord, ThreatAssessment, ThreatSource};
use crate::utils::{AppError, HandlerResponse};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;
const MAX_PAYLOAD_CHARS: usize = 10_000;

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub payload: String,
}

#[derive(Debug, Deserialize)]
pub struct ThreatsQuery {
    pub limit: Option<usize>,
}

/// Scores a payload and records it when it looks malicious
#[instrument(name = "analyze_threat", skip(state, caller, request), fields(reporter = %caller.username))]
pub async fn analyze(
    State(state): State<AppState>,
    caller: AuthUser,
    Json(request): Json<AnalyzeRequest>,
) -> Result<HandlerResponse, AppError> {
    if request.payload.trim().is_empty() {
        return Err(AppError::BadRequest("Payload cannot be empty".into()));
    }
    if request.payload.chars().count() > MAX_PAYLOAD_CHARS {
        return Err(AppError::BadRequest(format!(
            "Payload cannot exceed {MAX_PAYLOAD_CHARS} characters"
        )));
    }

    let assessment: ThreatAssessment = state.threat_detector.assess(&request.payload);

    if assessment.is_malicious() {
        warn!(score = assessment.score, "Malicious payload submitted for analysis");
        state.threat_log.record(
            ThreatSource::Api,
            &request.payload,
            &assessment,
            Some(caller.username.clone()),
        );
    }

    Ok(HandlerResponse::new(StatusCode::OK)
        .message("Payload analyzed")
        .data(json!(assessment)))
}

/// Recorded detections, newest first
pub async fn list_threats(
    State(state): State<AppState>,
    _caller: AuthUser,
    Query(query): Query<ThreatsQuery>,
) -> HandlerResponse {
    let limit: usize = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let threats: Vec<ThreatRecord> = state.threat_log.recent(limit);

    HandlerResponse::new(StatusCode::OK)
        .data(json!({ "threats": threats, "count": threats.len() }))
}
