use axum::{extract::State, http::StatusCode};
use serde_json::json;
use tracing::{debug, instrument};

use crate::api::middleware::RefreshUser;
use crate::config::state::AppState;
use crate::database::User;
use crate::utils::{AppError, HandlerResponse};

/// Issues a fresh access token for a valid refresh token
#[instrument(name = "refresh_token", skip(state, caller), fields(username = %caller.username))]
pub async fn refresh(
    State(state): State<AppState>,
    caller: RefreshUser,
) -> Result<HandlerResponse, AppError> {
    let user: User = state
        .users
        .find_by_id(&caller.user_id)
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;

    let access_token: String = state.tokens.issue_access(&user)?;
    debug!("Issued refreshed access token");

    Ok(HandlerResponse::new(StatusCode::OK)
        .message("Token refreshed")
        .data(json!({
            "access_token": access_token,
            "token_type": "Bearer",
            "expires_in": state.tokens.access_ttl_secs(),
        })))
}
