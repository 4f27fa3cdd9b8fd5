use axum::{extract::State, Json, http::StatusCode};
use bcrypt::{hash, verify};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::api::middleware::AuthUser;
use crate::config::state::AppState;
use crate::database::User;
use crate::utils::{AppError, HandlerResponse};

// =============================================================================
// DTOs
// =============================================================================

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

const MIN_PASSWORD_LEN: usize = 8;

// =============================================================================
// VALIDATION
// =============================================================================

fn validate_username(raw: &str) -> Result<String, AppError> {
    let username: &str = raw.trim();

    if !(3..=32).contains(&username.chars().count()) {
        return Err(AppError::BadRequest("Username must be 3 to 32 characters".into()));
    }

    if !username.chars().all(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(AppError::BadRequest(
            "Username can only contain letters, digits, underscores and hyphens".into(),
        ));
    }

    Ok(username.to_string())
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Register a new account
#[instrument(name = "register", skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<HandlerResponse, AppError> {
    let username: String = validate_username(&payload.username)?;

    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if state.users.find_by_username(&username).is_some() {
        return Err(AppError::Conflict("Username already registered".into()));
    }

    // Hashing is CPU bound
    let cost: u32 = state.environment.bcrypt_cost;
    let password: String = payload.password;
    let password_hash: String = tokio::task::spawn_blocking(move || hash(password, cost))
        .await
        .map_err(anyhow::Error::from)?
        .map_err(anyhow::Error::from)?;

    // Another request may have taken the name while we were hashing
    let user: User = state
        .users
        .create(&username, password_hash)
        .ok_or_else(|| AppError::Conflict("Username already registered".into()))?;

    info!("Registered user {}", user.username);

    Ok(HandlerResponse::new(StatusCode::CREATED)
        .message("User registered successfully")
        .data(json!({ "user_id": user.id, "username": user.username })))
}

/// Exchange credentials for an access/refresh token pair
#[instrument(name = "login", skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<HandlerResponse, AppError> {
    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    let user: User = match state.users.find_by_username(payload.username.trim()) {
        Some(user) => user,
        None => {
            warn!("Login attempt for unknown user");
            return Err(invalid());
        }
    };

    let stored_hash: String = user.password_hash.clone();
    let password: String = payload.password;
    let matches: bool = tokio::task::spawn_blocking(move || verify(password, &stored_hash))
        .await
        .map_err(anyhow::Error::from)?
        .unwrap_or(false);

    if !matches {
        warn!("Invalid password for {}", user.username);
        return Err(invalid());
    }

    let response: LoginResponse = LoginResponse {
        access_token: state.tokens.issue_access(&user)?,
        refresh_token: state.tokens.issue_refresh(&user)?,
        token_type: "Bearer",
        expires_in: state.tokens.access_ttl_secs(),
    };

    info!("User {} logged in", user.username);

    Ok(HandlerResponse::new(StatusCode::OK)
        .message("Login successful")
        .data(json!(response)))
}

/// Profile of the authenticated caller
pub async fn me(
    State(state): State<AppState>,
    caller: AuthUser,
) -> Result<HandlerResponse, AppError> {
    let user_id: Uuid = caller.user_id;
    let user: User = state
        .users
        .find_by_id(&user_id)
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(HandlerResponse::new(StatusCode::OK)
        .data(json!({
            "user_id": user.id,
            "username": user.username,
            "created_at": user.created_at.to_rfc3339(),
        })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_are_trimmed_and_checked() {
        assert_eq!(validate_username("  neo_1 ").unwrap(), "neo_1");
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("<script>").is_err());
        assert!(validate_username(&"x".repeat(33)).is_err());
    }
}
