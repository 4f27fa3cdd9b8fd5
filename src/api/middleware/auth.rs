use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use uuid::Uuid;

use crate::config::state::AppState;
use crate::security::{jwt::bearer_token, Claims, TokenType};
use crate::utils::AppError;

/// Caller authenticated with an access token
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
}

/// Caller authenticated with a refresh token
#[derive(Debug, Clone)]
pub struct RefreshUser {
    pub user_id: Uuid,
    pub username: String,
}

/// Verifies the bearer token and that its subject still exists
fn authenticate(parts: &Parts, state: &AppState, expected: TokenType) -> Result<Claims, AppError> {
    let header: Option<&str> = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token: &str = bearer_token(header)?;
    let claims: Claims = state.tokens.verify(token, expected)?;

    if state.users.find_by_id(&claims.sub).is_none() {
        return Err(AppError::Unauthorized("User not found".into()));
    }

    Ok(claims)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims: Claims = authenticate(parts, state, TokenType::Access)?;
        Ok(Self { user_id: claims.sub, username: claims.username })
    }
}

impl FromRequestParts<AppState> for RefreshUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims: Claims = authenticate(parts, state, TokenType::Refresh)?;
        Ok(Self { user_id: claims.sub, username: claims.username })
    }
}
