// HS256 access and refresh tokens signed with the configured secret

use std::fmt;

use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::database::User;
use crate::utils::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub jti: Uuid,
    pub iat: u64,
    pub exp: u64,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("Missing Authorization Header")]
    Missing,

    #[error("Invalid token")]
    Invalid,

    #[error("Token has expired")]
    Expired,

    #[error("Only {} tokens are allowed", .0.as_str())]
    WrongType(TokenType),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::WrongType(_) => AppError::UnprocessableEntity(err.to_string()),
            _ => AppError::Unauthorized(err.to_string()),
        }
    }
}

/// Token-authentication manager
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(secret: &str, access_ttl_secs: u64, refresh_ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl_secs,
            refresh_ttl_secs,
        }
    }

    pub fn access_ttl_secs(&self) -> u64 {
        self.access_ttl_secs
    }

    pub fn issue_access(&self, user: &User) -> anyhow::Result<String> {
        self.issue(user, TokenType::Access, self.access_ttl_secs)
    }

    pub fn issue_refresh(&self, user: &User) -> anyhow::Result<String> {
        self.issue(user, TokenType::Refresh, self.refresh_ttl_secs)
    }

    fn issue(&self, user: &User, token_type: TokenType, ttl_secs: u64) -> anyhow::Result<String> {
        let now: u64 = Utc::now().timestamp().max(0) as u64;
        let claims: Claims = Claims {
            sub: user.id,
            username: user.username.clone(),
            token_type,
            jti: Uuid::new_v4(),
            iat: now,
            exp: now + ttl_secs,
        };
        self.sign(&claims)
    }

    pub(crate) fn sign(&self, claims: &Claims) -> anyhow::Result<String> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding)?)
    }

    /// Checks signature, expiry and token type
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, TokenError> {
        let mut validation: Validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims: Claims = decode::<Claims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })?
            .claims;

        if claims.token_type != expected {
            return Err(TokenError::WrongType(expected));
        }

        Ok(claims)
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, TokenError> {
    let value: &str = header.ok_or(TokenError::Missing)?;
    let (scheme, token) = value.trim().split_once(' ').ok_or(TokenError::Missing)?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(TokenError::Missing);
    }

    Ok(token.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "carol".into(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn access_tokens_round_trip_with_their_type() {
        let service = TokenService::new("secret", 60, 120);
        let user = user();

        let token = service.issue_access(&user).unwrap();
        let claims = service.verify(&token, TokenType::Access).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "carol");
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn token_types_are_not_interchangeable() {
        let service = TokenService::new("secret", 60, 120);
        let user = user();

        let refresh = service.issue_refresh(&user).unwrap();
        assert_eq!(
            service.verify(&refresh, TokenType::Access).unwrap_err(),
            TokenError::WrongType(TokenType::Access)
        );

        let access = service.issue_access(&user).unwrap();
        let err = service.verify(&access, TokenType::Refresh).unwrap_err();
        assert_eq!(err.to_string(), "Only refresh tokens are allowed");
    }

    #[test]
    fn other_secrets_and_garbage_are_rejected() {
        let service = TokenService::new("secret", 60, 120);
        let other = TokenService::new("different", 60, 120);
        let token = other.issue_access(&user()).unwrap();

        assert_eq!(service.verify(&token, TokenType::Access).unwrap_err(), TokenError::Invalid);
        assert_eq!(service.verify("not.a.jwt", TokenType::Access).unwrap_err(), TokenError::Invalid);
    }

    #[test]
    fn expired_tokens_are_reported_as_expired() {
        let service = TokenService::new("secret", 60, 120);
        let now = Utc::now().timestamp() as u64;
        let claims = Claims {
            sub: Uuid::new_v4(),
            username: "dave".into(),
            token_type: TokenType::Access,
            jti: Uuid::new_v4(),
            iat: now - 120,
            exp: now - 60,
        };
        let token = service.sign(&claims).unwrap();

        assert_eq!(service.verify(&token, TokenType::Access).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token(Some("Bearer abc.def")).unwrap(), "abc.def");
        assert_eq!(bearer_token(Some("bearer   abc")).unwrap(), "abc");
        assert_eq!(bearer_token(None).unwrap_err(), TokenError::Missing);
        assert_eq!(bearer_token(Some("Basic abc")).unwrap_err(), TokenError::Missing);
        assert_eq!(bearer_token(Some("Bearer")).unwrap_err(), TokenError::Missing);
    }
}
