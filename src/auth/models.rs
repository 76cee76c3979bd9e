//! Data models shared across the authentication stack.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::UserId;
use crate::errors::Error;

/// Request-scoped authenticated identity, derived from a verified access
/// token. Never persisted; reconstructed per request by the auth guard.
///
/// Carrying the token's `jti`/`exp` lets logout revoke exactly the token
/// that was presented.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    /// Unique ID of the presented token, used for revocation.
    pub token_jti: String,
    pub token_issued_at: DateTime<Utc>,
    pub token_expires_at: DateTime<Utc>,
}

impl Principal {
    /// Ownership check: authentication alone never implies access to a
    /// resource.
    pub fn owns(&self, owner: &UserId) -> bool {
        &self.user_id == owner
    }
}

/// Errors returned by authentication middleware/services.
///
/// Everything except `Persistence` maps to 401 at the HTTP boundary;
/// 403 is reserved for ownership violations, which are not an
/// authentication concern.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unauthorized: bearer token missing")]
    MissingBearer,
    #[error("unauthorized: malformed bearer token")]
    MalformedBearer,
    #[error("unauthorized: token signature invalid")]
    InvalidSignature,
    #[error("unauthorized: token expired")]
    Expired,
    #[error("unauthorized: token revoked")]
    Revoked,
    #[error("unauthorized: wrong token type")]
    WrongTokenType,
    #[error("unauthorized: unknown user")]
    NoSuchUser,
    #[error("unauthorized: account deactivated")]
    Deactivated,
    #[error(transparent)]
    Persistence(#[from] Error),
}

impl AuthError {
    /// Stable machine-readable code for clients and logs.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingBearer => "missing_token",
            AuthError::MalformedBearer => "malformed_token",
            AuthError::InvalidSignature => "invalid_signature",
            AuthError::Expired => "expired_token",
            AuthError::Revoked => "revoked_token",
            AuthError::WrongTokenType => "wrong_token_type",
            AuthError::NoSuchUser => "unknown_user",
            AuthError::Deactivated => "account_deactivated",
            AuthError::Persistence(_) => "internal_error",
        }
    }
}
