//! # Error Handling
//!
//! Error types for the dreamkeeper service using `thiserror`. The HTTP
//! layer maps these onto status codes in `api::error`; unexpected failures
//! surface to clients as a generic 500 while the detail stays in the logs.

use std::fmt;

/// Custom result type for dreamkeeper operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the dreamkeeper service.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database and storage errors
    #[error("Database error: {context}")]
    Database {
        #[source]
        source: sqlx::Error,
        context: String,
    },

    /// Validation errors (malformed or rejected input)
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Authentication and authorization errors
    #[error("Authentication error: {message}")]
    Auth {
        message: String,
        error_type: AuthErrorType,
    },

    /// Resource not found errors
    #[error("Resource not found: {resource_type} with ID '{id}'")]
    NotFound { resource_type: String, id: String },

    /// Resource conflict errors (e.g. already exists)
    #[error("Resource conflict: {message}")]
    Conflict { message: String },

    /// Rate limiting errors
    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<u64>,
    },

    /// Operation timed out (e.g. a slow credential lookup)
    #[error("Operation timed out: {operation}")]
    Timeout { operation: String },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Machine-readable authentication error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorType {
    MissingToken,
    InvalidToken,
    InvalidSignature,
    ExpiredToken,
    RevokedToken,
    WrongTokenType,
    InvalidCredentials,
    AccountDeactivated,
}

impl fmt::Display for AuthErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthErrorType::MissingToken => write!(f, "missing_token"),
            AuthErrorType::InvalidToken => write!(f, "invalid_token"),
            AuthErrorType::InvalidSignature => write!(f, "invalid_signature"),
            AuthErrorType::ExpiredToken => write!(f, "expired_token"),
            AuthErrorType::RevokedToken => write!(f, "revoked_token"),
            AuthErrorType::WrongTokenType => write!(f, "wrong_token_type"),
            AuthErrorType::InvalidCredentials => write!(f, "invalid_credentials"),
            AuthErrorType::AccountDeactivated => write!(f, "account_deactivated"),
        }
    }
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create an authentication error
    pub fn auth<S: Into<String>>(message: S, error_type: AuthErrorType) -> Self {
        Self::Auth { message: message.into(), error_type }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource_type: R, id: I) -> Self {
        Self::NotFound { resource_type: resource_type.into(), id: id.into() }
    }

    /// Create a conflict error
    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict { message: message.into() }
    }

    /// Create a rate limit error with a retry-after hint in seconds
    pub fn rate_limited<S: Into<String>>(message: S, retry_after: u64) -> Self {
        Self::RateLimited { message: message.into(), retry_after: Some(retry_after) }
    }

    /// Create a timeout error
    pub fn timeout<S: Into<String>>(operation: S) -> Self {
        Self::Timeout { operation: operation.into() }
    }

    /// Create an internal server error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Wrap a sqlx error with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Database { source, context: context.into() }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::validation(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_error_carries_machine_code() {
        let err = Error::auth("token has expired", AuthErrorType::ExpiredToken);
        match err {
            Error::Auth { error_type, .. } => {
                assert_eq!(error_type, AuthErrorType::ExpiredToken)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn auth_error_types_display_as_stable_codes() {
        assert_eq!(AuthErrorType::MissingToken.to_string(), "missing_token");
        assert_eq!(AuthErrorType::InvalidSignature.to_string(), "invalid_signature");
        assert_eq!(AuthErrorType::RevokedToken.to_string(), "revoked_token");
        assert_eq!(AuthErrorType::WrongTokenType.to_string(), "wrong_token_type");
        assert_eq!(AuthErrorType::AccountDeactivated.to_string(), "account_deactivated");
    }

    #[test]
    fn not_found_formats_resource_and_id() {
        let err = Error::not_found("dream", "d-1");
        assert_eq!(err.to_string(), "Resource not found: dream with ID 'd-1'");
    }
}
