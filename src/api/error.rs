use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::auth::AuthError;
use crate::errors::Error;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Conflict(String),
    NotFound(String),
    Unauthorized(String),
    RateLimited { message: String, retry_after: Option<u64> },
    Internal(String),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn unauthorized<S: Into<String>>(msg: S) -> Self {
        ApiError::Unauthorized(msg.into())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let error_kind = match &self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Conflict(_) => "conflict",
            ApiError::NotFound(_) => "not_found",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::RateLimited { .. } => "rate_limited",
            ApiError::Internal(_) => "internal_error",
        };

        let retry_after = match &self {
            ApiError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        };

        let message = match self {
            ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::NotFound(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Internal(msg) => msg,
            ApiError::RateLimited { message, .. } => message,
        };

        let body = Json(ErrorBody { error: error_kind, message });
        match retry_after {
            Some(seconds) => {
                (status, [(header::RETRY_AFTER, seconds.to_string())], body).into_response()
            }
            None => (status, body).into_response(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation { message, .. } => ApiError::BadRequest(message),
            Error::NotFound { resource_type, id } => {
                ApiError::NotFound(format!("{resource_type} '{id}' not found"))
            }
            Error::Conflict { message } => ApiError::Conflict(message),
            Error::RateLimited { message, retry_after } => {
                ApiError::RateLimited { message, retry_after }
            }
            // All authentication failures collapse to 401 so callers cannot
            // probe which check rejected them.
            Error::Auth { message, .. } => ApiError::Unauthorized(message),
            Error::Database { source, context } => {
                if let Some(db_err) = source.as_database_error() {
                    if let Some(code) = db_err.code() {
                        if code.as_ref() == "2067" || code.as_ref().starts_with("SQLITE_CONSTRAINT")
                        {
                            return ApiError::Conflict(context);
                        }
                    }
                }
                tracing::error!(error = %source, context = %context, "database error");
                ApiError::Internal("Internal server error".to_string())
            }
            Error::Timeout { operation } => {
                tracing::error!(operation = %operation, "operation timed out");
                ApiError::Internal("Internal server error".to_string())
            }
            Error::Config(msg) | Error::Internal { message: msg } => {
                tracing::error!(error = %msg, "internal error");
                ApiError::Internal("Internal server error".to_string())
            }
            Error::Io(err) => {
                tracing::error!(error = %err, "I/O error");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Persistence(inner) => ApiError::from(inner),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}
