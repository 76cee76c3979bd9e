//! Axum middleware for request authentication.
//!
//! Per-request state machine: no token → token present → verified or
//! rejected. On success a [`Principal`] lands in request extensions for
//! downstream handlers, which must still perform their own ownership
//! checks — authentication never implies authorization.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Method, Request},
    middleware::Next,
    response::Response,
};
use tracing::{field, info_span, warn, Instrument};

use crate::api::error::ApiError;
use crate::auth::models::{AuthError, Principal};
use crate::auth::token_service::{TokenService, TokenUse};
use crate::storage::repositories::UserRepository;

/// Shared state for the authentication middleware.
pub struct AuthGuard {
    tokens: Arc<TokenService>,
    users: Arc<dyn UserRepository>,
    lookup_timeout: std::time::Duration,
}

impl AuthGuard {
    pub fn new(
        tokens: Arc<TokenService>,
        users: Arc<dyn UserRepository>,
        lookup_timeout: std::time::Duration,
    ) -> Self {
        Self { tokens, users, lookup_timeout }
    }

    /// Verify the bearer token and resolve its user to a live principal.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Principal, AuthError> {
        let header = header.unwrap_or("").trim();
        if header.is_empty() {
            return Err(AuthError::MissingBearer);
        }
        let token = header.strip_prefix("Bearer ").ok_or(AuthError::MalformedBearer)?;

        let claims = self.tokens.verify(token, TokenUse::Access)?;
        let user_id = claims.user_id();

        // A slow credential store must not hang the auth path.
        let lookup = tokio::time::timeout(self.lookup_timeout, self.users.find_by_id(&user_id));
        let user = match lookup.await {
            Ok(result) => result?.ok_or(AuthError::NoSuchUser)?,
            Err(_) => {
                return Err(AuthError::Persistence(crate::errors::Error::timeout(
                    "credential lookup",
                )))
            }
        };

        if !user.is_active {
            return Err(AuthError::Deactivated);
        }

        Ok(Principal {
            user_id: user.id,
            username: user.username,
            email: user.email,
            token_jti: claims.jti.clone(),
            token_issued_at: claims.issued_at(),
            token_expires_at: claims.expires_at(),
        })
    }
}

pub type AuthGuardState = Arc<AuthGuard>;

/// Middleware entry point that authenticates requests using the configured
/// [`AuthGuard`].
pub async fn authenticate(
    State(guard): State<AuthGuardState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = info_span!(
        "auth_middleware.authenticate",
        http.method = %method,
        http.path = %path,
        auth.user_id = field::Empty,
    );
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let result = guard.authenticate(header.as_deref()).instrument(span.clone()).await;

    match result {
        Ok(principal) => {
            span.record("auth.user_id", field::display(&principal.user_id));
            request.extensions_mut().insert(principal);
            Ok(next.run(request).await)
        }
        Err(err) => {
            let _enter = span.enter();
            warn!(code = err.code(), error = %err, "authentication failed");
            Err(ApiError::from(err))
        }
    }
}
