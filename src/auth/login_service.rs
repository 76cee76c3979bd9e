//! Registration, login, token refresh, logout, and password changes.

use std::sync::{Arc, LazyLock};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::auth::models::{AuthError, Principal};
use crate::auth::token_service::{TokenService, TokenUse};
use crate::auth::user::{NewUser, User};
use crate::auth::validation::{
    validate_password_strength, ChangePasswordRequest, LoginRequest, RegisterRequest,
};
use crate::auth::{hashing, rate_limit::RateLimiter};
use crate::config::{AuthConfig, RateLimitConfig};
use crate::domain::UserId;
use crate::errors::{AuthErrorType, Error, Result};
use crate::storage::repositories::UserRepository;

const RATE_WINDOW_SECONDS: u64 = 3_600;

/// Pre-computed dummy hash for timing-safe user enumeration prevention.
/// When an unknown email is used, we still run Argon2 verification against
/// this hash so the response time matches a real verification.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    hashing::hash_password("dummy_startup_value").unwrap_or_else(|_| {
        "$argon2id$v=19$m=19456,t=2,p=1$dW5rbm93bg$dW5rbm93bg".to_string()
    })
});

/// Tokens handed to a client after register, login, or refresh.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub user: User,
}

/// Response for `POST /auth/refresh`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

/// Service for the credential-based authentication flows.
#[derive(Clone)]
pub struct LoginService {
    users: Arc<dyn UserRepository>,
    tokens: Arc<TokenService>,
    rate_limiter: Arc<RateLimiter>,
    auth_config: AuthConfig,
    limits: RateLimitConfig,
}

impl LoginService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        tokens: Arc<TokenService>,
        rate_limiter: Arc<RateLimiter>,
        auth_config: AuthConfig,
        limits: RateLimitConfig,
    ) -> Self {
        Self { users, tokens, rate_limiter, auth_config, limits }
    }

    /// Register a new account and log it in.
    ///
    /// `client_key` identifies the unauthenticated caller (client address)
    /// for rate limiting.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: RegisterRequest, client_key: &str) -> Result<AuthTokens> {
        self.check_rate(client_key, "register", self.limits.register_per_hour)?;

        request.validate()?;
        validate_password_strength(&request.password)?;

        let email = User::normalize_email(&request.email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(Error::conflict("Email already registered"));
        }
        if self.users.find_by_username(&request.username).await?.is_some() {
            return Err(Error::conflict("Username already taken"));
        }

        let password_hash = hashing::hash_password(&request.password)?;
        let user = self
            .users
            .create_user(NewUser {
                id: UserId::new(),
                username: request.username,
                email,
                password_hash,
            })
            .await?;

        info!(user_id = %user.id, "user registered");
        self.issue_tokens(user)
    }

    /// Authenticate with email and password.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest, client_key: &str) -> Result<AuthTokens> {
        self.check_rate(client_key, "login", self.limits.login_per_hour)?;

        request.validate()?;
        let email = User::normalize_email(&request.email);

        let Some((user, password_hash)) = self.users.get_user_with_password(&email).await? else {
            // Prevent timing-based user enumeration: burn the same Argon2
            // cost as a real verification.
            let _ = hashing::verify_password(&request.password, &DUMMY_HASH);
            warn!(email = %email, "login attempt for non-existent user");
            return Err(invalid_credentials());
        };

        if !hashing::verify_password(&request.password, &password_hash) {
            warn!(user_id = %user.id, "login attempt with incorrect password");
            return Err(invalid_credentials());
        }

        if !user.is_active {
            // Same message as a bad password: login must not reveal
            // account status to an unauthenticated caller.
            warn!(user_id = %user.id, "login attempt for deactivated account");
            return Err(invalid_credentials());
        }

        info!(user_id = %user.id, "user logged in");
        self.issue_tokens(user)
    }

    /// Exchange a refresh token for a fresh access token.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<AccessTokenResponse> {
        let claims = self
            .tokens
            .verify(refresh_token, TokenUse::Refresh)
            .map_err(Error::from)?;

        let user_id = claims.user_id();
        let user = self
            .users
            .find_by_id(&user_id)
            .await?
            .ok_or_else(|| Error::auth("Unknown user", AuthErrorType::InvalidCredentials))?;
        if !user.is_active {
            return Err(Error::auth(
                "Account deactivated",
                AuthErrorType::AccountDeactivated,
            ));
        }

        let access = self.tokens.issue_access_token(
            &user.id,
            &user.username,
            self.auth_config.access_ttl(),
        )?;
        Ok(AccessTokenResponse { access_token: access.token })
    }

    /// Revoke the access token presented with this request. The token is
    /// rejected by every verification after this returns.
    #[instrument(skip(self, principal), fields(user_id = %principal.user_id))]
    pub fn logout(&self, principal: &Principal) {
        self.tokens.revoke(&principal.token_jti, principal.token_expires_at);
        info!(user_id = %principal.user_id, "user logged out, access token revoked");
    }

    /// Change the caller's password after re-verifying the current one.
    #[instrument(skip(self, request), fields(user_id = %principal.user_id))]
    pub async fn change_password(
        &self,
        principal: &Principal,
        request: ChangePasswordRequest,
    ) -> Result<()> {
        request.validate()?;

        let stored = self
            .users
            .get_password_hash(&principal.user_id)
            .await?
            .ok_or_else(|| Error::not_found("user", principal.user_id.as_str()))?;

        if !hashing::verify_password(&request.old_password, &stored) {
            warn!(user_id = %principal.user_id, "password change with incorrect old password");
            return Err(Error::auth(
                "Invalid credentials",
                AuthErrorType::InvalidCredentials,
            ));
        }

        validate_password_strength(&request.new_password)?;

        let new_hash = hashing::hash_password(&request.new_password)?;
        self.users.update_password(&principal.user_id, new_hash).await?;
        info!(user_id = %principal.user_id, "password changed");
        Ok(())
    }

    /// Fetch the caller's own profile.
    pub async fn me(&self, principal: &Principal) -> Result<User> {
        self.users
            .find_by_id(&principal.user_id)
            .await?
            .ok_or_else(|| Error::not_found("user", principal.user_id.as_str()))
    }

    fn issue_tokens(&self, user: User) -> Result<AuthTokens> {
        let access = self.tokens.issue_access_token(
            &user.id,
            &user.username,
            self.auth_config.access_ttl(),
        )?;
        let refresh = self.tokens.issue_refresh_token(
            &user.id,
            &user.username,
            self.auth_config.refresh_ttl(),
        )?;
        Ok(AuthTokens { access_token: access.token, refresh_token: refresh.token, user })
    }

    fn check_rate(&self, key: &str, action: &str, limit: u32) -> Result<()> {
        self.rate_limiter
            .allow(key, action, limit, RATE_WINDOW_SECONDS)
            .map_err(|retry_after| {
                Error::rate_limited(
                    format!("Too many {action} attempts. Please try again later."),
                    retry_after,
                )
            })
    }
}

fn invalid_credentials() -> Error {
    Error::auth("Invalid email or password", AuthErrorType::InvalidCredentials)
}

impl From<AuthError> for Error {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::Persistence(inner) => inner,
            AuthError::MissingBearer => Error::auth(message, AuthErrorType::MissingToken),
            AuthError::MalformedBearer => Error::auth(message, AuthErrorType::InvalidToken),
            AuthError::InvalidSignature => Error::auth(message, AuthErrorType::InvalidSignature),
            AuthError::Expired => Error::auth(message, AuthErrorType::ExpiredToken),
            AuthError::Revoked => Error::auth(message, AuthErrorType::RevokedToken),
            AuthError::WrongTokenType => Error::auth(message, AuthErrorType::WrongTokenType),
            AuthError::NoSuchUser => Error::auth(message, AuthErrorType::InvalidCredentials),
            AuthError::Deactivated => Error::auth(message, AuthErrorType::AccountDeactivated),
        }
    }
}
