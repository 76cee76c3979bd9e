//! Account and session endpoints.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::{
    AccessTokenResponse, AuthTokens, Principal, User,
    validation::{ChangePasswordRequest, LoginRequest, RegisterRequest},
};

use super::client_key;

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = AuthTokens),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Username or email already taken"),
        (status = 429, description = "Too many registration attempts")
    ),
    tag = "auth"
)]
pub async fn register_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthTokens>), ApiError> {
    let tokens = state.login.register(body, &client_key(&headers)).await?;
    Ok((StatusCode::CREATED, Json(tokens)))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthTokens),
        (status = 401, description = "Invalid credentials"),
        (status = 429, description = "Too many login attempts")
    ),
    tag = "auth"
)]
pub async fn login_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthTokens>, ApiError> {
    let tokens = state.login.login(body, &client_key(&headers)).await?;
    Ok(Json(tokens))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token", body = AccessTokenResponse),
        (status = 401, description = "Invalid or expired refresh token")
    ),
    tag = "auth"
)]
pub async fn refresh_handler(
    State(state): State<ApiState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<AccessTokenResponse>, ApiError> {
    let response = state.login.refresh(&body.refresh_token).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "Current account", body = User),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearerAuth" = [])),
    tag = "auth"
)]
pub async fn me_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<User>, ApiError> {
    let user = state.login.me(&principal).await?;
    Ok(Json(user))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Access token revoked", body = MessageResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearerAuth" = [])),
    tag = "auth"
)]
pub async fn logout_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
) -> Json<MessageResponse> {
    state.login.logout(&principal);
    Json(MessageResponse { message: "Logged out".to_string() })
}

#[utoipa::path(
    put,
    path = "/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "New password too weak"),
        (status = 401, description = "Old password incorrect")
    ),
    security(("bearerAuth" = [])),
    tag = "auth"
)]
pub async fn change_password_handler(
    State(state): State<ApiState>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.login.change_password(&principal, body).await?;
    Ok(Json(MessageResponse { message: "Password updated".to_string() }))
}
