//! OpenAPI document for the HTTP API, served as plain JSON.

use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

use crate::api::handlers::auth::{MessageResponse, RefreshRequest};
use crate::api::handlers::dreams::{CreateDreamBody, DreamListResponse, UpdateDreamBody};
use crate::api::handlers::health::HealthResponse;
use crate::auth::validation::{ChangePasswordRequest, LoginRequest, RegisterRequest};
use crate::auth::{AccessTokenResponse, AuthTokens, User};
use crate::domain::{Dream, DreamStats, MoodCount, TagCount};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::handlers::health::health_handler,
        crate::api::handlers::auth::register_handler,
        crate::api::handlers::auth::login_handler,
        crate::api::handlers::auth::refresh_handler,
        crate::api::handlers::auth::me_handler,
        crate::api::handlers::auth::logout_handler,
        crate::api::handlers::auth::change_password_handler,
        crate::api::handlers::dreams::create_dream_handler,
        crate::api::handlers::dreams::list_dreams_handler,
        crate::api::handlers::dreams::search_dreams_handler,
        crate::api::handlers::dreams::dream_stats_handler,
        crate::api::handlers::dreams::get_dream_handler,
        crate::api::handlers::dreams::update_dream_handler,
        crate::api::handlers::dreams::delete_dream_handler,
    ),
    components(schemas(
        HealthResponse,
        RegisterRequest,
        LoginRequest,
        ChangePasswordRequest,
        RefreshRequest,
        MessageResponse,
        AuthTokens,
        AccessTokenResponse,
        User,
        Dream,
        DreamStats,
        MoodCount,
        TagCount,
        CreateDreamBody,
        UpdateDreamBody,
        DreamListResponse,
    )),
    tags(
        (name = "health", description = "Service liveness"),
        (name = "auth", description = "Accounts and tokens"),
        (name = "dreams", description = "Dream journal")
    ),
    info(
        title = "Dreamkeeper API",
        description = "Dream journal service with token-based authentication"
    )
)]
pub struct ApiDoc;

pub fn docs_router<S: Clone + Send + Sync + 'static>() -> Router<S> {
    Router::new().route("/api-docs/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
