use std::sync::Arc;

use axum::{
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::middleware::{authenticate, AuthGuardState};
use crate::auth::{LoginService, RateLimiter};
use crate::config::{RateLimitConfig, ServerConfig};
use crate::storage::repositories::DreamRepository;

use super::{
    docs,
    handlers::{
        auth::{
            change_password_handler, login_handler, logout_handler, me_handler, refresh_handler,
            register_handler,
        },
        dreams::{
            create_dream_handler, delete_dream_handler, dream_stats_handler, get_dream_handler,
            list_dreams_handler, search_dreams_handler, update_dream_handler,
        },
        health::health_handler,
    },
};

#[derive(Clone)]
pub struct ApiState {
    pub login: Arc<LoginService>,
    pub dreams: Arc<dyn DreamRepository>,
    pub rate_limiter: Arc<RateLimiter>,
    pub limits: RateLimitConfig,
}

/// Assemble the full application router.
///
/// Everything under `/api/dreams` plus the account endpoints go through
/// the bearer-token guard; register, login, refresh, health, and the
/// OpenAPI document stay public.
pub fn build_router(state: ApiState, guard: AuthGuardState, server: &ServerConfig) -> Router {
    let auth_layer = middleware::from_fn_with_state(guard, authenticate);

    let public = Router::new()
        .route("/health", get(health_handler))
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/refresh", post(refresh_handler));

    let secured = Router::new()
        .route("/auth/me", get(me_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/auth/change-password", put(change_password_handler))
        .route("/api/dreams", post(create_dream_handler))
        .route("/api/dreams", get(list_dreams_handler))
        .route("/api/dreams/search", get(search_dreams_handler))
        .route("/api/dreams/stats", get(dream_stats_handler))
        .route("/api/dreams/{id}", get(get_dream_handler))
        .route("/api/dreams/{id}", put(update_dream_handler))
        .route("/api/dreams/{id}", delete(delete_dream_handler))
        .route_layer(auth_layer);

    Router::new()
        .merge(public)
        .merge(secured)
        .merge(docs::docs_router())
        .layer(cors_layer(&server.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods(Any)
        .allow_headers(Any)
}
