use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use dreamkeeper::{
    api::{build_router, ApiState},
    auth::{middleware::AuthGuard, LoginService, RateLimiter, TokenService},
    config::{AuthConfig, RateLimitConfig, ServerConfig},
    storage::{
        repositories::{SqlxDreamRepository, SqlxUserRepository},
        run_migrations, DbPool,
    },
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub pool: DbPool,
    pub tokens: Arc<TokenService>,
}

pub async fn setup_test_app() -> TestApp {
    // A single connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("create sqlite pool");
    run_migrations(&pool).await.expect("run migrations");

    let auth_config = AuthConfig::default();
    let limits = RateLimitConfig::default();

    let users = Arc::new(SqlxUserRepository::new(pool.clone()));
    let dreams = Arc::new(SqlxDreamRepository::new(pool.clone()));
    let tokens = Arc::new(TokenService::new(auth_config.jwt_secret.as_bytes()));
    let rate_limiter = Arc::new(RateLimiter::new());

    let login = Arc::new(LoginService::new(
        users.clone(),
        tokens.clone(),
        rate_limiter.clone(),
        auth_config.clone(),
        limits.clone(),
    ));
    let guard = Arc::new(AuthGuard::new(
        tokens.clone(),
        users,
        auth_config.lookup_timeout(),
    ));

    let state = ApiState { login, dreams, rate_limiter, limits };
    let router = build_router(state, guard, &ServerConfig::default());

    TestApp { router, pool, tokens }
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(value.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        self.router.clone().oneshot(request).await.expect("send request")
    }

    /// Like `request`, with an `X-Forwarded-For` header so tests can pick
    /// their own unauthenticated rate-limit key.
    pub async fn request_from(
        &self,
        method: Method,
        path: &str,
        client: &str,
        body: Value,
    ) -> Response<Body> {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .header("x-forwarded-for", client)
            .body(Body::from(body.to_string()))
            .expect("build request");

        self.router.clone().oneshot(request).await.expect("send request")
    }

    /// Register an account and return `(access_token, refresh_token)`.
    /// Each call uses a distinct forwarded address so registration rate
    /// limits never interfere across tests.
    pub async fn register_user(&self, username: &str, email: &str, password: &str) -> (String, String) {
        let response = self
            .request_from(
                Method::POST,
                "/auth/register",
                &format!("reg-{email}"),
                json!({ "username": username, "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "registration failed");
        let body: Value = read_json(response).await;
        (
            body["access_token"].as_str().expect("access token").to_string(),
            body["refresh_token"].as_str().expect("refresh token").to_string(),
        )
    }
}

pub async fn read_json<T: DeserializeOwned>(response: Response<Body>) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("read body");
    serde_json::from_slice(&bytes).expect("decode json body")
}
