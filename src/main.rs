use std::sync::Arc;

use dreamkeeper::{
    api::{build_router, ApiState},
    auth::{
        middleware::AuthGuard, LoginService, RateLimiter, TokenService,
    },
    observability::init_tracing,
    storage::{
        create_pool, run_migrations,
        repositories::{SqlxDreamRepository, SqlxUserRepository},
    },
    AppConfig, Result, APP_NAME, VERSION,
};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present; a missing file is fine.
    let _ = dotenvy::dotenv();

    let config = AppConfig::from_env()?;
    init_tracing(&config.observability)?;

    info!(app_name = APP_NAME, version = VERSION, "starting dreamkeeper");

    let pool = create_pool(&config.database).await?;
    run_migrations(&pool).await?;

    let users = Arc::new(SqlxUserRepository::new(pool.clone()));
    let dreams = Arc::new(SqlxDreamRepository::new(pool.clone()));
    let tokens = Arc::new(TokenService::new(config.auth.jwt_secret.as_bytes()));
    let rate_limiter = Arc::new(RateLimiter::new());

    let login = Arc::new(LoginService::new(
        users.clone(),
        tokens.clone(),
        rate_limiter.clone(),
        config.auth.clone(),
        config.rate_limit.clone(),
    ));
    let guard = Arc::new(AuthGuard::new(tokens, users, config.auth.lookup_timeout()));

    let state = ApiState { login, dreams, rate_limiter, limits: config.rate_limit.clone() };
    let app = build_router(state, guard, &config.server);

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install shutdown handler");
    }
}
