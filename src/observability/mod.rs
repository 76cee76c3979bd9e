//! # Observability
//!
//! Structured logging via the tracing ecosystem. Service and repository
//! methods are `#[instrument]`-ed with skip-lists for secrets; request
//! spans come from `tower_http::trace::TraceLayer` in the router.

use crate::config::ObservabilityConfig;
use crate::errors::{Error, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured default level
/// applies. Safe to call once per process; a second call returns an error
/// instead of panicking so tests that race on init stay quiet.
pub fn init_tracing(config: &ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    result.map_err(|e| Error::internal(format!("failed to initialize tracing: {e}")))
}
