//! # Configuration
//!
//! Environment-driven configuration for the dreamkeeper service. Loaded
//! once at process start; there is no hot-reload.

mod settings;

pub use settings::{
    AppConfig, AuthConfig, DatabaseConfig, ObservabilityConfig, RateLimitConfig, ServerConfig,
};
