//! # Configuration Settings
//!
//! Defines the configuration structure for the dreamkeeper service. All
//! values come from `DREAMKEEPER_*` environment variables with sensible
//! development defaults, except the JWT secret which has no default in
//! spirit: the fallback is only acceptable for local development and is
//! rejected by validation when shorter than 32 bytes.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,

    #[validate(nested)]
    pub database: DatabaseConfig,

    #[validate(nested)]
    pub auth: AuthConfig,

    #[validate(nested)]
    pub rate_limit: RateLimitConfig,

    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load the full configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            server: ServerConfig::from_env(),
            database: DatabaseConfig::from_env(),
            auth: AuthConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            observability: ObservabilityConfig::from_env(),
        };
        config.validate_all()?;
        Ok(config)
    }

    /// Validate the entire configuration.
    pub fn validate_all(&self) -> Result<()> {
        Validate::validate(self)
            .map_err(|e| Error::validation(format!("invalid configuration: {e}")))?;
        self.validate_custom()
    }

    /// Custom validation beyond what the validator derive can express.
    fn validate_custom(&self) -> Result<()> {
        if self.auth.jwt_secret.len() < 32 {
            return Err(Error::config("JWT secret must be at least 32 bytes long"));
        }
        if self.auth.access_ttl_seconds >= self.auth.refresh_ttl_seconds {
            return Err(Error::config(
                "access token TTL must be shorter than refresh token TTL",
            ));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    #[validate(range(min = 1, message = "Port must be non-zero"))]
    pub port: u16,

    /// CORS allowed origins (empty = allow any origin)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8080, cors_origins: vec![] }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let cors_origins = std::env::var("DREAMKEEPER_CORS_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Self {
            host: env_or("DREAMKEEPER_HOST", defaults.host),
            port: env_or("DREAMKEEPER_PORT", defaults.port),
            cors_origins,
        }
    }

    /// Get the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DatabaseConfig {
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    #[validate(range(min = 1, max = 64))]
    pub max_connections: u32,

    pub connect_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://dreamkeeper.db".to_string(),
            max_connections: 5,
            connect_timeout_seconds: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            url: env_or("DREAMKEEPER_DATABASE_URL", defaults.url),
            max_connections: env_or("DREAMKEEPER_DATABASE_MAX_CONNECTIONS", defaults.max_connections),
            connect_timeout_seconds: env_or(
                "DREAMKEEPER_DATABASE_CONNECT_TIMEOUT_SECONDS",
                defaults.connect_timeout_seconds,
            ),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    /// Symmetric secret for HS256 token signing. One configured secret for
    /// the whole process; tokens never choose their own algorithm.
    pub jwt_secret: String,

    /// Access token lifetime in seconds (default: 1 hour)
    #[validate(range(min = 1))]
    pub access_ttl_seconds: i64,

    /// Refresh token lifetime in seconds (default: 7 days)
    #[validate(range(min = 1))]
    pub refresh_ttl_seconds: i64,

    /// Upper bound on a credential-store lookup during authentication
    #[validate(range(min = 1, max = 60))]
    pub lookup_timeout_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "insecure-dev-secret-change-me-in-prod".to_string(),
            access_ttl_seconds: 3_600,
            refresh_ttl_seconds: 7 * 86_400,
            lookup_timeout_seconds: 5,
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            jwt_secret: env_or("DREAMKEEPER_JWT_SECRET", defaults.jwt_secret),
            access_ttl_seconds: env_or("DREAMKEEPER_ACCESS_TTL_SECONDS", defaults.access_ttl_seconds),
            refresh_ttl_seconds: env_or(
                "DREAMKEEPER_REFRESH_TTL_SECONDS",
                defaults.refresh_ttl_seconds,
            ),
            lookup_timeout_seconds: env_or(
                "DREAMKEEPER_LOOKUP_TIMEOUT_SECONDS",
                defaults.lookup_timeout_seconds,
            ),
        }
    }

    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.access_ttl_seconds)
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_ttl_seconds)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_seconds)
    }
}

/// Per-action rate limit policy. These are advisory abuse-prevention
/// knobs, not a security boundary; all counts share a one-hour sliding
/// window.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RateLimitConfig {
    #[validate(range(min = 1))]
    pub register_per_hour: u32,
    #[validate(range(min = 1))]
    pub login_per_hour: u32,
    #[validate(range(min = 1))]
    pub create_dream_per_hour: u32,
    #[validate(range(min = 1))]
    pub update_dream_per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            register_per_hour: 5,
            login_per_hour: 10,
            create_dream_per_hour: 20,
            update_dream_per_hour: 30,
        }
    }
}

impl RateLimitConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            register_per_hour: env_or("DREAMKEEPER_RATE_REGISTER_PER_HOUR", defaults.register_per_hour),
            login_per_hour: env_or("DREAMKEEPER_RATE_LOGIN_PER_HOUR", defaults.login_per_hour),
            create_dream_per_hour: env_or(
                "DREAMKEEPER_RATE_CREATE_DREAM_PER_HOUR",
                defaults.create_dream_per_hour,
            ),
            update_dream_per_hour: env_or(
                "DREAMKEEPER_RATE_UPDATE_DREAM_PER_HOUR",
                defaults.update_dream_per_hour,
            ),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Default log filter when RUST_LOG is unset
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logs: false }
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: env_or("DREAMKEEPER_LOG_LEVEL", defaults.log_level),
            json_logs: env_or("DREAMKEEPER_JSON_LOGS", defaults.json_logs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            auth: AuthConfig {
                jwt_secret: "a".repeat(32),
                ..AuthConfig::default()
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn default_rate_limit_policy() {
        let limits = RateLimitConfig::default();
        assert_eq!(limits.register_per_hour, 5);
        assert_eq!(limits.login_per_hour, 10);
        assert_eq!(limits.create_dream_per_hour, 20);
        assert_eq!(limits.update_dream_per_hour, 30);
    }

    #[test]
    fn short_jwt_secret_is_rejected() {
        let mut config = valid_config();
        config.auth.jwt_secret = "short".to_string();
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn access_ttl_must_be_shorter_than_refresh_ttl() {
        let mut config = valid_config();
        config.auth.access_ttl_seconds = config.auth.refresh_ttl_seconds;
        assert!(config.validate_all().is_err());
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate_all().is_ok());
    }
}
