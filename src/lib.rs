//! # Dreamkeeper
//!
//! A dream journal service: accounts with Argon2id password storage, JWT
//! access/refresh tokens with in-process revocation, sliding-window rate
//! limiting, and an owner-scoped journal with search and statistics.
//!
//! ## Architecture
//!
//! ```text
//! HTTP API Layer → Auth Guard → Services → Repositories → SQLite
//!      ↓               ↓            ↓
//! Error Mapping   Token Service  Rate Limiter
//! ```
//!
//! - **API layer**: Axum router, handlers, and the HTTP error mapping
//! - **Auth**: password hashing, token issue/verify/revoke, the bearer
//!   guard middleware, and login/register/refresh flows
//! - **Storage**: SQLx repositories over SQLite with embedded migrations

pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod storage;

pub use config::AppConfig;
pub use errors::{Error, Result};

/// Crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name used in logs.
pub const APP_NAME: &str = "dreamkeeper";
