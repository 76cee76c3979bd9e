//! Authentication and authorization module entry point.
//!
//! The security-sensitive core of dreamkeeper: password hashing, signed
//! token issuance/verification with revocation, per-action rate limiting,
//! and the request-level auth guard.

pub mod hashing;
pub mod login_service;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod token_service;
pub mod user;
pub mod validation;

pub use login_service::{AccessTokenResponse, AuthTokens, LoginService};
pub use models::{AuthError, Principal};
pub use rate_limit::RateLimiter;
pub use token_service::{Claims, TokenService, TokenUse};
pub use user::{NewUser, User};
