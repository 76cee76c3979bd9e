//! HTTP API: router, handlers, error mapping, and OpenAPI document.

pub mod docs;
pub mod error;
pub mod handlers;
pub mod routes;

pub use error::ApiError;
pub use routes::{build_router, ApiState};
