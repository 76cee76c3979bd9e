//! Repository traits and their sqlx implementations.

mod dream;
mod user;

pub use dream::{DreamRepository, SqlxDreamRepository};
pub use user::{SqlxUserRepository, UserRepository};
