//! Domain layer
//!
//! Pure domain types with zero infrastructure dependencies: type-safe
//! identifiers and the dream journal entry model. Everything here can be
//! constructed and tested without a database or HTTP stack.

pub mod dream;
pub mod id;

pub use dream::{Dream, DreamStats, MoodCount, NewDream, TagCount, UpdateDream};
pub use id::{DreamId, UserId};
