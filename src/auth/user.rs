//! User credential model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::UserId;

/// A registered user. The password hash lives only in storage and in the
/// narrow `get_user_with_password` path; it is never serialized out.
///
/// Accounts are soft-deactivated (`is_active = false`), never physically
/// deleted, so a user id embedded in an outstanding token always resolves
/// to a row whose status can be checked.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Emails are matched case-insensitively; normalize before lookup or
    /// insert.
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }
}

/// New user database payload.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_email_lowercases_and_trims() {
        assert_eq!(User::normalize_email("  Ann@X.Com "), "ann@x.com");
    }
}
