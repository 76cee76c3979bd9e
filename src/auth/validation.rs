//! Request payloads for the auth endpoints, with input validation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::errors::{Error, Result};

/// `POST /auth/register`
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 80, message = "username must be 3-80 characters"))]
    pub username: String,
    #[validate(email(message = "invalid email address"))]
    #[validate(length(max = 120))]
    pub email: String,
    pub password: String,
}

/// `POST /auth/login`
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// `PUT /auth/change-password`
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "old password is required"))]
    pub old_password: String,
    pub new_password: String,
}

/// Password strength policy: at least 8 characters with an uppercase
/// letter, a lowercase letter, and a digit.
///
/// Kept out of the validator derive so register and change-password share
/// one composite rule with a precise message per failure.
pub fn validate_password_strength(password: &str) -> Result<()> {
    if password.len() < 8 {
        return Err(Error::validation_field(
            "Password must be at least 8 characters long",
            "password",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(Error::validation_field(
            "Password must contain at least one uppercase letter",
            "password",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(Error::validation_field(
            "Password must contain at least one lowercase letter",
            "password",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(Error::validation_field(
            "Password must contain at least one digit",
            "password",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn strong_password_passes() {
        assert!(validate_password_strength("Abcd1234").is_ok());
    }

    #[test]
    fn weak_passwords_fail_with_specific_reasons() {
        for (password, fragment) in [
            ("Ab1", "at least 8 characters"),
            ("abcd1234", "uppercase"),
            ("ABCD1234", "lowercase"),
            ("Abcdefgh", "digit"),
        ] {
            let err = validate_password_strength(password).unwrap_err();
            assert!(
                err.to_string().contains(fragment),
                "{password:?} should fail mentioning {fragment:?}, got {err}"
            );
        }
    }

    #[test]
    fn register_request_rejects_bad_email_and_short_username() {
        let req = RegisterRequest {
            username: "ab".into(),
            email: "not-an-email".into(),
            password: "Abcd1234".into(),
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("username"));
        assert!(errors.field_errors().contains_key("email"));
    }

    #[test]
    fn valid_register_request_passes() {
        let req = RegisterRequest {
            username: "ann".into(),
            email: "ann@x.com".into(),
            password: "Abcd1234".into(),
        };
        assert!(req.validate().is_ok());
    }
}
