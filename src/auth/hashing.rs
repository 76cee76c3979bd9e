//! Password hashing with Argon2id.
//!
//! The stored record is a self-describing PHC string (algorithm, version,
//! parameters, salt, digest), so verification never needs out-of-band
//! metadata. Verification is constant-time inside the argon2 crate, and a
//! malformed stored record fails closed: `verify_password` returns
//! `Ok(false)` rather than an error a caller could mistake for success.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;

use crate::errors::{Error, Result};

/// Build the process-wide Argon2 instance.
///
/// Argon2id with the RFC 9106 low-memory profile brings a single hash to
/// roughly 100ms on commodity hardware, which is the cost target for an
/// interactive login path.
pub fn password_hasher() -> Argon2<'static> {
    const MEMORY_COST_KIB: u32 = 19_456; // 19 MiB
    const ITERATIONS: u32 = 2;
    const PARALLELISM: u32 = 1;
    let params = Params::new(MEMORY_COST_KIB, ITERATIONS, PARALLELISM, Some(32))
        .expect("valid Argon2 parameters");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Hash a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = password_hasher()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| Error::internal(format!("Failed to hash password: {err}")))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC record.
///
/// An unparsable record means the credential can never match, not that the
/// caller hit an internal error.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    password_hasher().verify_password(password.as_bytes(), &parsed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hash = hash_password("Abcd1234").unwrap();
        assert!(verify_password("Abcd1234", &hash));
    }

    #[test]
    fn wrong_password_fails() {
        let hash = hash_password("Abcd1234").unwrap();
        assert!(!verify_password("Abcd1235", &hash));
    }

    #[test]
    fn same_password_hashes_differently_per_salt() {
        let a = hash_password("Abcd1234").unwrap();
        let b = hash_password("Abcd1234").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_record_fails_closed() {
        assert!(!verify_password("Abcd1234", "not-a-phc-string"));
        assert!(!verify_password("Abcd1234", ""));
    }

    #[test]
    fn record_is_self_describing_phc_string() {
        let hash = hash_password("Abcd1234").unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }
}
