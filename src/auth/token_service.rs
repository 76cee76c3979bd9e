//! Signed-token issuance, verification, and revocation.
//!
//! Tokens are HS256 JWTs: three base64url segments signed with one
//! configured symmetric secret. The algorithm is pinned in code — the
//! token's own header never chooses how it is verified, which closes the
//! algorithm-confusion class of attack. Signature comparison happens
//! inside `jsonwebtoken`, which uses a constant-time ring MAC check.
//!
//! Revocation is a process-wide set of `jti` values held in a `DashMap`.
//! An insert is visible to every verification that starts after `revoke`
//! returns (shard write lock), and entries are purged once their token's
//! natural expiry passes so the set stays bounded.

use chrono::{DateTime, Duration, TimeZone, Utc};
use dashmap::DashMap;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::auth::models::AuthError;
use crate::domain::UserId;
use crate::errors::{Error, Result};

/// What a token is allowed to authorize.
///
/// A refresh token can only mint a new access token; presenting it to a
/// resource endpoint fails with `WrongTokenType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenUse {
    Access,
    Refresh,
}

impl TokenUse {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenUse::Access => "access",
            TokenUse::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    pub username: String,
    /// Unique token id, tracked for revocation
    pub jti: String,
    /// Issued-at, seconds since epoch
    pub iat: i64,
    /// Expiry, seconds since epoch
    pub exp: i64,
    /// Token type: "access" or "refresh"
    pub typ: String,
}

impl Claims {
    pub fn user_id(&self) -> UserId {
        UserId::from_str_unchecked(&self.sub)
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0).single().unwrap_or_else(Utc::now)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

/// A freshly signed token plus the metadata callers need to store or
/// revoke it.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
}

/// Service for issuing and verifying signed bearer tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    /// Revoked `jti` → token expiry (epoch seconds), for purge.
    revoked: DashMap<String, i64>,
}

impl TokenService {
    /// Create a token service with the given symmetric secret.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry must be strictly honored; the default 60s leeway would
        // accept a token past its `exp`.
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            revoked: DashMap::new(),
        }
    }

    /// Issue a short-lived access token for API calls.
    pub fn issue_access_token(
        &self,
        user_id: &UserId,
        username: &str,
        ttl: Duration,
    ) -> Result<IssuedToken> {
        self.issue(user_id, username, TokenUse::Access, ttl)
    }

    /// Issue a longer-lived refresh token, good only for minting a new
    /// access token.
    pub fn issue_refresh_token(
        &self,
        user_id: &UserId,
        username: &str,
        ttl: Duration,
    ) -> Result<IssuedToken> {
        self.issue(user_id, username, TokenUse::Refresh, ttl)
    }

    fn issue(
        &self,
        user_id: &UserId,
        username: &str,
        token_use: TokenUse,
        ttl: Duration,
    ) -> Result<IssuedToken> {
        let now = Utc::now();
        let expires_at = now + ttl;
        let jti = Uuid::new_v4().to_string();
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            jti: jti.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            typ: token_use.as_str().to_string(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|err| Error::internal(format!("Failed to sign token: {err}")))?;

        Ok(IssuedToken { token, jti, expires_at })
    }

    /// Verify a token string and return its claims.
    ///
    /// Rejections, in order: bad signature or malformed encoding, expiry,
    /// revocation, then token-type mismatch against what the caller
    /// expects.
    pub fn verify(&self, token: &str, expected_use: TokenUse) -> std::result::Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(
            |err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidSignature => AuthError::InvalidSignature,
                _ => AuthError::MalformedBearer,
            },
        )?;

        let claims = data.claims;
        // The decoder accepts `exp == now`; expiry must lie strictly in
        // the future.
        if claims.exp <= Utc::now().timestamp() {
            return Err(AuthError::Expired);
        }
        if self.is_revoked(&claims.jti) {
            return Err(AuthError::Revoked);
        }
        if claims.typ != expected_use.as_str() {
            return Err(AuthError::WrongTokenType);
        }
        Ok(claims)
    }

    /// Revoke a token by its `jti`. Every verification that begins after
    /// this returns will reject the token, even if otherwise valid.
    pub fn revoke(&self, jti: &str, token_expires_at: DateTime<Utc>) {
        self.purge_expired();
        self.revoked.insert(jti.to_string(), token_expires_at.timestamp());
    }

    pub fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.get(jti).is_some()
    }

    /// Number of revocation entries currently held.
    pub fn revoked_count(&self) -> usize {
        self.revoked.len()
    }

    /// Drop entries whose token has expired anyway; verification would
    /// already reject them on `exp`.
    fn purge_expired(&self) {
        let now = Utc::now().timestamp();
        self.revoked.retain(|_, exp| *exp > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn service() -> TokenService {
        TokenService::new(b"unit-test-secret-with-enough-bytes")
    }

    fn issue_access(svc: &TokenService) -> IssuedToken {
        svc.issue_access_token(&UserId::new(), "ann", Duration::hours(1)).unwrap()
    }

    #[test]
    fn issued_access_token_verifies() {
        let svc = service();
        let user_id = UserId::new();
        let issued = svc.issue_access_token(&user_id, "ann", Duration::hours(1)).unwrap();

        let claims = svc.verify(&issued.token, TokenUse::Access).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.username, "ann");
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.typ, "access");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let svc = service();
        let issued = svc
            .issue_access_token(&UserId::new(), "ann", Duration::seconds(-5))
            .unwrap();
        assert!(matches!(svc.verify(&issued.token, TokenUse::Access), Err(AuthError::Expired)));
    }

    #[test]
    fn token_expiring_exactly_now_is_rejected() {
        let svc = service();
        // Zero ttl puts `exp` at the current second; that boundary must
        // already count as expired.
        let issued = svc
            .issue_access_token(&UserId::new(), "ann", Duration::zero())
            .unwrap();
        assert!(matches!(svc.verify(&issued.token, TokenUse::Access), Err(AuthError::Expired)));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let svc = service();
        let other = TokenService::new(b"a-completely-different-secret-value");
        let issued = issue_access(&other);
        assert!(matches!(
            svc.verify(&issued.token, TokenUse::Access),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn tampered_payload_fails_signature_check() {
        let svc = service();
        let issued = issue_access(&svc);

        let mut parts: Vec<String> =
            issued.token.split('.').map(|s| s.to_string()).collect();
        assert_eq!(parts.len(), 3);
        // Flip one character of the payload segment.
        let payload = &mut parts[1];
        let flipped = if payload.as_bytes()[0] == b'A' { 'B' } else { 'A' };
        payload.replace_range(0..1, &flipped.to_string());
        let tampered = parts.join(".");

        match svc.verify(&tampered, TokenUse::Access) {
            Err(AuthError::InvalidSignature) | Err(AuthError::MalformedBearer) => {}
            other => panic!("tampered token must not verify: {other:?}"),
        }
    }

    #[test]
    fn garbage_token_is_malformed() {
        let svc = service();
        assert!(matches!(
            svc.verify("definitely.not.a-jwt", TokenUse::Access),
            Err(AuthError::MalformedBearer)
        ));
        assert!(matches!(svc.verify("", TokenUse::Access), Err(AuthError::MalformedBearer)));
    }

    #[test]
    fn revoked_token_is_rejected_even_if_valid() {
        let svc = service();
        let issued = issue_access(&svc);

        svc.verify(&issued.token, TokenUse::Access).unwrap();
        svc.revoke(&issued.jti, issued.expires_at);
        assert!(matches!(svc.verify(&issued.token, TokenUse::Access), Err(AuthError::Revoked)));
    }

    #[test]
    fn refresh_token_cannot_authorize_resource_calls() {
        let svc = service();
        let issued = svc
            .issue_refresh_token(&UserId::new(), "ann", Duration::days(7))
            .unwrap();
        assert!(matches!(
            svc.verify(&issued.token, TokenUse::Access),
            Err(AuthError::WrongTokenType)
        ));
        // But it verifies as what it is.
        let claims = svc.verify(&issued.token, TokenUse::Refresh).unwrap();
        assert_eq!(claims.typ, "refresh");
    }

    #[test]
    fn access_token_cannot_refresh() {
        let svc = service();
        let issued = issue_access(&svc);
        assert!(matches!(
            svc.verify(&issued.token, TokenUse::Refresh),
            Err(AuthError::WrongTokenType)
        ));
    }

    #[test]
    fn purge_drops_entries_for_expired_tokens() {
        let svc = service();
        // Already-expired revocation entry, then a live one; the purge on
        // revoke should drop the stale entry.
        svc.revoke("stale", Utc::now() - Duration::hours(1));
        svc.revoke("live", Utc::now() + Duration::hours(1));
        assert!(!svc.is_revoked("stale"));
        assert!(svc.is_revoked("live"));
        assert_eq!(svc.revoked_count(), 1);
    }

    #[test]
    fn jti_is_unique_per_issue() {
        let svc = service();
        let a = issue_access(&svc);
        let b = issue_access(&svc);
        assert_ne!(a.jti, b.jti);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn round_trips_arbitrary_usernames(username in "[a-zA-Z0-9_.-]{1,32}") {
            let svc = service();
            let issued = svc
                .issue_access_token(&UserId::new(), &username, Duration::hours(1))
                .unwrap();
            let claims = svc.verify(&issued.token, TokenUse::Access).unwrap();
            prop_assert_eq!(claims.username, username);
        }

        #[test]
        fn mutated_tokens_never_verify(idx in 0usize..64, byte in 0u8..=255) {
            let svc = service();
            let issued = issue_access(&svc);
            let mut bytes = issued.token.clone().into_bytes();
            let pos = idx % bytes.len();
            if bytes[pos] == byte {
                return Ok(());
            }
            bytes[pos] = byte;
            if let Ok(mutated) = String::from_utf8(bytes) {
                prop_assert!(svc.verify(&mutated, TokenUse::Access).is_err());
            }
        }
    }
}
