//! Per-action sliding-window rate limiting.
//!
//! Each `(principal_key, action)` pair keeps the timestamps of its
//! requests inside the trailing window. A request is admitted while the
//! pruned count stays below the limit. The store is a `DashMap`; the
//! shard write lock held by the entry API serializes mutations per key,
//! so concurrent requests can never under-count.
//!
//! This is advisory abuse-prevention, not a security boundary: state is
//! in-process and not durable across restarts.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::{debug, warn};

/// Sliding-window rate limiter keyed by `(principal_key, action)`.
#[derive(Debug, Default)]
pub struct RateLimiter {
    windows: DashMap<(String, String), Vec<DateTime<Utc>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { windows: DashMap::new() }
    }

    /// Check and record a request.
    ///
    /// Returns `Ok(())` when admitted, `Err(retry_after_secs)` when the
    /// caller must wait for the oldest request to age out of the window.
    pub fn allow(
        &self,
        principal_key: &str,
        action: &str,
        limit: u32,
        window_seconds: u64,
    ) -> Result<(), u64> {
        self.allow_at(principal_key, action, limit, window_seconds, Utc::now())
    }

    /// `allow` with an explicit clock, the seam tests use to age entries
    /// out without sleeping.
    pub fn allow_at(
        &self,
        principal_key: &str,
        action: &str,
        limit: u32,
        window_seconds: u64,
        now: DateTime<Utc>,
    ) -> Result<(), u64> {
        let window = Duration::seconds(window_seconds as i64);
        let key = (principal_key.to_string(), action.to_string());

        let mut entry = self.windows.entry(key).or_default();
        let cutoff = now - window;
        entry.retain(|ts| *ts > cutoff);

        if entry.len() >= limit as usize {
            // Oldest surviving timestamp decides when a slot frees up.
            let retry_after = entry
                .first()
                .map(|oldest| {
                    let free_at = *oldest + window;
                    (free_at - now).num_seconds().max(1) as u64
                })
                .unwrap_or(1);
            warn!(
                principal = %principal_key,
                action = %action,
                limit,
                retry_after_seconds = retry_after,
                "rate limit exceeded"
            );
            return Err(retry_after);
        }

        entry.push(now);
        debug!(
            principal = %principal_key,
            action = %action,
            used = entry.len(),
            limit,
            "rate limit check passed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_exactly_limit_within_window() {
        let limiter = RateLimiter::new();
        for i in 0..5 {
            assert!(
                limiter.allow("ann", "register", 5, 3600).is_ok(),
                "request {} should be admitted",
                i + 1
            );
        }
        assert!(limiter.allow("ann", "register", 5, 3600).is_err(), "6th must be denied");
    }

    #[test]
    fn denied_request_reports_retry_after() {
        let limiter = RateLimiter::new();
        limiter.allow("ann", "login", 1, 3600).unwrap();
        let retry_after = limiter.allow("ann", "login", 1, 3600).unwrap_err();
        assert!(retry_after >= 1 && retry_after <= 3600);
    }

    #[test]
    fn oldest_entry_aging_out_frees_a_slot() {
        let limiter = RateLimiter::new();
        let t0 = Utc::now();
        for _ in 0..3 {
            limiter.allow_at("ann", "create_dream", 3, 3600, t0).unwrap();
        }
        assert!(limiter.allow_at("ann", "create_dream", 3, 3600, t0).is_err());

        // Just before the window closes the slot is still taken.
        let almost = t0 + Duration::seconds(3599);
        assert!(limiter.allow_at("ann", "create_dream", 3, 3600, almost).is_err());

        // Once the recorded timestamps leave the trailing window the
        // slots free up again.
        let later = t0 + Duration::seconds(3601);
        assert!(limiter.allow_at("ann", "create_dream", 3, 3600, later).is_ok());
    }

    #[test]
    fn keys_are_isolated_by_principal_and_action() {
        let limiter = RateLimiter::new();
        limiter.allow("ann", "login", 1, 3600).unwrap();
        assert!(limiter.allow("ann", "login", 1, 3600).is_err());

        // Different principal, same action.
        assert!(limiter.allow("bob", "login", 1, 3600).is_ok());
        // Same principal, different action.
        assert!(limiter.allow("ann", "register", 1, 3600).is_ok());
    }

    #[test]
    fn denied_requests_do_not_consume_slots() {
        let limiter = RateLimiter::new();
        let t0 = Utc::now();
        limiter.allow_at("ann", "login", 1, 60, t0).unwrap();
        for _ in 0..10 {
            assert!(limiter.allow_at("ann", "login", 1, 60, t0).is_err());
        }
        // The single recorded timestamp ages out on schedule despite the
        // denied attempts.
        assert!(limiter.allow_at("ann", "login", 1, 60, t0 + Duration::seconds(61)).is_ok());
    }

    #[tokio::test]
    async fn concurrent_requests_never_exceed_limit() {
        use std::sync::Arc;

        let limiter = Arc::new(RateLimiter::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move {
                limiter.allow("ann", "register", 5, 3600).is_ok()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 5);
    }
}
