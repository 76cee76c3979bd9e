pub mod auth;
pub mod dreams;
pub mod health;

use axum::http::HeaderMap;

/// Rate-limit key for unauthenticated callers.
///
/// Uses the first hop of `X-Forwarded-For` when present, otherwise a
/// fixed key for direct connections.
pub(crate) fn client_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|hop| hop.trim().to_string())
        .filter(|hop| !hop.is_empty())
        .unwrap_or_else(|| "local".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn client_key_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_key(&headers), "203.0.113.7");
    }

    #[test]
    fn client_key_falls_back_for_direct_connections() {
        assert_eq!(client_key(&HeaderMap::new()), "local");
    }
}
