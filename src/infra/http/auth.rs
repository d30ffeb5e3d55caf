//! Bearer-token helpers shared by the admin API and the invalidation
//! endpoint.

use std::sync::Arc;

use axum::http::{HeaderMap, header};
use subtle::ConstantTimeEq;

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

pub(crate) fn token_matches(expected: &str, presented: &str) -> bool {
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

/// Normalize a configured secret: blank values mean "not configured", so a
/// blank secret can never match a blank header.
pub(crate) fn normalize_token(token: Option<String>) -> Option<Arc<str>> {
    token.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| Arc::from(trimmed))
    })
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn extracts_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer sekrit"),
        );
        assert_eq!(bearer_token(&headers), Some("sekrit"));
    }

    #[test]
    fn rejects_non_bearer_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Basic c2Vrcml0"),
        );
        assert_eq!(bearer_token(&headers), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn token_comparison() {
        assert!(token_matches("sekrit", "sekrit"));
        assert!(!token_matches("sekrit", "sekri"));
        assert!(!token_matches("sekrit", ""));
    }

    #[test]
    fn blank_secrets_normalize_to_none() {
        assert!(normalize_token(None).is_none());
        assert!(normalize_token(Some("   ".to_string())).is_none());
        assert_eq!(
            normalize_token(Some(" sekrit ".to_string())).as_deref(),
            Some("sekrit")
        );
    }
}
