//! Request extractors

use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, request::Parts},
};
use std::convert::Infallible;

/// `scheme://host` as seen by the client, honouring reverse-proxy headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin(pub String);

impl RequestOrigin {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let host = header("x-forwarded-host")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .or_else(|| header("host"))
            .unwrap_or("localhost");

        let forwarded_https = header("forwarded")
            .is_some_and(|v| v.to_ascii_lowercase().contains("proto=https"));
        let proto_https =
            header("x-forwarded-proto").is_some_and(|v| v.eq_ignore_ascii_case("https"));
        let scheme = if forwarded_https || proto_https {
            "https"
        } else {
            "http"
        };

        Self(format!("{scheme}://{host}"))
    }
}

impl<S> FromRequestParts<S> for RequestOrigin
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn origin(pairs: &[(&'static str, &'static str)]) -> String {
        let mut headers = HeaderMap::new();
        for (name, value) in pairs {
            headers.insert(*name, HeaderValue::from_static(*value));
        }
        RequestOrigin::from_headers(&headers).0
    }

    #[test]
    fn test_defaults_to_localhost() {
        assert_eq!(origin(&[]), "http://localhost");
    }

    #[test]
    fn test_host_header() {
        assert_eq!(origin(&[("host", "snapper.lan:8080")]), "http://snapper.lan:8080");
    }

    #[test]
    fn test_forwarded_host_wins() {
        assert_eq!(
            origin(&[("host", "internal:8080"), ("x-forwarded-host", "trmnl.example.com, proxy")]),
            "http://trmnl.example.com"
        );
    }

    #[test]
    fn test_https_detection() {
        assert_eq!(
            origin(&[("host", "a.example"), ("x-forwarded-proto", "https")]),
            "https://a.example"
        );
        assert_eq!(
            origin(&[("host", "a.example"), ("forwarded", "for=1.2.3.4;proto=https")]),
            "https://a.example"
        );
        assert_eq!(
            origin(&[("host", "a.example"), ("x-forwarded-proto", "http")]),
            "http://a.example"
        );
    }
}
