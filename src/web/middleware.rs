//! HTTP middleware

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

/// What a request is about, for the completion log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestSubject {
    /// `/api/{command}` poll, with the device's `id` header ("" when absent)
    Device { command: String, device: String },
    /// `/image/{fingerprint}` fetch
    Artifact { fingerprint: String },
    Other,
}

impl RequestSubject {
    pub fn classify(path: &str, headers: &HeaderMap) -> Self {
        if let Some(command) = path.strip_prefix("/api/") {
            let device = headers
                .get("id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            return Self::Device {
                command: command.to_string(),
                device,
            };
        }
        if let Some(fingerprint) = path.strip_prefix("/image/") {
            return Self::Artifact {
                fingerprint: fingerprint.to_string(),
            };
        }
        Self::Other
    }
}

/// One line per request inside a span carrying a fresh request id.
///
/// Device polls are tagged with the device id and artifact fetches with the
/// fingerprint; an expired artifact is routine and only logged at debug.
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let subject = RequestSubject::classify(request.uri().path(), request.headers());
    let span = info_span!(
        "http",
        request_id = %uuid::Uuid::new_v4(),
        method = %request.method(),
        path = %request.uri().path(),
    );

    async move {
        let response = next.run(request).await;
        let status = response.status();
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &subject {
            RequestSubject::Device { command, device } if status.is_success() => {
                info!(%command, %device, status = status.as_u16(), elapsed_ms, "Device poll");
            }
            RequestSubject::Device { command, device } => {
                warn!(%command, %device, status = status.as_u16(), elapsed_ms, "Device poll failed");
            }
            RequestSubject::Artifact { fingerprint } if status == StatusCode::NOT_FOUND => {
                debug!(%fingerprint, elapsed_ms, "Artifact fetch missed");
            }
            RequestSubject::Artifact { fingerprint } => {
                info!(%fingerprint, status = status.as_u16(), elapsed_ms, "Artifact fetch");
            }
            RequestSubject::Other if status.is_client_error() || status.is_server_error() => {
                warn!(status = status.as_u16(), elapsed_ms, "Request failed");
            }
            RequestSubject::Other => {
                info!(status = status.as_u16(), elapsed_ms, "Request served");
            }
        }

        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_device_polls_carry_the_device_id() {
        let mut headers = HeaderMap::new();
        headers.insert("id", HeaderValue::from_static("AA:BB:CC"));
        assert_eq!(
            RequestSubject::classify("/api/display", &headers),
            RequestSubject::Device {
                command: "display".to_string(),
                device: "AA:BB:CC".to_string(),
            }
        );
        assert_eq!(
            RequestSubject::classify("/api/log", &HeaderMap::new()),
            RequestSubject::Device {
                command: "log".to_string(),
                device: String::new(),
            }
        );
    }

    #[test]
    fn test_artifact_fetches_carry_the_fingerprint() {
        assert_eq!(
            RequestSubject::classify("/image/0123abcd", &HeaderMap::new()),
            RequestSubject::Artifact {
                fingerprint: "0123abcd".to_string(),
            }
        );
    }

    #[test]
    fn test_other_paths() {
        assert_eq!(
            RequestSubject::classify("/health", &HeaderMap::new()),
            RequestSubject::Other
        );
        assert_eq!(
            RequestSubject::classify("/render", &HeaderMap::new()),
            RequestSubject::Other
        );
    }
}
