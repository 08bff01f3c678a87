//! End-to-end tests of the HTTP surface with an in-memory renderer

use async_trait::async_trait;
use axum::http::StatusCode;
use axum_test::TestServer;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

use trmnl_snapper::{
    codec::{self, BitDepth, RawBitmap, Rotation},
    config::Config,
    errors::{RenderError, RenderResult},
    orchestrator,
    renderer::PageRenderer,
    web::{AppState, create_router},
};

/// Horizontal gradient so neighbouring columns land in different gray levels
fn gradient(width: u32, height: u32) -> RawBitmap {
    let mut data = Vec::with_capacity((width * height * 3) as usize);
    for _ in 0..height {
        for x in 0..width {
            let v = (x * 255 / width.max(1)) as u8;
            data.extend_from_slice(&[v, v, v]);
        }
    }
    RawBitmap::rgb8(width, height, data)
}

#[derive(Default)]
struct GradientRenderer {
    calls: Mutex<Vec<Url>>,
}

#[async_trait]
impl PageRenderer for GradientRenderer {
    async fn capture(&self, url: &Url, width: u32, height: u32) -> RenderResult<RawBitmap> {
        self.calls.lock().unwrap().push(url.clone());
        Ok(gradient(width, height))
    }
}

struct BrokenRenderer;

#[async_trait]
impl PageRenderer for BrokenRenderer {
    async fn capture(&self, _url: &Url, _width: u32, _height: u32) -> RenderResult<RawBitmap> {
        Err(RenderError::capture("no browser"))
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.render.page_url = "https://example.com/dashboard?theme=dark".to_string();
    config.device.default_width = 64;
    config.device.default_height = 32;
    config
}

fn server_with(config: Config, renderer: Arc<dyn PageRenderer>) -> TestServer {
    let state = AppState::new(config, renderer).unwrap();
    TestServer::new(create_router(state)).unwrap()
}

fn server() -> (TestServer, Arc<GradientRenderer>) {
    let renderer = Arc::new(GradientRenderer::default());
    (server_with(test_config(), renderer.clone()), renderer)
}

#[tokio::test]
async fn test_display_then_fetch_image() {
    let (server, _) = server();

    let response = server
        .get("/api/display")
        .add_header("host", "snapper.lan:8080")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();

    let filename = body["filename"].as_str().unwrap();
    let fingerprint = filename.strip_suffix(".png").unwrap();
    assert_eq!(fingerprint.len(), 32);
    assert_eq!(
        body["image_url"].as_str().unwrap(),
        format!("http://snapper.lan:8080/image/{fingerprint}")
    );
    assert_eq!(body["image_url_timeout"], 1000);
    assert_eq!(body["refresh_rate"], 30);
    assert_eq!(body["reset_firmware"], false);
    assert_eq!(body["update_firmware"], false);
    assert_eq!(body["special_function"], "");

    let image = server.get(&format!("/image/{fingerprint}")).await;
    assert_eq!(image.status_code(), StatusCode::OK);
    assert_eq!(
        image.headers().get("content-type").unwrap(),
        "image/png"
    );

    // Served bytes are exactly the artifact the fingerprint names
    assert_eq!(orchestrator::fingerprint(image.as_bytes()), fingerprint);
    let expected = codec::encode(&gradient(64, 32), 64, 32, Rotation::None, BitDepth::Two).unwrap();
    assert_eq!(image.as_bytes().as_ref(), expected.to_png().unwrap().as_slice());

    let decoded = image::load_from_memory(image.as_bytes()).unwrap().into_luma8();
    assert_eq!(decoded.dimensions(), (64, 32));
    for (x, y, pixel) in decoded.enumerate_pixels() {
        let level = expected.level(x, y).unwrap();
        assert_eq!(pixel.0[0], level * 85, "pixel ({x}, {y})");
    }
}

#[tokio::test]
async fn test_image_expires_after_ttl() {
    let mut config = test_config();
    config.cache.artifact_ttl = Duration::from_millis(100);
    let server = server_with(config, Arc::new(GradientRenderer::default()));

    let body: Value = server.get("/api/display").await.json();
    let fingerprint = body["filename"]
        .as_str()
        .unwrap()
        .trim_end_matches(".png")
        .to_string();

    let path = format!("/image/{fingerprint}");
    server.get(&path).await.assert_status_ok();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(server.get(&path).await.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_command_is_not_found() {
    let (server, renderer) = server();

    let unknown = server.post("/api/unknown").await;
    assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);
    assert!(unknown.text().is_empty());

    let log = server
        .post("/api/log")
        .add_header("content-type", "application/json")
        .text(r#"{"logs_array":[{"message":"woke up"}]}"#)
        .await;
    assert_eq!(log.status_code(), StatusCode::NO_CONTENT);

    assert!(renderer.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_log_tolerates_bad_bodies() {
    let (server, _) = server();

    assert_eq!(
        server.post("/api/log").text("{not json").await.status_code(),
        StatusCode::NO_CONTENT
    );
    assert_eq!(
        server.get("/api/log").await.status_code(),
        StatusCode::NO_CONTENT
    );
}

#[tokio::test]
async fn test_setup_response_and_forwarded_origin() {
    let (server, _) = server();

    let response = server
        .get("/api/setup")
        .add_header("host", "internal:8080")
        .add_header("x-forwarded-host", "trmnl.example.com")
        .add_header("x-forwarded-proto", "https")
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);

    let body: Value = response.json();
    assert_eq!(body["api_key"], "lolsecret");
    assert_eq!(body["friendly_id"], "ABC123");
    assert_eq!(body["message"], "Welcome to TRMNL snapper!");
    assert!(
        body["image_url"]
            .as_str()
            .unwrap()
            .starts_with("https://trmnl.example.com/image/")
    );
}

#[tokio::test]
async fn test_device_headers_reach_the_page() {
    let (server, renderer) = server();

    server
        .get("/api/display")
        .add_header("id", "AA:BB:CC")
        .add_header("rssi", "-60")
        .add_header("battery-voltage", "4.02")
        .add_header("fw-version", "1.5.2")
        .add_header("width", "40")
        .add_header("height", "20")
        .await
        .assert_status_ok();

    let calls = renderer.calls.lock().unwrap();
    let url = calls.last().unwrap();
    let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    let value = |name: &str| {
        query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    };
    assert_eq!(value("theme").as_deref(), Some("dark"));
    assert_eq!(value("id").as_deref(), Some("AA:BB:CC"));
    assert_eq!(value("rssi").as_deref(), Some("-60"));
    assert_eq!(value("battery-voltage").as_deref(), Some("4.02"));
    assert_eq!(value("fw-version").as_deref(), Some("1.5.2"));
    assert_eq!(value("model").as_deref(), Some(""));
}

#[tokio::test]
async fn test_render_endpoint() {
    let (server, renderer) = server();

    let response = server.get("/render?w=24&h=16&r=90&b=1").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.headers().get("cache-control").unwrap(), "no-store");
    assert_eq!(response.headers().get("content-type").unwrap(), "image/png");

    let decoded = image::load_from_memory(response.as_bytes()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (24, 16));

    // Rendered from the configured page without device parameters
    let calls = renderer.calls.lock().unwrap();
    assert_eq!(
        calls.last().unwrap().as_str(),
        "https://example.com/dashboard?theme=dark"
    );
}

#[tokio::test]
async fn test_render_rejects_bad_parameters() {
    let (server, _) = server();

    for query in ["r=45", "b=4", "w=abc", "w=0", "h=5000"] {
        let response = server.get(&format!("/render?{query}")).await;
        assert_eq!(
            response.status_code(),
            StatusCode::BAD_REQUEST,
            "query: {query}"
        );
    }
}

#[tokio::test]
async fn test_render_failure_is_opaque_500() {
    let server = server_with(test_config(), Arc::new(BrokenRenderer));

    let response = server.get("/api/display").await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.text().is_empty());
}

#[tokio::test]
async fn test_missing_image_and_unknown_routes() {
    let (server, _) = server();

    assert_eq!(
        server.get("/image/0123456789abcdef0123456789abcdef").await.status_code(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(server.get("/nope").await.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(server.delete("/health").await.status_code(), StatusCode::NOT_FOUND);
}

/// The body limit sits in front of the protocol, so even best-effort log
/// uploads are refused once they exceed it.
#[tokio::test]
async fn test_log_body_over_limit_is_refused_before_dispatch() {
    let mut config = test_config();
    config.web.max_request_size = 1024;
    let server = server_with(config, Arc::new(GradientRenderer::default()));

    let response = server.post("/api/log").text("x".repeat(4096)).await;
    assert_eq!(response.status_code(), StatusCode::PAYLOAD_TOO_LARGE);

    let response = server.post("/api/log").text("x".repeat(512)).await;
    assert_eq!(response.status_code(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_health_reports_cache() {
    let (server, _) = server();

    let before: Value = server.get("/health").await.json();
    assert_eq!(before["status"], "healthy");
    assert_eq!(before["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(before["cached_artifacts"], 0);

    server.get("/api/display").await.assert_status_ok();

    let after: Value = server.get("/health").await.json();
    assert_eq!(after["cached_artifacts"], 1);
    assert!(after["cached_bytes"].as_u64().unwrap() > 0);
}
