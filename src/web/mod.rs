//! HTTP surface
//!
//! The device polling API, artifact fetches, the direct render endpoint and a
//! health check, all on one axum router.

use anyhow::Result;
use axum::{
    Router,
    http::StatusCode,
    middleware::from_fn,
    routing::get,
};
use chrono::{DateTime, Utc};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::info;

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod responses;

use crate::cache::ArtifactCache;
use crate::config::Config;
use crate::errors::AppResult;
use crate::orchestrator::RenderOrchestrator;
use crate::protocol::DeviceProtocol;
use crate::renderer::PageRenderer;

pub use extractors::RequestOrigin;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub protocol: Arc<DeviceProtocol>,
    pub orchestrator: Arc<RenderOrchestrator>,
    pub config: Arc<Config>,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    /// Wire the orchestrator and protocol around a renderer
    pub fn new(config: Config, renderer: Arc<dyn PageRenderer>) -> AppResult<Self> {
        let orchestrator = Arc::new(RenderOrchestrator::from_config(
            renderer,
            ArtifactCache::new(),
            &config,
        ));
        let protocol = Arc::new(DeviceProtocol::new(
            orchestrator.clone(),
            &config.render,
            config.device.clone(),
        )?);

        Ok(Self {
            protocol,
            orchestrator,
            config: Arc::new(config),
            start_time: Utc::now(),
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    let max_request_size = state.config.web.max_request_size;

    Router::new()
        .route(
            "/api/{command}",
            get(handlers::device::device_command).post(handlers::device::device_command),
        )
        .route("/image/{fingerprint}", get(handlers::images::get_image))
        .route("/render", get(handlers::render::render_page))
        .route("/health", get(handlers::health::health_check))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .layer(RequestBodyLimitLayer::new(max_request_size))
        .layer(from_fn(middleware::request_logging_middleware))
        .with_state(state)
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: AppState) -> Result<Self> {
        let addr: SocketAddr =
            format!("{}:{}", state.config.web.host, state.config.web.port).parse()?;
        Ok(Self {
            app: create_router(state),
            addr,
        })
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Serve until SIGTERM or Ctrl+C, then drain in-flight requests
    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(&self.addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {e}", self.addr))?;
        info!("Listening on http://{}", self.addr);

        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down gracefully"),
                    _ = sigint.recv() => info!("Received SIGINT (Ctrl+C), shutting down gracefully"),
                }
            }
            _ => {
                tracing::warn!("Failed to install signal handlers, falling back to Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received Ctrl+C, shutting down gracefully");
    }
}
