//! Health check endpoint

use axum::{Json, extract::State};
use chrono::Utc;
use serde::Serialize;

use crate::web::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: i64,
    pub cached_artifacts: usize,
    pub cached_bytes: usize,
}

/// Liveness plus a glance at the artifact cache
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.orchestrator.cache_stats().await;

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: (Utc::now() - state.start_time).num_seconds(),
        cached_artifacts: stats.entries,
        cached_bytes: stats.bytes,
    })
}
