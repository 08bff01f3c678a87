//! Cached artifact delivery

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::codec::container::CONTENT_TYPE;
use crate::web::AppState;

/// Serve a rendered artifact by fingerprint; expired or unknown ones are 404
pub async fn get_image(
    State(state): State<AppState>,
    Path(fingerprint): Path<String>,
) -> Response {
    match state.orchestrator.artifact(&fingerprint).await {
        Some(bytes) => ([(header::CONTENT_TYPE, CONTENT_TYPE)], bytes).into_response(),
        None => {
            debug!(fingerprint = %fingerprint, "Artifact not in cache");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}
