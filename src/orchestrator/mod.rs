//! Render orchestration
//!
//! Ties the renderer, the codec and the artifact cache together: one call
//! captures a page, reduces it, fingerprints the result and makes it fetchable
//! for a short while.

use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use url::Url;

use crate::cache::{ArtifactCache, CacheStats};
use crate::codec::{self, BitDepth, Rotation};
use crate::config::Config;
use crate::config::defaults::{MAX_DIMENSION, MIN_REFRESH_RATE_SECONDS};
use crate::errors::{AppError, AppResult, RenderError, RenderResult};
use crate::renderer::PageRenderer;

/// Hex characters kept from the SHA-256 digest
pub const FINGERPRINT_LEN: usize = 32;

/// Everything that determines a rendered artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    url: Url,
    width: u32,
    height: u32,
    rotation: Rotation,
    depth: BitDepth,
}

impl RenderRequest {
    pub fn new(
        url: Url,
        width: u32,
        height: u32,
        rotation: Rotation,
        depth: BitDepth,
    ) -> AppResult<Self> {
        for (name, value) in [("width", width), ("height", height)] {
            if value == 0 || value > MAX_DIMENSION {
                return Err(AppError::validation(format!(
                    "{name} must be between 1 and {MAX_DIMENSION}, got {value}"
                )));
            }
        }
        Ok(Self {
            url,
            width,
            height,
            rotation,
            depth,
        })
    }
}

/// A cached, fetchable render result
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub fingerprint: String,
    pub bytes: Bytes,
}

/// Content fingerprint used as the artifact's URL path segment
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..FINGERPRINT_LEN / 2])
}

/// Refresh interval actually handed out, never below the safety floor
pub fn effective_refresh_interval(requested: Duration) -> Duration {
    requested.max(Duration::from_secs(MIN_REFRESH_RATE_SECONDS))
}

pub struct RenderOrchestrator {
    renderer: Arc<dyn PageRenderer>,
    cache: ArtifactCache,
    artifact_ttl: Duration,
    render_timeout: Duration,
    refresh_interval: Duration,
}

impl RenderOrchestrator {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        cache: ArtifactCache,
        artifact_ttl: Duration,
        render_timeout: Duration,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            renderer,
            cache,
            artifact_ttl,
            render_timeout,
            refresh_interval: effective_refresh_interval(refresh_interval),
        }
    }

    pub fn from_config(
        renderer: Arc<dyn PageRenderer>,
        cache: ArtifactCache,
        config: &Config,
    ) -> Self {
        Self::new(
            renderer,
            cache,
            config.cache.artifact_ttl,
            config.render.timeout,
            config.device.refresh_rate,
        )
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Capture, reduce and cache one page.
    ///
    /// The cache is only touched once the whole pipeline has succeeded.
    pub async fn render(&self, request: &RenderRequest) -> RenderResult<RenderedArtifact> {
        let (capture_width, capture_height) = request
            .rotation
            .capture_size(request.width, request.height);

        info!(
            url = %request.url,
            width = request.width,
            height = request.height,
            rotation = %request.rotation,
            depth = %request.depth,
            "Rendering page"
        );
        let start = Instant::now();

        let bitmap = tokio::time::timeout(
            self.render_timeout,
            self.renderer
                .capture(&request.url, capture_width, capture_height),
        )
        .await
        .map_err(|_| {
            warn!(url = %request.url, timeout = ?self.render_timeout, "Render timed out");
            RenderError::Timeout {
                after: self.render_timeout,
            }
        })??;

        let raster = codec::encode(
            &bitmap,
            request.width,
            request.height,
            request.rotation,
            request.depth,
        )?;
        let bytes = Bytes::from(raster.to_png()?);
        let fingerprint = fingerprint(&bytes);

        self.cache
            .put(&fingerprint, bytes.clone(), self.artifact_ttl)
            .await;

        info!(
            url = %request.url,
            fingerprint = %fingerprint,
            size = bytes.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Render complete"
        );

        Ok(RenderedArtifact { fingerprint, bytes })
    }

    /// Previously rendered artifact, `None` once it has expired
    pub async fn artifact(&self, fingerprint: &str) -> Option<Bytes> {
        self.cache.get(fingerprint).await
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}
