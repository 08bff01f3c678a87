//! Headless Chromium screenshot renderer

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};
use url::Url;

use super::{PageRenderer, raw_bitmap_from_image};
use crate::codec::RawBitmap;
use crate::config::RenderConfig;
use crate::errors::{RenderError, RenderResult};

const SCREENSHOT_FILE: &str = "capture.png";

/// Drives a headless Chromium-compatible browser binary.
///
/// Every capture runs in its own temporary profile directory; the child is
/// killed if the capture future is dropped (e.g. by the render timeout).
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    command: String,
    extra_args: Vec<String>,
    settle_delay: Duration,
}

impl ChromeRenderer {
    pub fn new(command: impl Into<String>, extra_args: Vec<String>, settle_delay: Duration) -> Self {
        Self {
            command: command.into(),
            extra_args,
            settle_delay,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(
            config.browser_command.clone(),
            config.browser_args.clone(),
            config.settle_delay,
        )
    }

    fn args(&self, url: &Url, width: u32, height: u32, workdir: &std::path::Path) -> Vec<String> {
        let mut args = vec![
            "--headless".to_string(),
            "--disable-gpu".to_string(),
            "--hide-scrollbars".to_string(),
            "--force-device-scale-factor=1".to_string(),
            format!("--user-data-dir={}", workdir.join("profile").display()),
            format!("--window-size={width},{height}"),
            format!("--virtual-time-budget={}", self.settle_delay.as_millis()),
            format!("--screenshot={}", workdir.join(SCREENSHOT_FILE).display()),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push(url.to_string());
        args
    }
}

#[async_trait]
impl PageRenderer for ChromeRenderer {
    async fn capture(&self, url: &Url, width: u32, height: u32) -> RenderResult<RawBitmap> {
        let workdir = tempfile::Builder::new().prefix("trmnl-snapper-").tempdir()?;

        let mut cmd = Command::new(&self.command);
        cmd.args(self.args(url, width, height, workdir.path()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(command = %self.command, %url, width, height, "Launching browser");
        let output = cmd.output().await.map_err(|e| {
            RenderError::capture(format!("failed to execute {}: {e}", self.command))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = ?output.status.code(), "Browser exited unsuccessfully: {}", stderr.trim());
            return Err(RenderError::capture(format!(
                "{} exited with {}",
                self.command, output.status
            )));
        }

        let png = tokio::fs::read(workdir.path().join(SCREENSHOT_FILE))
            .await
            .map_err(|e| RenderError::capture(format!("no screenshot produced: {e}")))?;
        let img = image::load_from_memory_with_format(&png, image::ImageFormat::Png)?;

        Ok(raw_bitmap_from_image(img))
    }
}
