//! TRMNL device polling protocol
//!
//! Devices call `/api/{command}` with identity and panel-size headers. Setup and
//! display both trigger a render and point the device at the cached artifact; log
//! just records what the device sent.

use axum::http::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use strum::{Display, EnumString};
use tracing::{debug, info, warn};
use url::Url;

use crate::codec::{BitDepth, Rotation};
use crate::config::{DeviceConfig, RenderConfig};
use crate::errors::{AppError, AppResult};
use crate::orchestrator::{RenderOrchestrator, RenderRequest, RenderedArtifact};

/// Headers copied verbatim onto the rendered page's query string
pub const IDENTITY_HEADERS: [&str; 5] = ["id", "rssi", "battery-voltage", "fw-version", "model"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DeviceCommand {
    Setup,
    Log,
    Display,
}

impl DeviceCommand {
    pub fn parse(command: &str) -> AppResult<Self> {
        command
            .parse()
            .map_err(|_| AppError::unknown_command(command))
    }
}

/// What a device tells us about itself on every poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceHeaders {
    pub id: Option<String>,
    pub rssi: Option<String>,
    pub battery_voltage: Option<String>,
    pub fw_version: Option<String>,
    pub model: Option<String>,
    pub width: u32,
    pub height: u32,
}

impl DeviceHeaders {
    /// Panel dimensions that are missing, unparseable or zero fall back to the defaults
    pub fn from_headers(headers: &HeaderMap, default_width: u32, default_height: u32) -> Self {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let dimension = |name: &str, fallback: u32| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(fallback)
        };

        Self {
            id: text("id"),
            rssi: text("rssi"),
            battery_voltage: text("battery-voltage"),
            fw_version: text("fw-version"),
            model: text("model"),
            width: dimension("width", default_width),
            height: dimension("height", default_height),
        }
    }

    /// Identity headers paired with their wire names, absent ones as ""
    pub fn identity(&self) -> [(&'static str, &str); 5] {
        fn value(v: &Option<String>) -> &str {
            v.as_deref().unwrap_or("")
        }
        [
            (IDENTITY_HEADERS[0], value(&self.id)),
            (IDENTITY_HEADERS[1], value(&self.rssi)),
            (IDENTITY_HEADERS[2], value(&self.battery_voltage)),
            (IDENTITY_HEADERS[3], value(&self.fw_version)),
            (IDENTITY_HEADERS[4], value(&self.model)),
        ]
    }
}

/// Page URL with the device's identity set as query parameters
pub fn with_device_params(base: &Url, headers: &DeviceHeaders) -> Url {
    let retained: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(name, _)| !IDENTITY_HEADERS.contains(&name.as_ref()))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();

    let mut url = base.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        pairs.extend_pairs(retained);
        for (name, value) in headers.identity() {
            pairs.append_pair(name, value);
        }
    }
    url
}

/// Body of a device request, as far as we could make sense of it
#[derive(Debug, Clone, PartialEq)]
pub enum DevicePayload {
    Empty,
    Json(Value),
    Malformed(String),
}

impl DevicePayload {
    pub fn from_bytes(body: &[u8]) -> Self {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Self::Empty;
        }
        match serde_json::from_slice(body) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Malformed(String::from_utf8_lossy(body).into_owned()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeviceRequest {
    /// `scheme://host` the device used to reach us
    pub origin: String,
    pub headers: DeviceHeaders,
    pub payload: DevicePayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupResponse {
    pub api_key: String,
    pub friendly_id: String,
    pub image_url: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayResponse {
    pub filename: String,
    pub image_url: String,
    pub image_url_timeout: u64,
    pub refresh_rate: u64,
    pub reset_firmware: bool,
    pub special_function: String,
    pub update_firmware: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceReply {
    Setup(SetupResponse),
    Display(DisplayResponse),
    NoContent,
}

pub struct DeviceProtocol {
    orchestrator: Arc<RenderOrchestrator>,
    page_url: Url,
    rotation: Rotation,
    depth: BitDepth,
    device: DeviceConfig,
}

impl DeviceProtocol {
    pub fn new(
        orchestrator: Arc<RenderOrchestrator>,
        render: &RenderConfig,
        device: DeviceConfig,
    ) -> AppResult<Self> {
        Ok(Self {
            orchestrator,
            page_url: render.page_url()?,
            rotation: render.rotation,
            depth: render.bit_depth,
            device,
        })
    }

    pub fn device_config(&self) -> &DeviceConfig {
        &self.device
    }

    pub async fn dispatch(
        &self,
        command: DeviceCommand,
        request: DeviceRequest,
    ) -> AppResult<DeviceReply> {
        debug!(%command, device = request.headers.id.as_deref().unwrap_or(""), "Device command");

        match command {
            DeviceCommand::Setup => {
                let (_, image_url) = self.render_for(&request).await?;
                Ok(DeviceReply::Setup(SetupResponse {
                    api_key: self.device.api_key.clone(),
                    friendly_id: self.device.friendly_id.clone(),
                    image_url,
                    message: self.device.welcome_message.clone(),
                }))
            }
            DeviceCommand::Display => {
                let (artifact, image_url) = self.render_for(&request).await?;
                Ok(DeviceReply::Display(DisplayResponse {
                    filename: format!("{}.png", artifact.fingerprint),
                    image_url,
                    image_url_timeout: self.device.image_url_timeout,
                    refresh_rate: self.orchestrator.refresh_interval().as_secs(),
                    reset_firmware: false,
                    special_function: String::new(),
                    update_firmware: false,
                }))
            }
            DeviceCommand::Log => {
                let device = request.headers.id.as_deref().unwrap_or("");
                match &request.payload {
                    DevicePayload::Json(body) => {
                        info!(target: "device_log", device, %body, "Device log");
                    }
                    DevicePayload::Empty => {
                        warn!(target: "device_log", device, "Device log without a body");
                    }
                    DevicePayload::Malformed(raw) => {
                        warn!(target: "device_log", device, raw = %raw, "Device log body is not JSON");
                    }
                }
                Ok(DeviceReply::NoContent)
            }
        }
    }

    async fn render_for(&self, request: &DeviceRequest) -> AppResult<(RenderedArtifact, String)> {
        let render_request = RenderRequest::new(
            with_device_params(&self.page_url, &request.headers),
            request.headers.width,
            request.headers.height,
            self.rotation,
            self.depth,
        )?;
        let artifact = self.orchestrator.render(&render_request).await?;
        let image_url = format!("{}/image/{}", request.origin, artifact.fingerprint);
        Ok((artifact, image_url))
    }
}
