use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub mod defaults;
pub mod duration_serde;

use crate::codec::{BitDepth, Rotation};
use crate::errors::{AppError, AppResult};
use defaults::*;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest request body accepted, in bytes (device log uploads)
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,
}

/// How pages are captured and reduced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Page rendered for every device poll
    #[serde(default = "default_page_url")]
    pub page_url: String,
    /// Panel rotation in degrees (0, 90, 180, 270)
    #[serde(default)]
    pub rotation: Rotation,
    /// Output bits per pixel (1 or 2)
    #[serde(default = "default_bit_depth")]
    pub bit_depth: BitDepth,
    #[serde(default = "default_browser_command")]
    pub browser_command: String,
    /// Extra arguments appended to the browser command line (e.g. "--no-sandbox")
    #[serde(default)]
    pub browser_args: Vec<String>,
    /// Time the page gets to settle after loading before the screenshot
    #[serde(default = "default_settle_delay", with = "duration_serde::duration")]
    pub settle_delay: Duration,
    /// Upper bound on a single capture
    #[serde(default = "default_render_timeout", with = "duration_serde::duration")]
    pub timeout: Duration,
}

/// Values handed to devices through the polling protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Requested refresh interval; never below the 10s floor
    #[serde(default = "default_refresh_rate", with = "duration_serde::duration")]
    pub refresh_rate: Duration,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_friendly_id")]
    pub friendly_id: String,
    #[serde(default = "default_welcome_message")]
    pub welcome_message: String,
    #[serde(default = "default_image_url_timeout")]
    pub image_url_timeout: u64,
    #[serde(default = "default_width")]
    pub default_width: u32,
    #[serde(default = "default_height")]
    pub default_height: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a rendered artifact stays fetchable
    #[serde(default = "default_artifact_ttl", with = "duration_serde::duration")]
    pub artifact_ttl: Duration,
}

// Web defaults
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_request_size() -> usize {
    DEFAULT_MAX_REQUEST_SIZE
}

// Render defaults
fn default_page_url() -> String {
    DEFAULT_PAGE_URL.to_string()
}

fn default_bit_depth() -> BitDepth {
    BitDepth::Two
}

fn default_browser_command() -> String {
    DEFAULT_BROWSER_COMMAND.to_string()
}

fn default_settle_delay() -> Duration {
    Duration::from_secs(DEFAULT_SETTLE_DELAY_SECONDS)
}

fn default_render_timeout() -> Duration {
    Duration::from_secs(DEFAULT_RENDER_TIMEOUT_SECONDS)
}

// Device defaults
fn default_refresh_rate() -> Duration {
    Duration::from_secs(DEFAULT_REFRESH_RATE_SECONDS)
}

fn default_api_key() -> String {
    DEFAULT_API_KEY.to_string()
}

fn default_friendly_id() -> String {
    DEFAULT_FRIENDLY_ID.to_string()
}

fn default_welcome_message() -> String {
    DEFAULT_WELCOME_MESSAGE.to_string()
}

fn default_image_url_timeout() -> u64 {
    DEFAULT_IMAGE_URL_TIMEOUT
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

// Cache defaults
fn default_artifact_ttl() -> Duration {
    Duration::from_secs(DEFAULT_ARTIFACT_TTL_SECONDS)
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_request_size: default_max_request_size(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            page_url: default_page_url(),
            rotation: Rotation::default(),
            bit_depth: default_bit_depth(),
            browser_command: default_browser_command(),
            browser_args: Vec::new(),
            settle_delay: default_settle_delay(),
            timeout: default_render_timeout(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            refresh_rate: default_refresh_rate(),
            api_key: default_api_key(),
            friendly_id: default_friendly_id(),
            welcome_message: default_welcome_message(),
            image_url_timeout: default_image_url_timeout(),
            default_width: default_width(),
            default_height: default_height(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            artifact_ttl: default_artifact_ttl(),
        }
    }
}

impl RenderConfig {
    pub fn page_url(&self) -> AppResult<Url> {
        Url::parse(&self.page_url).map_err(|e| {
            AppError::configuration(format!("invalid page url '{}': {e}", self.page_url))
        })
    }
}

impl Config {
    /// Layer defaults, the TOML file (if present) and `SNAPPER_*` environment variables.
    ///
    /// Nested keys use a double underscore: `SNAPPER_RENDER__PAGE_URL`.
    pub fn load_from_file(config_file: impl AsRef<Path>) -> Result<Self> {
        let config_file = config_file.as_ref();
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load configuration from {}", config_file.display()))
    }

    /// Reject configurations the service cannot run with
    pub fn validate(&self) -> AppResult<()> {
        self.render.page_url()?;

        if self.cache.artifact_ttl.is_zero() {
            return Err(AppError::configuration(
                "cache.artifact_ttl must be greater than zero",
            ));
        }
        if self.render.timeout.is_zero() {
            return Err(AppError::configuration(
                "render.timeout must be greater than zero",
            ));
        }
        for (name, value) in [
            ("device.default_width", self.device.default_width),
            ("device.default_height", self.device.default_height),
        ] {
            if value == 0 || value > MAX_DIMENSION {
                return Err(AppError::configuration(format!(
                    "{name} must be between 1 and {MAX_DIMENSION}"
                )));
            }
        }
        Ok(())
    }
}
