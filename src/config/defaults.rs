/// Configuration default values
///
/// Central location for every default so they are easy to find and change.
// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 1024 * 1024; // 1MiB

// Render defaults
pub const DEFAULT_PAGE_URL: &str = "https://samthor.au/trmnlocal";
pub const DEFAULT_BROWSER_COMMAND: &str = "chromium";
pub const DEFAULT_SETTLE_DELAY_SECONDS: u64 = 1;
pub const DEFAULT_RENDER_TIMEOUT_SECONDS: u64 = 30;
pub const MAX_DIMENSION: u32 = 4096;

// Device protocol defaults
pub const DEFAULT_REFRESH_RATE_SECONDS: u64 = 30;
/// Floor on the refresh interval handed to devices, protects the renderer
pub const MIN_REFRESH_RATE_SECONDS: u64 = 10;
pub const DEFAULT_API_KEY: &str = "lolsecret";
pub const DEFAULT_FRIENDLY_ID: &str = "ABC123";
pub const DEFAULT_WELCOME_MESSAGE: &str = "Welcome to TRMNL snapper!";
pub const DEFAULT_IMAGE_URL_TIMEOUT: u64 = 1000;
pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 480;

// Cache defaults
/// Devices fetch the image right after polling; keep artifacts this long
pub const DEFAULT_ARTIFACT_TTL_SECONDS: u64 = 10;

// Config file / environment
pub const DEFAULT_CONFIG_FILE: &str = "snapper.toml";
pub const ENV_PREFIX: &str = "SNAPPER_";
