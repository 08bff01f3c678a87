use anyhow::{Result, anyhow};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use trmnl_snapper::{
    codec::{BitDepth, Rotation},
    config::{Config, defaults::DEFAULT_CONFIG_FILE},
    orchestrator::effective_refresh_interval,
    renderer::ChromeRenderer,
    web::{AppState, WebServer},
};

#[derive(Parser)]
#[command(name = "trmnl-snapper")]
#[command(version)]
#[command(about = "Serves screenshots of a web page to TRMNL e-paper devices")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Page to render (overrides config file)
    #[arg(short, long, value_name = "URL")]
    url: Option<String>,

    /// Device refresh interval, e.g. "60" or "5m" (minimum 10s)
    #[arg(short, long, value_name = "DURATION", value_parser = parse_duration)]
    refresh_rate: Option<Duration>,

    /// Panel rotation in degrees (0, 90, 180, 270)
    #[arg(short = 'd', long, value_name = "DEGREES")]
    rotate: Option<u16>,

    /// Output bits per pixel (1 or 2)
    #[arg(short, long, value_name = "BITS")]
    bit_depth: Option<u8>,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

/// Plain seconds or a humantime string
fn parse_duration(value: &str) -> Result<Duration, String> {
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(value).map_err(|e| e.to_string())
}

fn init_logging(cli: &Cli) {
    let log_filter = if cli.log_level == "trace" {
        format!("trmnl_snapper={},device_log=trace,tower_http=trace", cli.log_level)
    } else {
        format!("trmnl_snapper={},device_log=info", cli.log_level)
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| log_filter.into());

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

impl Cli {
    /// CLI flags take precedence over every other configuration source
    fn apply(&self, config: &mut Config) -> Result<()> {
        if let Some(url) = &self.url {
            config.render.page_url = url.clone();
        }
        if let Some(refresh_rate) = self.refresh_rate {
            config.device.refresh_rate = refresh_rate;
        }
        if let Some(degrees) = self.rotate {
            config.render.rotation = Rotation::try_from(degrees).map_err(|e| anyhow!(e))?;
        }
        if let Some(bits) = self.bit_depth {
            config.render.bit_depth = BitDepth::try_from(bits).map_err(|e| anyhow!(e))?;
        }
        if let Some(host) = &self.host {
            config.web.host = host.clone();
        }
        if let Some(port) = self.port {
            config.web.port = port;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut config = Config::load_from_file(&cli.config)?;
    cli.apply(&mut config)?;
    config.validate()?;

    info!(
        page_url = %config.render.page_url,
        rotation = %config.render.rotation,
        bit_depth = %config.render.bit_depth,
        refresh_rate = ?effective_refresh_interval(config.device.refresh_rate),
        browser = %config.render.browser_command,
        "Starting trmnl-snapper v{}",
        env!("CARGO_PKG_VERSION")
    );

    let renderer = Arc::new(ChromeRenderer::from_config(&config.render));
    let state = AppState::new(config, renderer)?;
    let server = WebServer::new(state)?;

    info!("Web server listening on {}:{}", server.host(), server.port());
    server.serve().await?;

    info!("Shut down cleanly");
    Ok(())
}
