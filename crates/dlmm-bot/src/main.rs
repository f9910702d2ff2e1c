//! DLMM position monitor - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

/// Monitor and rebalance a DLMM liquidity position
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via DLMM_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Determine config path: CLI arg > DLMM_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("DLMM_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    let (config, source) = dlmm_bot::AppConfig::load(&config_path)?;

    dlmm_telemetry::init_logging(&config.telemetry.log_level)?;

    if source == dlmm_bot::ConfigSource::Defaults {
        warn!(path = %config_path, "Config file not found, using defaults");
    }

    info!("Starting DLMM monitor v{}", env!("CARGO_PKG_VERSION"));
    info!(
        config_path = %config_path,
        ?config.mode,
        interval_secs = config.monitor.interval_secs,
        "Configuration loaded"
    );

    let app = dlmm_bot::Application::new(config)?;
    let summary = app.run().await?;
    info!(reason = %summary.reason, "Monitor exited");

    Ok(())
}
