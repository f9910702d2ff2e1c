//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Startup error: {0}")]
    Startup(String),

    #[error("Core error: {0}")]
    Core(#[from] dlmm_core::CoreError),

    #[error("Position error: {0}")]
    Position(#[from] dlmm_position::PositionError),

    #[error("Venue error: {0}")]
    Venue(#[from] dlmm_position::VenueError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] dlmm_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
