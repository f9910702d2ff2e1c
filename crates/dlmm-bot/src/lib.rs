//! DLMM position monitor.
//!
//! Watches a single concentrated-liquidity position:
//! - values it in USD every tick
//! - recenters it when the market leaves its bin range
//! - closes it on take-profit or stop-loss

pub mod app;
pub mod config;
pub mod error;
pub mod monitor;
pub mod paper;

pub use app::Application;
pub use config::{AppConfig, ConfigSource};
pub use error::{AppError, AppResult};
pub use monitor::{MonitorPhase, MonitorSettings, PositionMonitor, TickOutcome};
pub use paper::PaperVenue;
