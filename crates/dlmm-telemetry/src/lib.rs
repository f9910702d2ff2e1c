//! Structured logging and status reporting for the DLMM monitor.
//!
//! - `init_logging`: tracing subscriber, JSON in production
//! - `Metrics`: Prometheus counters and gauges for the control loop
//! - `StatusRecord`: one row per monitored tick
//! - `RunSummary`: final report of a monitoring run

pub mod error;
pub mod logging;
pub mod metrics;
pub mod status;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, DEFAULT_FILTER};
pub use metrics::Metrics;
pub use status::{RunSummary, StatusRecord};
