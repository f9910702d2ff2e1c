//! Main application orchestration.
//!
//! Opens the starting position on the configured venue, hands it to the
//! [`PositionMonitor`] and prints status rows while the monitor runs.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use dlmm_position::Venue;
use dlmm_telemetry::{Metrics, RunSummary, StatusRecord};

use crate::config::{AppConfig, OperatingMode};
use crate::error::{AppError, AppResult};
use crate::monitor::{MonitorSettings, PositionMonitor};
use crate::paper::PaperVenue;

/// Main application.
#[derive(Debug)]
pub struct Application {
    config: AppConfig,
}

impl Application {
    /// Create a new application from a validated configuration.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Open the position, monitor it until termination and return the summary.
    pub async fn run(self) -> AppResult<RunSummary> {
        let exit_config = self.config.exit_config()?;

        let (venue, position) = match self.config.mode {
            OperatingMode::Paper => {
                let paper = Arc::new(PaperVenue::new(self.config.paper.clone()));
                let position = paper.open_position(&exit_config.strategy, None, Decimal::ZERO)?;
                (Venue::from_shared(paper), position)
            }
        };

        let pool = exit_config.strategy.pool_address.clone();
        let snapshot = venue
            .positions
            .fetch_snapshot(&position, &pool)
            .await?
            .ok_or_else(|| AppError::Startup(format!("position {position} not found")))?;

        info!(
            mode = ?self.config.mode,
            position = %position,
            strategy = %exit_config.strategy.kind,
            bin_span = exit_config.strategy.bin_span,
            "Starting position monitor"
        );

        let settings = MonitorSettings::from(&self.config);
        let mut monitor = PositionMonitor::start(venue, snapshot, exit_config, settings).await?;

        let printer = self
            .config
            .telemetry
            .status_table
            .then(|| spawn_status_printer(monitor.subscribe()));

        let summary = monitor.run().await;

        // Closing the channel ends the printer.
        drop(monitor);
        if let Some(handle) = printer {
            if let Err(e) = handle.await {
                warn!(error = %e, "Status printer task failed");
            }
        }

        match Metrics::render() {
            Ok(text) => debug!(metrics = %text, "Final metrics"),
            Err(e) => warn!(error = %e, "Failed to render metrics"),
        }

        println!("{summary}");
        Ok(summary)
    }
}

/// Print each status record as a table row until the channel closes.
fn spawn_status_printer(mut rx: broadcast::Receiver<StatusRecord>) -> JoinHandle<()> {
    tokio::spawn(async move {
        println!("{}", StatusRecord::header());
        loop {
            match rx.recv().await {
                Ok(record) => println!("{record}"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Status printer lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
