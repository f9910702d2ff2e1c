//! Position monitoring control loop.
//!
//! One [`PositionMonitor`] watches one position. Each tick runs, in order:
//!
//! 1. fetch a fresh snapshot of the active position (missing: terminate)
//! 2. resolve token decimals and fetch both unit prices
//! 3. value the snapshot
//! 4. on a range breach, rebalance, refetch and revalue with the same prices
//! 5. emit one [`StatusRecord`]
//! 6. evaluate the exit rules; on a trigger, close the position and terminate
//!
//! Errors that only spoil the current tick are logged and the tick is
//! skipped. `run` sleeps the configured interval after each tick's work, so
//! ticks never overlap.

use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use dlmm_core::{PositionSnapshot, Price, UsdValue};
use dlmm_position::{
    bins_from_edges, classify, DecimalsCache, ExitConfig, MonitorState, PositionError,
    PositionResult, RebalanceCoordinator, TerminationReason, Valuation, Venue,
};
use dlmm_telemetry::{Metrics, RunSummary, StatusRecord};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// Loop tuning.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    /// Pause after each tick.
    pub interval: Duration,
    /// Consecutive failed ticks before terminating. 0 never terminates.
    pub max_consecutive_failures: u32,
    pub status_channel_capacity: usize,
    /// P&L baseline. `None` uses the valuation at start.
    pub initial_capital_usd: Option<UsdValue>,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_consecutive_failures: 0,
            status_channel_capacity: 64,
            initial_capital_usd: None,
        }
    }
}

impl From<&AppConfig> for MonitorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            interval: config.interval(),
            max_consecutive_failures: config.monitor.max_consecutive_failures,
            status_channel_capacity: config.monitor.status_channel_capacity,
            initial_capital_usd: config.initial_capital_usd(),
        }
    }
}

/// Lifecycle phase of the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorPhase {
    Running,
    /// A breach is being handled within the current tick.
    Rebalancing,
    /// An exit rule fired and the close is in flight.
    Closing,
    Terminated(TerminationReason),
}

impl MonitorPhase {
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated(_))
    }
}

/// Result of a single tick.
#[derive(Debug, Clone)]
pub enum TickOutcome {
    /// The tick reached valuation and the loop continues.
    Completed(Box<StatusRecord>),
    /// The tick failed without ending the run.
    Skipped {
        error: String,
        consecutive_failures: u32,
    },
    Terminated(TerminationReason),
}

/// Monitors one position until a terminal condition is reached.
pub struct PositionMonitor {
    venue: Venue,
    exit_config: ExitConfig,
    settings: MonitorSettings,
    state: MonitorState,
    phase: MonitorPhase,
    decimals: DecimalsCache,
    coordinator: RebalanceCoordinator,
    status_tx: broadcast::Sender<StatusRecord>,
    ticks: u64,
    consecutive_failures: u32,
    last_total_usd: Option<UsdValue>,
}

impl PositionMonitor {
    /// Start monitoring the position described by `initial_snapshot`.
    ///
    /// Values the snapshot once to fix the P&L baseline, unless
    /// `settings.initial_capital_usd` is set. Failing to do so is fatal.
    pub async fn start(
        venue: Venue,
        mut initial_snapshot: PositionSnapshot,
        exit_config: ExitConfig,
        settings: MonitorSettings,
    ) -> AppResult<Self> {
        exit_config.validate()?;
        if settings.interval.is_zero() {
            return Err(AppError::Config("monitor interval must be > 0".to_string()));
        }
        if settings
            .initial_capital_usd
            .is_some_and(|initial| initial.is_negative())
        {
            return Err(AppError::Config(
                "initial capital must not be negative".to_string(),
            ));
        }

        let mut decimals = DecimalsCache::new();
        decimals
            .resolve(venue.positions.as_ref(), &mut initial_snapshot)
            .await?;
        let (price_x, price_y) = fetch_prices(&venue, &initial_snapshot).await?;
        let valuation = Valuation::compute(&initial_snapshot, price_x, price_y)?;

        let initial_capital = settings.initial_capital_usd.unwrap_or(valuation.total_usd);
        if initial_capital.is_zero() {
            warn!("Initial capital is zero, exit rules cannot fire");
        }

        let state = MonitorState::new(
            initial_snapshot.position.clone(),
            initial_snapshot.pool.clone(),
            initial_capital,
        );

        info!(
            position = %state.active_position(),
            pool = %state.active_pool(),
            range = %initial_snapshot.range,
            active_bin = %initial_snapshot.active_bin,
            current_value_usd = %valuation.total_usd,
            initial_capital_usd = %initial_capital,
            take_profit = %exit_config.take_profit_label(),
            stop_loss = %exit_config.stop_loss_label(),
            interval_secs = settings.interval.as_secs(),
            "Position monitor started"
        );

        let (status_tx, _) = broadcast::channel(settings.status_channel_capacity.max(1));
        let coordinator = RebalanceCoordinator::new(venue.recenter.clone());

        Ok(Self {
            venue,
            exit_config,
            settings,
            state,
            phase: MonitorPhase::Running,
            decimals,
            coordinator,
            status_tx,
            ticks: 0,
            consecutive_failures: 0,
            last_total_usd: Some(valuation.total_usd),
        })
    }

    /// Subscribe to status records.
    pub fn subscribe(&self) -> broadcast::Receiver<StatusRecord> {
        self.status_tx.subscribe()
    }

    pub fn phase(&self) -> &MonitorPhase {
        &self.phase
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Run until terminated, then log and return the summary.
    pub async fn run(&mut self) -> RunSummary {
        let reason = loop {
            if let TickOutcome::Terminated(reason) = self.tick().await {
                break reason;
            }
            tokio::time::sleep(self.settings.interval).await;
        };

        let summary = RunSummary::new(reason, &self.state, self.last_total_usd, self.ticks);
        summary.log();
        summary
    }

    /// Run exactly one tick.
    ///
    /// Once terminated, further calls return the termination reason without
    /// touching the venue.
    pub async fn tick(&mut self) -> TickOutcome {
        if let MonitorPhase::Terminated(reason) = &self.phase {
            return TickOutcome::Terminated(reason.clone());
        }
        self.ticks += 1;
        Metrics::tick_started();

        match self.try_tick().await {
            Ok(outcome) => {
                self.consecutive_failures = 0;
                outcome
            }
            Err(e) => match terminal_reason(&e) {
                Some(reason) => {
                    error!(tick = self.ticks, error = %e, "Monitoring terminated");
                    self.terminate(reason)
                }
                None => self.skip_tick(e),
            },
        }
    }

    async fn try_tick(&mut self) -> PositionResult<TickOutcome> {
        let mut snapshot = self.fetch_snapshot().await?;
        let (price_x, price_y) = fetch_prices(&self.venue, &snapshot).await?;
        let mut valuation = Valuation::compute(&snapshot, price_x, price_y)?;

        let mut range_status = classify(snapshot.active_bin, &snapshot.range);
        let mut rebalanced = false;

        if let Some(direction) = range_status.direction() {
            warn!(
                position = %self.state.active_position(),
                active_bin = %snapshot.active_bin,
                range = %snapshot.range,
                %direction,
                "Position out of range"
            );
            self.phase = MonitorPhase::Rebalancing;
            self.coordinator
                .rebalance(&mut self.state, &self.exit_config, direction)
                .await?;
            Metrics::rebalanced(direction);

            snapshot = self.fetch_snapshot().await?;
            valuation = Valuation::compute(&snapshot, price_x, price_y)?;
            range_status = classify(snapshot.active_bin, &snapshot.range);
            self.phase = MonitorPhase::Running;
            rebalanced = true;
        } else if let Some((from_lower, from_upper)) =
            bins_from_edges(snapshot.active_bin, &snapshot.range)
        {
            debug!(
                active_bin = %snapshot.active_bin,
                from_lower,
                from_upper,
                "Position in range"
            );
        }

        self.last_total_usd = Some(valuation.total_usd);
        let record = StatusRecord::capture(
            self.ticks,
            &self.state,
            &self.exit_config,
            &snapshot,
            &valuation,
            range_status,
            rebalanced,
        );
        self.emit(&record);

        let decision = self
            .exit_config
            .evaluate(valuation.total_usd, self.state.initial_capital_usd());
        let Some(trigger) = decision.trigger() else {
            if record.pnl_percent.is_none() && self.exit_config.has_triggers() {
                warn!(tick = self.ticks, "P&L percentage undefined, exit rules skipped");
            }
            return Ok(TickOutcome::Completed(Box::new(record)));
        };

        self.phase = MonitorPhase::Closing;
        warn!(
            %trigger,
            pnl_percent = ?record.pnl_percent,
            total_usd = %valuation.total_usd,
            position = %self.state.active_position(),
            "Exit triggered, closing position"
        );

        let closed = match self
            .venue
            .liquidator
            .close_and_liquidate(self.state.active_position())
            .await
        {
            Ok(()) => {
                info!(position = %self.state.active_position(), "Position closed");
                true
            }
            Err(e) => {
                error!(
                    position = %self.state.active_position(),
                    error = %e,
                    "Failed to close position after exit trigger"
                );
                false
            }
        };
        Ok(self.terminate(TerminationReason::ExitTriggered { trigger, closed }))
    }

    /// Fetch the active position and fill in its decimals.
    async fn fetch_snapshot(&mut self) -> PositionResult<PositionSnapshot> {
        let position = self.state.active_position();
        let mut snapshot = self
            .venue
            .positions
            .fetch_snapshot(position, self.state.active_pool())
            .await?
            .ok_or_else(|| PositionError::NotFound(position.clone()))?;
        self.decimals
            .resolve(self.venue.positions.as_ref(), &mut snapshot)
            .await?;
        Ok(snapshot)
    }

    fn emit(&self, record: &StatusRecord) {
        record.log();
        Metrics::position_valued(record);
        // No subscribers is fine.
        let _ = self.status_tx.send(record.clone());
    }

    fn skip_tick(&mut self, e: PositionError) -> TickOutcome {
        self.phase = MonitorPhase::Running;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        Metrics::tick_skipped(self.consecutive_failures);
        warn!(
            tick = self.ticks,
            error = %e,
            consecutive_failures = self.consecutive_failures,
            "Tick failed, skipping"
        );

        let limit = self.settings.max_consecutive_failures;
        if limit > 0 && self.consecutive_failures >= limit {
            error!(
                consecutive_failures = self.consecutive_failures,
                "Too many consecutive failures"
            );
            return self.terminate(TerminationReason::FailureEscalation {
                consecutive_failures: self.consecutive_failures,
            });
        }

        TickOutcome::Skipped {
            error: e.to_string(),
            consecutive_failures: self.consecutive_failures,
        }
    }

    fn terminate(&mut self, reason: TerminationReason) -> TickOutcome {
        Metrics::terminated(&reason);
        self.phase = MonitorPhase::Terminated(reason.clone());
        TickOutcome::Terminated(reason)
    }
}

impl std::fmt::Debug for PositionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionMonitor")
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

/// Fetch and validate both unit prices of a snapshot's tokens.
async fn fetch_prices(
    venue: &Venue,
    snapshot: &PositionSnapshot,
) -> PositionResult<(Price, Price)> {
    let price_x = venue.prices.fetch_price(&snapshot.token_x.mint).await?;
    let price_y = venue.prices.fetch_price(&snapshot.token_y.mint).await?;
    for (mint, price) in [
        (&snapshot.token_x.mint, price_x),
        (&snapshot.token_y.mint, price_y),
    ] {
        if !price.is_positive() {
            return Err(PositionError::InvalidPrice {
                mint: mint.clone(),
                price,
            });
        }
    }
    Ok((price_x, price_y))
}

fn terminal_reason(e: &PositionError) -> Option<TerminationReason> {
    match e {
        PositionError::NotFound(position) => Some(TerminationReason::PositionNotFound {
            position: position.clone(),
        }),
        PositionError::RebalanceFailed(detail) => Some(TerminationReason::RebalanceFailed {
            detail: detail.clone(),
        }),
        _ => None,
    }
}
