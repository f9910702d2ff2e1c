//! Per-tick status records and the end-of-run summary.
//!
//! A [`StatusRecord`] is emitted for every tick that reaches valuation. It is
//! logged with structured fields and can be rendered as one row of a text
//! table. [`RunSummary`] is logged once when the run terminates, whatever the
//! reason.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use dlmm_core::{BinId, BinRange, PositionHandle, PositionSnapshot, UsdValue};
use dlmm_position::{
    pnl_percent, ExitConfig, MonitorState, RangeStatus, TerminationReason, Valuation,
};

use crate::error::TelemetryResult;

/// Status of the position after one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRecord {
    pub timestamp: DateTime<Utc>,
    pub tick: u64,
    pub position: PositionHandle,
    pub active_bin: BinId,
    pub range: BinRange,
    pub range_status: RangeStatus,
    /// Current value including unclaimed fees.
    pub total_usd: UsdValue,
    /// Unclaimed fees included in `total_usd`.
    pub unclaimed_fees_usd: UsdValue,
    pub initial_capital_usd: UsdValue,
    /// `None` when the difference overflows.
    pub pnl_usd: Option<UsdValue>,
    /// `None` when the initial capital is zero.
    pub pnl_percent: Option<Decimal>,
    /// Fees realized by rebalances so far.
    pub cumulative_fees_usd: UsdValue,
    pub rebalance_count: u32,
    /// e.g. `TP:+15%`
    pub take_profit: String,
    /// e.g. `SL:-10%`
    pub stop_loss: String,
    /// Whether this tick rebalanced the position.
    pub rebalanced: bool,
}

impl StatusRecord {
    /// Capture the status after a tick.
    ///
    /// `snapshot` and `valuation` must describe the position held at the end
    /// of the tick, i.e. the replacement position after a rebalance.
    pub fn capture(
        tick: u64,
        state: &MonitorState,
        exit_config: &ExitConfig,
        snapshot: &PositionSnapshot,
        valuation: &Valuation,
        range_status: RangeStatus,
        rebalanced: bool,
    ) -> Self {
        let initial = state.initial_capital_usd();
        Self {
            timestamp: Utc::now(),
            tick,
            position: state.active_position().clone(),
            active_bin: snapshot.active_bin,
            range: snapshot.range,
            range_status,
            total_usd: valuation.total_usd,
            unclaimed_fees_usd: valuation.fees_usd,
            initial_capital_usd: initial,
            pnl_usd: valuation.total_usd.checked_sub(initial),
            pnl_percent: pnl_percent(valuation.total_usd, initial),
            cumulative_fees_usd: state.cumulative_fees_usd(),
            rebalance_count: state.rebalance_count(),
            take_profit: exit_config.take_profit_label(),
            stop_loss: exit_config.stop_loss_label(),
            rebalanced,
        }
    }

    /// Column header matching the [`Display`](fmt::Display) row layout.
    pub fn header() -> String {
        format!(
            "{:<8} | {:>6} | {:<15} | {:>14} | {:>14} | {:>9} | {:>12} | {:>4} | {}",
            "TIME",
            "TICK",
            "BIN (RANGE)",
            "VALUE USD",
            "P&L USD",
            "P&L %",
            "FEES USD",
            "REB",
            "EXIT"
        )
    }

    /// Emit the record as a structured log event.
    pub fn log(&self) {
        info!(
            tick = self.tick,
            position = %self.position,
            active_bin = %self.active_bin,
            range = %self.range,
            range_status = %self.range_status,
            total_usd = %self.total_usd,
            unclaimed_fees_usd = %self.unclaimed_fees_usd,
            pnl_usd = %format_usd(self.pnl_usd),
            pnl_percent = %format_pct(self.pnl_percent),
            cumulative_fees_usd = %self.cumulative_fees_usd,
            rebalance_count = self.rebalance_count,
            take_profit = %self.take_profit,
            stop_loss = %self.stop_loss,
            rebalanced = self.rebalanced,
            "Position status"
        );
    }

    pub fn to_json(&self) -> TelemetryResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for StatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bin = format!("{} ({})", self.active_bin, self.range);
        write!(
            f,
            "{:<8} | {:>6} | {:<15} | {:>14} | {:>14} | {:>9} | {:>12} | {:>4} | {} {}{}",
            self.timestamp.format("%H:%M:%S").to_string(),
            self.tick,
            bin,
            self.total_usd.inner().round_dp(2).to_string(),
            format_usd(self.pnl_usd),
            format_pct(self.pnl_percent),
            self.cumulative_fees_usd.inner().round_dp(2).to_string(),
            self.rebalance_count,
            self.take_profit,
            self.stop_loss,
            if self.rebalanced { " *" } else { "" }
        )
    }
}

/// Outcome of a whole monitoring run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub reason: TerminationReason,
    /// Position active when the run ended.
    pub position: PositionHandle,
    pub ticks: u64,
    pub initial_capital_usd: UsdValue,
    /// Last valuation reached, if any tick got that far.
    pub final_total_usd: Option<UsdValue>,
    pub pnl_usd: Option<UsdValue>,
    pub pnl_percent: Option<Decimal>,
    pub cumulative_fees_usd: UsdValue,
    pub rebalance_count: u32,
    pub started_at: DateTime<Utc>,
    pub elapsed_secs: i64,
}

impl RunSummary {
    pub fn new(
        reason: TerminationReason,
        state: &MonitorState,
        final_total_usd: Option<UsdValue>,
        ticks: u64,
    ) -> Self {
        let initial = state.initial_capital_usd();
        Self {
            reason,
            position: state.active_position().clone(),
            ticks,
            initial_capital_usd: initial,
            final_total_usd,
            pnl_usd: final_total_usd.and_then(|total| total.checked_sub(initial)),
            pnl_percent: final_total_usd.and_then(|total| pnl_percent(total, initial)),
            cumulative_fees_usd: state.cumulative_fees_usd(),
            rebalance_count: state.rebalance_count(),
            started_at: state.started_at(),
            elapsed_secs: state.elapsed().num_seconds(),
        }
    }

    /// Write the summary to the log.
    pub fn log(&self) {
        info!("========== Monitoring Summary ==========");
        info!(reason = %self.reason, "Terminated: {}", self.reason);
        info!(
            "Period: {} ({})",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            format_elapsed(self.elapsed_secs)
        );
        info!("  Position: {} after {} ticks", self.position, self.ticks);
        info!("  Initial capital: ${}", self.initial_capital_usd.inner().round_dp(2));
        match self.final_total_usd {
            Some(total) => info!(
                "  Final value: ${} (P&L: {} / {})",
                total.inner().round_dp(2),
                format_usd(self.pnl_usd),
                format_pct(self.pnl_percent)
            ),
            None => warn!("  Final value: unknown (no tick reached valuation)"),
        }
        info!(
            "  Fees realized: ${} over {} rebalances",
            self.cumulative_fees_usd.inner().round_dp(2),
            self.rebalance_count
        );
        info!("========================================");
    }

    pub fn to_json(&self) -> TelemetryResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | ticks={} rebalances={} fees=${} pnl={}",
            self.reason,
            self.ticks,
            self.rebalance_count,
            self.cumulative_fees_usd.inner().round_dp(2),
            format_pct(self.pnl_percent)
        )
    }
}

fn format_usd(value: Option<UsdValue>) -> String {
    match value {
        Some(v) => v.inner().round_dp(2).to_string(),
        None => "n/a".to_string(),
    }
}

fn format_pct(pct: Option<Decimal>) -> String {
    match pct {
        Some(p) if p.is_sign_negative() && !p.is_zero() => format!("{}%", p.round_dp(2)),
        Some(p) => format!("+{}%", p.round_dp(2)),
        None => "n/a".to_string(),
    }
}

fn format_elapsed(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
}
