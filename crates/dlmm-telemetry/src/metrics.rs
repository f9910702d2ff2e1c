//! Prometheus metrics for the position monitor.
//!
//! Covers:
//! - Tick throughput and skipped ticks
//! - Rebalances by direction
//! - Terminations by reason
//! - Position value, P&L and fee gauges
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means duplicate metric
//! names, which is a programming error and panics on first use of the metric.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_int_counter, register_int_gauge, CounterVec,
    Encoder, Gauge, IntCounter, IntGauge, TextEncoder,
};
use rust_decimal::prelude::ToPrimitive;

use dlmm_core::RebalanceDirection;
use dlmm_position::TerminationReason;

use crate::error::{TelemetryError, TelemetryResult};
use crate::status::StatusRecord;

/// Total ticks started.
pub static TICKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("dlmm_ticks_total", "Total monitoring ticks started").unwrap()
});

/// Total ticks skipped after a transient error.
pub static TICKS_SKIPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "dlmm_ticks_skipped_total",
        "Total ticks skipped after a transient error"
    )
    .unwrap()
});

/// Current run of consecutive failed ticks.
pub static CONSECUTIVE_FAILURES: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "dlmm_consecutive_failures",
        "Consecutive failed ticks (0 after a successful tick)"
    )
    .unwrap()
});

/// Successful rebalances.
/// Labels: direction (up/down)
pub static REBALANCES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dlmm_rebalances_total",
        "Total successful rebalances",
        &["direction"]
    )
    .unwrap()
});

/// Monitoring runs ended.
/// Labels: reason (position_not_found/rebalance_failed/exit_triggered/failure_escalation)
pub static TERMINATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dlmm_terminations_total",
        "Total monitoring runs terminated",
        &["reason"]
    )
    .unwrap()
});

/// Position value in USD including unclaimed fees.
pub static POSITION_TOTAL_USD: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "dlmm_position_total_usd",
        "Position value in USD including unclaimed fees"
    )
    .unwrap()
});

/// P&L against the initial capital, in percent.
pub static POSITION_PNL_PERCENT: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "dlmm_position_pnl_percent",
        "P&L against initial capital in percent"
    )
    .unwrap()
});

/// Fees realized by rebalances.
pub static CUMULATIVE_FEES_USD: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "dlmm_cumulative_fees_usd",
        "Fees realized by rebalances in USD"
    )
    .unwrap()
});

/// Active bin of the market at the last valuation.
pub static ACTIVE_BIN: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("dlmm_active_bin", "Active bin at last valuation").unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record a tick start.
    pub fn tick_started() {
        TICKS_TOTAL.inc();
    }

    /// Record a tick that failed without ending the run.
    pub fn tick_skipped(consecutive_failures: u32) {
        TICKS_SKIPPED_TOTAL.inc();
        CONSECUTIVE_FAILURES.set(i64::from(consecutive_failures));
    }

    /// Record a tick that reached valuation.
    pub fn position_valued(record: &StatusRecord) {
        CONSECUTIVE_FAILURES.set(0);
        if let Some(total) = record.total_usd.inner().to_f64() {
            POSITION_TOTAL_USD.set(total);
        }
        // Undefined P&L keeps the last value.
        if let Some(pnl) = record.pnl_percent.and_then(|p| p.to_f64()) {
            POSITION_PNL_PERCENT.set(pnl);
        }
        if let Some(fees) = record.cumulative_fees_usd.inner().to_f64() {
            CUMULATIVE_FEES_USD.set(fees);
        }
        ACTIVE_BIN.set(i64::from(record.active_bin.index()));
    }

    /// Record a successful rebalance.
    pub fn rebalanced(direction: RebalanceDirection) {
        let label = match direction {
            RebalanceDirection::Up => "up",
            RebalanceDirection::Down => "down",
        };
        REBALANCES_TOTAL.with_label_values(&[label]).inc();
    }

    /// Record the end of a run.
    pub fn terminated(reason: &TerminationReason) {
        TERMINATIONS_TOTAL.with_label_values(&[reason.kind()]).inc();
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use dlmm_core::{BinId, BinRange, PositionHandle, UsdValue};
    use dlmm_position::{ExitTrigger, RangeStatus};
    use rust_decimal_macros::dec;

    fn record() -> StatusRecord {
        StatusRecord {
            timestamp: Utc::now(),
            tick: 1,
            position: PositionHandle::new("pos"),
            active_bin: BinId(-42),
            range: BinRange::new(BinId(-50), BinId(-30)).unwrap(),
            range_status: RangeStatus::Inside,
            total_usd: UsdValue::new(dec!(1050.5)),
            unclaimed_fees_usd: UsdValue::new(dec!(2)),
            initial_capital_usd: UsdValue::new(dec!(1000)),
            pnl_usd: Some(UsdValue::new(dec!(50.5))),
            pnl_percent: Some(dec!(5.05)),
            cumulative_fees_usd: UsdValue::new(dec!(3.25)),
            rebalance_count: 1,
            take_profit: "TP:+15%".to_string(),
            stop_loss: "SL:OFF".to_string(),
            rebalanced: false,
        }
    }

    #[test]
    fn test_counters_increase() {
        let ticks = TICKS_TOTAL.get();
        let skipped = TICKS_SKIPPED_TOTAL.get();
        Metrics::tick_started();
        Metrics::tick_skipped(2);
        assert!(TICKS_TOTAL.get() > ticks);
        assert!(TICKS_SKIPPED_TOTAL.get() > skipped);

        let up = REBALANCES_TOTAL.with_label_values(&["up"]).get();
        Metrics::rebalanced(RebalanceDirection::Up);
        assert!(REBALANCES_TOTAL.with_label_values(&["up"]).get() > up);

        let exits = TERMINATIONS_TOTAL
            .with_label_values(&["exit_triggered"])
            .get();
        Metrics::terminated(&TerminationReason::ExitTriggered {
            trigger: ExitTrigger::StopLoss,
            closed: true,
        });
        assert!(
            TERMINATIONS_TOTAL
                .with_label_values(&["exit_triggered"])
                .get()
                > exits
        );
    }

    #[test]
    fn test_gauges_follow_record() {
        Metrics::position_valued(&record());
        assert_eq!(ACTIVE_BIN.get(), -42);
        assert!((CUMULATIVE_FEES_USD.get() - 3.25).abs() < 1e-9);
        assert!(POSITION_TOTAL_USD.get() > 0.0);
    }

    #[test]
    fn test_render_text_format() {
        Metrics::tick_started();
        Metrics::terminated(&TerminationReason::FailureEscalation {
            consecutive_failures: 3,
        });
        let text = Metrics::render().unwrap();
        assert!(text.contains("dlmm_ticks_total"));
        assert!(text.contains("dlmm_terminations_total{reason=\"failure_escalation\"}"));
    }
}
