//! Running state of one monitoring run.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use dlmm_core::{PoolHandle, PositionHandle, UsdValue};

use crate::exit::ExitTrigger;
use crate::venue::RecenterOutcome;

/// Why a monitoring run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum TerminationReason {
    /// The active position no longer exists.
    PositionNotFound { position: PositionHandle },
    /// A rebalance failed; the old position may already be closed.
    RebalanceFailed { detail: String },
    /// An exit rule fired. `closed` reports whether the close succeeded.
    ExitTriggered { trigger: ExitTrigger, closed: bool },
    /// Too many consecutive ticks failed.
    FailureEscalation { consecutive_failures: u32 },
}

impl TerminationReason {
    /// Stable snake_case name of the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PositionNotFound { .. } => "position_not_found",
            Self::RebalanceFailed { .. } => "rebalance_failed",
            Self::ExitTriggered { .. } => "exit_triggered",
            Self::FailureEscalation { .. } => "failure_escalation",
        }
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PositionNotFound { position } => write!(f, "position {position} not found"),
            Self::RebalanceFailed { detail } => write!(f, "rebalance failed: {detail}"),
            Self::ExitTriggered { trigger, closed } => {
                if *closed {
                    write!(f, "{trigger} triggered, position closed")
                } else {
                    write!(f, "{trigger} triggered, close failed")
                }
            }
            Self::FailureEscalation {
                consecutive_failures,
            } => write!(f, "{consecutive_failures} consecutive failed ticks"),
        }
    }
}

/// Mutable state owned by the control loop.
///
/// `initial_capital_usd` is fixed at construction. `cumulative_fees_usd` and
/// `rebalance_count` only grow, and only through [`MonitorState::apply_rebalance`].
#[derive(Debug, Clone, Serialize)]
pub struct MonitorState {
    initial_capital_usd: UsdValue,
    cumulative_fees_usd: UsdValue,
    rebalance_count: u32,
    active_position: PositionHandle,
    active_pool: PoolHandle,
    started_at: DateTime<Utc>,
}

impl MonitorState {
    pub fn new(
        position: PositionHandle,
        pool: PoolHandle,
        initial_capital_usd: UsdValue,
    ) -> Self {
        Self {
            initial_capital_usd,
            cumulative_fees_usd: UsdValue::ZERO,
            rebalance_count: 0,
            active_position: position,
            active_pool: pool,
            started_at: Utc::now(),
        }
    }

    pub fn initial_capital_usd(&self) -> UsdValue {
        self.initial_capital_usd
    }

    pub fn cumulative_fees_usd(&self) -> UsdValue {
        self.cumulative_fees_usd
    }

    pub fn rebalance_count(&self) -> u32 {
        self.rebalance_count
    }

    pub fn active_position(&self) -> &PositionHandle {
        &self.active_position
    }

    pub fn active_pool(&self) -> &PoolHandle {
        &self.active_pool
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Wall-clock time since the run started.
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now().signed_duration_since(self.started_at)
    }

    /// Merge a completed recenter.
    ///
    /// Both handles are replaced together. Negative realized fees are clamped
    /// to zero so the accumulated total never decreases.
    pub(crate) fn apply_rebalance(&mut self, outcome: RecenterOutcome) {
        let realized = if outcome.realized_fees_usd.is_negative() {
            warn!(
                realized_fees_usd = %outcome.realized_fees_usd,
                position = %outcome.position,
                "Negative realized fees reported, clamping to zero"
            );
            UsdValue::ZERO
        } else {
            outcome.realized_fees_usd
        };

        self.cumulative_fees_usd = self
            .cumulative_fees_usd
            .checked_add(realized)
            .unwrap_or(self.cumulative_fees_usd);
        self.rebalance_count = self.rebalance_count.saturating_add(1);
        self.active_position = outcome.position;
        self.active_pool = outcome.pool;
    }
}
