//! Take-profit / stop-loss exit rules.
//!
//! P&L is measured against the valuation fixed when monitoring started:
//! `pnl_percent = (total - initial) / initial * 100`. Take-profit is checked
//! before stop-loss and wins when both hold. An undefined percentage (zero
//! initial capital) never fires a trigger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use dlmm_core::{CoreError, CoreResult, StrategyParams, UsdValue};

/// Immutable exit intent for one monitoring run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitConfig {
    pub take_profit_enabled: bool,
    /// Gain (percent of initial capital) that closes the position.
    pub take_profit_percent: Decimal,
    pub stop_loss_enabled: bool,
    /// Loss (percent of initial capital, positive number) that closes the position.
    pub stop_loss_percent: Decimal,
    /// Sizing used to re-derive positions after a rebalance.
    pub strategy: StrategyParams,
}

impl ExitConfig {
    /// Whether any exit rule is active.
    pub fn has_triggers(&self) -> bool {
        self.take_profit_enabled || self.stop_loss_enabled
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.take_profit_enabled && self.take_profit_percent <= Decimal::ZERO {
            return Err(CoreError::InvalidConfig(format!(
                "take profit percent must be positive, got {}",
                self.take_profit_percent
            )));
        }
        if self.stop_loss_enabled && self.stop_loss_percent <= Decimal::ZERO {
            return Err(CoreError::InvalidConfig(format!(
                "stop loss percent must be positive, got {}",
                self.stop_loss_percent
            )));
        }
        self.strategy.validate()
    }

    /// Evaluate the exit rules against the current total.
    #[inline]
    pub fn evaluate(&self, total: UsdValue, initial: UsdValue) -> ExitDecision {
        evaluate(total, initial, self)
    }

    /// Short status label, e.g. `TP:+15%` or `TP:OFF`.
    pub fn take_profit_label(&self) -> String {
        if self.take_profit_enabled {
            format!("TP:+{}%", self.take_profit_percent.normalize())
        } else {
            "TP:OFF".to_string()
        }
    }

    /// Short status label, e.g. `SL:-10%` or `SL:OFF`.
    pub fn stop_loss_label(&self) -> String {
        if self.stop_loss_enabled {
            format!("SL:-{}%", self.stop_loss_percent.normalize())
        } else {
            "SL:OFF".to_string()
        }
    }
}

/// Which exit rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitTrigger {
    TakeProfit,
    StopLoss,
}

impl fmt::Display for ExitTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TakeProfit => write!(f, "TAKE PROFIT"),
            Self::StopLoss => write!(f, "STOP LOSS"),
        }
    }
}

/// Outcome of one exit evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    /// Keep monitoring.
    Hold,
    TakeProfit { pnl_percent: Decimal },
    StopLoss { pnl_percent: Decimal },
}

impl ExitDecision {
    pub fn trigger(&self) -> Option<ExitTrigger> {
        match self {
            Self::Hold => None,
            Self::TakeProfit { .. } => Some(ExitTrigger::TakeProfit),
            Self::StopLoss { .. } => Some(ExitTrigger::StopLoss),
        }
    }
}

/// Percentage P&L of `total` against `initial`. `None` when undefined.
#[inline]
pub fn pnl_percent(total: UsdValue, initial: UsdValue) -> Option<Decimal> {
    total.pct_from(initial)
}

/// Evaluate the exit rules of `config`.
pub fn evaluate(total: UsdValue, initial: UsdValue, config: &ExitConfig) -> ExitDecision {
    if !config.has_triggers() {
        return ExitDecision::Hold;
    }
    let Some(pnl) = pnl_percent(total, initial) else {
        return ExitDecision::Hold;
    };

    if config.take_profit_enabled && pnl >= config.take_profit_percent {
        return ExitDecision::TakeProfit { pnl_percent: pnl };
    }
    if config.stop_loss_enabled && pnl <= -config.stop_loss_percent {
        return ExitDecision::StopLoss { pnl_percent: pnl };
    }
    ExitDecision::Hold
}
