//! Rebalance coordination.
//!
//! On a range breach the current position is handed to the [`Recenter`]
//! collaborator together with the original strategy parameters. A successful
//! recenter is merged into [`MonitorState`] in one step. Any failure is
//! terminal for the run and is never retried.
//!
//! [`Recenter`]: crate::venue::Recenter

use serde::Serialize;
use tracing::{error, info};

use dlmm_core::{PoolHandle, PositionHandle, RebalanceDirection, UsdValue};

use crate::error::{PositionError, PositionResult};
use crate::exit::ExitConfig;
use crate::state::MonitorState;
use crate::venue::DynRecenter;

/// A completed rebalance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebalanceOutcome {
    pub direction: RebalanceDirection,
    pub previous_position: PositionHandle,
    pub position: PositionHandle,
    pub pool: PoolHandle,
    pub realized_fees_usd: UsdValue,
}

/// Drives the recenter collaborator and updates running state.
pub struct RebalanceCoordinator {
    recenter: DynRecenter,
}

impl RebalanceCoordinator {
    pub fn new(recenter: DynRecenter) -> Self {
        Self { recenter }
    }

    /// Recenter the active position in `direction`.
    ///
    /// # Errors
    /// `RebalanceFailed` when the collaborator errors or opens no
    /// replacement. `state` is untouched in that case.
    pub async fn rebalance(
        &self,
        state: &mut MonitorState,
        exit_config: &ExitConfig,
        direction: RebalanceDirection,
    ) -> PositionResult<RebalanceOutcome> {
        let previous = state.active_position().clone();
        info!(
            position = %previous,
            %direction,
            strategy = %exit_config.strategy.kind,
            bin_span = exit_config.strategy.bin_span,
            swapless = exit_config.strategy.swapless.enabled,
            "Rebalancing position"
        );

        let outcome = match self
            .recenter
            .recenter(&previous, &exit_config.strategy, direction)
            .await
        {
            Ok(Some(outcome)) => outcome,
            Ok(None) => {
                error!(position = %previous, %direction, "Recenter opened no replacement position");
                return Err(PositionError::RebalanceFailed(format!(
                    "no replacement position opened for {previous}"
                )));
            }
            Err(e) => {
                error!(position = %previous, %direction, error = %e, "Recenter failed");
                return Err(PositionError::RebalanceFailed(e.to_string()));
            }
        };

        let result = RebalanceOutcome {
            direction,
            previous_position: previous,
            position: outcome.position.clone(),
            pool: outcome.pool.clone(),
            realized_fees_usd: outcome.realized_fees_usd,
        };
        state.apply_rebalance(outcome);

        info!(
            previous = %result.previous_position,
            position = %result.position,
            pool = %result.pool,
            realized_fees_usd = %result.realized_fees_usd,
            cumulative_fees_usd = %state.cumulative_fees_usd(),
            rebalance_count = state.rebalance_count(),
            "Rebalance complete"
        );
        Ok(result)
    }
}

impl std::fmt::Debug for RebalanceCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RebalanceCoordinator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockVenue;
    use crate::venue::{RecenterOutcome, VenueError};
    use dlmm_core::{StrategyKind, StrategyParams, SwaplessConfig, TokenRatio};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn exit_config() -> ExitConfig {
        ExitConfig {
            take_profit_enabled: true,
            take_profit_percent: dec!(15),
            stop_loss_enabled: true,
            stop_loss_percent: dec!(10),
            strategy: StrategyParams {
                capital_amount: dec!(2),
                token_ratio: TokenRatio::default(),
                bin_span: 40,
                pool_address: PoolHandle::new("pool-0"),
                kind: StrategyKind::Spot,
                swapless: SwaplessConfig::default(),
                auto_compound: false,
            },
        }
    }

    fn state() -> MonitorState {
        MonitorState::new(
            PositionHandle::new("pos-0"),
            PoolHandle::new("pool-0"),
            UsdValue::new(dec!(1000)),
        )
    }

    fn recentered(n: u32, fees: rust_decimal::Decimal) -> RecenterOutcome {
        RecenterOutcome {
            position: PositionHandle::new(format!("pos-{n}")),
            pool: PoolHandle::new(format!("pool-{n}")),
            realized_fees_usd: UsdValue::new(fees),
        }
    }

    #[tokio::test]
    async fn test_successful_rebalance_updates_state() {
        let venue = Arc::new(MockVenue::new());
        venue.push_recenter(Ok(Some(recentered(1, dec!(4.2)))));
        let coordinator = RebalanceCoordinator::new(venue.clone());
        let mut s = state();

        let outcome = coordinator
            .rebalance(&mut s, &exit_config(), RebalanceDirection::Down)
            .await
            .unwrap();

        assert_eq!(outcome.previous_position.as_str(), "pos-0");
        assert_eq!(outcome.position.as_str(), "pos-1");
        assert_eq!(s.active_position().as_str(), "pos-1");
        assert_eq!(s.active_pool().as_str(), "pool-1");
        assert_eq!(s.rebalance_count(), 1);
        assert_eq!(s.cumulative_fees_usd(), UsdValue::new(dec!(4.2)));
        assert_eq!(
            venue.recenter_calls(),
            vec![(PositionHandle::new("pos-0"), RebalanceDirection::Down)]
        );
    }

    #[tokio::test]
    async fn test_none_is_terminal_failure() {
        let venue = Arc::new(MockVenue::new());
        venue.push_recenter(Ok(None));
        let coordinator = RebalanceCoordinator::new(venue.clone());
        let mut s = state();

        let err = coordinator
            .rebalance(&mut s, &exit_config(), RebalanceDirection::Up)
            .await
            .unwrap_err();

        assert!(matches!(err, PositionError::RebalanceFailed(_)));
        assert!(err.is_terminal());
        assert_eq!(s.active_position().as_str(), "pos-0");
        assert_eq!(s.rebalance_count(), 0);
        assert!(venue.close_calls().is_empty());
    }

    #[tokio::test]
    async fn test_collaborator_error_is_terminal_failure() {
        let venue = Arc::new(MockVenue::new());
        venue.push_recenter(Err(VenueError::Rejected("slippage".to_string())));
        let coordinator = RebalanceCoordinator::new(venue.clone());
        let mut s = state();

        let err = coordinator
            .rebalance(&mut s, &exit_config(), RebalanceDirection::Up)
            .await
            .unwrap_err();

        assert!(err.is_terminal());
        assert!(err.to_string().contains("slippage"));
        assert_eq!(s.cumulative_fees_usd(), UsdValue::ZERO);
    }

    #[tokio::test]
    async fn test_repeated_rebalances_are_monotonic() {
        let venue = Arc::new(MockVenue::new());
        venue.push_recenter(Ok(Some(recentered(1, dec!(1)))));
        venue.push_recenter(Ok(Some(recentered(2, dec!(-2)))));
        venue.push_recenter(Ok(Some(recentered(3, dec!(0.5)))));
        let coordinator = RebalanceCoordinator::new(venue.clone());
        let cfg = exit_config();
        let mut s = state();

        let mut last_fees = s.cumulative_fees_usd();
        for (i, dir) in [
            RebalanceDirection::Down,
            RebalanceDirection::Up,
            RebalanceDirection::Down,
        ]
        .into_iter()
        .enumerate()
        {
            coordinator.rebalance(&mut s, &cfg, dir).await.unwrap();
            assert_eq!(s.rebalance_count(), i as u32 + 1);
            assert!(s.cumulative_fees_usd() >= last_fees);
            last_fees = s.cumulative_fees_usd();
        }

        assert_eq!(s.cumulative_fees_usd(), UsdValue::new(dec!(1.5)));
        let calls = venue.recenter_calls();
        assert_eq!(calls[1].0.as_str(), "pos-1");
        assert_eq!(calls[2].0.as_str(), "pos-2");
    }
}
