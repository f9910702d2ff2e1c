//! Paper venue.
//!
//! An in-process market implementing every venue collaborator, so the
//! monitor can run end to end without a chain.
//!
//! - The active bin follows a triangle wave around bin 0, moving
//!   `drift_bins_per_step` bins every `step_secs` and turning at
//!   `±swing_bins`.
//! - Token X is priced geometrically: `price_x_usd * (1 + bin_step)^bin`.
//!   Token Y has a fixed price.
//! - Fees accrue linearly: every step adds `fee_bps_per_step` of each
//!   held amount.

use std::collections::HashMap;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use dlmm_core::{
    AssetId, BinId, BinLiquidity, BinRange, PoolHandle, PositionHandle, PositionSnapshot, Price,
    RebalanceDirection, StrategyParams, TokenInfo,
};
use dlmm_position::{
    Liquidator, PositionSource, PriceSource, Recenter, RecenterOutcome, Valuation, VenueError,
    VenueResult,
};

use crate::config::PaperConfig;

const BPS: u32 = 10_000;

#[derive(Debug, Clone)]
struct PaperPosition {
    pool: PoolHandle,
    range: BinRange,
    bins: Vec<BinLiquidity>,
    opened_step: u64,
}

/// Simulated DLMM market.
#[derive(Debug)]
pub struct PaperVenue {
    config: PaperConfig,
    token_x: AssetId,
    token_y: AssetId,
    started: Instant,
    positions: Mutex<HashMap<PositionHandle, PaperPosition>>,
}

impl PaperVenue {
    pub fn new(config: PaperConfig) -> Self {
        let token_x = config.token_x();
        let token_y = config.token_y();
        Self {
            config,
            token_x,
            token_y,
            started: Instant::now(),
            positions: Mutex::new(HashMap::new()),
        }
    }

    /// Market steps elapsed since the venue was created.
    pub fn current_step(&self) -> u64 {
        self.started.elapsed().as_secs() / self.config.step_secs.max(1)
    }

    /// Active bin after `step` market steps.
    pub fn active_bin_at(&self, step: u64) -> BinId {
        let swing = i64::from(self.config.swing_bins);
        if swing == 0 {
            return BinId(0);
        }
        let period = 4 * swing;
        let travelled = (step as i128 * i128::from(self.config.drift_bins_per_step))
            % i128::from(period);
        let p = travelled as i64;
        let offset = if p <= swing {
            p
        } else if p <= 3 * swing {
            2 * swing - p
        } else {
            p - period
        };
        BinId(offset as i32)
    }

    pub fn active_bin(&self) -> BinId {
        self.active_bin_at(self.current_step())
    }

    /// USD price of token X when `bin` is active.
    pub fn price_x_at(&self, bin: BinId) -> VenueResult<Price> {
        let unavailable = || VenueError::PriceUnavailable(self.token_x.clone());
        let factor = Decimal::ONE + Decimal::from(self.config.bin_step_bps) / Decimal::from(BPS);
        let mut price = self.config.price_x_usd;
        for _ in 0..bin.0.unsigned_abs() {
            price = if bin.0 >= 0 {
                price.checked_mul(factor)
            } else {
                price.checked_div(factor)
            }
            .ok_or_else(unavailable)?;
        }
        Ok(Price::new(price))
    }

    pub fn price_y(&self) -> Price {
        Price::new(self.config.price_y_usd)
    }

    pub fn position_count(&self) -> usize {
        self.positions.lock().len()
    }

    /// Open a position centered on the current active bin.
    ///
    /// `extra_capital_x` is added to the strategy capital (auto-compounding).
    pub fn open_position(
        &self,
        strategy: &StrategyParams,
        direction: Option<RebalanceDirection>,
        extra_capital_x: Decimal,
    ) -> VenueResult<PositionHandle> {
        let step = self.current_step();
        let active = self.active_bin_at(step);
        let range = strategy
            .layout(active, direction)
            .map_err(|e| VenueError::Rejected(e.to_string()))?;

        let capital = strategy.capital_amount + extra_capital_x;
        let price_x = self.price_x_at(active)?.inner();
        let price_x_in_y = price_x / self.config.price_y_usd;

        let ratio_x = match direction {
            Some(RebalanceDirection::Down) if strategy.swapless.enabled => Decimal::ONE,
            Some(RebalanceDirection::Up) if strategy.swapless.enabled => Decimal::ZERO,
            _ => strategy.token_ratio.ratio_x(),
        };
        let total_x = capital * ratio_x;
        let total_y = capital * (Decimal::ONE - ratio_x) * price_x_in_y;

        let bins = distribute(
            range,
            active,
            to_raw(total_x, self.config.token_x_decimals)?,
            to_raw(total_y, self.config.token_y_decimals)?,
        );

        let handle = PositionHandle::new(format!("paper-{}", Uuid::new_v4()));
        info!(
            position = %handle,
            %range,
            active_bin = %active,
            amount_x = %total_x,
            amount_y = %total_y.round_dp(6),
            "Paper position opened"
        );
        self.positions.lock().insert(
            handle.clone(),
            PaperPosition {
                pool: strategy.pool_address.clone(),
                range,
                bins,
                opened_step: step,
            },
        );
        Ok(handle)
    }

    fn snapshot_of(
        &self,
        handle: &PositionHandle,
        position: &PaperPosition,
        step: u64,
        with_decimals: bool,
    ) -> VenueResult<PositionSnapshot> {
        let steps_open = step.saturating_sub(position.opened_step);
        let amount_x: u128 = position.bins.iter().map(|b| b.amount_x).sum();
        let amount_y: u128 = position.bins.iter().map(|b| b.amount_y).sum();

        let decimals = |d: u8| if with_decimals { Some(d) } else { None };
        Ok(PositionSnapshot {
            position: handle.clone(),
            pool: position.pool.clone(),
            range: position.range,
            active_bin: self.active_bin_at(step),
            bins: position.bins.clone(),
            fee_x: accrued(amount_x, self.config.fee_bps_per_step, steps_open)?,
            fee_y: accrued(amount_y, self.config.fee_bps_per_step, steps_open)?,
            token_x: TokenInfo::new(self.token_x.clone(), decimals(self.config.token_x_decimals)),
            token_y: TokenInfo::new(self.token_y.clone(), decimals(self.config.token_y_decimals)),
        })
    }
}

/// X goes to bins at or above the active bin, Y to bins at or below it,
/// split evenly.
fn distribute(range: BinRange, active: BinId, raw_x: u128, raw_y: u128) -> Vec<BinLiquidity> {
    let ids: Vec<BinId> = (range.lower().0..=range.upper().0).map(BinId).collect();
    let x_bins = ids.iter().filter(|b| **b >= active).count().max(1) as u128;
    let y_bins = ids.iter().filter(|b| **b <= active).count().max(1) as u128;

    ids.into_iter()
        .map(|bin_id| BinLiquidity {
            bin_id,
            amount_x: if bin_id >= active { raw_x / x_bins } else { 0 },
            amount_y: if bin_id <= active { raw_y / y_bins } else { 0 },
        })
        .collect()
}

fn to_raw(amount: Decimal, decimals: u8) -> VenueResult<u128> {
    let scale = Decimal::from_i128_with_scale(10i128.pow(u32::from(decimals)), 0);
    amount
        .checked_mul(scale)
        .and_then(|raw| raw.floor().to_u128())
        .ok_or_else(|| VenueError::Rejected(format!("amount {amount} out of range")))
}

fn accrued(amount: u128, bps_per_step: Decimal, steps: u64) -> VenueResult<u128> {
    let overflow = || VenueError::Rpc("fee accrual overflow".to_string());
    let amount = Decimal::from_u128(amount).ok_or_else(overflow)?;
    amount
        .checked_mul(bps_per_step)
        .and_then(|v| v.checked_mul(Decimal::from(steps)))
        .and_then(|v| v.checked_div(Decimal::from(BPS)))
        .and_then(|v| v.floor().to_u128())
        .ok_or_else(overflow)
}

impl PositionSource for PaperVenue {
    fn fetch_snapshot<'a>(
        &'a self,
        position: &'a PositionHandle,
        _pool: &'a PoolHandle,
    ) -> BoxFuture<'a, VenueResult<Option<PositionSnapshot>>> {
        Box::pin(async move {
            let step = self.current_step();
            let positions = self.positions.lock();
            match positions.get(position) {
                Some(p) => self.snapshot_of(position, p, step, false).map(Some),
                None => Ok(None),
            }
        })
    }

    fn fetch_decimals<'a>(&'a self, mint: &'a AssetId) -> BoxFuture<'a, VenueResult<u8>> {
        Box::pin(async move {
            if *mint == self.token_x {
                Ok(self.config.token_x_decimals)
            } else if *mint == self.token_y {
                Ok(self.config.token_y_decimals)
            } else {
                Err(VenueError::Rpc(format!("unknown mint {mint}")))
            }
        })
    }
}

impl PriceSource for PaperVenue {
    fn fetch_price<'a>(&'a self, mint: &'a AssetId) -> BoxFuture<'a, VenueResult<Price>> {
        Box::pin(async move {
            if *mint == self.token_x {
                self.price_x_at(self.active_bin())
            } else if *mint == self.token_y {
                Ok(self.price_y())
            } else {
                Err(VenueError::PriceUnavailable(mint.clone()))
            }
        })
    }
}

impl Recenter for PaperVenue {
    fn recenter<'a>(
        &'a self,
        position: &'a PositionHandle,
        strategy: &'a StrategyParams,
        direction: RebalanceDirection,
    ) -> BoxFuture<'a, VenueResult<Option<RecenterOutcome>>> {
        Box::pin(async move {
            let step = self.current_step();
            let old = self
                .positions
                .lock()
                .remove(position)
                .ok_or_else(|| VenueError::Rejected(format!("unknown position {position}")))?;

            let snapshot = self.snapshot_of(position, &old, step, true)?;
            let price_x = self.price_x_at(snapshot.active_bin)?;
            let fees = Valuation::compute(&snapshot, price_x, self.price_y())
                .map_err(|e| VenueError::Rpc(e.to_string()))?
                .fees_usd;
            debug!(position = %position, fees_usd = %fees, "Paper position closed");

            let extra_capital_x = if strategy.auto_compound {
                fees.inner()
                    .checked_div(price_x.inner())
                    .unwrap_or(Decimal::ZERO)
            } else {
                Decimal::ZERO
            };

            match self.open_position(strategy, Some(direction), extra_capital_x) {
                Ok(handle) => Ok(Some(RecenterOutcome {
                    position: handle,
                    pool: strategy.pool_address.clone(),
                    realized_fees_usd: fees,
                })),
                Err(e) => {
                    debug!(error = %e, "Paper replacement position not opened");
                    Ok(None)
                }
            }
        })
    }
}

impl Liquidator for PaperVenue {
    fn close_and_liquidate<'a>(
        &'a self,
        position: &'a PositionHandle,
    ) -> BoxFuture<'a, VenueResult<()>> {
        Box::pin(async move {
            match self.positions.lock().remove(position) {
                Some(_) => {
                    info!(position = %position, "Paper position closed and liquidated");
                    Ok(())
                }
                None => Err(VenueError::Rejected(format!("unknown position {position}"))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlmm_core::{StrategyKind, SwaplessConfig, TokenRatio, UsdValue};
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn strategy() -> StrategyParams {
        StrategyParams {
            capital_amount: dec!(1),
            token_ratio: TokenRatio::default(),
            bin_span: 20,
            pool_address: PoolHandle::new("paper-pool"),
            kind: StrategyKind::Spot,
            swapless: SwaplessConfig::default(),
            auto_compound: false,
        }
    }

    fn venue() -> PaperVenue {
        PaperVenue::new(PaperConfig::default())
    }

    #[test]
    fn test_triangle_drift() {
        let v = venue();
        // drift 2, swing 30
        assert_eq!(v.active_bin_at(0), BinId(0));
        assert_eq!(v.active_bin_at(5), BinId(10));
        assert_eq!(v.active_bin_at(15), BinId(30));
        assert_eq!(v.active_bin_at(20), BinId(20));
        assert_eq!(v.active_bin_at(45), BinId(-30));
        assert_eq!(v.active_bin_at(60), BinId(0));
        for step in 0..200 {
            assert!(v.active_bin_at(step).0.abs() <= 30);
        }
    }

    #[test]
    fn test_geometric_pricing() {
        let v = venue();
        assert_eq!(v.price_x_at(BinId(0)).unwrap(), Price::new(dec!(150)));
        assert_eq!(v.price_x_at(BinId(1)).unwrap(), Price::new(dec!(150.15)));
        let up = v.price_x_at(BinId(10)).unwrap();
        let down = v.price_x_at(BinId(-10)).unwrap();
        assert!(up > Price::new(dec!(150)));
        assert!(down < Price::new(dec!(150)));
    }

    #[test]
    fn test_distribute_splits_around_active() {
        let range = BinRange::new(BinId(-2), BinId(2)).unwrap();
        let bins = distribute(range, BinId(0), 300, 600);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins.iter().map(|b| b.amount_x).sum::<u128>(), 300);
        assert_eq!(bins.iter().map(|b| b.amount_y).sum::<u128>(), 600);
        assert_eq!(bins[0].amount_x, 0);
        assert_eq!(bins[4].amount_y, 0);
    }

    #[test]
    fn test_accrued_fees_are_linear() {
        assert_eq!(accrued(1_000_000, dec!(2), 0).unwrap(), 0);
        assert_eq!(accrued(1_000_000, dec!(2), 1).unwrap(), 200);
        assert_eq!(accrued(1_000_000, dec!(2), 5).unwrap(), 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_and_snapshot() {
        let v = venue();
        let handle = v.open_position(&strategy(), None, Decimal::ZERO).unwrap();
        let pool = PoolHandle::new("paper-pool");

        let snap = v.fetch_snapshot(&handle, &pool).await.unwrap().unwrap();
        assert!(snap.range.contains(snap.active_bin));
        assert_eq!(snap.range.width(), 20);
        assert_eq!(snap.decimals(), None);
        assert_eq!(snap.amount_x(), 500_000_000);
        assert_eq!((snap.fee_x, snap.fee_y), (0, 0));

        tokio::time::sleep(Duration::from_secs(10)).await;
        let later = v.fetch_snapshot(&handle, &pool).await.unwrap().unwrap();
        assert!(later.fee_x > 0);
        assert_eq!(later.active_bin, BinId(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recenter_replaces_position() {
        let v = venue();
        let first = v.open_position(&strategy(), None, Decimal::ZERO).unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;

        let outcome = v
            .recenter(&first, &strategy(), RebalanceDirection::Up)
            .await
            .unwrap()
            .unwrap();

        assert_ne!(outcome.position, first);
        assert!(outcome.realized_fees_usd > UsdValue::ZERO);
        assert_eq!(v.position_count(), 1);
        let pool = PoolHandle::new("paper-pool");
        assert!(v.fetch_snapshot(&first, &pool).await.unwrap().is_none());
        let snap = v
            .fetch_snapshot(&outcome.position, &pool)
            .await
            .unwrap()
            .unwrap();
        assert!(snap.range.contains(snap.active_bin));
    }

    #[tokio::test]
    async fn test_close_removes_position() {
        let v = venue();
        let handle = v.open_position(&strategy(), None, Decimal::ZERO).unwrap();
        v.close_and_liquidate(&handle).await.unwrap();
        assert_eq!(v.position_count(), 0);
        assert!(v.close_and_liquidate(&handle).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_mint() {
        let v = venue();
        let mint = AssetId::new("unknown");
        assert!(v.fetch_price(&mint).await.is_err());
        assert!(v.fetch_decimals(&mint).await.is_err());
        assert_eq!(v.fetch_decimals(&v.config.token_x()).await, Ok(9));
    }
}
