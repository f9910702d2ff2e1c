//! Shared builders for monitor tests.
//!
//! The reference position holds 5 SOL and 500 USDC. At SOL = 100 and
//! USDC = 1 it is worth exactly 1000 USD.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::broadcast;

use dlmm_bot::{MonitorSettings, PositionMonitor};
use dlmm_core::{
    AssetId, BinId, BinLiquidity, BinRange, PoolHandle, PositionHandle, PositionSnapshot, Price,
    StrategyKind, StrategyParams, SwaplessConfig, TokenInfo, TokenRatio, UsdValue,
};
use dlmm_position::{ExitConfig, Liquidator, MockVenue, RecenterOutcome, Venue, VenueResult};
use dlmm_telemetry::StatusRecord;

pub const SOL: &str = "SOL";
pub const USDC: &str = "USDC";

pub fn sol() -> AssetId {
    AssetId::new(SOL)
}

pub fn usdc() -> AssetId {
    AssetId::new(USDC)
}

/// Snapshot of `position` over `[lower, upper]` holding 5 SOL and 500 USDC.
pub fn snapshot(position: &str, lower: i32, upper: i32, active: i32) -> PositionSnapshot {
    PositionSnapshot {
        position: PositionHandle::new(position),
        pool: PoolHandle::new(format!("pool-{position}")),
        range: BinRange::new(BinId(lower), BinId(upper)).unwrap(),
        active_bin: BinId(active),
        bins: vec![
            BinLiquidity {
                bin_id: BinId(lower),
                amount_x: 0,
                amount_y: 500_000_000,
            },
            BinLiquidity {
                bin_id: BinId(upper),
                amount_x: 5_000_000_000,
                amount_y: 0,
            },
        ],
        fee_x: 0,
        fee_y: 0,
        token_x: TokenInfo::new(sol(), Some(9)),
        token_y: TokenInfo::new(usdc(), Some(6)),
    }
}

/// Same as [`snapshot`] but without token decimals.
pub fn bare_snapshot(position: &str, lower: i32, upper: i32, active: i32) -> PositionSnapshot {
    let mut snap = snapshot(position, lower, upper, active);
    snap.token_x.decimals = None;
    snap.token_y.decimals = None;
    snap
}

pub fn strategy() -> StrategyParams {
    StrategyParams {
        capital_amount: dec!(5),
        token_ratio: TokenRatio::default(),
        bin_span: 20,
        pool_address: PoolHandle::new("pool-pos-0"),
        kind: StrategyKind::Spot,
        swapless: SwaplessConfig::default(),
        auto_compound: false,
    }
}

pub fn exit_config(take_profit: Option<Decimal>, stop_loss: Option<Decimal>) -> ExitConfig {
    ExitConfig {
        take_profit_enabled: take_profit.is_some(),
        take_profit_percent: take_profit.unwrap_or(dec!(15)),
        stop_loss_enabled: stop_loss.is_some(),
        stop_loss_percent: stop_loss.unwrap_or(dec!(10)),
        strategy: strategy(),
    }
}

pub fn settings() -> MonitorSettings {
    MonitorSettings {
        interval: Duration::from_secs(5),
        ..MonitorSettings::default()
    }
}

/// Mock venue with known decimals and USDC pinned at 1.
///
/// `sol_prices` are served in order, the last one repeating.
pub fn mock_venue(sol_prices: &[Decimal]) -> Arc<MockVenue> {
    let venue = Arc::new(MockVenue::new());
    venue.set_decimals(&sol(), 9);
    venue.set_decimals(&usdc(), 6);
    for p in sol_prices {
        venue.push_price(&sol(), Ok(Price::new(*p)));
    }
    venue.push_price(&usdc(), Ok(Price::ONE));
    venue
}

pub fn recentered(position: &str, fees: Decimal) -> RecenterOutcome {
    RecenterOutcome {
        position: PositionHandle::new(position),
        pool: PoolHandle::new(format!("pool-{position}")),
        realized_fees_usd: UsdValue::new(fees),
    }
}

/// Start a monitor on `pos-0` over `[100, 120]`, active bin 110.
pub async fn start_monitor(
    venue: &Arc<MockVenue>,
    exit: ExitConfig,
    settings: MonitorSettings,
) -> PositionMonitor {
    PositionMonitor::start(
        Venue::from_shared(venue.clone()),
        snapshot("pos-0", 100, 120, 110),
        exit,
        settings,
    )
    .await
    .unwrap()
}

/// Liquidator that drains a status subscription when a close arrives.
///
/// Each close records the ticks of the records already published at that
/// moment.
#[derive(Default)]
pub struct ObservingLiquidator {
    rx: Mutex<Option<broadcast::Receiver<StatusRecord>>>,
    closes: Mutex<Vec<(PositionHandle, Vec<u64>)>>,
}

impl ObservingLiquidator {
    pub fn watch(&self, rx: broadcast::Receiver<StatusRecord>) {
        *self.rx.lock() = Some(rx);
    }

    pub fn closes(&self) -> Vec<(PositionHandle, Vec<u64>)> {
        self.closes.lock().clone()
    }
}

impl Liquidator for ObservingLiquidator {
    fn close_and_liquidate<'a>(
        &'a self,
        position: &'a PositionHandle,
    ) -> BoxFuture<'a, VenueResult<()>> {
        Box::pin(async move {
            let mut seen = Vec::new();
            if let Some(rx) = self.rx.lock().as_mut() {
                while let Ok(record) = rx.try_recv() {
                    seen.push(record.tick);
                }
            }
            self.closes.lock().push((position.clone(), seen));
            Ok(())
        })
    }
}

/// `venue` for everything except closes, which go to `liquidator`.
pub fn venue_with_liquidator(
    venue: &Arc<MockVenue>,
    liquidator: &Arc<ObservingLiquidator>,
) -> Venue {
    Venue::new(venue.clone(), venue.clone(), venue.clone(), liquidator.clone())
}
