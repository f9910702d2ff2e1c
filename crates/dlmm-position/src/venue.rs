//! Collaborator interfaces for the liquidity venue.
//!
//! The monitor never talks to a chain directly. Snapshot reads, price quotes,
//! recentering and liquidation are delegated to these traits so that the
//! decision logic can be driven by scripted implementations in tests.
//!
//! Methods return boxed futures, keeping the traits object safe
//! (`Arc<dyn PositionSource>` and friends).

use std::sync::Arc;

use futures_util::future::BoxFuture;
use thiserror::Error;

use dlmm_core::{
    AssetId, PoolHandle, PositionHandle, PositionSnapshot, Price, RebalanceDirection,
    StrategyParams, UsdValue,
};

/// Errors reported by venue collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VenueError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Active bin unavailable")]
    ActiveBinUnavailable,

    #[error("Price unavailable for {0}")]
    PriceUnavailable(AssetId),

    #[error("Transaction rejected: {0}")]
    Rejected(String),

    #[error("Request timed out")]
    Timeout,
}

pub type VenueResult<T> = Result<T, VenueError>;

/// Result of a successful recenter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecenterOutcome {
    /// Replacement position.
    pub position: PositionHandle,
    /// Pool of the replacement position.
    pub pool: PoolHandle,
    /// Fee income credited while closing the old position.
    pub realized_fees_usd: UsdValue,
}

/// Reads position state. Implementations must not cache across calls.
pub trait PositionSource: Send + Sync {
    /// Fetch the current state of `position` in `pool`.
    ///
    /// Returns `Ok(None)` when the position no longer exists.
    fn fetch_snapshot<'a>(
        &'a self,
        position: &'a PositionHandle,
        pool: &'a PoolHandle,
    ) -> BoxFuture<'a, VenueResult<Option<PositionSnapshot>>>;

    /// Look up the decimal precision of a mint.
    fn fetch_decimals<'a>(&'a self, mint: &'a AssetId) -> BoxFuture<'a, VenueResult<u8>>;
}

/// Quotes unit prices in USD.
pub trait PriceSource: Send + Sync {
    /// Fetch the unit price of `mint`. Must be positive on success.
    fn fetch_price<'a>(&'a self, mint: &'a AssetId) -> BoxFuture<'a, VenueResult<Price>>;
}

/// Closes a position and opens an equivalent one centered on the active bin.
pub trait Recenter: Send + Sync {
    /// Returns `Ok(None)` when the old position was closed but no replacement
    /// could be opened.
    fn recenter<'a>(
        &'a self,
        position: &'a PositionHandle,
        strategy: &'a StrategyParams,
        direction: RebalanceDirection,
    ) -> BoxFuture<'a, VenueResult<Option<RecenterOutcome>>>;
}

/// Closes a position and converts every held token to the base asset.
pub trait Liquidator: Send + Sync {
    fn close_and_liquidate<'a>(&'a self, position: &'a PositionHandle)
        -> BoxFuture<'a, VenueResult<()>>;
}

pub type DynPositionSource = Arc<dyn PositionSource>;
pub type DynPriceSource = Arc<dyn PriceSource>;
pub type DynRecenter = Arc<dyn Recenter>;
pub type DynLiquidator = Arc<dyn Liquidator>;

/// The four collaborators a monitoring run needs.
#[derive(Clone)]
pub struct Venue {
    pub positions: DynPositionSource,
    pub prices: DynPriceSource,
    pub recenter: DynRecenter,
    pub liquidator: DynLiquidator,
}

impl Venue {
    pub fn new(
        positions: DynPositionSource,
        prices: DynPriceSource,
        recenter: DynRecenter,
        liquidator: DynLiquidator,
    ) -> Self {
        Self {
            positions,
            prices,
            recenter,
            liquidator,
        }
    }

    /// Build from one object implementing every collaborator.
    pub fn from_shared<T>(venue: Arc<T>) -> Self
    where
        T: PositionSource + PriceSource + Recenter + Liquidator + 'static,
    {
        let positions: DynPositionSource = venue.clone();
        let prices: DynPriceSource = venue.clone();
        let recenter: DynRecenter = venue.clone();
        let liquidator: DynLiquidator = venue;
        Self::new(positions, prices, recenter, liquidator)
    }
}

impl std::fmt::Debug for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Venue").finish_non_exhaustive()
    }
}
