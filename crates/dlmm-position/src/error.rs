//! Position error types.

use dlmm_core::{AssetId, CoreError, PositionHandle, Price};
use thiserror::Error;

use crate::venue::VenueError;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("Position not found: {0}")]
    NotFound(PositionHandle),

    #[error("Token decimals unknown for mint {0}")]
    DecimalsUnknown(AssetId),

    #[error("Invalid price for {mint}: {price}")]
    InvalidPrice { mint: AssetId, price: Price },

    #[error("Valuation overflow computing {0}")]
    ValuationOverflow(&'static str),

    #[error("Rebalance failed: {0}")]
    RebalanceFailed(String),

    #[error("Venue error: {0}")]
    Venue(#[from] VenueError),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl PositionError {
    /// Whether the error ends the monitoring run.
    ///
    /// A missing position or a failed rebalance leaves no trustworthy handle to
    /// keep watching. Everything else only spoils the current tick.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::RebalanceFailed(_))
    }
}

pub type PositionResult<T> = Result<T, PositionError>;
