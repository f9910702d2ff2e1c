//! Position data read from the venue.
//!
//! Contains the handles identifying a position and its pool, token
//! metadata, and the immutable per-tick [`PositionSnapshot`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bin_range::{BinId, BinRange};

/// Token mint address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn new(mint: impl Into<String>) -> Self {
        Self(mint.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// On-chain address of a liquidity position.
///
/// Handles are replaced wholesale after a rebalance; an old handle is never
/// reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PositionHandle(pub String);

impl PositionHandle {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PositionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// On-chain address of the pool (lb pair) a position lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolHandle(pub String);

impl PoolHandle {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PoolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token side of a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Mint address.
    pub mint: AssetId,
    /// Decimal precision, when the venue already knows it.
    /// `None` means it must be resolved through the decimals cache.
    pub decimals: Option<u8>,
}

impl TokenInfo {
    pub fn new(mint: AssetId, decimals: Option<u8>) -> Self {
        Self { mint, decimals }
    }
}

/// Raw liquidity held by a position in a single bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinLiquidity {
    pub bin_id: BinId,
    pub amount_x: u128,
    pub amount_y: u128,
}

/// Immutable read of one position, taken fresh every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// Position this snapshot describes.
    pub position: PositionHandle,
    /// Pool the position lives in.
    pub pool: PoolHandle,
    /// Bins covered by the position.
    pub range: BinRange,
    /// Market-reported active bin.
    pub active_bin: BinId,
    /// Per-bin raw liquidity.
    pub bins: Vec<BinLiquidity>,
    /// Accrued unclaimed fee, token X (raw).
    pub fee_x: u128,
    /// Accrued unclaimed fee, token Y (raw).
    pub fee_y: u128,
    pub token_x: TokenInfo,
    pub token_y: TokenInfo,
}

impl PositionSnapshot {
    /// Total raw token X across all bins. Saturates instead of wrapping.
    pub fn amount_x(&self) -> u128 {
        self.bins
            .iter()
            .fold(0u128, |acc, b| acc.saturating_add(b.amount_x))
    }

    /// Total raw token Y across all bins. Saturates instead of wrapping.
    pub fn amount_y(&self) -> u128 {
        self.bins
            .iter()
            .fold(0u128, |acc, b| acc.saturating_add(b.amount_y))
    }

    /// Both decimals, if known.
    pub fn decimals(&self) -> Option<(u8, u8)> {
        Some((self.token_x.decimals?, self.token_y.decimals?))
    }
}
