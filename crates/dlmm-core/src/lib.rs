//! Core domain types for the DLMM position monitor.
//!
//! This crate provides fundamental types used throughout the monitor:
//! - `Price`, `TokenAmount`, `UsdValue`: Precision-safe numeric types
//! - `BinId`, `BinRange`: Discretized price bins and position ranges
//! - `PositionSnapshot`: Per-tick read of a position
//! - `StrategyParams`: Sizing and shape of a position

pub mod bin_range;
pub mod decimal;
pub mod error;
pub mod strategy;
pub mod types;

pub use bin_range::{BinId, BinRange};
pub use decimal::{Price, TokenAmount, UsdValue, MAX_TOKEN_DECIMALS};
pub use error::{CoreError, CoreResult};
pub use strategy::{RebalanceDirection, StrategyKind, StrategyParams, SwaplessConfig, TokenRatio};
pub use types::{AssetId, BinLiquidity, PoolHandle, PositionHandle, PositionSnapshot, TokenInfo};
