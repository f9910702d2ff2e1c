//! Error types for dlmm-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Invalid bin range: lower {lower} > upper {upper}")]
    InvalidRange { lower: i32, upper: i32 },

    #[error("Unsupported token decimals: {0}")]
    InvalidDecimals(u8),

    #[error("Raw amount {0} exceeds decimal precision")]
    AmountOverflow(u128),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for core operations.
pub type CoreResult<T> = std::result::Result<T, CoreError>;
