//! Position valuation.
//!
//! Converts the raw token amounts and unclaimed fees of a
//! [`PositionSnapshot`] into USD using one unit price per token. Both
//! valuation points of a tick (before and after a rebalance) go through
//! [`Valuation::compute`].

use serde::Serialize;

use dlmm_core::{AssetId, PositionSnapshot, Price, TokenAmount, UsdValue};

use crate::error::{PositionError, PositionResult};

/// USD value of a position at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Valuation {
    /// Token X held across all bins.
    pub amount_x: TokenAmount,
    /// Token Y held across all bins.
    pub amount_y: TokenAmount,
    /// Value of the liquidity itself.
    pub liquidity_usd: UsdValue,
    /// Value of the unclaimed fees.
    pub fees_usd: UsdValue,
    /// `liquidity_usd + fees_usd`.
    pub total_usd: UsdValue,
}

impl Valuation {
    /// Value `snapshot` at the given unit prices.
    ///
    /// Pure function of its inputs. Requires both token decimals to be known
    /// and both prices to be strictly positive.
    ///
    /// # Errors
    /// - `InvalidPrice` for a non-positive price
    /// - `DecimalsUnknown` when the snapshot lacks a decimal precision
    /// - `ValuationOverflow` when the arithmetic leaves decimal range
    pub fn compute(
        snapshot: &PositionSnapshot,
        price_x: Price,
        price_y: Price,
    ) -> PositionResult<Self> {
        ensure_positive(&snapshot.token_x.mint, price_x)?;
        ensure_positive(&snapshot.token_y.mint, price_y)?;

        let dx = snapshot
            .token_x
            .decimals
            .ok_or_else(|| PositionError::DecimalsUnknown(snapshot.token_x.mint.clone()))?;
        let dy = snapshot
            .token_y
            .decimals
            .ok_or_else(|| PositionError::DecimalsUnknown(snapshot.token_y.mint.clone()))?;

        let amount_x = TokenAmount::from_raw(snapshot.amount_x(), dx)?;
        let amount_y = TokenAmount::from_raw(snapshot.amount_y(), dy)?;
        let fee_x = TokenAmount::from_raw(snapshot.fee_x, dx)?;
        let fee_y = TokenAmount::from_raw(snapshot.fee_y, dy)?;

        let liquidity_usd = pair_value(amount_x, price_x, amount_y, price_y, "liquidity_usd")?;
        let fees_usd = pair_value(fee_x, price_x, fee_y, price_y, "fees_usd")?;
        let total_usd = liquidity_usd
            .checked_add(fees_usd)
            .ok_or(PositionError::ValuationOverflow("total_usd"))?;

        Ok(Self {
            amount_x,
            amount_y,
            liquidity_usd,
            fees_usd,
            total_usd,
        })
    }
}

fn ensure_positive(mint: &AssetId, price: Price) -> PositionResult<()> {
    if price.is_positive() {
        Ok(())
    } else {
        Err(PositionError::InvalidPrice {
            mint: mint.clone(),
            price,
        })
    }
}

fn pair_value(
    x: TokenAmount,
    price_x: Price,
    y: TokenAmount,
    price_y: Price,
    what: &'static str,
) -> PositionResult<UsdValue> {
    let vx = x
        .value_at(price_x)
        .ok_or(PositionError::ValuationOverflow(what))?;
    let vy = y
        .value_at(price_y)
        .ok_or(PositionError::ValuationOverflow(what))?;
    vx.checked_add(vy)
        .ok_or(PositionError::ValuationOverflow(what))
}
