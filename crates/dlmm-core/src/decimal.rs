//! Precision-safe decimal types for position valuation.
//!
//! Uses `rust_decimal` for exact decimal arithmetic. Raw on-chain integer
//! amounts become [`TokenAmount`]s, which multiplied by a [`Price`] give a
//! [`UsdValue`]. Every operation that can overflow is checked and reports
//! `None`/`Err` instead of panicking.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// Largest scale `rust_decimal` can represent.
pub const MAX_TOKEN_DECIMALS: u8 = 28;

/// Unit price of a token quoted in USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(pub Decimal);

impl Price {
    pub const ZERO: Self = Self(Decimal::ZERO);
    pub const ONE: Self = Self(Decimal::ONE);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Strictly greater than zero. Only positive prices are usable for valuation.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Build a price from a floating point quote, rejecting NaN, infinities and
    /// non-positive values.
    pub fn from_quote(quote: f64) -> CoreResult<Self> {
        if !quote.is_finite() {
            return Err(CoreError::InvalidPrice(format!("non-finite quote {quote}")));
        }
        let value = Decimal::try_from(quote)
            .map_err(|e| CoreError::InvalidPrice(format!("unrepresentable quote {quote}: {e}")))?;
        let price = Self(value);
        if !price.is_positive() {
            return Err(CoreError::InvalidPrice(format!("non-positive quote {quote}")));
        }
        Ok(price)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for Price {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

/// Human-scale token quantity (raw amount shifted by the mint's decimals).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenAmount(pub Decimal);

impl TokenAmount {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    /// Scale a raw integer amount by `10^-decimals`.
    ///
    /// Fails when `decimals` exceeds [`MAX_TOKEN_DECIMALS`] or the raw amount
    /// does not fit in the 96-bit decimal mantissa.
    pub fn from_raw(raw: u128, decimals: u8) -> CoreResult<Self> {
        if decimals > MAX_TOKEN_DECIMALS {
            return Err(CoreError::InvalidDecimals(decimals));
        }
        let signed = i128::try_from(raw).map_err(|_| CoreError::AmountOverflow(raw))?;
        Decimal::try_from_i128_with_scale(signed, u32::from(decimals))
            .map(Self)
            .map_err(|_| CoreError::AmountOverflow(raw))
    }

    /// USD value of this quantity at `price`. `None` on overflow.
    #[inline]
    pub fn value_at(&self, price: Price) -> Option<UsdValue> {
        self.0.checked_mul(price.0).map(UsdValue)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monetary amount in USD.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UsdValue(pub Decimal);

impl UsdValue {
    pub const ZERO: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    #[inline]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    #[inline]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    /// Percentage difference from `base`: `(self - base) / base * 100`.
    ///
    /// Returns `None` when `base` is zero or the arithmetic overflows.
    #[inline]
    pub fn pct_from(&self, base: UsdValue) -> Option<Decimal> {
        if base.is_zero() {
            return None;
        }
        self.0
            .checked_sub(base.0)?
            .checked_div(base.0)?
            .checked_mul(Decimal::ONE_HUNDRED)
    }
}

impl fmt::Display for UsdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UsdValue {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

impl From<Decimal> for UsdValue {
    fn from(d: Decimal) -> Self {
        Self(d)
    }
}

impl Add for UsdValue {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for UsdValue {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for UsdValue {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Sum for UsdValue {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}
