//! Position sizing and shape parameters.
//!
//! [`StrategyParams`] captures everything needed to open a position and to
//! re-derive an equivalent one after a rebalance: capital, token ratio, bin
//! span, pool, and liquidity distribution.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::bin_range::{BinId, BinRange};
use crate::error::{CoreError, CoreResult};
use crate::types::PoolHandle;

/// Liquidity distribution shape across the bin span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Uniform distribution.
    #[default]
    #[serde(alias = "Spot")]
    Spot,
    /// Concentrated around the active bin.
    #[serde(alias = "Curve")]
    Curve,
    /// Concentrated at the range edges.
    #[serde(alias = "BidAsk", alias = "bid_ask")]
    BidAsk,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spot => write!(f, "spot"),
            Self::Curve => write!(f, "curve"),
            Self::BidAsk => write!(f, "bidask"),
        }
    }
}

/// Direction the market moved out of the position range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RebalanceDirection {
    /// Active bin fell below the lower edge.
    Down,
    /// Active bin rose above the upper edge.
    Up,
}

impl fmt::Display for RebalanceDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down => write!(f, "DOWN"),
            Self::Up => write!(f, "UP"),
        }
    }
}

/// Share of capital allocated to token X. Token Y gets the remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenRatio {
    pub ratio_x: Decimal,
}

impl TokenRatio {
    /// Create a ratio, rejecting values outside `[0, 1]`.
    pub fn new(ratio_x: Decimal) -> CoreResult<Self> {
        if ratio_x < Decimal::ZERO || ratio_x > Decimal::ONE {
            return Err(CoreError::InvalidConfig(format!(
                "token ratio {ratio_x} outside [0, 1]"
            )));
        }
        Ok(Self { ratio_x })
    }

    #[inline]
    pub fn ratio_x(&self) -> Decimal {
        self.ratio_x
    }

    #[inline]
    pub fn ratio_y(&self) -> Decimal {
        Decimal::ONE - self.ratio_x
    }
}

impl Default for TokenRatio {
    fn default() -> Self {
        Self {
            ratio_x: Decimal::new(5, 1),
        }
    }
}

/// Single-sided rebalancing: re-deposit only the token the position ended up
/// holding, without swapping back to the target ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct SwaplessConfig {
    pub enabled: bool,
    /// Bin span used for single-sided positions.
    pub bin_span: u32,
}

impl Default for SwaplessConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bin_span: 15,
        }
    }
}

/// Original sizing and strategy parameters of a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Capital committed, denominated in the base asset.
    pub capital_amount: Decimal,
    pub token_ratio: TokenRatio,
    /// Number of bins the position spans.
    pub bin_span: u32,
    pub pool_address: PoolHandle,
    pub kind: StrategyKind,
    pub swapless: SwaplessConfig,
    /// Reinvest claimed fees into the next position.
    pub auto_compound: bool,
}

impl StrategyParams {
    /// Validate the parameters.
    pub fn validate(&self) -> CoreResult<()> {
        if self.capital_amount <= Decimal::ZERO {
            return Err(CoreError::InvalidConfig(format!(
                "capital amount must be positive, got {}",
                self.capital_amount
            )));
        }
        TokenRatio::new(self.token_ratio.ratio_x)?;
        if self.bin_span == 0 {
            return Err(CoreError::InvalidConfig("bin span must be > 0".to_string()));
        }
        if self.swapless.enabled && self.swapless.bin_span == 0 {
            return Err(CoreError::InvalidConfig(
                "swapless bin span must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Bins placed below the active bin: `floor(bin_span * ratio_x)`.
    pub fn bins_below(&self) -> u32 {
        let below = (Decimal::from(self.bin_span) * self.token_ratio.ratio_x()).floor();
        below.to_u32().unwrap_or(self.bin_span).min(self.bin_span)
    }

    /// Bin range for a position centered on `active`.
    ///
    /// With swapless rebalancing and a known direction, the position becomes
    /// single-sided: after a move down it holds token X and sits above the
    /// active bin; after a move up it holds token Y and sits below it.
    pub fn layout(
        &self,
        active: BinId,
        direction: Option<RebalanceDirection>,
    ) -> CoreResult<BinRange> {
        match direction {
            Some(dir) if self.swapless.enabled => {
                let span = self.swapless.bin_span;
                match dir {
                    RebalanceDirection::Down => BinRange::around(active, 0, span),
                    RebalanceDirection::Up => {
                        BinRange::around(active, span.saturating_sub(1), span)
                    }
                }
            }
            _ => BinRange::around(active, self.bins_below(), self.bin_span),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params() -> StrategyParams {
        StrategyParams {
            capital_amount: dec!(1.5),
            token_ratio: TokenRatio::new(dec!(0.5)).unwrap(),
            bin_span: 40,
            pool_address: PoolHandle::new("pool"),
            kind: StrategyKind::Spot,
            swapless: SwaplessConfig::default(),
            auto_compound: false,
        }
    }

    #[test]
    fn test_token_ratio_bounds() {
        assert!(TokenRatio::new(dec!(0)).is_ok());
        assert!(TokenRatio::new(dec!(1)).is_ok());
        assert!(TokenRatio::new(dec!(1.01)).is_err());
        assert!(TokenRatio::new(dec!(-0.1)).is_err());
        assert_eq!(TokenRatio::new(dec!(0.3)).unwrap().ratio_y(), dec!(0.7));
    }

    #[test]
    fn test_bins_below_floors() {
        let mut p = params();
        assert_eq!(p.bins_below(), 20);
        p.token_ratio = TokenRatio::new(dec!(0.33)).unwrap();
        // 40 * 0.33 = 13.2
        assert_eq!(p.bins_below(), 13);
        p.token_ratio = TokenRatio::new(dec!(1)).unwrap();
        assert_eq!(p.bins_below(), 40);
    }

    #[test]
    fn test_layout_two_sided() {
        let range = params().layout(BinId(100), Some(RebalanceDirection::Up)).unwrap();
        assert_eq!(range.lower(), BinId(80));
        assert_eq!(range.upper(), BinId(119));
    }

    #[test]
    fn test_layout_swapless_single_sided() {
        let mut p = params();
        p.swapless = SwaplessConfig {
            enabled: true,
            bin_span: 15,
        };

        let down = p.layout(BinId(100), Some(RebalanceDirection::Down)).unwrap();
        assert_eq!(down.lower(), BinId(100));
        assert_eq!(down.upper(), BinId(114));

        let up = p.layout(BinId(100), Some(RebalanceDirection::Up)).unwrap();
        assert_eq!(up.lower(), BinId(86));
        assert_eq!(up.upper(), BinId(100));

        // Without a direction the regular span applies.
        let initial = p.layout(BinId(100), None).unwrap();
        assert_eq!(initial.width(), 40);
    }

    #[test]
    fn test_validate() {
        assert!(params().validate().is_ok());

        let mut p = params();
        p.bin_span = 0;
        assert!(p.validate().is_err());

        let mut p = params();
        p.capital_amount = dec!(0);
        assert!(p.validate().is_err());

        let mut p = params();
        p.swapless = SwaplessConfig {
            enabled: true,
            bin_span: 0,
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_strategy_kind_aliases() {
        let kind: StrategyKind = serde_json::from_str("\"BidAsk\"").unwrap();
        assert_eq!(kind, StrategyKind::BidAsk);
        let kind: StrategyKind = serde_json::from_str("\"curve\"").unwrap();
        assert_eq!(kind, StrategyKind::Curve);
    }
}
