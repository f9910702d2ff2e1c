//! Bin identification for discretized-liquidity pools.
//!
//! A DLMM pool partitions its price axis into bins. A position covers a
//! contiguous, inclusive span of bins described by [`BinRange`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// Bin index reported by the pool. Can be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BinId(pub i32);

impl BinId {
    #[inline]
    pub fn new(id: i32) -> Self {
        Self(id)
    }

    #[inline]
    pub fn index(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for BinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for BinId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

/// Inclusive span of bins covered by a position. `lower <= upper` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BinRange {
    lower: BinId,
    upper: BinId,
}

impl BinRange {
    /// Create a range, rejecting `lower > upper`.
    pub fn new(lower: BinId, upper: BinId) -> CoreResult<Self> {
        if lower > upper {
            return Err(CoreError::InvalidRange {
                lower: lower.0,
                upper: upper.0,
            });
        }
        Ok(Self { lower, upper })
    }

    /// Range of `width` bins with `active` placed `below` bins above the lower edge.
    ///
    /// Used to lay out a fresh position around the active bin.
    pub fn around(active: BinId, below: u32, width: u32) -> CoreResult<Self> {
        let width = width.max(1);
        let below = below.min(width - 1);
        let lower = i64::from(active.0) - i64::from(below);
        let upper = lower + i64::from(width) - 1;
        let lower = i32::try_from(lower)
            .map_err(|_| CoreError::InvalidConfig(format!("bin {lower} out of range")))?;
        let upper = i32::try_from(upper)
            .map_err(|_| CoreError::InvalidConfig(format!("bin {upper} out of range")))?;
        Self::new(BinId(lower), BinId(upper))
    }

    #[inline]
    pub fn lower(&self) -> BinId {
        self.lower
    }

    #[inline]
    pub fn upper(&self) -> BinId {
        self.upper
    }

    /// Number of bins covered.
    #[inline]
    pub fn width(&self) -> u32 {
        (i64::from(self.upper.0) - i64::from(self.lower.0) + 1) as u32
    }

    #[inline]
    pub fn contains(&self, bin: BinId) -> bool {
        bin >= self.lower && bin <= self.upper
    }
}

impl fmt::Display for BinRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

impl<'de> Deserialize<'de> for BinRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            lower: BinId,
            upper: BinId,
        }

        let raw = Raw::deserialize(deserializer)?;
        BinRange::new(raw.lower, raw.upper).map_err(serde::de::Error::custom)
    }
}
