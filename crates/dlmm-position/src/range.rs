//! Range monitoring.
//!
//! Classifies the market's active bin against the bins covered by the
//! position. A breach means the price has left the range completely; being
//! on an edge bin is still inside. There is no buffer and no smoothing
//! across ticks.

use serde::Serialize;
use std::fmt;

use dlmm_core::{BinId, BinRange, RebalanceDirection};

/// Where the active bin sits relative to the position range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RangeStatus {
    Inside,
    BreachedBelow,
    BreachedAbove,
}

impl RangeStatus {
    #[inline]
    pub fn is_breached(&self) -> bool {
        !matches!(self, Self::Inside)
    }

    /// Direction a rebalance must follow, if any.
    #[inline]
    pub fn direction(&self) -> Option<RebalanceDirection> {
        match self {
            Self::Inside => None,
            Self::BreachedBelow => Some(RebalanceDirection::Down),
            Self::BreachedAbove => Some(RebalanceDirection::Up),
        }
    }
}

impl fmt::Display for RangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inside => write!(f, "inside"),
            Self::BreachedBelow => write!(f, "breached_below"),
            Self::BreachedAbove => write!(f, "breached_above"),
        }
    }
}

/// Classify `active` against `range`.
#[inline]
pub fn classify(active: BinId, range: &BinRange) -> RangeStatus {
    if active < range.lower() {
        RangeStatus::BreachedBelow
    } else if active > range.upper() {
        RangeStatus::BreachedAbove
    } else {
        RangeStatus::Inside
    }
}

/// Distance in bins from `active` to the lower and upper edges.
///
/// `None` when `active` is outside the range.
pub fn bins_from_edges(active: BinId, range: &BinRange) -> Option<(u32, u32)> {
    if !range.contains(active) {
        return None;
    }
    let from_lower = (i64::from(active.0) - i64::from(range.lower().0)) as u32;
    let from_upper = (i64::from(range.upper().0) - i64::from(active.0)) as u32;
    Some((from_lower, from_upper))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(lower: i32, upper: i32) -> BinRange {
        BinRange::new(BinId(lower), BinId(upper)).unwrap()
    }

    #[test]
    fn test_breached_below() {
        // lower=100, upper=120, active=99
        assert_eq!(classify(BinId(99), &range(100, 120)), RangeStatus::BreachedBelow);
    }

    #[test]
    fn test_breached_above() {
        assert_eq!(classify(BinId(121), &range(100, 120)), RangeStatus::BreachedAbove);
    }

    #[test]
    fn test_edges_are_inside() {
        let r = range(100, 120);
        assert_eq!(classify(BinId(100), &r), RangeStatus::Inside);
        assert_eq!(classify(BinId(120), &r), RangeStatus::Inside);
        assert_eq!(classify(BinId(110), &r), RangeStatus::Inside);
    }

    #[test]
    fn test_single_bin_range() {
        let r = range(-3, -3);
        assert_eq!(classify(BinId(-4), &r), RangeStatus::BreachedBelow);
        assert_eq!(classify(BinId(-3), &r), RangeStatus::Inside);
        assert_eq!(classify(BinId(-2), &r), RangeStatus::BreachedAbove);
    }

    #[test]
    fn test_classification_is_total_and_exclusive() {
        let ranges = [range(-50, -10), range(0, 0), range(100, 120), range(i32::MIN, i32::MAX)];
        for r in &ranges {
            for active in [i32::MIN, -51, -50, -10, -9, -1, 0, 1, 99, 100, 120, 121, i32::MAX] {
                let active = BinId(active);
                let status = classify(active, r);
                let below = active < r.lower();
                let above = active > r.upper();
                let inside = r.contains(active);
                // Exactly one predicate holds and it matches the classification.
                assert_eq!([below, above, inside].iter().filter(|b| **b).count(), 1);
                match status {
                    RangeStatus::BreachedBelow => assert!(below),
                    RangeStatus::BreachedAbove => assert!(above),
                    RangeStatus::Inside => assert!(inside),
                }
            }
        }
    }

    #[test]
    fn test_direction_mapping() {
        assert_eq!(RangeStatus::Inside.direction(), None);
        assert_eq!(
            RangeStatus::BreachedBelow.direction(),
            Some(RebalanceDirection::Down)
        );
        assert_eq!(
            RangeStatus::BreachedAbove.direction(),
            Some(RebalanceDirection::Up)
        );
    }

    #[test]
    fn test_bins_from_edges() {
        let r = range(100, 120);
        assert_eq!(bins_from_edges(BinId(105), &r), Some((5, 15)));
        assert_eq!(bins_from_edges(BinId(100), &r), Some((0, 20)));
        assert_eq!(bins_from_edges(BinId(99), &r), None);
    }
}
