//! Position logic for the DLMM monitor.
//!
//! Everything the control loop decides on lives here; the loop itself only
//! sequences these pieces.
//!
//! # Key Components
//!
//! - [`Valuation`]: USD value of a snapshot at given unit prices
//! - [`classify`] / [`RangeStatus`]: active bin versus position range
//! - [`RebalanceCoordinator`]: recenters on breach and merges the result
//! - [`ExitConfig`] / [`ExitDecision`]: take-profit and stop-loss rules
//! - [`MonitorState`]: running totals owned by the loop
//! - [`DecimalsCache`]: token decimals resolved once per run
//! - [`Venue`]: the collaborator traits the loop talks to
//! - [`MockVenue`]: scripted venue for tests

pub mod decimals;
pub mod error;
pub mod exit;
pub mod mock;
pub mod range;
pub mod rebalance;
pub mod state;
pub mod valuation;
pub mod venue;

pub use decimals::DecimalsCache;
pub use error::{PositionError, PositionResult};
pub use exit::{evaluate, pnl_percent, ExitConfig, ExitDecision, ExitTrigger};
pub use mock::MockVenue;
pub use range::{bins_from_edges, classify, RangeStatus};
pub use rebalance::{RebalanceCoordinator, RebalanceOutcome};
pub use state::{MonitorState, TerminationReason};
pub use valuation::Valuation;
pub use venue::{
    DynLiquidator, DynPositionSource, DynPriceSource, DynRecenter, Liquidator, PositionSource,
    PriceSource, Recenter, RecenterOutcome, Venue, VenueError, VenueResult,
};
