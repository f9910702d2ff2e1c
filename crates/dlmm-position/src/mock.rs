//! Scripted venue for tests.
//!
//! Every response queue replays its items in order and then keeps returning
//! the last one. Calls are recorded for verification.

use std::collections::{HashMap, VecDeque};

use futures_util::future::BoxFuture;
use parking_lot::Mutex;

use dlmm_core::{
    AssetId, PoolHandle, PositionHandle, PositionSnapshot, Price, RebalanceDirection,
    StrategyParams,
};

use crate::venue::{
    Liquidator, PositionSource, PriceSource, Recenter, RecenterOutcome, VenueError, VenueResult,
};

/// Response queue whose last entry persists.
#[derive(Debug)]
struct Script<T: Clone> {
    items: VecDeque<T>,
}

impl<T: Clone> Script<T> {
    fn new() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }

    fn push(&mut self, item: T) {
        self.items.push_back(item);
    }

    fn next(&mut self) -> Option<T> {
        if self.items.len() > 1 {
            self.items.pop_front()
        } else {
            self.items.front().cloned()
        }
    }
}

/// Mock venue implementing every collaborator trait.
#[derive(Debug)]
pub struct MockVenue {
    snapshots: Mutex<Script<VenueResult<Option<PositionSnapshot>>>>,
    prices: Mutex<HashMap<AssetId, Script<VenueResult<Price>>>>,
    decimals: Mutex<HashMap<AssetId, u8>>,
    recenters: Mutex<Script<VenueResult<Option<RecenterOutcome>>>>,
    close_result: Mutex<VenueResult<()>>,

    snapshot_calls: Mutex<Vec<PositionHandle>>,
    decimals_calls: Mutex<Vec<AssetId>>,
    recenter_calls: Mutex<Vec<(PositionHandle, RebalanceDirection)>>,
    close_calls: Mutex<Vec<PositionHandle>>,
}

impl Default for MockVenue {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVenue {
    pub fn new() -> Self {
        Self {
            snapshots: Mutex::new(Script::new()),
            prices: Mutex::new(HashMap::new()),
            decimals: Mutex::new(HashMap::new()),
            recenters: Mutex::new(Script::new()),
            close_result: Mutex::new(Ok(())),
            snapshot_calls: Mutex::new(Vec::new()),
            decimals_calls: Mutex::new(Vec::new()),
            recenter_calls: Mutex::new(Vec::new()),
            close_calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a snapshot response.
    pub fn push_snapshot(&self, result: VenueResult<Option<PositionSnapshot>>) {
        self.snapshots.lock().push(result);
    }

    /// Queue a price response for `mint`.
    pub fn push_price(&self, mint: &AssetId, result: VenueResult<Price>) {
        self.prices
            .lock()
            .entry(mint.clone())
            .or_insert_with(Script::new)
            .push(result);
    }

    /// Register the decimals returned for `mint`.
    pub fn set_decimals(&self, mint: &AssetId, decimals: u8) {
        self.decimals.lock().insert(mint.clone(), decimals);
    }

    /// Queue a recenter response.
    pub fn push_recenter(&self, result: VenueResult<Option<RecenterOutcome>>) {
        self.recenters.lock().push(result);
    }

    pub fn set_close_result(&self, result: VenueResult<()>) {
        *self.close_result.lock() = result;
    }

    pub fn snapshot_calls(&self) -> Vec<PositionHandle> {
        self.snapshot_calls.lock().clone()
    }

    pub fn decimals_calls(&self) -> Vec<AssetId> {
        self.decimals_calls.lock().clone()
    }

    pub fn recenter_calls(&self) -> Vec<(PositionHandle, RebalanceDirection)> {
        self.recenter_calls.lock().clone()
    }

    pub fn close_calls(&self) -> Vec<PositionHandle> {
        self.close_calls.lock().clone()
    }
}

impl PositionSource for MockVenue {
    fn fetch_snapshot<'a>(
        &'a self,
        position: &'a PositionHandle,
        _pool: &'a PoolHandle,
    ) -> BoxFuture<'a, VenueResult<Option<PositionSnapshot>>> {
        Box::pin(async move {
            self.snapshot_calls.lock().push(position.clone());
            self.snapshots
                .lock()
                .next()
                .unwrap_or(Err(VenueError::Rpc("no snapshot scripted".to_string())))
        })
    }

    fn fetch_decimals<'a>(&'a self, mint: &'a AssetId) -> BoxFuture<'a, VenueResult<u8>> {
        Box::pin(async move {
            self.decimals_calls.lock().push(mint.clone());
            self.decimals
                .lock()
                .get(mint)
                .copied()
                .ok_or_else(|| VenueError::Rpc(format!("unknown mint {mint}")))
        })
    }
}

impl PriceSource for MockVenue {
    fn fetch_price<'a>(&'a self, mint: &'a AssetId) -> BoxFuture<'a, VenueResult<Price>> {
        Box::pin(async move {
            self.prices
                .lock()
                .get_mut(mint)
                .and_then(Script::next)
                .unwrap_or_else(|| Err(VenueError::PriceUnavailable(mint.clone())))
        })
    }
}

impl Recenter for MockVenue {
    fn recenter<'a>(
        &'a self,
        position: &'a PositionHandle,
        _strategy: &'a StrategyParams,
        direction: RebalanceDirection,
    ) -> BoxFuture<'a, VenueResult<Option<RecenterOutcome>>> {
        Box::pin(async move {
            self.recenter_calls
                .lock()
                .push((position.clone(), direction));
            self.recenters.lock().next().unwrap_or(Ok(None))
        })
    }
}

impl Liquidator for MockVenue {
    fn close_and_liquidate<'a>(
        &'a self,
        position: &'a PositionHandle,
    ) -> BoxFuture<'a, VenueResult<()>> {
        Box::pin(async move {
            self.close_calls.lock().push(position.clone());
            self.close_result.lock().clone()
        })
    }
}
