//! Per-run token decimals cache.

use std::collections::HashMap;

use tracing::debug;

use dlmm_core::{AssetId, PositionSnapshot, TokenInfo};

use crate::error::PositionResult;
use crate::venue::PositionSource;

/// Token decimals resolved during one run.
///
/// A mint is looked up at most once. Decimals carried by a snapshot seed the
/// cache without a lookup.
#[derive(Debug, Default, Clone)]
pub struct DecimalsCache {
    known: HashMap<AssetId, u8>,
}

impl DecimalsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, mint: &AssetId) -> Option<u8> {
        self.known.get(mint).copied()
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }

    /// Fill in both token decimals of `snapshot`.
    ///
    /// # Errors
    /// Propagates the lookup error on a cache miss. The cache is left
    /// unchanged for that mint so the next tick retries.
    pub async fn resolve(
        &mut self,
        source: &dyn PositionSource,
        snapshot: &mut PositionSnapshot,
    ) -> PositionResult<()> {
        self.resolve_token(source, &mut snapshot.token_x).await?;
        self.resolve_token(source, &mut snapshot.token_y).await?;
        Ok(())
    }

    async fn resolve_token(
        &mut self,
        source: &dyn PositionSource,
        token: &mut TokenInfo,
    ) -> PositionResult<()> {
        if let Some(decimals) = token.decimals {
            self.known.entry(token.mint.clone()).or_insert(decimals);
            return Ok(());
        }
        if let Some(decimals) = self.get(&token.mint) {
            token.decimals = Some(decimals);
            return Ok(());
        }

        let decimals = source.fetch_decimals(&token.mint).await?;
        debug!(mint = %token.mint, decimals, "Resolved token decimals");
        self.known.insert(token.mint.clone(), decimals);
        token.decimals = Some(decimals);
        Ok(())
    }
}
