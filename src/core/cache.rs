//! Price cache abstraction

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::time::Duration;

use crate::core::asset::AssetId;
use crate::core::price::PriceSnapshot;

/// TTL-bounded store of last-known price-per-asset. Decouples the
/// alert-check frequency from upstream rate limits.
///
/// The cache is an optimization, never a source of truth: implementations
/// swallow backend failures and report them as misses, and callers must
/// treat any id absent from `get`'s result as requiring a fetch.
#[async_trait]
pub trait PriceCache: Send + Sync {
    /// Return a partial snapshot covering only the requested ids whose
    /// freshness invariant still holds. The snapshot's capture timestamp is
    /// the oldest contributing entry.
    async fn get(&self, ids: &BTreeSet<AssetId>) -> PriceSnapshot;

    /// Store every entry of the snapshot with the given TTL, overwriting
    /// existing entries unconditionally.
    async fn put(&self, snapshot: &PriceSnapshot, ttl: Duration);
}
