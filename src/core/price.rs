//! Pricing abstractions and core types

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::asset::AssetId;
use crate::core::error::UpstreamError;

/// A point-in-time price reading for a set of assets, in a fixed quote
/// currency. A snapshot is never mutated after a cycle produces it; merging
/// during construction consumes both inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub prices: BTreeMap<AssetId, f64>,
    pub captured_at: DateTime<Utc>,
}

impl PriceSnapshot {
    pub fn new(prices: BTreeMap<AssetId, f64>, captured_at: DateTime<Utc>) -> Self {
        PriceSnapshot {
            prices,
            captured_at,
        }
    }

    pub fn empty(captured_at: DateTime<Utc>) -> Self {
        PriceSnapshot {
            prices: BTreeMap::new(),
            captured_at,
        }
    }

    pub fn price(&self, id: &AssetId) -> Option<f64> {
        self.prices.get(id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Combine two snapshots into one, keeping the older capture timestamp.
    /// Entries from `other` win on key collision.
    pub fn merge(mut self, other: PriceSnapshot) -> Self {
        self.prices.extend(other.prices);
        self.captured_at = self.captured_at.min(other.captured_at);
        self
    }
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Fetch current prices for a deduplicated set of asset ids. Ids unknown
    /// to the upstream are simply absent from the result, not an error.
    async fn fetch_prices(&self, ids: &BTreeSet<AssetId>) -> Result<PriceSnapshot, UpstreamError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn snapshot_with(entries: &[(&str, f64)], captured_at: DateTime<Utc>) -> PriceSnapshot {
        let prices = entries
            .iter()
            .map(|(id, price)| (AssetId::new(id), *price))
            .collect();
        PriceSnapshot::new(prices, captured_at)
    }

    #[test]
    fn test_price_lookup_uses_normalized_id() {
        let now = Utc::now();
        let snapshot = snapshot_with(&[("bitcoin", 50000.0)], now);
        assert_eq!(snapshot.price(&AssetId::new(" Bitcoin ")), Some(50000.0));
        assert_eq!(snapshot.price(&AssetId::new("solana")), None);
    }

    #[test]
    fn test_merge_keeps_oldest_timestamp_and_newer_entries() {
        let older = Utc::now() - Duration::seconds(20);
        let newer = Utc::now();
        let cached = snapshot_with(&[("bitcoin", 49000.0)], older);
        let fetched = snapshot_with(&[("bitcoin", 50000.0), ("ethereum", 3000.0)], newer);

        let merged = cached.merge(fetched);
        assert_eq!(merged.captured_at, older);
        assert_eq!(merged.price(&AssetId::new("bitcoin")), Some(50000.0));
        assert_eq!(merged.price(&AssetId::new("ethereum")), Some(3000.0));
        assert_eq!(merged.len(), 2);
    }
}
