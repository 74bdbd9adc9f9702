use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::core::alert::{AlertRule, NewAlertRule, TriggeredRecord};
use crate::core::asset::AssetId;
use crate::core::cache::PriceCache;
use crate::core::error::StoreError;
use crate::core::price::PriceSnapshot;
use crate::core::store::RuleStore;

struct CacheEntry {
    price: f64,
    cached_at: DateTime<Utc>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// In-memory TTL price cache backed by HashMap and Mutex.
pub struct MemoryPriceCache {
    inner: Arc<Mutex<HashMap<AssetId, CacheEntry>>>,
}

impl MemoryPriceCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for MemoryPriceCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceCache for MemoryPriceCache {
    async fn get(&self, ids: &BTreeSet<AssetId>) -> PriceSnapshot {
        let cache = self.inner.lock().await;
        let mut prices = BTreeMap::new();
        let mut oldest: Option<DateTime<Utc>> = None;

        for id in ids {
            if let Some(entry) = cache.get(id) {
                if entry.is_fresh() {
                    prices.insert(id.clone(), entry.price);
                    oldest = Some(match oldest {
                        Some(ts) => ts.min(entry.cached_at),
                        None => entry.cached_at,
                    });
                }
            }
        }

        debug!(
            fresh = prices.len(),
            missing = ids.len() - prices.len(),
            "price cache lookup"
        );
        PriceSnapshot::new(prices, oldest.unwrap_or_else(Utc::now))
    }

    async fn put(&self, snapshot: &PriceSnapshot, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        let mut cache = self.inner.lock().await;
        for (id, price) in &snapshot.prices {
            cache.insert(
                id.clone(),
                CacheEntry {
                    price: *price,
                    cached_at: snapshot.captured_at,
                    expires_at,
                },
            );
        }
        debug!(entries = snapshot.len(), "price cache put");
    }
}

/// In-memory rule store; used by tests and ephemeral runs.
pub struct MemoryRuleStore {
    rules: RwLock<HashMap<Uuid, AlertRule>>,
    history: RwLock<HashMap<Uuid, Vec<TriggeredRecord>>>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            history: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn create_rule(&self, new_rule: NewAlertRule) -> Result<AlertRule, StoreError> {
        let rule = AlertRule {
            id: Uuid::new_v4(),
            owner: new_rule.owner,
            asset: new_rule.asset,
            kind: new_rule.kind,
            threshold: new_rule.threshold,
            enabled: true,
            created_at: Utc::now(),
        };
        debug!(rule_id = %rule.id, asset = %rule.asset, "rule created");
        self.rules.write().unwrap().insert(rule.id, rule.clone());
        Ok(rule)
    }

    async fn list_enabled_rules(&self, owner: Option<&str>) -> Result<Vec<AlertRule>, StoreError> {
        let rules = self.rules.read().unwrap();
        let mut enabled: Vec<AlertRule> = rules
            .values()
            .filter(|rule| rule.enabled)
            .filter(|rule| owner.is_none_or(|o| rule.owner == o))
            .cloned()
            .collect();
        enabled.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(enabled)
    }

    async fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<(), StoreError> {
        let mut rules = self.rules.write().unwrap();
        let rule = rules.get_mut(&id).ok_or(StoreError::RuleNotFound(id))?;
        rule.enabled = enabled;
        Ok(())
    }

    async fn append_history(&self, id: Uuid, price: f64) -> Result<(), StoreError> {
        if !self.rules.read().unwrap().contains_key(&id) {
            return Err(StoreError::RuleNotFound(id));
        }
        let record = TriggeredRecord {
            rule_id: id,
            price,
            triggered_at: Utc::now(),
        };
        self.history.write().unwrap().entry(id).or_default().push(record);
        Ok(())
    }

    async fn list_history(&self, id: Uuid) -> Result<Vec<TriggeredRecord>, StoreError> {
        if !self.rules.read().unwrap().contains_key(&id) {
            return Err(StoreError::RuleNotFound(id));
        }
        Ok(self
            .history
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }
}
