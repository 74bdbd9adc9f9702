//! Price monitoring loop.
//!
//! One task drives evaluation cycles at a fixed period. Cycles never
//! overlap: the next tick is delayed until the current cycle finishes
//! (fixed-delay, not fixed-rate), so broadcasts stay ordered by cycle
//! start time and the cache sees one writer at a time.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::core::asset::AssetId;
use crate::core::cache::PriceCache;
use crate::core::error::CycleError;
use crate::core::evaluate::evaluate;
use crate::core::price::PriceProvider;
use crate::core::store::RuleStore;
use crate::server::broadcast::Broadcaster;

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub poll_interval: Duration,
    pub cache_ttl: Duration,
}

/// What one cycle did; returned for logging and tests.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    pub rules: usize,
    pub assets: usize,
    pub fetched: usize,
    pub fired: usize,
}

pub struct Monitor {
    store: Arc<dyn RuleStore>,
    provider: Arc<dyn PriceProvider>,
    cache: Arc<dyn PriceCache>,
    broadcaster: Arc<Broadcaster>,
    config: MonitorConfig,
}

impl Monitor {
    pub fn new(
        store: Arc<dyn RuleStore>,
        provider: Arc<dyn PriceProvider>,
        cache: Arc<dyn PriceCache>,
        broadcaster: Arc<Broadcaster>,
        config: MonitorConfig,
    ) -> Self {
        Self {
            store,
            provider,
            cache,
            broadcaster,
            config,
        }
    }

    /// Run cycles forever. A failed cycle is logged and retried on the
    /// next tick; it never takes the loop down.
    pub async fn run(&self) {
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            cache_ttl_s = self.config.cache_ttl.as_secs(),
            "price monitor started"
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match self.run_cycle().await {
                Ok(outcome) if outcome.fired > 0 => {
                    info!(
                        rules = outcome.rules,
                        fired = outcome.fired,
                        "price check cycle fired alerts"
                    );
                }
                Ok(outcome) => {
                    debug!(rules = outcome.rules, assets = outcome.assets, "price check cycle done");
                }
                Err(e) => {
                    warn!(error = %e, "price check cycle failed");
                }
            }
        }
    }

    /// One evaluation cycle: load rules, assemble a snapshot (cache first,
    /// fetch the rest), evaluate, broadcast, then apply per-rule effects.
    ///
    /// Per-rule effects run rule-by-rule so a late store failure only
    /// affects rules not yet processed. Any error before the snapshot
    /// broadcast aborts the cycle without broadcasting.
    pub async fn run_cycle(&self) -> Result<CycleOutcome, CycleError> {
        let rules = self.store.list_enabled_rules(None).await?;
        let ids: BTreeSet<AssetId> = rules.iter().map(|rule| rule.asset.clone()).collect();
        if ids.is_empty() {
            debug!("no enabled rules, skipping price check");
            return Ok(CycleOutcome::default());
        }

        let mut snapshot = self.cache.get(&ids).await;
        let missing: BTreeSet<AssetId> = ids
            .iter()
            .filter(|id| snapshot.price(id).is_none())
            .cloned()
            .collect();
        let fetched = missing.len();
        if !missing.is_empty() {
            let fresh = self.provider.fetch_prices(&missing).await?;
            self.cache.put(&fresh, self.config.cache_ttl).await;
            snapshot = snapshot.merge(fresh);
        }

        let fired = evaluate(&snapshot, &rules);

        // Snapshot first: within a cycle, trigger events always follow the
        // snapshot they were derived from.
        self.broadcaster.publish_snapshot(&snapshot);

        for alert in &fired {
            let event = alert.to_event();
            info!(asset = %event.asset, price = event.price, rule_id = %event.rule_id, "{}", event.message);
            self.broadcaster.publish_trigger(&event);
            self.store.append_history(alert.rule.id, alert.price).await?;
            self.store.set_enabled(alert.rule.id, false).await?;
        }

        Ok(CycleOutcome {
            rules: rules.len(),
            assets: ids.len(),
            fetched,
            fired: fired.len(),
        })
    }
}
