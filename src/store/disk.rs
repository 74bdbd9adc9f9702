use async_trait::async_trait;
use chrono::Utc;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use std::fmt::Display;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

use crate::core::alert::{AlertRule, NewAlertRule, TriggeredRecord};
use crate::core::error::StoreError;
use crate::core::store::RuleStore;

fn backend<E: Display>(e: E) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Durable rule store on an embedded fjall keyspace, one partition for
/// rules and one for triggered history. Records are JSON.
pub struct DiskRuleStore {
    _keyspace: Keyspace,
    rules: PartitionHandle,
    history: PartitionHandle,
}

impl DiskRuleStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path).map_err(backend)?;

        let keyspace = fjall::Config::new(path).open().map_err(backend)?;
        let rules = keyspace
            .open_partition("rules", PartitionCreateOptions::default())
            .map_err(backend)?;
        let history = keyspace
            .open_partition("history", PartitionCreateOptions::default())
            .map_err(backend)?;

        debug!(path = %path.display(), "opened rule store");
        Ok(Self {
            _keyspace: keyspace,
            rules,
            history,
        })
    }

    fn load_rule(&self, id: Uuid) -> Result<AlertRule, StoreError> {
        let bytes = self
            .rules
            .get(id.to_string())
            .map_err(backend)?
            .ok_or(StoreError::RuleNotFound(id))?;
        serde_json::from_slice(&bytes).map_err(backend)
    }

    fn save_rule(&self, rule: &AlertRule) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(rule).map_err(backend)?;
        self.rules.insert(rule.id.to_string(), bytes).map_err(backend)
    }
}

#[async_trait]
impl RuleStore for DiskRuleStore {
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
        self.save_rule(&rule)?;
        debug!(rule_id = %rule.id, asset = %rule.asset, "rule created");
        Ok(rule)
    }

    async fn list_enabled_rules(&self, owner: Option<&str>) -> Result<Vec<AlertRule>, StoreError> {
        let mut enabled = Vec::new();
        for kv in self.rules.iter() {
            let (_, value) = kv.map_err(backend)?;
            let rule: AlertRule = serde_json::from_slice(&value).map_err(backend)?;
            if rule.enabled && owner.is_none_or(|o| rule.owner == o) {
                enabled.push(rule);
            }
        }
        enabled.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(enabled)
    }

    async fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<(), StoreError> {
        let mut rule = self.load_rule(id)?;
        rule.enabled = enabled;
        self.save_rule(&rule)
    }

    async fn append_history(&self, id: Uuid, price: f64) -> Result<(), StoreError> {
        // Ensure the referenced rule exists before recording against it.
        self.load_rule(id)?;

        let record = TriggeredRecord {
            rule_id: id,
            price,
            triggered_at: Utc::now(),
        };
        // Keys sort by trigger time within the rule's prefix; the random
        // suffix keeps same-microsecond triggers from colliding.
        let key = format!(
            "{id}/{:020}-{}",
            record.triggered_at.timestamp_micros(),
            Uuid::new_v4().simple()
        );
        let bytes = serde_json::to_vec(&record).map_err(backend)?;
        self.history.insert(key, bytes).map_err(backend)
    }

    async fn list_history(&self, id: Uuid) -> Result<Vec<TriggeredRecord>, StoreError> {
        self.load_rule(id)?;

        let mut records = Vec::new();
        for kv in self.history.prefix(format!("{id}/")) {
            let (_, value) = kv.map_err(backend)?;
            let record: TriggeredRecord = serde_json::from_slice(&value).map_err(backend)?;
            records.push(record);
        }
        Ok(records)
    }
}
