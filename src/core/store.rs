//! Rule store abstraction

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::alert::{AlertRule, NewAlertRule, TriggeredRecord};
use crate::core::error::StoreError;

/// Durable storage of alert rules and their triggered history.
///
/// Shared between the monitoring loop and the rule-submission path; a rule
/// created mid-cycle joins evaluation on the next cycle at the latest
/// (read-at-cycle-start semantics).
#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn create_rule(&self, new_rule: NewAlertRule) -> Result<AlertRule, StoreError>;

    /// Enabled rules, optionally filtered by owner, ordered by creation
    /// time. This order governs evaluation and emission order.
    async fn list_enabled_rules(&self, owner: Option<&str>) -> Result<Vec<AlertRule>, StoreError>;

    async fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<(), StoreError>;

    async fn append_history(&self, id: Uuid, price: f64) -> Result<(), StoreError>;

    /// Triggered records for one rule, oldest first.
    async fn list_history(&self, id: Uuid) -> Result<Vec<TriggeredRecord>, StoreError>;
}
