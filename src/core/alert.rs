//! Alert rules and trigger events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::asset::AssetId;

/// Threshold comparison kind. Wire format matches the subscriber protocol
/// (`PRICE_ABOVE` / `PRICE_BELOW`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    PriceAbove,
    PriceBelow,
}

impl AlertKind {
    /// Strict comparison; equality never fires. An alert has "cross"
    /// semantics, not "reached" semantics.
    pub fn fires(&self, price: f64, threshold: f64) -> bool {
        match self {
            AlertKind::PriceAbove => price > threshold,
            AlertKind::PriceBelow => price < threshold,
        }
    }

    pub fn verb(&self) -> &'static str {
        match self {
            AlertKind::PriceAbove => "rose above",
            AlertKind::PriceBelow => "fell below",
        }
    }
}

/// A persisted threshold condition owned by a user. Mutated only by
/// disable-on-fire; the core never deletes rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: Uuid,
    pub owner: String,
    pub asset: AssetId,
    pub kind: AlertKind,
    pub threshold: f64,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Rule submission payload; the store assigns id, enabled flag, and
/// creation timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlertRule {
    pub owner: String,
    pub asset: AssetId,
    pub kind: AlertKind,
    pub threshold: f64,
}

/// Produced exactly once per firing; broadcast and persisted as history,
/// then discarded from live memory.
#[derive(Debug, Clone, Serialize)]
pub struct TriggerEvent {
    pub asset: AssetId,
    pub price: f64,
    pub message: String,
    pub rule_id: Uuid,
}

/// One row of a rule's triggered history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggeredRecord {
    pub rule_id: Uuid,
    pub price: f64,
    pub triggered_at: DateTime<Utc>,
}
