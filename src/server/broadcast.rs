//! Event fan-out to connected subscribers.
//!
//! A `tokio::sync::broadcast` channel carries every published event to all
//! current subscriber connections. Delivery is best-effort/at-most-once: a
//! disconnected or lagging subscriber misses events, and nothing is queued
//! for replay beyond the last snapshot kept for connect-time state sync.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::RwLock;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::core::alert::{AlertRule, TriggerEvent};
use crate::core::asset::AssetId;
use crate::core::price::PriceSnapshot;

/// Server-to-client events, JSON-tagged by `type`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundEvent {
    /// Full price snapshot, pushed every successful cycle and replayed on
    /// connect.
    PriceSnapshot {
        prices: BTreeMap<AssetId, f64>,
        captured_at: DateTime<Utc>,
    },

    /// A rule fired.
    RuleTriggered {
        asset: AssetId,
        price: f64,
        message: String,
        rule_id: Uuid,
    },

    /// The owner's current enabled rules; sent to one connection only, on
    /// connect and after each rule submission.
    InitialRules { rules: Vec<AlertRule> },
}

impl OutboundEvent {
    pub fn from_snapshot(snapshot: &PriceSnapshot) -> Self {
        OutboundEvent::PriceSnapshot {
            prices: snapshot.prices.clone(),
            captured_at: snapshot.captured_at,
        }
    }

    pub fn from_trigger(event: &TriggerEvent) -> Self {
        OutboundEvent::RuleTriggered {
            asset: event.asset.clone(),
            price: event.price,
            message: event.message.clone(),
            rule_id: event.rule_id,
        }
    }
}

/// Fan-out boundary between the monitor and subscriber connections.
pub struct Broadcaster {
    tx: broadcast::Sender<OutboundEvent>,
    latest: RwLock<Option<PriceSnapshot>>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            latest: RwLock::new(None),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OutboundEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish a snapshot to all subscribers and retain it for connect-time
    /// replay. Send errors (no subscribers) are ignored.
    pub fn publish_snapshot(&self, snapshot: &PriceSnapshot) {
        *self.latest.write().unwrap() = Some(snapshot.clone());
        let _ = self.tx.send(OutboundEvent::from_snapshot(snapshot));
    }

    pub fn publish_trigger(&self, event: &TriggerEvent) {
        let _ = self.tx.send(OutboundEvent::from_trigger(event));
    }

    /// The last broadcast snapshot, if any cycle has completed yet.
    pub fn latest_snapshot(&self) -> Option<PriceSnapshot> {
        self.latest.read().unwrap().clone()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
