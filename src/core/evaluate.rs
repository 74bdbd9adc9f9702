//! Rule evaluation
//!
//! Extracted as a pure function so firing logic is unit-testable without a
//! live timer or network.

use crate::core::alert::{AlertRule, TriggerEvent};
use crate::core::price::PriceSnapshot;

/// A rule whose condition held against one snapshot, with the price that
/// caused the fire.
#[derive(Debug, Clone)]
pub struct FiredAlert {
    pub rule: AlertRule,
    pub price: f64,
}

impl FiredAlert {
    pub fn message(&self) -> String {
        format!(
            "{} {} {}",
            self.rule.asset,
            self.rule.kind.verb(),
            self.rule.threshold
        )
    }

    pub fn to_event(&self) -> TriggerEvent {
        TriggerEvent {
            asset: self.rule.asset.clone(),
            price: self.price,
            message: self.message(),
            rule_id: self.rule.id,
        }
    }
}

/// Decide which rules fire against one snapshot.
///
/// Disabled rules and rules whose asset has no price in the snapshot are
/// skipped silently. Output order follows input order. Pure: no clock, no
/// I/O, no side effects; disabling fired rules is the scheduler's job.
pub fn evaluate(snapshot: &PriceSnapshot, rules: &[AlertRule]) -> Vec<FiredAlert> {
    rules
        .iter()
        .filter(|rule| rule.enabled)
        .filter_map(|rule| {
            let price = snapshot.price(&rule.asset)?;
            rule.kind.fires(price, rule.threshold).then(|| FiredAlert {
                rule: rule.clone(),
                price,
            })
        })
        .collect()
}
