//! Asset identity

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Normalized identifier for a tracked asset (an exchange-listing id such as
/// `bitcoin`). Construction trims whitespace and lowercases, so lookups and
/// comparisons always operate on the normalized form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AssetId(String);

impl AssetId {
    pub fn new(raw: &str) -> Self {
        AssetId(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AssetId {
    fn from(raw: String) -> Self {
        AssetId::new(&raw)
    }
}

impl From<&str> for AssetId {
    fn from(raw: &str) -> Self {
        AssetId::new(raw)
    }
}

impl From<AssetId> for String {
    fn from(id: AssetId) -> Self {
        id.0
    }
}
