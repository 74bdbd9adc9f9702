//! Error taxonomy for the monitoring loop

use thiserror::Error;
use uuid::Uuid;

/// The external price source failed. Recovered by skipping the
/// fetch-dependent steps of the current cycle; the next tick retries.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("price source request failed: {0}")]
    Request(String),

    #[error("price source returned HTTP {0}")]
    Status(u16),

    #[error("malformed price payload: {0}")]
    Payload(String),
}

/// The rule store failed. Aborts the remaining steps of the current cycle;
/// already-applied per-rule effects are kept.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("rule {0} not found")]
    RuleNotFound(Uuid),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Any failure that aborts one evaluation cycle. Never fatal to the process.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
