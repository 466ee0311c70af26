use chrono::{DateTime, Utc};
use common::MessageId;
use serde::{Serialize, de::DeserializeOwned};

/// An entity that a [`Repository`](crate::Repository) can persist.
///
/// Implemented by each service's variant enum. Rows are stored as JSON
/// snapshots together with the kind, status and filter key columns.
pub trait StoredEntity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Entity kind, e.g. `"Order"`. Separates rows of different services
    /// sharing one table.
    const KIND: &'static str;

    /// Name of the current variant, e.g. `"Placed"`.
    fn status(&self) -> &'static str;

    /// True for terminal success and terminal failure variants.
    fn is_terminal(&self) -> bool;

    /// Secondary lookup key (the customer phone for all three services).
    fn filter_key(&self) -> Option<&str>;
}

/// One row of the dedup ledger.
///
/// Created once and never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub message_id: MessageId,
    pub processed_at: DateTime<Utc>,
    pub processor_name: String,
}

impl LedgerEntry {
    /// Creates a ledger entry stamped with the current time.
    pub fn now(message_id: MessageId, processor_name: impl Into<String>) -> Self {
        Self {
            message_id,
            processed_at: Utc::now(),
            processor_name: processor_name.into(),
        }
    }
}
