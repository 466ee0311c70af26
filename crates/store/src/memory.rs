use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    EntityId, LedgerEntry, MessageId, Result, StoreError, StoredEntity,
    repository::{DedupLedger, Repository, ensure_terminal},
};

#[derive(Debug, Clone)]
struct StoredRow<E> {
    id: EntityId,
    entity: E,
}

/// In-memory repository for testing and single-process runs.
///
/// Can be switched into an "unavailable" mode to simulate a store outage.
#[derive(Clone)]
pub struct InMemoryRepository<E> {
    rows: Arc<RwLock<Vec<StoredRow<E>>>>,
    unavailable: Arc<AtomicBool>,
}

impl<E> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
            unavailable: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl<E: StoredEntity> InMemoryRepository<E> {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Returns true if nothing has been stored.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Makes every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "{} repository is unreachable",
                E::KIND
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<E: StoredEntity> Repository<E> for InMemoryRepository<E> {
    async fn get_by_id(&self, id: EntityId) -> Result<Option<E>> {
        self.check_available()?;
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|r| r.id == id).map(|r| r.entity.clone()))
    }

    async fn get_by_filter(&self, key: &str) -> Result<Vec<E>> {
        self.check_available()?;
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|r| r.entity.filter_key() == Some(key))
            .map(|r| r.entity.clone())
            .collect())
    }

    async fn save(&self, entity: &E) -> Result<EntityId> {
        ensure_terminal(entity)?;
        self.check_available()?;

        let id = EntityId::new();
        self.rows.write().await.push(StoredRow {
            id,
            entity: entity.clone(),
        });
        tracing::debug!(kind = E::KIND, status = entity.status(), %id, "entity saved");
        Ok(id)
    }

    async fn get_all(&self) -> Result<Vec<E>> {
        self.check_available()?;
        let rows = self.rows.read().await;
        Ok(rows.iter().map(|r| r.entity.clone()).collect())
    }
}

/// In-memory dedup ledger for testing and single-process runs.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    entries: Arc<RwLock<HashMap<MessageId, LedgerEntry>>>,
    unavailable: Arc<AtomicBool>,
    fail_on_record: Arc<AtomicBool>,
}

impl InMemoryLedger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of recorded messages.
    pub async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns the entry recorded for a message, if any.
    pub async fn entry(&self, message_id: &MessageId) -> Option<LedgerEntry> {
        self.entries.read().await.get(message_id).cloned()
    }

    /// Makes both `exists` and `record` fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes only `record` fail, leaving `exists` working.
    pub fn set_fail_on_record(&self, fail: bool) {
        self.fail_on_record.store(fail, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("dedup ledger is unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DedupLedger for InMemoryLedger {
    async fn exists(&self, message_id: &MessageId) -> Result<bool> {
        self.check_available()?;
        Ok(self.entries.read().await.contains_key(message_id))
    }

    async fn record(&self, entry: LedgerEntry) -> Result<()> {
        self.check_available()?;
        if self.fail_on_record.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "dedup ledger write failed".into(),
            ));
        }

        self.entries
            .write()
            .await
            .entry(entry.message_id.clone())
            .or_insert(entry);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum Parcel {
        Packed { owner: String },
        Shipped { owner: String },
        Lost { reason: String },
    }

    impl StoredEntity for Parcel {
        const KIND: &'static str = "Parcel";

        fn status(&self) -> &'static str {
            match self {
                Parcel::Packed { .. } => "Packed",
                Parcel::Shipped { .. } => "Shipped",
                Parcel::Lost { .. } => "Lost",
            }
        }

        fn is_terminal(&self) -> bool {
            !matches!(self, Parcel::Packed { .. })
        }

        fn filter_key(&self) -> Option<&str> {
            match self {
                Parcel::Packed { owner } | Parcel::Shipped { owner } => Some(owner),
                Parcel::Lost { .. } => None,
            }
        }
    }

    fn shipped(owner: &str) -> Parcel {
        Parcel::Shipped {
            owner: owner.to_string(),
        }
    }

    #[tokio::test]
    async fn save_and_get_by_id() {
        let repo = InMemoryRepository::new();
        let id = repo.save(&shipped("alice")).await.unwrap();

        let loaded = repo.get_by_id(id).await.unwrap();
        assert_eq!(loaded, Some(shipped("alice")));
        assert_eq!(repo.get_by_id(EntityId::new()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_rejects_non_terminal_variant() {
        let repo = InMemoryRepository::new();
        let result = repo
            .save(&Parcel::Packed {
                owner: "alice".into(),
            })
            .await;

        assert!(matches!(
            result,
            Err(StoreError::NonTerminal {
                kind: "Parcel",
                status: "Packed"
            })
        ));
        assert!(repo.is_empty().await);
    }

    #[tokio::test]
    async fn terminal_failure_variants_can_be_saved() {
        let repo = InMemoryRepository::new();
        repo.save(&Parcel::Lost {
            reason: "fell off the truck".into(),
        })
        .await
        .unwrap();
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn get_by_filter_and_get_all() {
        let repo = InMemoryRepository::new();
        repo.save(&shipped("alice")).await.unwrap();
        repo.save(&shipped("bob")).await.unwrap();
        repo.save(&shipped("alice")).await.unwrap();

        assert_eq!(repo.get_by_filter("alice").await.unwrap().len(), 2);
        assert_eq!(repo.get_by_filter("carol").await.unwrap().len(), 0);
        assert_eq!(repo.get_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unavailable_repository_fails_transiently() {
        let repo = InMemoryRepository::new();
        repo.set_unavailable(true);

        let err = repo.save(&shipped("alice")).await.unwrap_err();
        assert!(err.is_transient());

        repo.set_unavailable(false);
        assert!(repo.save(&shipped("alice")).await.is_ok());
    }

    #[tokio::test]
    async fn ledger_records_and_checks_existence() {
        let ledger = InMemoryLedger::new();
        let id = MessageId::new("m-1");

        assert!(!ledger.exists(&id).await.unwrap());
        ledger
            .record(LedgerEntry::now(id.clone(), "billing"))
            .await
            .unwrap();
        assert!(ledger.exists(&id).await.unwrap());
        assert_eq!(ledger.entry_count().await, 1);
    }

    #[tokio::test]
    async fn ledger_keeps_the_first_entry() {
        let ledger = InMemoryLedger::new();
        let id = MessageId::new("m-1");

        ledger
            .record(LedgerEntry::now(id.clone(), "billing"))
            .await
            .unwrap();
        ledger
            .record(LedgerEntry::now(id.clone(), "someone-else"))
            .await
            .unwrap();

        let entry = ledger.entry(&id).await.unwrap();
        assert_eq!(entry.processor_name, "billing");
        assert_eq!(ledger.entry_count().await, 1);
    }

    #[tokio::test]
    async fn ledger_fail_on_record_leaves_exists_working() {
        let ledger = InMemoryLedger::new();
        ledger.set_fail_on_record(true);
        let id = MessageId::new("m-1");

        assert!(!ledger.exists(&id).await.unwrap());
        let err = ledger
            .record(LedgerEntry::now(id.clone(), "billing"))
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(!ledger.exists(&id).await.unwrap());
    }
}
