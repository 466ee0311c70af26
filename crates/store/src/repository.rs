use std::sync::Arc;

use async_trait::async_trait;
use common::{EntityId, MessageId};

use crate::{LedgerEntry, Result, StoreError, StoredEntity};

/// Storage for terminal entity variants of one service.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Repository<E: StoredEntity>: Send + Sync {
    /// Retrieves an entity by row ID.
    async fn get_by_id(&self, id: EntityId) -> Result<Option<E>>;

    /// Retrieves all entities whose filter key matches, oldest first.
    async fn get_by_filter(&self, key: &str) -> Result<Vec<E>>;

    /// Persists a terminal variant and returns the new row ID.
    ///
    /// Fails with [`StoreError::NonTerminal`] when handed an intermediate
    /// variant.
    async fn save(&self, entity: &E) -> Result<EntityId>;

    /// Retrieves every stored entity, oldest first.
    async fn get_all(&self) -> Result<Vec<E>>;
}

/// Append-only record of broker messages that were already processed.
///
/// The existence of an entry is the only idempotency check.
#[async_trait]
pub trait DedupLedger: Send + Sync {
    /// Returns true if the message was already processed.
    async fn exists(&self, message_id: &MessageId) -> Result<bool>;

    /// Records a processed message. Recording an existing ID keeps the
    /// original entry.
    async fn record(&self, entry: LedgerEntry) -> Result<()>;
}

#[async_trait]
impl<E: StoredEntity, T: Repository<E> + ?Sized> Repository<E> for Arc<T> {
    async fn get_by_id(&self, id: EntityId) -> Result<Option<E>> {
        (**self).get_by_id(id).await
    }

    async fn get_by_filter(&self, key: &str) -> Result<Vec<E>> {
        (**self).get_by_filter(key).await
    }

    async fn save(&self, entity: &E) -> Result<EntityId> {
        (**self).save(entity).await
    }

    async fn get_all(&self) -> Result<Vec<E>> {
        (**self).get_all().await
    }
}

#[async_trait]
impl<T: DedupLedger + ?Sized> DedupLedger for Arc<T> {
    async fn exists(&self, message_id: &MessageId) -> Result<bool> {
        (**self).exists(message_id).await
    }

    async fn record(&self, entry: LedgerEntry) -> Result<()> {
        (**self).record(entry).await
    }
}

/// Rejects intermediate variants before they reach storage.
pub fn ensure_terminal<E: StoredEntity>(entity: &E) -> Result<()> {
    if entity.is_terminal() {
        Ok(())
    } else {
        Err(StoreError::NonTerminal {
            kind: E::KIND,
            status: entity.status(),
        })
    }
}
