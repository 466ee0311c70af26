use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::{
    EntityId, LedgerEntry, MessageId, Result, StoredEntity,
    repository::{DedupLedger, Repository, ensure_terminal},
};

/// Runs the database migrations for entities and the dedup ledger.
pub async fn run_migrations(pool: &PgPool) -> std::result::Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await
}

/// PostgreSQL-backed repository for one entity kind.
///
/// All kinds share the `entities` table; rows are separated by the `kind`
/// column and hold a JSON snapshot of the terminal variant.
#[derive(Clone)]
pub struct PostgresRepository<E> {
    pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E: StoredEntity> PostgresRepository<E> {
    /// Creates a new PostgreSQL repository.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn row_to_entity(row: PgRow) -> Result<E> {
        let payload: serde_json::Value = row.try_get("payload")?;
        Ok(serde_json::from_value(payload)?)
    }
}

#[async_trait]
impl<E: StoredEntity> Repository<E> for PostgresRepository<E> {
    async fn get_by_id(&self, id: EntityId) -> Result<Option<E>> {
        let row = sqlx::query("SELECT payload FROM entities WHERE id = $1 AND kind = $2")
            .bind(id.as_uuid())
            .bind(E::KIND)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_entity).transpose()
    }

    async fn get_by_filter(&self, key: &str) -> Result<Vec<E>> {
        let rows = sqlx::query(
            r#"
            SELECT payload
            FROM entities
            WHERE kind = $1 AND filter_key = $2
            ORDER BY seq ASC
            "#,
        )
        .bind(E::KIND)
        .bind(key)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entity).collect()
    }

    #[tracing::instrument(skip(self, entity), fields(kind = E::KIND, status = entity.status()))]
    async fn save(&self, entity: &E) -> Result<EntityId> {
        ensure_terminal(entity)?;

        let id = EntityId::new();
        let payload = serde_json::to_value(entity)?;

        sqlx::query(
            r#"
            INSERT INTO entities (id, kind, status, filter_key, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(id.as_uuid())
        .bind(E::KIND)
        .bind(entity.status())
        .bind(entity.filter_key())
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        metrics::counter!("store_entities_saved_total", "kind" => E::KIND).increment(1);
        Ok(id)
    }

    async fn get_all(&self) -> Result<Vec<E>> {
        let rows = sqlx::query(
            r#"
            SELECT payload
            FROM entities
            WHERE kind = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(E::KIND)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_entity).collect()
    }
}

/// PostgreSQL-backed dedup ledger (`processed_messages` table).
#[derive(Clone)]
pub struct PostgresLedger {
    pool: PgPool,
}

impl PostgresLedger {
    /// Creates a new PostgreSQL ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Loads the entry recorded for a message, if any.
    pub async fn entry(&self, message_id: &MessageId) -> Result<Option<LedgerEntry>> {
        let row = sqlx::query(
            r#"
            SELECT message_id, processed_at, processor_name
            FROM processed_messages
            WHERE message_id = $1
            "#,
        )
        .bind(message_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(LedgerEntry {
                message_id: MessageId::new(row.try_get::<String, _>("message_id")?),
                processed_at: row.try_get("processed_at")?,
                processor_name: row.try_get("processor_name")?,
            })),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DedupLedger for PostgresLedger {
    async fn exists(&self, message_id: &MessageId) -> Result<bool> {
        let found: Option<String> = sqlx::query_scalar(
            "SELECT message_id FROM processed_messages WHERE message_id = $1",
        )
        .bind(message_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }

    #[tracing::instrument(skip(self, entry), fields(message_id = %entry.message_id))]
    async fn record(&self, entry: LedgerEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO processed_messages (message_id, processed_at, processor_name)
            VALUES ($1, $2, $3)
            ON CONFLICT (message_id) DO NOTHING
            "#,
        )
        .bind(entry.message_id.as_str())
        .bind(entry.processed_at)
        .bind(&entry.processor_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
