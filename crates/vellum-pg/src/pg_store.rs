//! `PostgreSQL` implementation of the Vellum store traits.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use vellum_core::clock::{Clock, SystemClock};
use vellum_core::entity::FieldChange;
use vellum_core::error::StoreError;
use vellum_core::history::{StreamEntry, StreamId, Trim};
use vellum_core::store::{CounterStore, Document, DocumentStore, DocumentWrite, HistoryStore};

/// PostgreSQL-backed document, counter and history store.
///
/// Documents of every collection share the `documents` table. Counter
/// updates are single upserts. History appends for one stream are
/// serialized with a transaction-scoped advisory lock so stream ids stay
/// strictly increasing.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgStore {
    /// Creates a store stamping history with the system clock.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self::with_clock(pool, Arc::new(SystemClock))
    }

    /// Creates a store stamping history with `clock`.
    #[must_use]
    pub fn with_clock(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }

    /// The underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn add(&self, key: &str, delta: i64) -> Result<i64, StoreError> {
        sqlx::query_scalar(
            r"
            INSERT INTO counters (name, value)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET value = counters.value + EXCLUDED.value
            RETURNING value
            ",
        )
        .bind(key)
        .bind(delta)
        .fetch_one(&self.pool)
        .await
        .map_err(unavailable)
    }
}

impl std::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn document(row: &PgRow) -> Result<Document, StoreError> {
    Ok(Document {
        id: row.try_get("id").map_err(unavailable)?,
        version: row.try_get("version").map_err(unavailable)?,
        body: row
            .try_get::<Json<Value>, _>("body")
            .map_err(unavailable)?
            .0,
    })
}

fn stream_entry(row: &PgRow) -> Result<StreamEntry, StoreError> {
    let millis: i64 = row.try_get("millis").map_err(unavailable)?;
    let sequence: i64 = row.try_get("sequence").map_err(unavailable)?;
    let fields: Json<Vec<FieldChange>> = row.try_get("fields").map_err(unavailable)?;
    Ok(StreamEntry {
        id: stream_id(millis, sequence)?,
        fields: fields.0,
    })
}

fn stream_id(millis: i64, sequence: i64) -> Result<StreamId, StoreError> {
    match (u64::try_from(millis), u64::try_from(sequence)) {
        (Ok(millis), Ok(sequence)) => Ok(StreamId::new(millis, sequence)),
        _ => Err(StoreError::Unavailable(format!(
            "negative stream id {millis}-{sequence}"
        ))),
    }
}

fn stream_columns(id: StreamId) -> Result<(i64, i64), StoreError> {
    match (i64::try_from(id.millis), i64::try_from(id.sequence)) {
        (Ok(millis), Ok(sequence)) => Ok((millis, sequence)),
        _ => Err(StoreError::Unavailable(format!(
            "stream id out of range: {id}"
        ))),
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert(&self, collection: &str, document: DocumentWrite) -> Result<String, StoreError> {
        let id = Uuid::now_v7().simple().to_string();
        sqlx::query(
            r"
            INSERT INTO documents (collection, id, version, body)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(collection)
        .bind(&id)
        .bind(document.version)
        .bind(Json(document.body))
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(id)
    }

    async fn fetch_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        sqlx::query(
            r"SELECT id, version, body FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unavailable)?
        .as_ref()
        .map(document)
        .transpose()
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        document: DocumentWrite,
        expected_version: Option<i64>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r"
            UPDATE documents
            SET body = $3, version = $4
            WHERE collection = $1
              AND id = $2
              AND ($5::BIGINT IS NULL OR version IS NULL OR version = $5)
            ",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(document.body))
        .bind(document.version)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(r"DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(result.rows_affected() > 0)
    }

    async fn query_all(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        sqlx::query(
            r"SELECT id, version, body FROM documents WHERE collection = $1 ORDER BY position",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?
        .iter()
        .map(document)
        .collect()
    }

    async fn query_page(
        &self,
        collection: &str,
        skip: usize,
        take: usize,
    ) -> Result<Vec<Document>, StoreError> {
        sqlx::query(
            r"
            SELECT id, version, body
            FROM documents
            WHERE collection = $1
            ORDER BY position
            OFFSET $2
            LIMIT $3
            ",
        )
        .bind(collection)
        .bind(to_i64(skip))
        .bind(to_i64(take))
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?
        .iter()
        .map(document)
        .collect()
    }

    async fn count(&self, collection: &str) -> Result<i64, StoreError> {
        sqlx::query_scalar(r"SELECT COUNT(*) FROM documents WHERE collection = $1")
            .bind(collection)
            .fetch_one(&self.pool)
            .await
            .map_err(unavailable)
    }
}

#[async_trait]
impl CounterStore for PgStore {
    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        self.add(key, 1).await
    }

    async fn decrement(&self, key: &str) -> Result<i64, StoreError> {
        self.add(key, -1).await
    }

    async fn read(&self, key: &str) -> Result<i64, StoreError> {
        let value: Option<i64> = sqlx::query_scalar(r"SELECT value FROM counters WHERE name = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(unavailable)?;
        Ok(value.unwrap_or(0))
    }

    async fn reset(&self, key: &str, value: i64) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO counters (name, value)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for PgStore {
    #[tracing::instrument(skip(self, fields), fields(fields_len = fields.len()))]
    async fn append(
        &self,
        key: &str,
        fields: &[FieldChange],
        trim: Trim,
    ) -> Result<StreamId, StoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        sqlx::query(r"SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(key)
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;

        let last = sqlx::query(
            r"
            SELECT millis, sequence
            FROM history_entries
            WHERE stream_key = $1
            ORDER BY millis DESC, sequence DESC
            LIMIT 1
            ",
        )
        .bind(key)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unavailable)?
        .map(|row| -> Result<StreamId, StoreError> {
            let millis: i64 = row.try_get("millis").map_err(unavailable)?;
            let sequence: i64 = row.try_get("sequence").map_err(unavailable)?;
            stream_id(millis, sequence)
        })
        .transpose()?;

        let id = StreamId::next_after(last, self.clock.now_millis());
        let (millis, sequence) = stream_columns(id)?;

        sqlx::query(
            r"
            INSERT INTO history_entries (stream_key, millis, sequence, fields)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(key)
        .bind(millis)
        .bind(sequence)
        .bind(Json(fields))
        .execute(&mut *tx)
        .await
        .map_err(unavailable)?;

        let len: i64 =
            sqlx::query_scalar(r"SELECT COUNT(*) FROM history_entries WHERE stream_key = $1")
                .bind(key)
                .fetch_one(&mut *tx)
                .await
                .map_err(unavailable)?;
        let excess = trim.excess(usize::try_from(len).unwrap_or(0));
        if excess > 0 {
            sqlx::query(
                r"
                DELETE FROM history_entries
                WHERE (stream_key, millis, sequence) IN (
                    SELECT stream_key, millis, sequence
                    FROM history_entries
                    WHERE stream_key = $1
                    ORDER BY millis, sequence
                    LIMIT $2
                )
                ",
            )
            .bind(key)
            .bind(to_i64(excess))
            .execute(&mut *tx)
            .await
            .map_err(unavailable)?;
            debug!(excess, "history stream trimmed");
        }

        tx.commit().await.map_err(unavailable)?;
        Ok(id)
    }

    async fn range(&self, key: &str) -> Result<Vec<StreamEntry>, StoreError> {
        sqlx::query(
            r"
            SELECT millis, sequence, fields
            FROM history_entries
            WHERE stream_key = $1
            ORDER BY millis, sequence
            ",
        )
        .bind(key)
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)?
        .iter()
        .map(stream_entry)
        .collect()
    }
}
