//! PostgreSQL Event Store
//!
//! Append-only event log backed by the `events` table.
//! Provides atomic batch persistence with optimistic concurrency control.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::store::{EventBatch, EventStore, StoredEvent};
use super::EventStoreError;

/// Event store persisting to PostgreSQL
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Create a new event store with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get current head version of an aggregate inside a transaction
    async fn current_version(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        aggregate_id: Uuid,
    ) -> Result<i64, EventStoreError> {
        let result: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT MAX(version) FROM events WHERE aggregate_id = $1
            "#,
        )
        .bind(aggregate_id)
        .fetch_optional(&mut **tx)
        .await?
        .flatten();

        Ok(result.unwrap_or(0))
    }

    /// Head version as seen outside any transaction
    async fn head_on_pool(&self, aggregate_id: Uuid) -> Result<i64, EventStoreError> {
        let result: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT MAX(version) FROM events WHERE aggregate_id = $1
            "#,
        )
        .bind(aggregate_id)
        .fetch_optional(&self.pool)
        .await?
        .flatten();

        Ok(result.unwrap_or(0))
    }
}

/// True when the error is a unique constraint violation (SQLSTATE 23505)
fn is_unique_violation(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(&self, batch: EventBatch) -> Result<(), EventStoreError> {
        batch.validate()?;

        let mut tx = self.pool.begin().await?;

        // Optimistic concurrency check against the stream head
        let current_version = self.current_version(&mut tx, batch.aggregate_id).await?;
        if current_version != batch.expected_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id: batch.aggregate_id,
                expected: batch.expected_version,
                actual: current_version,
            });
        }

        for event in &batch.events {
            let insert = sqlx::query(
                r#"
                INSERT INTO events (
                    id, aggregate_type, aggregate_id, version,
                    event_type, payload, actor_id, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(event.event_id)
            .bind(&batch.aggregate_type)
            .bind(batch.aggregate_id)
            .bind(event.version)
            .bind(&event.event_type)
            .bind(&event.payload)
            .bind(&batch.actor_id)
            .bind(event.occurred_at)
            .execute(&mut *tx)
            .await;

            if let Err(error) = insert {
                // The unique (aggregate_id, version) index catches writers
                // that raced past the head check
                if is_unique_violation(&error) {
                    drop(tx);
                    let actual = self.head_on_pool(batch.aggregate_id).await?;
                    return Err(EventStoreError::ConcurrencyConflict {
                        aggregate_id: batch.aggregate_id,
                        expected: batch.expected_version,
                        actual,
                    });
                }
                return Err(error.into());
            }
        }

        tx.commit().await?;

        tracing::debug!(
            aggregate_type = %batch.aggregate_type,
            aggregate_id = %batch.aggregate_id,
            events = batch.events.len(),
            head = batch.expected_version + batch.events.len() as i64,
            "event batch appended"
        );

        Ok(())
    }

    async fn read(
        &self,
        aggregate_id: Uuid,
        from_version: i64,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let rows = sqlx::query_as::<
            _,
            (
                Uuid,
                String,
                Uuid,
                i64,
                String,
                serde_json::Value,
                Option<String>,
                DateTime<Utc>,
            ),
        >(
            r#"
            SELECT id, aggregate_type, aggregate_id, version, event_type, payload, actor_id, created_at
            FROM events
            WHERE aggregate_id = $1 AND version >= $2
            ORDER BY version ASC
            "#,
        )
        .bind(aggregate_id)
        .bind(from_version)
        .fetch_all(&self.pool)
        .await?;

        let events = rows
            .into_iter()
            .map(
                |(id, aggregate_type, aggregate_id, version, event_type, payload, actor_id, created_at)| {
                    StoredEvent {
                        id,
                        aggregate_type,
                        aggregate_id,
                        version,
                        event_type,
                        payload,
                        actor_id,
                        created_at,
                    }
                },
            )
            .collect();

        Ok(events)
    }

    async fn head_version(&self, aggregate_id: Uuid) -> Result<i64, EventStoreError> {
        self.head_on_pool(aggregate_id).await
    }
}
