//! PostgreSQL Snapshot Store
//!
//! Snapshot rows live in `event_snapshots`, keyed by aggregate and version.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{SnapshotError, SnapshotMeta, SnapshotRecord, SnapshotStore};

/// Snapshot store persisting to PostgreSQL
#[derive(Debug, Clone)]
pub struct PgSnapshotStore {
    pool: PgPool,
}

impl PgSnapshotStore {
    /// Create a new snapshot store with a database pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SnapshotStore for PgSnapshotStore {
    async fn save(&self, record: SnapshotRecord) -> Result<(), SnapshotError> {
        sqlx::query(
            r#"
            INSERT INTO event_snapshots (aggregate_type, aggregate_id, version, state, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (aggregate_type, aggregate_id, version) DO NOTHING
            "#,
        )
        .bind(&record.aggregate_type)
        .bind(record.aggregate_id)
        .bind(record.version)
        .bind(&record.state)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        tracing::info!(
            aggregate_type = %record.aggregate_type,
            aggregate_id = %record.aggregate_id,
            version = record.version,
            "snapshot saved"
        );

        Ok(())
    }

    async fn load_latest(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
    ) -> Result<Option<SnapshotRecord>, SnapshotError> {
        let row: Option<(i64, serde_json::Value, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT version, state, created_at
            FROM event_snapshots
            WHERE aggregate_type = $1 AND aggregate_id = $2
            ORDER BY version DESC
            LIMIT 1
            "#,
        )
        .bind(aggregate_type)
        .bind(aggregate_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(version, state, created_at)| SnapshotRecord {
            aggregate_type: aggregate_type.to_string(),
            aggregate_id,
            version,
            state,
            created_at,
        }))
    }

    async fn latest_meta(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
    ) -> Result<Option<SnapshotMeta>, SnapshotError> {
        let row: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
            r#"
            SELECT version, created_at
            FROM event_snapshots
            WHERE aggregate_type = $1 AND aggregate_id = $2
            ORDER BY version DESC
            LIMIT 1
            "#,
        )
        .bind(aggregate_type)
        .bind(aggregate_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(version, created_at)| SnapshotMeta {
            version,
            created_at,
        }))
    }

    async fn prune(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
        retain: u32,
    ) -> Result<u64, SnapshotError> {
        let result = sqlx::query(
            r#"
            DELETE FROM event_snapshots
            WHERE aggregate_type = $1
              AND aggregate_id = $2
              AND version NOT IN (
                  SELECT version FROM event_snapshots
                  WHERE aggregate_type = $1 AND aggregate_id = $2
                  ORDER BY version DESC
                  LIMIT $3
              )
            "#,
        )
        .bind(aggregate_type)
        .bind(aggregate_id)
        .bind(i64::from(retain))
        .execute(&self.pool)
        .await?;

        let pruned = result.rows_affected();
        if pruned > 0 {
            tracing::debug!(
                aggregate_type = %aggregate_type,
                aggregate_id = %aggregate_id,
                pruned,
                "old snapshots pruned"
            );
        }

        Ok(pruned)
    }
}
