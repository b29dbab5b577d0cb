//! Snapshot module
//!
//! Periodic state captures that shorten replay chains. A snapshot is always
//! redundant: deleting every snapshot loses no information, only speed.

mod memory;
mod postgres;
mod strategy;

pub use memory::InMemorySnapshotStore;
pub use postgres::PgSnapshotStore;
pub use strategy::{SnapshotConfig, SnapshotStrategy};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::aggregate::Aggregate;

/// Errors that can occur in the snapshot store
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A serialized aggregate state at a known stream position
#[derive(Debug, Clone)]
pub struct SnapshotRecord {
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub version: i64,
    pub state: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl SnapshotRecord {
    /// Serialize an aggregate's current state into a snapshot row.
    ///
    /// The caller must pass an aggregate with an empty uncommitted buffer;
    /// snapshots describe persisted history only.
    pub fn capture<A>(aggregate: &A) -> Result<Self, SnapshotError>
    where
        A: Aggregate + Serialize,
    {
        let state = serde_json::to_value(aggregate)?;
        Ok(Self {
            aggregate_type: A::aggregate_type().to_string(),
            aggregate_id: aggregate.id(),
            version: aggregate.version(),
            state,
            created_at: Utc::now(),
        })
    }

    /// Metadata view of this record
    pub fn meta(&self) -> SnapshotMeta {
        SnapshotMeta {
            version: self.version,
            created_at: self.created_at,
        }
    }
}

/// Version and age of a stored snapshot, all the strategy needs to decide
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapshotMeta {
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

/// Storage for aggregate snapshots
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Insert a snapshot row; an existing row at the same version is left
    /// untouched (snapshots are never overwritten)
    async fn save(&self, record: SnapshotRecord) -> Result<(), SnapshotError>;

    /// Newest snapshot for an aggregate, if any
    async fn load_latest(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
    ) -> Result<Option<SnapshotRecord>, SnapshotError>;

    /// Newest snapshot's metadata without fetching the state blob
    async fn latest_meta(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
    ) -> Result<Option<SnapshotMeta>, SnapshotError>;

    /// Delete all but the newest `retain` snapshots of an aggregate
    async fn prune(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
        retain: u32,
    ) -> Result<u64, SnapshotError>;
}
