//! In-memory Snapshot Store
//!
//! Mirror of the PostgreSQL store for unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{SnapshotError, SnapshotMeta, SnapshotRecord, SnapshotStore};

/// Snapshot store backed by process memory
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    snapshots: RwLock<HashMap<(String, Uuid), Vec<SnapshotRecord>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of snapshots stored for one aggregate
    pub async fn count(&self, aggregate_type: &str, aggregate_id: Uuid) -> usize {
        self.snapshots
            .read()
            .await
            .get(&(aggregate_type.to_string(), aggregate_id))
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, record: SnapshotRecord) -> Result<(), SnapshotError> {
        let mut snapshots = self.snapshots.write().await;
        let entries = snapshots
            .entry((record.aggregate_type.clone(), record.aggregate_id))
            .or_default();

        if entries.iter().all(|s| s.version != record.version) {
            entries.push(record);
            entries.sort_by_key(|s| s.version);
        }

        Ok(())
    }

    async fn load_latest(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
    ) -> Result<Option<SnapshotRecord>, SnapshotError> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots
            .get(&(aggregate_type.to_string(), aggregate_id))
            .and_then(|entries| entries.last())
            .cloned())
    }

    async fn latest_meta(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
    ) -> Result<Option<SnapshotMeta>, SnapshotError> {
        let snapshots = self.snapshots.read().await;
        Ok(snapshots
            .get(&(aggregate_type.to_string(), aggregate_id))
            .and_then(|entries| entries.last())
            .map(SnapshotRecord::meta))
    }

    async fn prune(
        &self,
        aggregate_type: &str,
        aggregate_id: Uuid,
        retain: u32,
    ) -> Result<u64, SnapshotError> {
        let mut snapshots = self.snapshots.write().await;
        let Some(entries) = snapshots.get_mut(&(aggregate_type.to_string(), aggregate_id)) else {
            return Ok(0);
        };

        let excess = entries.len().saturating_sub(retain as usize);
        entries.drain(..excess);

        Ok(excess as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(aggregate_id: Uuid, version: i64) -> SnapshotRecord {
        SnapshotRecord {
            aggregate_type: "Character".to_string(),
            aggregate_id,
            version,
            state: serde_json::json!({ "version": version }),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_latest_wins() {
        let store = InMemorySnapshotStore::new();
        let id = Uuid::new_v4();

        store.save(record(id, 10)).await.unwrap();
        store.save(record(id, 30)).await.unwrap();
        store.save(record(id, 20)).await.unwrap();

        let latest = store.load_latest("Character", id).await.unwrap().unwrap();
        assert_eq!(latest.version, 30);

        let meta = store.latest_meta("Character", id).await.unwrap().unwrap();
        assert_eq!(meta.version, 30);
    }

    #[tokio::test]
    async fn test_save_never_overwrites() {
        let store = InMemorySnapshotStore::new();
        let id = Uuid::new_v4();

        let mut first = record(id, 10);
        first.state = serde_json::json!({ "marker": "original" });
        store.save(first).await.unwrap();

        let mut second = record(id, 10);
        second.state = serde_json::json!({ "marker": "dup" });
        store.save(second).await.unwrap();

        let latest = store.load_latest("Character", id).await.unwrap().unwrap();
        assert_eq!(latest.state["marker"], "original");
        assert_eq!(store.count("Character", id).await, 1);
    }

    #[tokio::test]
    async fn test_prune_keeps_newest() {
        let store = InMemorySnapshotStore::new();
        let id = Uuid::new_v4();

        for version in [10, 20, 30, 40, 50] {
            store.save(record(id, version)).await.unwrap();
        }

        let pruned = store.prune("Character", id, 3).await.unwrap();
        assert_eq!(pruned, 2);
        assert_eq!(store.count("Character", id).await, 3);

        let latest = store.load_latest("Character", id).await.unwrap().unwrap();
        assert_eq!(latest.version, 50);
    }

    #[tokio::test]
    async fn test_missing_aggregate() {
        let store = InMemorySnapshotStore::new();
        let id = Uuid::new_v4();

        assert!(store.load_latest("Character", id).await.unwrap().is_none());
        assert!(store.latest_meta("Character", id).await.unwrap().is_none());
        assert_eq!(store.prune("Character", id, 3).await.unwrap(), 0);
    }
}
