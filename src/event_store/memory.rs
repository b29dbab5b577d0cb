//! In-memory Event Store
//!
//! Keeps streams in a map, matching the PostgreSQL store's contract exactly.
//! Used by unit tests and local experiments; nothing survives a restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{EventBatch, EventStore, StoredEvent};
use super::EventStoreError;

/// Event store backed by process memory
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    streams: RwLock<HashMap<Uuid, Vec<StoredEvent>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events across all streams
    pub async fn total_events(&self) -> usize {
        self.streams.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, batch: EventBatch) -> Result<(), EventStoreError> {
        batch.validate()?;

        let mut streams = self.streams.write().await;
        let stream = streams.entry(batch.aggregate_id).or_default();

        let head = stream.last().map(|event| event.version).unwrap_or(0);
        if head != batch.expected_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id: batch.aggregate_id,
                expected: batch.expected_version,
                actual: head,
            });
        }

        for event in batch.events {
            stream.push(StoredEvent {
                id: event.event_id,
                aggregate_type: batch.aggregate_type.clone(),
                aggregate_id: batch.aggregate_id,
                version: event.version,
                event_type: event.event_type,
                payload: event.payload,
                actor_id: batch.actor_id.clone(),
                created_at: event.occurred_at,
            });
        }

        Ok(())
    }

    async fn read(
        &self,
        aggregate_id: Uuid,
        from_version: i64,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let streams = self.streams.read().await;
        let events = streams
            .get(&aggregate_id)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|event| event.version >= from_version)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        Ok(events)
    }

    async fn head_version(&self, aggregate_id: Uuid) -> Result<i64, EventStoreError> {
        let streams = self.streams.read().await;
        let head = streams
            .get(&aggregate_id)
            .and_then(|stream| stream.last())
            .map(|event| event.version)
            .unwrap_or(0);

        Ok(head)
    }
}
