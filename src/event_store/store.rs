//! Event Store contract
//!
//! The append/read seam between aggregates and storage. Implementations
//! guarantee optimistic concurrency and per-batch atomicity.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::aggregate::Aggregate;
use crate::domain::{DomainEvent, EventEnvelope};

use super::EventStoreError;

/// Stored event read back from the log
#[derive(Debug, Clone)]
pub struct StoredEvent {
    pub id: Uuid,
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub version: i64,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub actor_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StoredEvent {
    /// Decode the payload back into a domain event
    pub fn decode_payload<E: DeserializeOwned>(&self) -> Result<E, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    /// Rebuild the envelope this row was persisted from
    pub fn into_envelope<E: DeserializeOwned>(
        self,
    ) -> Result<EventEnvelope<E>, serde_json::Error> {
        let payload = serde_json::from_value(self.payload)?;
        Ok(EventEnvelope {
            event_id: self.id,
            aggregate_id: self.aggregate_id,
            version: self.version,
            occurred_at: self.created_at,
            payload,
        })
    }
}

/// A single event ready for persistence
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_id: Uuid,
    pub version: i64,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

impl NewEvent {
    /// Serialize an envelope into its storage form
    pub fn from_envelope<E>(envelope: &EventEnvelope<E>) -> Result<Self, EventStoreError>
    where
        E: DomainEvent + Serialize,
    {
        let payload = serde_json::to_value(&envelope.payload)?;
        Ok(Self {
            event_id: envelope.event_id,
            version: envelope.version,
            event_type: envelope.event_type().to_string(),
            payload,
            occurred_at: envelope.occurred_at,
        })
    }
}

/// All uncommitted events of one aggregate, persisted together or not at all
#[derive(Debug, Clone)]
pub struct EventBatch {
    pub aggregate_type: String,
    pub aggregate_id: Uuid,
    pub expected_version: i64,
    pub events: Vec<NewEvent>,
    pub actor_id: Option<String>,
}

impl EventBatch {
    /// Build a batch from an aggregate's uncommitted buffer.
    ///
    /// The expected version is the stream position the aggregate was loaded
    /// at, so a concurrent commit in between will be detected on append.
    pub fn from_uncommitted<A>(
        aggregate: &A,
        actor_id: Option<String>,
    ) -> Result<Self, EventStoreError>
    where
        A: Aggregate,
        A::Event: Serialize,
    {
        let events = aggregate
            .journal()
            .uncommitted_events()
            .iter()
            .map(NewEvent::from_envelope)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            aggregate_type: A::aggregate_type().to_string(),
            aggregate_id: aggregate.id(),
            expected_version: aggregate.journal().committed_version(),
            events,
            actor_id,
        })
    }

    /// Reject structurally broken batches before any storage work happens
    pub fn validate(&self) -> Result<(), EventStoreError> {
        if self.events.is_empty() {
            return Err(EventStoreError::InvalidBatch(
                "batch contains no events".to_string(),
            ));
        }
        if self.expected_version < 0 {
            return Err(EventStoreError::InvalidBatch(format!(
                "expected version must be non-negative, got {}",
                self.expected_version
            )));
        }

        let mut next = self.expected_version + 1;
        for event in &self.events {
            if event.version != next {
                return Err(EventStoreError::InvalidBatch(format!(
                    "event versions must be contiguous: expected {}, got {}",
                    next, event.version
                )));
            }
            next += 1;
        }

        Ok(())
    }
}

/// Append-only event log keyed by aggregate
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Append a batch atomically.
    ///
    /// Fails with [`EventStoreError::ConcurrencyConflict`] when the stream
    /// head no longer matches the batch's expected version; in that case
    /// nothing is written.
    async fn append(&self, batch: EventBatch) -> Result<(), EventStoreError>;

    /// Read events of one aggregate from the given version (inclusive),
    /// ordered by version ascending
    async fn read(
        &self,
        aggregate_id: Uuid,
        from_version: i64,
    ) -> Result<Vec<StoredEvent>, EventStoreError>;

    /// Current head version of an aggregate's stream, 0 when absent
    async fn head_version(&self, aggregate_id: Uuid) -> Result<i64, EventStoreError>;
}
