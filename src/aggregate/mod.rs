//! Aggregate module
//!
//! Aggregate Root pattern implementation for Event Sourcing.
//! State is derived from events; commands validate, then record.

pub mod character;
pub mod party;

pub use character::Character;
pub use party::Party;

use serde::{Deserialize, Serialize};

use crate::domain::{DomainEvent, EventEnvelope};

/// Event bookkeeping an aggregate carries by composition.
///
/// Tracks the persisted stream position and buffers events recorded since
/// the last commit. Only the version survives serialization; the buffer is
/// transient and never reaches a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(deserialize = ""))]
pub struct EventJournal<E> {
    version: i64,

    #[serde(skip)]
    uncommitted: Vec<EventEnvelope<E>>,
}

impl<E> Default for EventJournal<E> {
    fn default() -> Self {
        Self {
            version: 0,
            uncommitted: Vec::new(),
        }
    }
}

impl<E: DomainEvent> EventJournal<E> {
    /// Version of the last event applied to the aggregate
    pub fn version(&self) -> i64 {
        self.version
    }

    /// Events recorded since the last commit, oldest first
    pub fn uncommitted_events(&self) -> &[EventEnvelope<E>] {
        &self.uncommitted
    }

    pub fn has_uncommitted(&self) -> bool {
        !self.uncommitted.is_empty()
    }

    /// Version the stream head held before the buffered events were recorded
    pub fn committed_version(&self) -> i64 {
        self.version - self.uncommitted.len() as i64
    }

    /// Wrap a new event at the next version and buffer it
    pub fn record(&mut self, aggregate_id: uuid::Uuid, payload: E) {
        self.version += 1;
        let envelope = EventEnvelope::new(aggregate_id, self.version, payload);
        self.uncommitted.push(envelope);
    }

    /// Move the version to a position restored from storage
    pub fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    /// Drop the buffer once its events have been committed and dispatched
    pub fn clear_uncommitted(&mut self) {
        self.uncommitted.clear();
    }
}

/// Aggregate trait that all aggregates must implement
pub trait Aggregate: Sized + Default + Send + Sync {
    /// The type of events this aggregate records
    type Event: DomainEvent;

    /// Get the aggregate type name (for storage)
    fn aggregate_type() -> &'static str;

    /// Get the aggregate ID
    fn id(&self) -> uuid::Uuid;

    /// Get the event journal
    fn journal(&self) -> &EventJournal<Self::Event>;

    /// Get the event journal mutably
    fn journal_mut(&mut self) -> &mut EventJournal<Self::Event>;

    /// Apply an event to update the aggregate state.
    ///
    /// Must be a pure state transition: no validation, no side effects, so
    /// that replaying the same events always rebuilds the same state.
    fn apply(&mut self, event: &Self::Event);

    /// Activity tier used by the snapshot strategy; higher means busier
    fn tier(&self) -> u32 {
        0
    }

    /// Get the current version (number of events applied)
    fn version(&self) -> i64 {
        self.journal().version()
    }

    /// Apply a new event and buffer it for the next commit
    fn record(&mut self, event: Self::Event) {
        self.apply(&event);
        let id = self.id();
        self.journal_mut().record(id, event);
    }

    /// Apply an already-persisted event during replay
    fn replay(&mut self, envelope: &EventEnvelope<Self::Event>) {
        self.apply(&envelope.payload);
        self.journal_mut().set_version(envelope.version);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CharacterEvent;
    use chrono::Utc;
    use uuid::Uuid;

    fn gained(id: Uuid, amount: i64, total: i64) -> CharacterEvent {
        CharacterEvent::ExperienceGained {
            character_id: id,
            amount,
            total_experience: total,
            gained_at: Utc::now(),
        }
    }

    #[test]
    fn test_journal_records_contiguous_versions() {
        let id = Uuid::new_v4();
        let mut journal = EventJournal::<CharacterEvent>::default();

        journal.record(id, gained(id, 10, 10));
        journal.record(id, gained(id, 20, 30));

        assert_eq!(journal.version(), 2);
        assert_eq!(journal.committed_version(), 0);
        let versions: Vec<i64> = journal
            .uncommitted_events()
            .iter()
            .map(|e| e.version)
            .collect();
        assert_eq!(versions, vec![1, 2]);
    }

    #[test]
    fn test_journal_clear_keeps_version() {
        let id = Uuid::new_v4();
        let mut journal = EventJournal::<CharacterEvent>::default();
        journal.set_version(7);
        journal.record(id, gained(id, 5, 105));

        assert_eq!(journal.version(), 8);
        assert_eq!(journal.committed_version(), 7);

        journal.clear_uncommitted();
        assert!(!journal.has_uncommitted());
        assert_eq!(journal.version(), 8);
        assert_eq!(journal.committed_version(), 8);
    }

    #[test]
    fn test_journal_serde_skips_buffer() {
        let id = Uuid::new_v4();
        let mut journal = EventJournal::<CharacterEvent>::default();
        journal.record(id, gained(id, 10, 10));

        let value = serde_json::to_value(&journal).unwrap();
        assert_eq!(value, serde_json::json!({ "version": 1 }));

        let restored: EventJournal<CharacterEvent> = serde_json::from_value(value).unwrap();
        assert_eq!(restored.version(), 1);
        assert!(!restored.has_uncommitted());
    }
}
