//! Aggregate Repository
//!
//! Rebuilds aggregates from the newest snapshot plus the events recorded
//! after it. Reads are side-effect free; snapshot writes happen through a
//! separate, explicitly out-of-band entry point.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::aggregate::Aggregate;
use crate::event_store::{EventStore, EventStoreError, StoredEvent};
use crate::snapshot::{SnapshotError, SnapshotRecord, SnapshotStore, SnapshotStrategy};

/// One stored event that failed to decode during reconstruction
#[derive(Debug, Clone)]
pub struct DecodeFailure {
    pub event_id: Uuid,
    pub version: i64,
    pub event_type: String,
    pub message: String,
}

impl std::fmt::Display for DecodeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "version {} ({}): {}",
            self.version, self.event_type, self.message
        )
    }
}

/// Errors raised while rebuilding or snapshotting aggregates
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Event store failure
    #[error(transparent)]
    Store(#[from] EventStoreError),

    /// Snapshot store failure
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    /// One or more stored events no longer decode into their declared kind.
    /// The whole scan ran first, so every bad event is listed.
    #[error("Corrupt event stream for aggregate {aggregate_id}: {} event(s) failed to decode", failures.len())]
    CorruptStream {
        aggregate_id: Uuid,
        failures: Vec<DecodeFailure>,
    },
}

/// Repository reconstructing aggregates from events and snapshots
pub struct AggregateRepository {
    events: Arc<dyn EventStore>,
    snapshots: Arc<dyn SnapshotStore>,
    strategy: SnapshotStrategy,
}

impl AggregateRepository {
    pub fn new(
        events: Arc<dyn EventStore>,
        snapshots: Arc<dyn SnapshotStore>,
        strategy: SnapshotStrategy,
    ) -> Self {
        Self {
            events,
            snapshots,
            strategy,
        }
    }

    /// Load an aggregate by replaying events on top of its newest snapshot.
    ///
    /// Returns `Ok(None)` when neither events nor a snapshot exist. A
    /// snapshot that fails to deserialize is skipped with a warning and the
    /// aggregate is rebuilt from version 1 instead.
    pub async fn get_by_id<A>(&self, id: Uuid) -> Result<Option<A>, RepositoryError>
    where
        A: Aggregate + DeserializeOwned,
        A::Event: DeserializeOwned,
    {
        let snapshot = self.snapshots.load_latest(A::aggregate_type(), id).await?;

        let (mut aggregate, from_version, has_snapshot) = match snapshot {
            Some(record) => match serde_json::from_value::<A>(record.state.clone()) {
                Ok(mut state) => {
                    state.journal_mut().set_version(record.version);
                    (state, record.version + 1, true)
                }
                Err(error) => {
                    tracing::warn!(
                        aggregate_type = A::aggregate_type(),
                        aggregate_id = %id,
                        version = record.version,
                        %error,
                        "snapshot failed to deserialize, falling back to full replay"
                    );
                    (A::default(), 1, false)
                }
            },
            None => (A::default(), 1, false),
        };

        let stored = self.events.read(id, from_version).await?;

        if !has_snapshot && stored.is_empty() {
            return Ok(None);
        }

        let envelopes = decode_stream::<A::Event>(id, stored)?;
        for envelope in &envelopes {
            aggregate.replay(envelope);
        }

        Ok(Some(aggregate))
    }

    /// Write a snapshot when the strategy says one is due.
    ///
    /// Returns whether a snapshot was written. Never called on the read or
    /// write path directly; command handlers spawn it and the maintenance
    /// job drives it on a schedule. Aggregates with uncommitted events are
    /// refused, a snapshot must describe persisted history only.
    pub async fn snapshot_if_due<A>(
        &self,
        aggregate: &A,
        now: DateTime<Utc>,
    ) -> Result<bool, RepositoryError>
    where
        A: Aggregate + Serialize,
    {
        if aggregate.journal().has_uncommitted() {
            tracing::warn!(
                aggregate_type = A::aggregate_type(),
                aggregate_id = %aggregate.id(),
                "snapshot check skipped: aggregate has uncommitted events"
            );
            return Ok(false);
        }

        let meta = self
            .snapshots
            .latest_meta(A::aggregate_type(), aggregate.id())
            .await?;

        let due = self.strategy.should_snapshot(
            aggregate.tier(),
            aggregate.version(),
            meta.as_ref(),
            now,
        );
        if !due {
            return Ok(false);
        }

        let record = SnapshotRecord::capture(aggregate)?;
        self.snapshots.save(record).await?;
        self.snapshots
            .prune(
                A::aggregate_type(),
                aggregate.id(),
                self.strategy.config().retain_per_aggregate,
            )
            .await?;

        Ok(true)
    }

    pub fn strategy(&self) -> &SnapshotStrategy {
        &self.strategy
    }
}

/// Decode a whole stream, collecting every failure instead of stopping at
/// the first one
fn decode_stream<E: DeserializeOwned>(
    aggregate_id: Uuid,
    stored: Vec<StoredEvent>,
) -> Result<Vec<crate::domain::EventEnvelope<E>>, RepositoryError> {
    let mut envelopes = Vec::with_capacity(stored.len());
    let mut failures = Vec::new();

    for event in stored {
        let event_id = event.id;
        let version = event.version;
        let event_type = event.event_type.clone();

        match event.into_envelope::<E>() {
            Ok(envelope) => envelopes.push(envelope),
            Err(error) => failures.push(DecodeFailure {
                event_id,
                version,
                event_type,
                message: error.to_string(),
            }),
        }
    }

    if !failures.is_empty() {
        return Err(RepositoryError::CorruptStream {
            aggregate_id,
            failures,
        });
    }

    Ok(envelopes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Character;
    use crate::domain::CharacterClass;
    use crate::event_store::{EventBatch, InMemoryEventStore, NewEvent};
    use crate::snapshot::{InMemorySnapshotStore, SnapshotConfig};

    fn repository() -> (
        Arc<InMemoryEventStore>,
        Arc<InMemorySnapshotStore>,
        AggregateRepository,
    ) {
        let events = Arc::new(InMemoryEventStore::new());
        let snapshots = Arc::new(InMemorySnapshotStore::new());
        let repository = AggregateRepository::new(
            events.clone(),
            snapshots.clone(),
            SnapshotStrategy::new(SnapshotConfig::default()),
        );
        (events, snapshots, repository)
    }

    async fn commit(events: &InMemoryEventStore, character: &mut Character) {
        let batch = EventBatch::from_uncommitted(character, None).unwrap();
        events.append(batch).await.unwrap();
        character.journal_mut().clear_uncommitted();
    }

    #[tokio::test]
    async fn test_get_by_id_full_replay() {
        let (events, _, repository) = repository();
        let id = Uuid::new_v4();

        let mut character = Character::create(id, "Aldric", CharacterClass::Knight).unwrap();
        character.gain_experience(150).unwrap();
        character.earn_gold(40).unwrap();
        commit(&events, &mut character).await;

        let loaded: Character = repository.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(loaded, character);
        assert_eq!(loaded.version(), character.version());
    }

    #[tokio::test]
    async fn test_get_by_id_missing_is_none() {
        let (_, _, repository) = repository();
        let loaded: Option<Character> = repository.get_by_id(Uuid::new_v4()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_snapshot_plus_partial_replay_equals_full_replay() {
        let (events, snapshots, repository) = repository();
        let id = Uuid::new_v4();

        let mut character = Character::create(id, "Aldric", CharacterClass::Knight).unwrap();
        for _ in 0..9 {
            character.gain_experience(5).unwrap();
        }
        commit(&events, &mut character).await;
        assert_eq!(character.version(), 10);

        snapshots
            .save(SnapshotRecord::capture(&character).unwrap())
            .await
            .unwrap();

        character.earn_gold(10).unwrap();
        character.take_damage(15, "wolf").unwrap();
        character.gain_experience(7).unwrap();
        character.heal(5).unwrap();
        character.earn_gold(3).unwrap();
        commit(&events, &mut character).await;
        assert_eq!(character.version(), 15);

        let via_snapshot: Character = repository.get_by_id(id).await.unwrap().unwrap();

        // Full replay path: same stream, no snapshots
        let bare = AggregateRepository::new(
            events.clone(),
            Arc::new(InMemorySnapshotStore::new()),
            SnapshotStrategy::default(),
        );
        let via_full: Character = bare.get_by_id(id).await.unwrap().unwrap();

        assert_eq!(via_snapshot, via_full);
        assert_eq!(via_snapshot.version(), 15);
    }

    #[tokio::test]
    async fn test_corrupt_events_collected_not_partial() {
        let (events, _, repository) = repository();
        let id = Uuid::new_v4();

        let mut character = Character::create(id, "Aldric", CharacterClass::Knight).unwrap();
        character.gain_experience(10).unwrap();
        commit(&events, &mut character).await;

        // Two undecodable payloads appended behind the good ones
        let now = Utc::now();
        let bad = EventBatch {
            aggregate_type: "Character".to_string(),
            aggregate_id: id,
            expected_version: 2,
            events: vec![
                NewEvent {
                    event_id: Uuid::new_v4(),
                    version: 3,
                    event_type: "GoldEarned".to_string(),
                    payload: serde_json::json!({ "type": "GoldEarned" }),
                    occurred_at: now,
                },
                NewEvent {
                    event_id: Uuid::new_v4(),
                    version: 4,
                    event_type: "Bogus".to_string(),
                    payload: serde_json::json!({ "type": "Bogus" }),
                    occurred_at: now,
                },
            ],
            actor_id: None,
        };
        events.append(bad).await.unwrap();

        let result: Result<Option<Character>, _> = repository.get_by_id(id).await;
        match result {
            Err(RepositoryError::CorruptStream {
                aggregate_id,
                failures,
            }) => {
                assert_eq!(aggregate_id, id);
                let versions: Vec<i64> = failures.iter().map(|f| f.version).collect();
                assert_eq!(versions, vec![3, 4]);
            }
            other => panic!("expected corrupt stream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_falls_back_to_full_replay() {
        let (events, snapshots, repository) = repository();
        let id = Uuid::new_v4();

        let mut character = Character::create(id, "Aldric", CharacterClass::Knight).unwrap();
        character.gain_experience(20).unwrap();
        commit(&events, &mut character).await;

        snapshots
            .save(SnapshotRecord {
                aggregate_type: "Character".to_string(),
                aggregate_id: id,
                version: 1,
                state: serde_json::json!({ "not": "a character" }),
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let loaded: Character = repository.get_by_id(id).await.unwrap().unwrap();
        assert_eq!(loaded, character);
    }

    #[tokio::test]
    async fn test_snapshot_if_due_writes_and_prunes() {
        let (events, snapshots, _) = repository();
        let strategy = SnapshotStrategy::new(SnapshotConfig {
            min_events_for_first_snapshot: 1,
            event_count_threshold: 1,
            min_snapshot_interval: chrono::Duration::zero(),
            retain_per_aggregate: 2,
            ..SnapshotConfig::default()
        });
        let repository =
            AggregateRepository::new(events.clone(), snapshots.clone(), strategy);

        let id = Uuid::new_v4();
        let mut character = Character::create(id, "Aldric", CharacterClass::Knight).unwrap();
        commit(&events, &mut character).await;

        for round in 0..4 {
            character.earn_gold(10 + round).unwrap();
            commit(&events, &mut character).await;
            let written = repository
                .snapshot_if_due(&character, Utc::now())
                .await
                .unwrap();
            assert!(written);
        }

        assert_eq!(snapshots.count("Character", id).await, 2);
        let latest = snapshots.load_latest("Character", id).await.unwrap().unwrap();
        assert_eq!(latest.version, character.version());
    }

    #[tokio::test]
    async fn test_snapshot_refused_with_uncommitted_events() {
        let (events, snapshots, _) = repository();
        let strategy = SnapshotStrategy::new(SnapshotConfig {
            min_events_for_first_snapshot: 1,
            ..SnapshotConfig::default()
        });
        let repository =
            AggregateRepository::new(events.clone(), snapshots.clone(), strategy);

        let character =
            Character::create(Uuid::new_v4(), "Aldric", CharacterClass::Knight).unwrap();

        let written = repository
            .snapshot_if_due(&character, Utc::now())
            .await
            .unwrap();
        assert!(!written);
        assert_eq!(snapshots.count("Character", character.id()).await, 0);
    }

    #[tokio::test]
    async fn test_snapshot_not_due_is_noop() {
        let (events, snapshots, repository) = repository();

        let id = Uuid::new_v4();
        let mut character = Character::create(id, "Aldric", CharacterClass::Knight).unwrap();
        commit(&events, &mut character).await;

        // Version 1 is far below the default first-snapshot floor
        let written = repository
            .snapshot_if_due(&character, Utc::now())
            .await
            .unwrap();
        assert!(!written);
        assert_eq!(snapshots.count("Character", id).await, 0);
    }
}
