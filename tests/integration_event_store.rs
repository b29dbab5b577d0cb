//! Integration tests for the Postgres event store

use chrono::Utc;
use questlog::aggregate::{Aggregate, Character};
use questlog::domain::CharacterClass;
use questlog::event_store::{
    EventBatch, EventStore, EventStoreError, NewEvent, PgEventStore,
};
use uuid::Uuid;

mod common;

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_append_assigns_gapless_versions() {
    let pool = common::setup_test_db().await;
    let store = PgEventStore::new(pool);

    let id = Uuid::new_v4();
    let mut character = Character::create(id, "Aldric", CharacterClass::Knight).unwrap();
    character.gain_experience(150).unwrap();

    let batch = EventBatch::from_uncommitted(&character, Some("gm:test".to_string())).unwrap();
    store.append(batch).await.unwrap();

    let events = store.read(id, 1).await.unwrap();
    let versions: Vec<i64> = events.iter().map(|e| e.version).collect();
    let kinds: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();

    assert_eq!(versions, vec![1, 2, 3]);
    assert_eq!(
        kinds,
        vec!["CharacterCreated", "ExperienceGained", "LevelAdvanced"]
    );
    assert_eq!(events[0].actor_id.as_deref(), Some("gm:test"));
    assert_eq!(store.head_version(id).await.unwrap(), 3);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_append_detects_version_conflict() {
    let pool = common::setup_test_db().await;
    let store = PgEventStore::new(pool);

    let id = Uuid::new_v4();
    let character = Character::create(id, "Aldric", CharacterClass::Knight).unwrap();
    let batch = EventBatch::from_uncommitted(&character, None).unwrap();
    store.append(batch).await.unwrap();

    // A second writer that never saw the first commit expects version 0
    let stale = Character::create(id, "Aldric", CharacterClass::Knight).unwrap();
    let stale_batch = EventBatch::from_uncommitted(&stale, None).unwrap();

    match store.append(stale_batch).await {
        Err(EventStoreError::ConcurrencyConflict {
            aggregate_id,
            expected,
            actual,
        }) => {
            assert_eq!(aggregate_id, id);
            assert_eq!(expected, 0);
            assert_eq!(actual, 1);
        }
        other => panic!("expected concurrency conflict, got {:?}", other),
    }

    assert_eq!(store.read(id, 1).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_writers_exactly_one_wins() {
    let pool = common::setup_test_db().await;
    let store = PgEventStore::new(pool);

    let id = Uuid::new_v4();
    let mut character = Character::create(id, "Aldric", CharacterClass::Knight).unwrap();
    let batch = EventBatch::from_uncommitted(&character, None).unwrap();
    store.append(batch).await.unwrap();
    character.journal_mut().clear_uncommitted();

    // Two copies loaded at version 1, each recording its own second event
    let mut left = character.clone();
    let mut right = character;
    left.earn_gold(10).unwrap();
    right.take_damage(5, "goblin").unwrap();

    let left_batch = EventBatch::from_uncommitted(&left, None).unwrap();
    let right_batch = EventBatch::from_uncommitted(&right, None).unwrap();

    let (left_result, right_result) =
        tokio::join!(store.append(left_batch), store.append(right_batch));

    let left_conflict = matches!(
        left_result,
        Err(EventStoreError::ConcurrencyConflict { .. })
    );
    let right_conflict = matches!(
        right_result,
        Err(EventStoreError::ConcurrencyConflict { .. })
    );
    assert!(
        left_conflict != right_conflict,
        "exactly one writer must lose the race"
    );
    assert_eq!(store.head_version(id).await.unwrap(), 2);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_conflicted_batch_writes_nothing() {
    let pool = common::setup_test_db().await;
    let store = PgEventStore::new(pool);

    let id = Uuid::new_v4();
    let character = Character::create(id, "Aldric", CharacterClass::Knight).unwrap();
    let batch = EventBatch::from_uncommitted(&character, None).unwrap();
    store.append(batch).await.unwrap();

    // Three stale events in one batch; the conflict must reject all of them
    let mut stale = Character::create(id, "Aldric", CharacterClass::Knight).unwrap();
    stale.gain_experience(150).unwrap();
    let stale_batch = EventBatch::from_uncommitted(&stale, None).unwrap();
    assert_eq!(stale_batch.events.len(), 3);

    let result = store.append(stale_batch).await;
    assert!(result.is_err());

    assert_eq!(store.head_version(id).await.unwrap(), 1);
    assert_eq!(store.read(id, 1).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_rejects_gapped_batch() {
    let pool = common::setup_test_db().await;
    let store = PgEventStore::new(pool);

    let id = Uuid::new_v4();
    let now = Utc::now();
    let make = |version: i64| NewEvent {
        event_id: Uuid::new_v4(),
        version,
        event_type: "GoldEarned".to_string(),
        payload: serde_json::json!({}),
        occurred_at: now,
    };

    let batch = EventBatch {
        aggregate_type: "Character".to_string(),
        aggregate_id: id,
        expected_version: 0,
        events: vec![make(1), make(3)],
        actor_id: None,
    };

    assert!(matches!(
        store.append(batch).await,
        Err(EventStoreError::InvalidBatch(_))
    ));
    assert_eq!(store.head_version(id).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_read_from_version_is_inclusive() {
    let pool = common::setup_test_db().await;
    let store = PgEventStore::new(pool);

    let id = Uuid::new_v4();
    let mut character = Character::create(id, "Aldric", CharacterClass::Knight).unwrap();
    for amount in [10, 20, 30, 40] {
        character.earn_gold(amount).unwrap();
    }
    let batch = EventBatch::from_uncommitted(&character, None).unwrap();
    store.append(batch).await.unwrap();

    let tail = store.read(id, 3).await.unwrap();
    let versions: Vec<i64> = tail.iter().map(|e| e.version).collect();
    assert_eq!(versions, vec![3, 4, 5]);

    let past_head = store.read(id, 6).await.unwrap();
    assert!(past_head.is_empty());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_head_version_of_unknown_stream() {
    let pool = common::setup_test_db().await;
    let store = PgEventStore::new(pool);

    assert_eq!(store.head_version(Uuid::new_v4()).await.unwrap(), 0);
}
