//! Event Store module
//!
//! Persistence layer for Event Sourcing.
//! Defines the store contract plus the PostgreSQL and in-memory backends.

mod error;
mod memory;
mod postgres;
mod store;

pub use error::EventStoreError;
pub use memory::InMemoryEventStore;
pub use postgres::PgEventStore;
pub use store::{EventBatch, EventStore, NewEvent, StoredEvent};
