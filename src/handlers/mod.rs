//! Command Handlers module
//!
//! CQRS command handlers that orchestrate business operations.
//! Each handler loads aggregates, applies domain logic, and finishes by
//! running the post-command hook.

mod commands;
mod character_handler;
mod encounter_handler;
mod party_handler;
mod progression_handler;


pub use commands::*;
pub use character_handler::CreateCharacterHandler;
pub use encounter_handler::ResolveEncounterHandler;
pub use party_handler::FormPartyHandler;
pub use progression_handler::GrantExperienceHandler;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::aggregate::Aggregate;
use crate::repository::AggregateRepository;

/// Run the snapshot check off the command path.
///
/// Spawned so the caller's response never waits on snapshot I/O; a failed
/// check is only logged, the command already succeeded.
pub(crate) fn spawn_snapshot_check<A>(repository: Arc<AggregateRepository>, aggregate: A)
where
    A: Aggregate + Serialize + 'static,
{
    tokio::spawn(async move {
        if let Err(error) = repository.snapshot_if_due(&aggregate, Utc::now()).await {
            tracing::warn!(
                aggregate_type = A::aggregate_type(),
                aggregate_id = %aggregate.id(),
                %error,
                "snapshot check failed"
            );
        }
    });
}
