//! Command Pipeline
//!
//! Post-command plumbing shared by every state-changing operation: drain the
//! aggregate's uncommitted events, append them as one batch, dispatch them,
//! then clear the buffer. Read-only outcomes pass through untouched.

use std::sync::Arc;

use serde::Serialize;

use crate::aggregate::Aggregate;
use crate::dispatch::{DispatchReport, EventDispatcher};
use crate::domain::DomainEvent;
use crate::event_store::{EventBatch, EventStore, EventStoreError};

/// Errors from the post-command commit path
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// Appending the uncommitted batch failed; nothing was dispatched
    #[error(transparent)]
    Store(#[from] EventStoreError),
}

impl HookError {
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, HookError::Store(error) if error.is_concurrency_conflict())
    }
}

/// What a command handler hands to the hook: the response for the caller,
/// plus the aggregate when the command changed state.
///
/// Commands declare mutation explicitly through this type; the hook never
/// inspects the response itself.
#[derive(Debug)]
pub struct CommandOutcome<R, A> {
    response: R,
    aggregate: Option<A>,
}

impl<R, A> CommandOutcome<R, A> {
    /// A command that changed aggregate state
    pub fn mutated(response: R, aggregate: A) -> Self {
        Self {
            response,
            aggregate: Some(aggregate),
        }
    }

    /// A command that only read
    pub fn read_only(response: R) -> Self {
        Self {
            response,
            aggregate: None,
        }
    }

    pub fn response(&self) -> &R {
        &self.response
    }

    pub fn aggregate(&self) -> Option<&A> {
        self.aggregate.as_ref()
    }
}

/// Result of running the hook: the response, the aggregate with a cleared
/// buffer, and what dispatch did
#[derive(Debug)]
pub struct CommandReceipt<R, A> {
    pub response: R,
    pub aggregate: Option<A>,
    pub dispatch: DispatchReport,
}

/// Commits and dispatches the events a command recorded.
///
/// Runs exactly once at the end of every command handler. If the append
/// fails the error propagates and no dispatch happens; unpersisted events
/// are never delivered.
pub struct PostCommandHook<E: DomainEvent> {
    store: Arc<dyn EventStore>,
    dispatcher: Arc<EventDispatcher<E>>,
}

impl<E: DomainEvent + Serialize> PostCommandHook<E> {
    pub fn new(store: Arc<dyn EventStore>, dispatcher: Arc<EventDispatcher<E>>) -> Self {
        Self { store, dispatcher }
    }

    pub async fn run<R, A>(
        &self,
        outcome: CommandOutcome<R, A>,
        actor_id: Option<String>,
    ) -> Result<CommandReceipt<R, A>, HookError>
    where
        A: Aggregate<Event = E>,
    {
        let CommandOutcome {
            response,
            aggregate,
        } = outcome;

        let Some(mut aggregate) = aggregate else {
            return Ok(CommandReceipt {
                response,
                aggregate: None,
                dispatch: DispatchReport::default(),
            });
        };

        if !aggregate.journal().has_uncommitted() {
            return Ok(CommandReceipt {
                response,
                aggregate: Some(aggregate),
                dispatch: DispatchReport::default(),
            });
        }

        let batch = EventBatch::from_uncommitted(&aggregate, actor_id)?;
        let pending = aggregate.journal().uncommitted_events().to_vec();

        self.store.append(batch).await?;

        let dispatch = self.dispatcher.dispatch(&pending).await;
        aggregate.journal_mut().clear_uncommitted();

        tracing::debug!(
            aggregate_type = A::aggregate_type(),
            aggregate_id = %aggregate.id(),
            events = pending.len(),
            clean_dispatch = dispatch.is_clean(),
            "command committed"
        );

        Ok(CommandReceipt {
            response,
            aggregate: Some(aggregate),
            dispatch,
        })
    }
}
