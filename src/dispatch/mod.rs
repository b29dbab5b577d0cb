//! Event Dispatch module
//!
//! Fans committed events out to registered handlers. Delivery is
//! at-most-once and best-effort: a failing handler is logged and reported,
//! never propagated, so the command that produced the events still succeeds.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{DomainEvent, EventEnvelope};

/// Errors a handler can raise; they never leave the dispatcher
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Anything else the handler wants to report
    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// A reaction to committed events, registered per event kind
#[async_trait]
pub trait EventHandler<E: DomainEvent>: Send + Sync {
    /// Stable handler name used in logs and reports
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &EventEnvelope<E>) -> Result<(), HandlerError>;
}

/// What happened when one event reached one handler
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Delivered,
    Failed(String),
}

/// One (event, handler) delivery attempt
#[derive(Debug, Clone)]
pub struct HandlerOutcome {
    pub event_id: uuid::Uuid,
    pub event_type: &'static str,
    pub aggregate_id: uuid::Uuid,
    pub version: i64,
    pub handler: &'static str,
    pub outcome: Outcome,
}

impl HandlerOutcome {
    pub fn succeeded(&self) -> bool {
        self.outcome == Outcome::Delivered
    }
}

/// Structured result of one dispatch call.
///
/// Failures live here instead of in a return error; callers that care can
/// inspect them, callers that don't can drop the report.
#[derive(Debug, Clone, Default)]
pub struct DispatchReport {
    outcomes: Vec<HandlerOutcome>,
}

impl DispatchReport {
    pub fn outcomes(&self) -> &[HandlerOutcome] {
        &self.outcomes
    }

    pub fn delivered(&self) -> impl Iterator<Item = &HandlerOutcome> {
        self.outcomes.iter().filter(|o| o.succeeded())
    }

    pub fn failed(&self) -> impl Iterator<Item = &HandlerOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded())
    }

    pub fn is_clean(&self) -> bool {
        self.outcomes.iter().all(HandlerOutcome::succeeded)
    }

    fn push(&mut self, outcome: HandlerOutcome) {
        self.outcomes.push(outcome);
    }
}

/// Registry-driven event dispatcher.
///
/// Handlers are registered against concrete event kinds at startup; lookup
/// at dispatch time is a plain table access on the event's tag.
pub struct EventDispatcher<E: DomainEvent> {
    handlers: HashMap<&'static str, Vec<Arc<dyn EventHandler<E>>>>,
}

impl<E: DomainEvent> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<E: DomainEvent> EventDispatcher<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind; handlers for a kind run in
    /// registration order
    pub fn register(&mut self, kind: &'static str, handler: Arc<dyn EventHandler<E>>) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Register one handler for several event kinds at once
    pub fn register_for(&mut self, kinds: &[&'static str], handler: Arc<dyn EventHandler<E>>) {
        for kind in kinds {
            self.register(kind, handler.clone());
        }
    }

    /// Number of handlers registered for a kind
    pub fn handler_count(&self, kind: &str) -> usize {
        self.handlers.get(kind).map(Vec::len).unwrap_or(0)
    }

    /// Deliver events to their handlers, in caller order.
    ///
    /// Handler failures are logged and recorded in the report; they abort
    /// neither the remaining handlers of the event nor subsequent events.
    pub async fn dispatch(&self, events: &[EventEnvelope<E>]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for event in events {
            let event_type = event.event_type();
            let Some(handlers) = self.handlers.get(event_type) else {
                tracing::trace!(event_type, "no handlers registered");
                continue;
            };

            for handler in handlers {
                let outcome = match handler.handle(event).await {
                    Ok(()) => Outcome::Delivered,
                    Err(error) => {
                        tracing::error!(
                            event_type,
                            aggregate_id = %event.aggregate_id,
                            version = event.version,
                            handler = handler.name(),
                            %error,
                            "event handler failed, continuing dispatch"
                        );
                        Outcome::Failed(error.to_string())
                    }
                };

                report.push(HandlerOutcome {
                    event_id: event.event_id,
                    event_type,
                    aggregate_id: event.aggregate_id,
                    version: event.version,
                    handler: handler.name(),
                    outcome,
                });
            }
        }

        report
    }
}
