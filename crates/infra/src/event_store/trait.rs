use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use originstream_core::EventMessage;

use super::query::EventQuery;

/// Event store operation error.
///
/// These are **infrastructure errors**; the caller may retry. Retries are not
/// deduplicated by the store: idempotency is the caller's concern, via
/// `clientEventId`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventStoreError {
    #[error("database error: {0}")]
    Database(String),

    /// The append reported success without yielding a usable id.
    #[error("error inserting event, no id returned")]
    MissingId,

    #[error("event store timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to decode event row: {0}")]
    Decode(String),
}

/// Append-only event store keyed by destination.
///
/// ## Append semantics
///
/// `append()` persists the event and returns the newly assigned sequence id.
/// Ids are positive, globally unique and strictly increasing in append order.
/// No id may become visible without its row, or a row without its id.
///
/// ## Query semantics
///
/// `query()` returns events for exactly one destination, filtered by the
/// query's cursor bounds and optional event type, strictly descending by
/// sequence id, capped at the query's limit. No match is an empty `Vec`.
#[async_trait::async_trait]
pub trait EventStore: Send + Sync {
    /// Persist one event and return its assigned sequence id.
    ///
    /// The incoming `sequence_id` is ignored.
    async fn append(&self, event: &EventMessage) -> Result<i64, EventStoreError>;

    async fn query(&self, query: &EventQuery) -> Result<Vec<EventMessage>, EventStoreError>;

    /// Cheap round trip used by connectivity probes.
    async fn ping(&self) -> Result<(), EventStoreError>;
}

#[async_trait::async_trait]
impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    async fn append(&self, event: &EventMessage) -> Result<i64, EventStoreError> {
        (**self).append(event).await
    }

    async fn query(&self, query: &EventQuery) -> Result<Vec<EventMessage>, EventStoreError> {
        (**self).query(query).await
    }

    async fn ping(&self) -> Result<(), EventStoreError> {
        (**self).ping().await
    }
}
