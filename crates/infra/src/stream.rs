//! Event stream service: validated writes, cursor reads and post-save
//! notification, over an [`EventStore`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument};

use originstream_core::{ClientEventIdGenerator, EventMessage, StreamId, ValidationError};

use crate::event_store::{EventQuery, EventStore, EventStoreError};
use crate::notification::NotificationPublisher;

/// Default bound on store reads.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] EventStoreError),
}

/// One event stream instance.
///
/// Holds no per-request state; share it behind an `Arc`.
pub struct EventStream {
    store: Arc<dyn EventStore>,
    publisher: Option<NotificationPublisher>,
    ids: ClientEventIdGenerator,
    store_timeout: Duration,
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("stream_id", self.ids.stream_id())
            .field("publisher", &self.publisher)
            .field("store_timeout", &self.store_timeout)
            .finish_non_exhaustive()
    }
}

impl EventStream {
    pub fn new(store: Arc<dyn EventStore>, stream_id: StreamId) -> Self {
        Self {
            store,
            publisher: None,
            ids: ClientEventIdGenerator::new(stream_id),
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_publisher(mut self, publisher: NotificationPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn stream_id(&self) -> &StreamId {
        self.ids.stream_id()
    }

    pub fn publisher(&self) -> Option<&NotificationPublisher> {
        self.publisher.as_ref()
    }

    /// Next `<unix nanos>_<counter>_<stream id>` correlation id.
    pub fn generate_client_event_id(&self) -> String {
        self.ids.next_id()
    }

    /// Validate, persist and announce one event.
    ///
    /// Returns the event as stored, with its assigned `sequence_id`,
    /// defaulted `destination_id` and server-side `creation_time_unix_sec`.
    /// Notification happens after the durable write and never affects the
    /// result.
    #[instrument(
        skip(self, event),
        fields(origin_id = %event.origin_id, event_type = %event.event_type),
        err
    )]
    pub async fn save(&self, mut event: EventMessage) -> Result<EventMessage, StreamError> {
        event.validate()?;

        if event.destination_id.is_empty() {
            event.destination_id = event.origin_id.clone();
        }
        event.creation_time_unix_sec = Utc::now().timestamp();
        event.sequence_id = 0;

        // No client-side timeout: see the event_store::postgres module docs.
        let id = self.store.append(&event).await?;
        if id <= 0 {
            return Err(EventStoreError::MissingId.into());
        }
        event.sequence_id = id;

        info!(
            sequence_id = id,
            destination_id = %event.destination_id,
            "event stored"
        );

        if let Some(publisher) = &self.publisher {
            publisher.publish_detached(event.clone());
        }

        Ok(event)
    }

    /// Events for one destination, newest first.
    pub async fn query(&self, query: &EventQuery) -> Result<Vec<EventMessage>, StreamError> {
        let events = tokio::time::timeout(self.store_timeout, self.store.query(query))
            .await
            .map_err(|_| EventStoreError::Timeout(self.store_timeout))??;
        Ok(events)
    }

    /// Store connectivity check.
    pub async fn ping(&self) -> Result<(), StreamError> {
        tokio::time::timeout(self.store_timeout, self.store.ping())
            .await
            .map_err(|_| EventStoreError::Timeout(self.store_timeout))??;
        Ok(())
    }
}
