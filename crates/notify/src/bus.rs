//! Notification publishing/subscription abstraction.
//!
//! The bus makes minimal assumptions about its transport:
//!
//! - **Retain latest**: every publish replaces the topic's retained message, and
//!   a new subscriber immediately receives it without waiting for fresh traffic.
//! - **Best-effort**: no retries, no exactly-once, no ordering across topics.
//! - **No persistence guarantees**: the event store is the source of truth; a
//!   lost notification is recovered by reading the store.

use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// A message delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub topic: String,
    pub payload: String,
    /// `true` when this is the replayed retained message rather than a live publish.
    pub retained: bool,
}

/// Notification failure. Observed and logged only; never surfaced to writers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("publish timed out after {0:?}")]
    Timeout(Duration),

    #[error("bus unavailable: {0}")]
    Unavailable(String),
}

/// A subscription to one topic.
///
/// Designed for single-threaded consumption, like a plain channel receiver.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Topic-based pub/sub with retained messages.
///
/// Calls may block on the transport; async callers run them on the blocking
/// pool and bound them with a timeout.
pub trait NotificationBus: Send + Sync {
    /// Publish `payload` to `topic` and retain it for late subscribers.
    fn publish_retained(&self, topic: &str, payload: &str) -> Result<(), NotificationError>;

    /// Subscribe to `topic`. The retained message, if any, is delivered first.
    fn subscribe(&self, topic: &str) -> Subscription<Notification>;
}

impl<B> NotificationBus for Arc<B>
where
    B: NotificationBus + ?Sized,
{
    fn publish_retained(&self, topic: &str, payload: &str) -> Result<(), NotificationError> {
        (**self).publish_retained(topic, payload)
    }

    fn subscribe(&self, topic: &str) -> Subscription<Notification> {
        (**self).subscribe(topic)
    }
}
