//! Topic-based notification bus (mechanics only).
//!
//! Newly stored events are republished here so that live subscribers can
//! follow a destination, or a whole stream instance, without polling. The bus
//! is best-effort: the event store remains the source of truth.

pub mod bus;
pub mod in_memory_bus;
pub mod topic;

pub use bus::{Notification, NotificationBus, NotificationError, Subscription};
pub use in_memory_bus::InMemoryNotificationBus;
pub use topic::{destination_topic, probe_topic, stream_topic};
