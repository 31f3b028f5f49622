//! In-memory notification bus for tests/dev.

use std::collections::HashMap;
use std::sync::{Mutex, mpsc};

use crate::bus::{Notification, NotificationBus, NotificationError, Subscription};

#[derive(Debug, Default)]
struct Topics {
    retained: HashMap<String, String>,
    subscribers: HashMap<String, Vec<mpsc::Sender<Notification>>>,
}

/// In-memory retained pub/sub bus.
///
/// - No IO
/// - Exact topic matching
/// - Dead subscribers are pruned while publishing
#[derive(Debug, Default)]
pub struct InMemoryNotificationBus {
    topics: Mutex<Topics>,
}

impl InMemoryNotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// The message currently retained on `topic`.
    pub fn retained(&self, topic: &str) -> Option<String> {
        self.topics
            .lock()
            .ok()
            .and_then(|t| t.retained.get(topic).cloned())
    }
}

impl NotificationBus for InMemoryNotificationBus {
    fn publish_retained(&self, topic: &str, payload: &str) -> Result<(), NotificationError> {
        let mut topics = self
            .topics
            .lock()
            .map_err(|_| NotificationError::Unavailable("lock poisoned".to_string()))?;

        topics.retained.insert(topic.to_string(), payload.to_string());

        if let Some(subs) = topics.subscribers.get_mut(topic) {
            let message = Notification {
                topic: topic.to_string(),
                payload: payload.to_string(),
                retained: false,
            };
            subs.retain(|tx| tx.send(message.clone()).is_ok());
        }

        Ok(())
    }

    fn subscribe(&self, topic: &str) -> Subscription<Notification> {
        let (tx, rx) = mpsc::channel();

        // A poisoned lock still yields a subscription; it just stays silent.
        if let Ok(mut topics) = self.topics.lock() {
            if let Some(payload) = topics.retained.get(topic) {
                let _ = tx.send(Notification {
                    topic: topic.to_string(),
                    payload: payload.clone(),
                    retained: true,
                });
            }
            topics.subscribers.entry(topic.to_string()).or_default().push(tx);
        }

        Subscription::new(rx)
    }
}
