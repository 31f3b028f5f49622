//! Redis-backed notification bus.
//!
//! Redis pub/sub has no retained messages, so retain is emulated: every
//! publish also stores the payload under the topic name as a plain key, in
//! the same atomic pipeline. A subscriber first subscribes, then reads that
//! key, so it cannot miss a publish that lands in between.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use redis::Commands;
use tracing::warn;

use originstream_notify::{Notification, NotificationBus, NotificationError, Subscription};

#[derive(Debug, Clone)]
pub struct RedisNotificationBus {
    client: redis::Client,
    io_timeout: Duration,
}

impl RedisNotificationBus {
    pub fn new(redis_url: impl AsRef<str>, io_timeout: Duration) -> Result<Self, NotificationError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| NotificationError::Unavailable(e.to_string()))?;
        Ok(Self { client, io_timeout })
    }

    fn connection(&self) -> Result<redis::Connection, NotificationError> {
        let conn = self
            .client
            .get_connection_with_timeout(self.io_timeout)
            .map_err(|e| NotificationError::Unavailable(e.to_string()))?;
        conn.set_read_timeout(Some(self.io_timeout))
            .and_then(|_| conn.set_write_timeout(Some(self.io_timeout)))
            .map_err(|e| NotificationError::Transport(e.to_string()))?;
        Ok(conn)
    }
}

impl NotificationBus for RedisNotificationBus {
    fn publish_retained(&self, topic: &str, payload: &str) -> Result<(), NotificationError> {
        let mut conn = self.connection()?;

        redis::pipe()
            .atomic()
            .set(topic, payload)
            .ignore()
            .publish(topic, payload)
            .ignore()
            .query::<()>(&mut conn)
            .map_err(|e| NotificationError::Transport(e.to_string()))
    }

    fn subscribe(&self, topic: &str) -> Subscription<Notification> {
        let (tx, rx) = mpsc::channel();

        let bus = self.clone();
        let topic = topic.to_string();

        // Background thread that receives pub/sub messages and forwards them.
        thread::spawn(move || {
            let mut sub_conn = match bus.client.get_connection_with_timeout(bus.io_timeout) {
                Ok(c) => c,
                Err(e) => {
                    warn!(topic = %topic, error = %e, "redis subscribe failed");
                    return;
                }
            };
            let mut pubsub = sub_conn.as_pubsub();
            if let Err(e) = pubsub.subscribe(&topic) {
                warn!(topic = %topic, error = %e, "redis subscribe failed");
                return;
            }

            let retained: Option<String> = bus
                .connection()
                .ok()
                .and_then(|mut conn| conn.get(&topic).ok());
            if let Some(payload) = retained {
                let message = Notification {
                    topic: topic.clone(),
                    payload,
                    retained: true,
                };
                if tx.send(message).is_err() {
                    return;
                }
            }

            loop {
                let msg = match pubsub.get_message() {
                    Ok(m) => m,
                    Err(_) => return,
                };

                let payload: String = match msg.get_payload() {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                let message = Notification {
                    topic: msg.get_channel_name().to_string(),
                    payload,
                    retained: false,
                };
                if tx.send(message).is_err() {
                    return;
                }
            }
        });

        Subscription::new(rx)
    }
}
