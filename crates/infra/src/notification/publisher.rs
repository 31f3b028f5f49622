use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use originstream_core::{EventMessage, StreamId};
use originstream_notify::{
    destination_topic, probe_topic, stream_topic, NotificationBus, NotificationError,
};

/// Republishes stored events to their retained topics.
///
/// Each saved event goes to `eventstream/<destinationId>/lastEvent` and
/// `eventstream/<streamId>/lastEvent`. Failures are logged, never retried
/// and never reported back to the writer.
#[derive(Clone)]
pub struct NotificationPublisher {
    bus: Arc<dyn NotificationBus>,
    stream_id: StreamId,
    timeout: Duration,
}

impl std::fmt::Debug for NotificationPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationPublisher")
            .field("stream_id", &self.stream_id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl NotificationPublisher {
    pub fn new(bus: Arc<dyn NotificationBus>, stream_id: StreamId, timeout: Duration) -> Self {
        Self {
            bus,
            stream_id,
            timeout,
        }
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The retained topics a stored event is published to.
    pub fn topics_for(&self, event: &EventMessage) -> [String; 2] {
        [
            destination_topic(&event.destination_id),
            stream_topic(self.stream_id.as_str()),
        ]
    }

    /// Publish `event` to both of its topics.
    ///
    /// Both topics are attempted even if the first fails; the first error is
    /// returned.
    pub async fn publish(&self, event: &EventMessage) -> Result<(), NotificationError> {
        let payload = serde_json::to_string(event)
            .map_err(|e| NotificationError::Serialize(e.to_string()))?;

        let mut first_err = None;
        for topic in self.topics_for(event) {
            if let Err(e) = self.publish_one(topic, payload.clone()).await {
                first_err.get_or_insert(e);
            }
        }

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Publish in a detached task. Outcomes are only logged.
    pub fn publish_detached(&self, event: EventMessage) -> JoinHandle<()> {
        let publisher = self.clone();
        tokio::spawn(async move {
            match publisher.publish(&event).await {
                Ok(()) => debug!(
                    sequence_id = event.sequence_id,
                    destination_id = %event.destination_id,
                    "event notification published"
                ),
                Err(e) => warn!(
                    sequence_id = event.sequence_id,
                    destination_id = %event.destination_id,
                    error = %e,
                    "event notification failed"
                ),
            }
        })
    }

    /// Round trip a marker message through the bus on this stream's probe topic.
    pub async fn probe(&self) -> Result<(), NotificationError> {
        let payload = chrono::Utc::now().timestamp().to_string();
        self.publish_one(probe_topic(self.stream_id.as_str()), payload)
            .await
    }

    async fn publish_one(&self, topic: String, payload: String) -> Result<(), NotificationError> {
        let bus = self.bus.clone();
        let task = tokio::task::spawn_blocking(move || bus.publish_retained(&topic, &payload));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(NotificationError::Transport(join_err.to_string())),
            Err(_) => Err(NotificationError::Timeout(self.timeout)),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use originstream_notify::{InMemoryNotificationBus, Notification, Subscription};

    use super::*;

    /// Bus whose publishes always fail.
    pub(crate) struct FailingBus;

    impl NotificationBus for FailingBus {
        fn publish_retained(&self, _topic: &str, _payload: &str) -> Result<(), NotificationError> {
            Err(NotificationError::Transport("broker down".to_string()))
        }

        fn subscribe(&self, _topic: &str) -> Subscription<Notification> {
            let (_tx, rx) = std::sync::mpsc::channel();
            Subscription::new(rx)
        }
    }

    /// Bus that blocks for `delay` on every publish.
    pub(crate) struct SlowBus {
        pub(crate) delay: Duration,
    }

    impl NotificationBus for SlowBus {
        fn publish_retained(&self, _topic: &str, _payload: &str) -> Result<(), NotificationError> {
            std::thread::sleep(self.delay);
            Ok(())
        }

        fn subscribe(&self, _topic: &str) -> Subscription<Notification> {
            let (_tx, rx) = std::sync::mpsc::channel();
            Subscription::new(rx)
        }
    }

    fn stored(dest: &str) -> EventMessage {
        EventMessage {
            sequence_id: 7,
            origin_id: "dev".to_string(),
            destination_id: dest.to_string(),
            event_type: "temp".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn publishes_to_destination_and_stream_topics() {
        let bus = Arc::new(InMemoryNotificationBus::new());
        let publisher =
            NotificationPublisher::new(bus.clone(), StreamId::new("srv"), Duration::from_secs(1));

        publisher.publish(&stored("d1")).await.unwrap();

        for topic in ["eventstream/d1/lastEvent", "eventstream/srv/lastEvent"] {
            let retained = bus.retained(topic).unwrap();
            let event: EventMessage = serde_json::from_str(&retained).unwrap();
            assert_eq!(event.sequence_id, 7);
        }
    }

    #[tokio::test]
    async fn late_subscriber_sees_latest_event() {
        let bus = Arc::new(InMemoryNotificationBus::new());
        let publisher =
            NotificationPublisher::new(bus.clone(), StreamId::new("srv"), Duration::from_secs(1));

        publisher.publish(&stored("d1")).await.unwrap();
        let sub = bus.subscribe("eventstream/d1/lastEvent");

        let message = sub.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(message.retained);
        assert!(message.payload.contains("\"sequenceId\":7"));
    }

    #[tokio::test]
    async fn failing_bus_reports_transport_error() {
        let publisher =
            NotificationPublisher::new(Arc::new(FailingBus), StreamId::new("srv"), Duration::from_secs(1));

        let err = publisher.publish(&stored("d1")).await.unwrap_err();
        assert_eq!(err, NotificationError::Transport("broker down".to_string()));
    }

    #[tokio::test]
    async fn slow_bus_times_out() {
        let publisher = NotificationPublisher::new(
            Arc::new(SlowBus {
                delay: Duration::from_millis(500),
            }),
            StreamId::new("srv"),
            Duration::from_millis(20),
        );

        let err = publisher.probe().await.unwrap_err();
        assert_eq!(err, NotificationError::Timeout(Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn probe_uses_the_test_topic() {
        let bus = Arc::new(InMemoryNotificationBus::new());
        let publisher =
            NotificationPublisher::new(bus.clone(), StreamId::new("srv"), Duration::from_secs(1));

        publisher.probe().await.unwrap();

        assert!(bus.retained("eventstream/srv/test").is_some());
        assert!(bus.retained("eventstream/srv/lastEvent").is_none());
    }
}
