use std::sync::RwLock;

use originstream_core::EventMessage;

use super::query::EventQuery;
use super::r#trait::{EventStore, EventStoreError};

#[derive(Debug)]
struct Log {
    /// Ascending by sequence id.
    events: Vec<EventMessage>,
    next_id: i64,
}

/// In-memory append-only event store.
///
/// Intended for tests/dev. Id assignment and the push happen under one write
/// lock, so ids follow append order exactly.
#[derive(Debug)]
pub struct InMemoryEventStore {
    log: RwLock<Log>,
}

impl Default for InMemoryEventStore {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose first assigned id is `first_id`.
    pub fn starting_at(first_id: i64) -> Self {
        Self {
            log: RwLock::new(Log {
                events: Vec::new(),
                next_id: first_id.max(1),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.log.read().map(|l| l.events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: &EventMessage) -> Result<i64, EventStoreError> {
        let mut log = self
            .log
            .write()
            .map_err(|_| EventStoreError::Database("lock poisoned".to_string()))?;

        let id = log.next_id;
        log.next_id += 1;
        log.events.push(EventMessage {
            sequence_id: id,
            ..event.clone()
        });

        Ok(id)
    }

    async fn query(&self, query: &EventQuery) -> Result<Vec<EventMessage>, EventStoreError> {
        let log = self
            .log
            .read()
            .map_err(|_| EventStoreError::Database("lock poisoned".to_string()))?;

        Ok(log
            .events
            .iter()
            .rev()
            .filter(|e| query.matches(e))
            .take(query.limit as usize)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), EventStoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(dest: &str, event_type: &str) -> EventMessage {
        EventMessage {
            client_event_id: "c".to_string(),
            origin_id: dest.to_string(),
            destination_id: dest.to_string(),
            event_type: event_type.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn ids_follow_append_order() {
        let store = InMemoryEventStore::starting_at(10);

        assert_eq!(store.append(&event("d1", "t")).await.unwrap(), 10);
        assert_eq!(store.append(&event("d2", "t")).await.unwrap(), 11);
        assert_eq!(store.append(&event("d1", "t")).await.unwrap(), 12);
        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn query_is_descending_and_scoped_to_destination() {
        let store = InMemoryEventStore::new();
        for dest in ["d1", "d2", "d1", "d1"] {
            store.append(&event(dest, "t")).await.unwrap();
        }

        let ids: Vec<i64> = store
            .query(&EventQuery::new("d1"))
            .await
            .unwrap()
            .iter()
            .map(|e| e.sequence_id)
            .collect();
        assert_eq!(ids, vec![4, 3, 1]);
    }

    #[tokio::test]
    async fn limit_and_type_filter_apply() {
        let store = InMemoryEventStore::new();
        for t in ["door", "temp", "door", "door"] {
            store.append(&event("d1", t)).await.unwrap();
        }

        let page = store
            .query(&EventQuery::new("d1").event_type("door").limit(2))
            .await
            .unwrap();
        let ids: Vec<i64> = page.iter().map(|e| e.sequence_id).collect();
        assert_eq!(ids, vec![4, 3]);
    }

    #[tokio::test]
    async fn no_match_is_empty_not_error() {
        let store = InMemoryEventStore::new();
        store.append(&event("d1", "t")).await.unwrap();

        assert!(store.query(&EventQuery::new("nobody")).await.unwrap().is_empty());
    }
}
