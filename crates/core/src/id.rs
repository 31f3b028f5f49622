//! Stream instance identity and client-side correlation ids.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one running event stream instance.
///
/// Used as the suffix of generated client event ids and as the key of the
/// per-instance notification topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(String);

impl StreamId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh instance id (UUIDv7, time-ordered).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Generates human-readable correlation ids of the form
/// `<unix nanos>_<counter>_<stream id>`.
///
/// The counter is shared by every id produced by this generator, starts at 0
/// and is incremented before use (the first id carries `1`). It is never
/// reset for the lifetime of the generator. Ids are not sequence ids: the
/// store assigns those independently.
#[derive(Debug)]
pub struct ClientEventIdGenerator {
    stream_id: StreamId,
    counter: AtomicU64,
}

impl ClientEventIdGenerator {
    pub fn new(stream_id: StreamId) -> Self {
        Self {
            stream_id,
            counter: AtomicU64::new(0),
        }
    }

    pub fn stream_id(&self) -> &StreamId {
        &self.stream_id
    }

    pub fn next_id(&self) -> String {
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{nanos}_{n}_{}", self.stream_id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn id_has_three_parts_and_counter_starts_at_one() {
        let generator = ClientEventIdGenerator::new(StreamId::new("stream-a"));

        let id = generator.next_id();
        let parts: Vec<&str> = id.splitn(3, '_').collect();

        assert_eq!(parts.len(), 3);
        assert!(parts[0].parse::<i64>().unwrap() > 0);
        assert_eq!(parts[1], "1");
        assert_eq!(parts[2], "stream-a");
    }

    #[test]
    fn ids_are_unique_across_threads() {
        let generator = Arc::new(ClientEventIdGenerator::new(StreamId::new("s")));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = generator.clone();
                std::thread::spawn(move || (0..250).map(|_| generator.next_id()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for h in handles {
            for id in h.join().unwrap() {
                assert!(seen.insert(id), "duplicate client event id");
            }
        }
        assert_eq!(seen.len(), 2000);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// The counter segment increases by one per call, whatever the stream id.
            #[test]
            fn counter_is_monotonic(stream in "[a-z0-9-]{1,32}", calls in 1usize..50) {
                let generator = ClientEventIdGenerator::new(StreamId::new(stream.clone()));
                for expected in 1..=calls {
                    let id = generator.next_id();
                    let parts: Vec<&str> = id.splitn(3, '_').collect();
                    prop_assert_eq!(parts[1].parse::<usize>().unwrap(), expected);
                    prop_assert_eq!(parts[2], stream.as_str());
                }
            }
        }
    }
}
