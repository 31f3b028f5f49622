//! The event message: unit of storage and transfer.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{ValidationError, ValidationResult};

/// An event as submitted by an origin and as returned to a destination.
///
/// ## Identity
///
/// - `sequence_id` is assigned by the store at insert time. It is globally
///   unique, strictly increasing in insertion order and never reused. A value
///   of `0` means the event has not been persisted.
/// - `client_event_id` is the caller's own correlation key. The store records
///   it but does not enforce uniqueness.
///
/// ## Wire format
///
/// camelCase JSON; every field may be omitted on input and takes its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventMessage {
    pub sequence_id: i64,
    pub client_event_id: String,
    pub creation_time_unix_sec: i64,

    // provenance of the writer
    pub origin_id: String,
    pub origin_iter: i64,
    pub origin_group_id: String,
    pub origin_build_version: String,

    /// Partition key for retrieval. Defaults to `origin_id` on save.
    pub destination_id: String,

    /// Caller-asserted occurrence time (not validated against creation time).
    pub event_time_unix_sec: i64,

    pub event_type: String,
    pub event_subtype: String,
    pub event_version: String,

    /// Opaque structured content, never interpreted by the store.
    pub payload: JsonValue,
}

impl Default for EventMessage {
    fn default() -> Self {
        Self {
            sequence_id: 0,
            client_event_id: String::new(),
            creation_time_unix_sec: 0,
            origin_id: String::new(),
            origin_iter: 0,
            origin_group_id: String::new(),
            origin_build_version: String::new(),
            destination_id: String::new(),
            event_time_unix_sec: 0,
            event_type: String::new(),
            event_subtype: String::new(),
            event_version: String::new(),
            payload: JsonValue::Object(Default::default()),
        }
    }
}

impl EventMessage {
    /// Check that every mandatory field is present.
    ///
    /// `event_subtype` and `destination_id` are optional.
    pub fn validate(&self) -> ValidationResult<()> {
        let required = [
            ("clientEventId", &self.client_event_id),
            ("originId", &self.origin_id),
            ("originBuildVersion", &self.origin_build_version),
            ("eventType", &self.event_type),
            ("eventVersion", &self.event_version),
        ];

        for (name, value) in required {
            if value.is_empty() {
                return Err(ValidationError::missing(name));
            }
        }
        Ok(())
    }

    /// Fill `destination_id` from `origin_id` for self-addressed events.
    pub fn default_destination(&mut self) {
        if self.destination_id.is_empty() {
            self.destination_id = self.origin_id.clone();
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.sequence_id > 0
    }
}
