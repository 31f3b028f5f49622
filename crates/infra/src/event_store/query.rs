//! Cursor-bounded event queries.
//!
//! A client pages backward through a destination's history by keeping
//! `newest_id` fixed (the highest id it already holds, or
//! [`NO_LOWER_BOUND`]) and moving `last_id` down to the smallest id of each
//! page until a page comes back empty:
//!
//! ```text
//! have 0..=6      → newest_id=6, last_id=None → 15 14 13 12 11 10
//!                 → newest_id=6, last_id=10   → 9 8 7
//!                 → newest_id=6, last_id=7    → (empty, done)
//! ```

use serde_json::Value as JsonValue;

use originstream_core::{EventMessage, ValidationError};

/// Page size when the caller gives none.
pub const DEFAULT_LIMIT: u32 = 100;

/// Largest page a caller may request.
pub const MAX_LIMIT: u32 = 1000;

/// `newest_id` sentinel: no lower bound, page down to the very first event.
pub const NO_LOWER_BOUND: i64 = -1;

/// Query for one destination's events, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub destination_id: String,
    pub event_type: Option<String>,
    /// Exclusive lower bound: only ids `> newest_id`.
    pub newest_id: i64,
    /// Exclusive upper bound: only ids `< last_id`. `None` means unbounded.
    pub last_id: Option<i64>,
    /// Maximum number of events returned. Honoured as given.
    pub limit: u32,
}

impl EventQuery {
    pub fn new(destination_id: impl Into<String>) -> Self {
        Self {
            destination_id: destination_id.into(),
            event_type: None,
            newest_id: NO_LOWER_BOUND,
            last_id: None,
            limit: DEFAULT_LIMIT,
        }
    }

    /// Build a query from caller-supplied parameters.
    ///
    /// Missing or zero `limit` means [`DEFAULT_LIMIT`]; anything above
    /// [`MAX_LIMIT`] is rejected. A `last_id` of 0 means no upper bound and
    /// an empty event type means no type filter.
    pub fn from_request(
        destination_id: impl Into<String>,
        event_type: Option<String>,
        newest_id: Option<i64>,
        last_id: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Self, ValidationError> {
        let limit = match limit {
            None | Some(0) => DEFAULT_LIMIT,
            Some(n) if n > MAX_LIMIT => {
                return Err(ValidationError::invalid(format!(
                    "limit cannot be more than {MAX_LIMIT}"
                )));
            }
            Some(n) => n,
        };

        let mut query = Self::new(destination_id).limit(limit);
        if let Some(t) = event_type {
            query = query.event_type(t);
        }
        if let Some(n) = newest_id {
            query = query.newest_id(n);
        }
        if let Some(l) = last_id {
            query = query.last_id(l);
        }
        Ok(query)
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        let event_type = event_type.into();
        self.event_type = (!event_type.is_empty()).then_some(event_type);
        self
    }

    pub fn newest_id(mut self, newest_id: i64) -> Self {
        self.newest_id = newest_id;
        self
    }

    pub fn last_id(mut self, last_id: i64) -> Self {
        self.last_id = (last_id != 0).then_some(last_id);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Whether `event` falls inside this query's filter (ignoring `limit`).
    pub fn matches(&self, event: &EventMessage) -> bool {
        event.destination_id == self.destination_id
            && event.sequence_id > self.newest_id
            && self.last_id.is_none_or(|last| event.sequence_id < last)
            && self
                .event_type
                .as_deref()
                .is_none_or(|t| event.event_type == t)
    }

    /// The query for the page after `page`, or `None` when `page` was empty.
    pub fn next_page(&self, page: &[EventMessage]) -> Option<Self> {
        let smallest = page.iter().map(|e| e.sequence_id).min()?;
        Some(self.clone().last_id(smallest))
    }
}

/// Fallback payload for rows stored without one.
pub(crate) fn empty_payload() -> JsonValue {
    JsonValue::Object(Default::default())
}
