//! Query/response DTOs and lenient parameter parsing.
//!
//! Numeric query parameters are parsed leniently: a value that is missing or
//! does not parse takes the parameter's default instead of failing the
//! request. Only an explicit `limit` above the ceiling is rejected.

use serde::{Deserialize, Serialize};

use originstream_core::ValidationError;
use originstream_infra::event_store::{EventQuery, NO_LOWER_BOUND};

/// Build version recorded when the origin does not report one.
pub const UNKNOWN_BUILD: &str = "not set";

// -------------------------
// Request DTOs
// -------------------------

/// Identity parameters shared by every event route.
#[derive(Debug, Default, Deserialize)]
pub struct OriginParams {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "destId", default)]
    pub dest_id: String,
    #[serde(default)]
    pub p: String,
    #[serde(default)]
    pub build: String,
}

impl OriginParams {
    /// The identity the gate checks: `destId`, or `id` when absent.
    pub fn gate_id(&self) -> &str {
        if self.dest_id.is_empty() {
            &self.id
        } else {
            &self.dest_id
        }
    }

    pub fn build_version(&self) -> &str {
        if self.build.is_empty() {
            UNKNOWN_BUILD
        } else {
            &self.build
        }
    }
}

/// `GET /api/eventstream/getOriginEvents` filters. `id` is the destination.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetEventsParams {
    #[serde(default)]
    pub id: String,
    pub event_type: Option<String>,
    pub limit: Option<String>,
    pub last_id: Option<String>,
    pub newest_id: Option<String>,
}

impl GetEventsParams {
    pub fn into_query(self) -> Result<EventQuery, ValidationError> {
        // Non-positive limits mean "default", like a missing one.
        let limit = lenient::<i64>(self.limit.as_deref())
            .filter(|n| *n > 0)
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX));

        EventQuery::from_request(
            self.id,
            self.event_type,
            Some(lenient(self.newest_id.as_deref()).unwrap_or(NO_LOWER_BOUND)),
            lenient(self.last_id.as_deref()),
            limit,
        )
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminParams {
    #[serde(default)]
    pub pass: String,
}

fn lenient<T: std::str::FromStr>(raw: Option<&str>) -> Option<T> {
    raw.and_then(|s| s.trim().parse().ok())
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddEventResponse {
    pub sequence_id: i64,
}

#[cfg(test)]
mod tests {
    use originstream_infra::event_store::{DEFAULT_LIMIT, MAX_LIMIT};

    use super::*;

    fn params(limit: Option<&str>, last_id: Option<&str>, newest_id: Option<&str>) -> GetEventsParams {
        GetEventsParams {
            id: "d1".to_string(),
            event_type: None,
            limit: limit.map(str::to_string),
            last_id: last_id.map(str::to_string),
            newest_id: newest_id.map(str::to_string),
        }
    }

    #[test]
    fn gate_checks_destination_when_given() {
        let mut p = OriginParams {
            id: "dev".to_string(),
            ..Default::default()
        };
        assert_eq!(p.gate_id(), "dev");
        assert_eq!(p.build_version(), "not set");

        p.dest_id = "hub".to_string();
        p.build = "2.1".to_string();
        assert_eq!(p.gate_id(), "hub");
        assert_eq!(p.build_version(), "2.1");
    }

    #[test]
    fn unparseable_numbers_take_defaults() {
        let q = params(Some("lots"), Some("x"), Some("y")).into_query().unwrap();
        assert_eq!(q.limit, DEFAULT_LIMIT);
        assert_eq!(q.last_id, None);
        assert_eq!(q.newest_id, NO_LOWER_BOUND);

        let q = params(Some("-3"), None, None).into_query().unwrap();
        assert_eq!(q.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn explicit_values_are_kept() {
        let q = params(Some("1000"), Some("50"), Some("7")).into_query().unwrap();
        assert_eq!(q.limit, MAX_LIMIT);
        assert_eq!(q.last_id, Some(50));
        assert_eq!(q.newest_id, 7);
    }

    #[test]
    fn limit_over_ceiling_is_rejected() {
        assert!(params(Some("1001"), None, None).into_query().is_err());
        assert!(params(Some("99999999999"), None, None).into_query().is_err());
    }
}
