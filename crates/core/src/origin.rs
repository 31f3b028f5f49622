//! Origin identity record.

use serde::{Deserialize, Serialize};

/// An identity known to the system that may submit and read events.
///
/// Created and updated only in the durable origin table; in memory this is a
/// read-only projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    pub id: String,

    /// Lowercase hex SHA-256 digest of the origin's credential.
    /// Empty means no credential is required.
    #[serde(default)]
    pub credential_hash: String,
}

impl Origin {
    pub fn new(id: impl Into<String>, credential_hash: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            credential_hash: credential_hash.into(),
        }
    }

    /// An origin that accepts any presented credential.
    pub fn open(id: impl Into<String>) -> Self {
        Self::new(id, "")
    }

    pub fn requires_credential(&self) -> bool {
        !self.credential_hash.is_empty()
    }
}
