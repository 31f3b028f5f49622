use std::sync::Arc;

use originstream_auth::{verify_credential, AccessGate, OriginRegistry};
use originstream_infra::EventStream;

/// Process-wide services shared by every request.
///
/// Built once at startup and handed to the router as an `Extension`.
#[derive(Debug, Clone)]
pub struct AppContext {
    gate: AccessGate,
    stream: Arc<EventStream>,
    /// SHA-256 hex of the admin probe password; `None` disables the probes.
    admin_pass_hash: Option<String>,
}

impl AppContext {
    pub fn new(gate: AccessGate, stream: Arc<EventStream>, admin_pass_hash: Option<String>) -> Self {
        Self {
            gate,
            stream,
            admin_pass_hash,
        }
    }

    pub fn gate(&self) -> &AccessGate {
        &self.gate
    }

    pub fn registry(&self) -> &Arc<OriginRegistry> {
        self.gate.registry()
    }

    pub fn stream(&self) -> &Arc<EventStream> {
        &self.stream
    }

    pub fn admin_enabled(&self) -> bool {
        self.admin_pass_hash.is_some()
    }

    /// Whether `pass` is the admin probe password.
    pub fn is_admin_pass(&self, pass: &str) -> bool {
        self.admin_pass_hash
            .as_deref()
            .is_some_and(|hash| verify_credential(pass, hash))
    }
}

/// Identity of an origin-authenticated request.
///
/// This is immutable and must be present for all event routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginContext {
    origin_id: String,
    destination_id: String,
    build_version: String,
}

impl OriginContext {
    pub fn new(
        origin_id: impl Into<String>,
        destination_id: impl Into<String>,
        build_version: impl Into<String>,
    ) -> Self {
        Self {
            origin_id: origin_id.into(),
            destination_id: destination_id.into(),
            build_version: build_version.into(),
        }
    }

    /// The `id` the request was made as.
    pub fn origin_id(&self) -> &str {
        &self.origin_id
    }

    /// The identity checked at the gate: `destId`, or `id` when absent.
    pub fn destination_id(&self) -> &str {
        &self.destination_id
    }

    pub fn build_version(&self) -> &str {
        &self.build_version
    }
}
