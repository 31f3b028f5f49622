//! Access gate: allow/block decisions for a claimed origin.
//!
//! Checks run in a fixed order and only a fully successful check is counted:
//!
//! 1. unknown id → [`AuthError::UnknownOrigin`]
//! 2. window full → [`AuthError::RateLimited`]
//! 3. credential digest mismatch → [`AuthError::InvalidCredential`]
//! 4. count the request and allow it
//!
//! The rate limit is advisory and per refresh cycle of the registry.

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::credential::verify_credential;
use crate::registry::OriginRegistry;

/// Request rejected at the gate.
///
/// Never retried automatically. Callers only see the message text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("unknown origin id")]
    UnknownOrigin,

    #[error("maximum requests reached")]
    RateLimited,

    #[error("invalid password")]
    InvalidCredential,
}

/// An allowed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub origin_id: String,
    /// Requests counted for this origin in the current window, this one included.
    pub requests_in_window: u64,
}

#[derive(Debug, Clone)]
pub struct AccessGate {
    registry: Arc<OriginRegistry>,
    max_requests_per_window: u64,
}

impl AccessGate {
    pub fn new(registry: Arc<OriginRegistry>, max_requests_per_window: u64) -> Self {
        Self {
            registry,
            max_requests_per_window,
        }
    }

    pub fn registry(&self) -> &Arc<OriginRegistry> {
        &self.registry
    }

    pub fn max_requests_per_window(&self) -> u64 {
        self.max_requests_per_window
    }

    pub fn check(&self, id: &str, credential: &str) -> Result<AccessGrant, AuthError> {
        let result = self.decide(id, credential);
        if let Err(e) = &result {
            debug!(origin_id = id, reason = %e, "request blocked");
        }
        result
    }

    fn decide(&self, id: &str, credential: &str) -> Result<AccessGrant, AuthError> {
        let origin = self.registry.lookup(id).ok_or(AuthError::UnknownOrigin)?;
        let max = self.max_requests_per_window;

        if origin.requests_in_window() >= max {
            return Err(AuthError::RateLimited);
        }

        let stored = &origin.origin().credential_hash;
        if !stored.is_empty() && !verify_credential(credential, stored) {
            return Err(AuthError::InvalidCredential);
        }

        // Concurrent callers may have filled the window since the first check.
        let requests_in_window = origin.try_acquire(max).ok_or(AuthError::RateLimited)?;

        Ok(AccessGrant {
            origin_id: origin.origin().id.clone(),
            requests_in_window,
        })
    }
}
