//! Validation error model.

use thiserror::Error;

/// Result type used for event validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A submitted event is missing data required before it may be persisted.
///
/// Validation errors are detected before any durable write and are never
/// retried automatically; the caller must correct the event and resubmit.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A mandatory field was empty.
    #[error("{0} not set")]
    MissingField(&'static str),

    /// A query parameter was outside its accepted range.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ValidationError {
    pub fn missing(field: &'static str) -> Self {
        Self::MissingField(field)
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }
}
