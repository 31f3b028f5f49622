//! Tracing and logging (shared setup).

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::{LogFormat, UnknownLogFormat};

/// Initialize process-wide tracing with the format named by `LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}
