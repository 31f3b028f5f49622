//! `originstream-auth`: origin authentication and rate limiting.
//!
//! This crate is decoupled from HTTP and storage: origins are loaded through
//! the [`OriginSource`] trait and decisions are plain `Result`s.

pub mod credential;
pub mod gate;
pub mod registry;

pub use credential::{hash_credential, verify_credential};
pub use gate::{AccessGate, AccessGrant, AuthError};
pub use registry::{
    OriginRegistry, OriginSnapshot, OriginSource, RegistryError, RegistryHealth, ReloadConfig,
    ReloadHandle, SecureOrigin,
};
