//! `originstream-core`: shared event and origin model.
//!
//! This crate contains **pure** types (no IO): the event message that travels
//! between origins and the store, the origin identity record, validation and
//! client-side correlation ids.

pub mod error;
pub mod event;
pub mod id;
pub mod origin;

pub use error::{ValidationError, ValidationResult};
pub use event::EventMessage;
pub use id::{ClientEventIdGenerator, StreamId};
pub use origin::Origin;
