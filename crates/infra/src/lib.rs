//! Infrastructure layer: durable stores, origin sources, notification
//! transport and the event stream service that ties them together.

pub mod event_store;
pub mod notification;
pub mod origin_store;
pub mod stream;

pub use stream::{EventStream, StreamError};
