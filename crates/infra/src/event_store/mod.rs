//! Append-only event store boundary.
//!
//! The store is the single source of truth for sequence id allocation: it
//! assigns the id and persists the row as one atomic operation.

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use query::{DEFAULT_LIMIT, EventQuery, MAX_LIMIT, NO_LOWER_BOUND};
pub use r#trait::{EventStore, EventStoreError};
