//! Durable origin sources feeding the [`OriginRegistry`](originstream_auth::OriginRegistry).

mod in_memory;
mod postgres;

pub use in_memory::InMemoryOriginSource;
pub use postgres::PostgresOriginSource;
