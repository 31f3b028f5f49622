//! Postgres-backed event store implementation.
//!
//! Sequence ids are the table's identity column, so the database alone decides
//! append order. Expected schema (see [`PostgresEventStore::ensure_schema`]):
//!
//! ```sql
//! CREATE TABLE events (
//!     id                    BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
//!     client_event_id       TEXT   NOT NULL,
//!     creation_time_unix_sec BIGINT NOT NULL,
//!     origin_id             TEXT   NOT NULL,
//!     origin_iter           BIGINT NOT NULL DEFAULT 0,
//!     origin_group_id       TEXT,
//!     origin_build_version  TEXT   NOT NULL,
//!     destination_id        TEXT   NOT NULL,
//!     event_time_unix_sec   BIGINT NOT NULL DEFAULT 0,
//!     event_type            TEXT   NOT NULL,
//!     event_subtype         TEXT,
//!     event_version         TEXT   NOT NULL,
//!     payload               JSONB
//! );
//! CREATE INDEX events_destination_id_idx ON events (destination_id, id DESC);
//! ```
//!
//! ## Error Mapping
//!
//! | SQLx Error | EventStoreError |
//! |------------|-----------------|
//! | Database (`57014`, statement timeout) | `Timeout` |
//! | Database (other) | `Database` |
//! | PoolTimedOut | `Timeout` |
//! | ColumnDecode / Decode | `Decode` |
//! | Other | `Database` |
//!
//! ## Timeouts
//!
//! Appends are never abandoned client-side: an insert dropped mid-flight could
//! still commit. They are bounded by the pool's `acquire_timeout` and by the
//! session `statement_timeout` configured on the pool's connect options.

use std::time::Duration;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::field::Empty;
use tracing::{instrument, Span};

use originstream_core::EventMessage;

use super::query::{empty_payload, EventQuery};
use super::r#trait::{EventStore, EventStoreError};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS events (
        id                     BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
        client_event_id        TEXT   NOT NULL,
        creation_time_unix_sec BIGINT NOT NULL,
        origin_id              TEXT   NOT NULL,
        origin_iter            BIGINT NOT NULL DEFAULT 0,
        origin_group_id        TEXT,
        origin_build_version   TEXT   NOT NULL,
        destination_id         TEXT   NOT NULL,
        event_time_unix_sec    BIGINT NOT NULL DEFAULT 0,
        event_type             TEXT   NOT NULL,
        event_subtype          TEXT,
        event_version          TEXT   NOT NULL,
        payload                JSONB
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS events_destination_id_idx
        ON events (destination_id, id DESC)
    "#,
];

/// Postgres-backed append-only event store.
///
/// `Send + Sync`; cloning shares the underlying pool.
#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `events` table and its destination index if missing.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), EventStoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventStore for PostgresEventStore {
    #[instrument(
        skip(self, event),
        fields(
            origin_id = %event.origin_id,
            destination_id = %event.destination_id,
            event_type = %event.event_type,
            sequence_id = Empty
        ),
        err
    )]
    async fn append(&self, event: &EventMessage) -> Result<i64, EventStoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO events (
                client_event_id,
                creation_time_unix_sec,
                origin_id,
                origin_iter,
                origin_group_id,
                origin_build_version,
                destination_id,
                event_time_unix_sec,
                event_type,
                event_subtype,
                event_version,
                payload
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(&event.client_event_id)
        .bind(event.creation_time_unix_sec)
        .bind(&event.origin_id)
        .bind(event.origin_iter)
        .bind(&event.origin_group_id)
        .bind(&event.origin_build_version)
        .bind(&event.destination_id)
        .bind(event.event_time_unix_sec)
        .bind(&event.event_type)
        .bind(&event.event_subtype)
        .bind(&event.event_version)
        .bind(&event.payload)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("append", e))?;

        let id: i64 = match row {
            Some(row) => row
                .try_get("id")
                .map_err(|e| map_sqlx_error("append", e))?,
            None => return Err(EventStoreError::MissingId),
        };
        if id <= 0 {
            return Err(EventStoreError::MissingId);
        }

        Span::current().record("sequence_id", id);
        Ok(id)
    }

    #[instrument(
        skip(self, query),
        fields(
            destination_id = %query.destination_id,
            newest_id = query.newest_id,
            last_id = ?query.last_id,
            limit = query.limit,
            event_count = Empty
        ),
        err
    )]
    async fn query(&self, query: &EventQuery) -> Result<Vec<EventMessage>, EventStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                id,
                client_event_id,
                creation_time_unix_sec,
                origin_id,
                origin_iter,
                COALESCE(origin_group_id, '') AS origin_group_id,
                origin_build_version,
                destination_id,
                event_time_unix_sec,
                event_type,
                COALESCE(event_subtype, '') AS event_subtype,
                event_version,
                payload
            FROM events
            WHERE destination_id = $1
                AND ($2::text IS NULL OR event_type = $2)
                AND id > $3
                AND ($4::bigint IS NULL OR id < $4)
            ORDER BY id DESC
            LIMIT $5
            "#,
        )
        .bind(&query.destination_id)
        .bind(query.event_type.as_deref())
        .bind(query.newest_id)
        .bind(query.last_id)
        .bind(i64::from(query.limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("query", e))?;

        let events = rows
            .iter()
            .map(event_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| EventStoreError::Decode(e.to_string()))?;

        Span::current().record("event_count", events.len());
        Ok(events)
    }

    async fn ping(&self) -> Result<(), EventStoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ping", e))?;
        Ok(())
    }
}

fn event_from_row(row: &PgRow) -> Result<EventMessage, sqlx::Error> {
    let payload: Option<serde_json::Value> = row.try_get("payload")?;
    Ok(EventMessage {
        sequence_id: row.try_get("id")?,
        client_event_id: row.try_get("client_event_id")?,
        creation_time_unix_sec: row.try_get("creation_time_unix_sec")?,
        origin_id: row.try_get("origin_id")?,
        origin_iter: row.try_get("origin_iter")?,
        origin_group_id: row.try_get("origin_group_id")?,
        origin_build_version: row.try_get("origin_build_version")?,
        destination_id: row.try_get("destination_id")?,
        event_time_unix_sec: row.try_get("event_time_unix_sec")?,
        event_type: row.try_get("event_type")?,
        event_subtype: row.try_get("event_subtype")?,
        event_version: row.try_get("event_version")?,
        payload: payload.unwrap_or_else(empty_payload),
    })
}

/// Map SQLx errors to EventStoreError.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> EventStoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            // query_canceled: statement_timeout fired
            if db_err.code().as_deref() == Some("57014") {
                EventStoreError::Timeout(Duration::ZERO)
            } else {
                EventStoreError::Database(format!(
                    "database error in {operation}: {}",
                    db_err.message()
                ))
            }
        }
        sqlx::Error::PoolTimedOut => EventStoreError::Timeout(Duration::ZERO),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            EventStoreError::Decode(format!("{operation}: {err}"))
        }
        sqlx::Error::PoolClosed => {
            EventStoreError::Database(format!("connection pool closed in {operation}"))
        }
        _ => EventStoreError::Database(format!("sqlx error in {operation}: {err}")),
    }
}
