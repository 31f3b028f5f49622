//! Postgres origin table:
//!
//! ```sql
//! CREATE TABLE origins (
//!     id        TEXT PRIMARY KEY,
//!     pass_hash TEXT
//! );
//! ```
//!
//! `pass_hash` holds the lowercase hex SHA-256 of the origin's credential.
//! NULL or empty means the origin needs no credential.

use sqlx::{PgPool, Row};
use tracing::instrument;

use originstream_auth::{OriginSource, RegistryError};
use originstream_core::Origin;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS origins (
        id        TEXT PRIMARY KEY,
        pass_hash TEXT
    )
"#;

#[derive(Debug, Clone)]
pub struct PostgresOriginSource {
    pool: PgPool,
}

impl PostgresOriginSource {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> Result<(), RegistryError> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| RegistryError::Source(format!("ensure_schema: {e}")))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl OriginSource for PostgresOriginSource {
    async fn load_origins(&self) -> Result<Vec<Origin>, RegistryError> {
        let rows = sqlx::query("SELECT id, COALESCE(pass_hash, '') AS pass_hash FROM origins")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RegistryError::Source(e.to_string()))?;

        rows.iter()
            .map(|row| {
                Ok(Origin::new(
                    row.try_get::<String, _>("id")?,
                    row.try_get::<String, _>("pass_hash")?,
                ))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()
            .map_err(|e| RegistryError::Source(format!("failed to decode origin row: {e}")))
    }
}
