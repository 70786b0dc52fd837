//! `PostgresBackend` - Relational Storage
//!
//! Envelopes land in a JSONB column so payloads stay queryable server-side.
//!
//! # Schema
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS external_records (
//!     id UUID NOT NULL,
//!     type_name TEXT NOT NULL,
//!     data JSONB NOT NULL,
//!     schema_version INTEGER NOT NULL DEFAULT 1,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     updated_at TIMESTAMPTZ NOT NULL,
//!     PRIMARY KEY (id, type_name)
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use url::Url;
use uuid::Uuid;

use crate::constants::POSTGRES_POOL_CONNECTIONS_MAX;

use super::backend::StorageBackend;
use super::envelope::StoredEnvelope;
use super::error::{StorageError, StorageResult};

/// PostgreSQL storage backend.
///
/// Connection pooling, explicit schema, no client error leakage.
pub struct PostgresBackend {
    url: Url,
    pool: Option<PgPool>,
}

// Manual impl so URL credentials never reach log output.
impl std::fmt::Debug for PostgresBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresBackend")
            .field("url", &super::error::scrub_url(&self.url))
            .field("connected", &self.pool.is_some())
            .finish()
    }
}

impl PostgresBackend {
    /// Create an unconnected backend for `url`.
    #[must_use]
    pub fn new(url: &Url) -> Self {
        Self {
            url: url.clone(),
            pool: None,
        }
    }

    fn pool(&self) -> StorageResult<&PgPool> {
        self.pool
            .as_ref()
            .ok_or_else(|| StorageError::connection("not connected to postgres"))
    }

    /// Create the records table if it does not exist.
    async fn init_schema(pool: &PgPool) -> StorageResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS external_records (
                id UUID NOT NULL,
                type_name TEXT NOT NULL,
                data JSONB NOT NULL,
                schema_version INTEGER NOT NULL DEFAULT 1,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (id, type_name)
            );
            CREATE INDEX IF NOT EXISTS idx_external_records_type
                ON external_records(type_name);
            ",
        )
        .execute(pool)
        .await
        .map_err(|e| StorageError::backend_with("failed to create schema", e))?;

        Ok(())
    }
}

fn row_to_envelope(row: &PgRow) -> StorageResult<StoredEnvelope> {
    let data: serde_json::Value = row
        .try_get("data")
        .map_err(|e| StorageError::backend_with("failed to read data column", e))?;

    let schema_version: i32 = row
        .try_get("schema_version")
        .map_err(|e| StorageError::backend_with("failed to read schema_version column", e))?;

    let created_at: DateTime<Utc> = row
        .try_get("created_at")
        .map_err(|e| StorageError::backend_with("failed to read created_at column", e))?;

    let updated_at: DateTime<Utc> = row
        .try_get("updated_at")
        .map_err(|e| StorageError::backend_with("failed to read updated_at column", e))?;

    Ok(StoredEnvelope {
        data,
        schema_version: schema_version.unsigned_abs(),
        created_at,
        updated_at,
    })
}

#[async_trait]
impl StorageBackend for PostgresBackend {
    async fn connect(&mut self) -> StorageResult<()> {
        if self.pool.is_some() {
            return Ok(());
        }

        let pool = PgPoolOptions::new()
            .max_connections(POSTGRES_POOL_CONNECTIONS_MAX)
            .connect(self.url.as_str())
            .await
            .map_err(|e| {
                StorageError::connection_with("failed to connect to postgres", &self.url, e)
            })?;

        Self::init_schema(&pool).await?;
        self.pool = Some(pool);
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.close().await;
        }
    }

    #[tracing::instrument(skip(self, envelope))]
    async fn save(
        &self,
        id: Uuid,
        type_name: &str,
        envelope: &StoredEnvelope,
    ) -> StorageResult<()> {
        assert!(!type_name.is_empty(), "type name cannot be empty");

        let pool = self.pool()?;

        // The conflict arm leaves created_at alone: updates keep the
        // record's original creation time.
        sqlx::query(
            r"
            INSERT INTO external_records
                (id, type_name, data, schema_version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id, type_name) DO UPDATE SET
                data = EXCLUDED.data,
                schema_version = EXCLUDED.schema_version,
                updated_at = EXCLUDED.updated_at
            ",
        )
        .bind(id)
        .bind(type_name)
        .bind(&envelope.data)
        .bind(envelope.schema_version as i32)
        .bind(envelope.created_at)
        .bind(envelope.updated_at)
        .execute(pool)
        .await
        .map_err(|e| StorageError::backend_with("failed to save record", e))?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn load(&self, id: Uuid, type_name: &str) -> StorageResult<Option<StoredEnvelope>> {
        assert!(!type_name.is_empty(), "type name cannot be empty");

        let pool = self.pool()?;

        let row = sqlx::query(
            r"
            SELECT data, schema_version, created_at, updated_at
            FROM external_records
            WHERE id = $1 AND type_name = $2
            ",
        )
        .bind(id)
        .bind(type_name)
        .fetch_optional(pool)
        .await
        .map_err(|e| StorageError::backend_with("failed to load record", e))?;

        match row {
            Some(row) => Ok(Some(row_to_envelope(&row)?)),
            None => Ok(None),
        }
    }
}

// =============================================================================
// Tests (require running Postgres)
// =============================================================================
