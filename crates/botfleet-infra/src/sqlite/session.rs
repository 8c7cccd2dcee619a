//! SQLite session backend.
//!
//! One row per `(identity, field)`, value stored as raw JSON text. The
//! engine owns decoding and its corruption tolerance; this backend only
//! guarantees that `store_all` is all-or-nothing.

use botfleet_core::session::SessionBackend;
use botfleet_types::error::RepositoryError;
use chrono::Utc;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionBackend`.
pub struct SqliteSessionBackend {
    pool: DatabasePool,
}

impl SqliteSessionBackend {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

impl SessionBackend for SqliteSessionBackend {
    async fn fetch(&self, identity: &str, field: &str) -> Result<Option<String>, RepositoryError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM bot_sessions WHERE identity = ? AND field = ?")
                .bind(identity)
                .bind(field)
                .fetch_optional(&self.pool.reader)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(row.map(|(value,)| value))
    }

    async fn store_all(
        &self,
        identity: &str,
        entries: &[(String, String)],
    ) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let now = Utc::now().to_rfc3339();
        for (field, value) in entries {
            sqlx::query(
                "INSERT INTO bot_sessions (identity, field, value, updated_at)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(identity, field) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )
            .bind(identity)
            .bind(field)
            .bind(value)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    async fn remove_all(&self, identity: &str, fields: &[String]) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        for field in fields {
            sqlx::query("DELETE FROM bot_sessions WHERE identity = ? AND field = ?")
                .bind(identity)
                .bind(field)
                .execute(&mut *tx)
                .await
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }
}
