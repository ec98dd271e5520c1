//! # Key-Value Repository
//!
//! Durable backing for the [`KeyValueStore`](checkout_core::ports::KeyValueStore)
//! port. The register mirrors the in-memory store into this table, so held
//! carts survive a restart.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

/// Repository for the `key_value` table.
#[derive(Debug, Clone)]
pub struct KeyValueRepository {
    pool: SqlitePool,
}

impl KeyValueRepository {
    /// Creates a new KeyValueRepository.
    pub fn new(pool: SqlitePool) -> Self {
        KeyValueRepository { pool }
    }

    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM key_value WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Inserts or replaces an entry.
    pub async fn put(&self, key: &str, value: &str) -> DbResult<()> {
        debug!(key = %key, bytes = value.len(), "Writing key-value entry");

        sqlx::query(
            r#"
            INSERT INTO key_value (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Removes an entry. Returns whether it existed.
    pub async fn remove(&self, key: &str) -> DbResult<bool> {
        debug!(key = %key, "Removing key-value entry");

        let result = sqlx::query("DELETE FROM key_value WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Keys starting with `prefix`, sorted.
    pub async fn keys_with_prefix(&self, prefix: &str) -> DbResult<Vec<String>> {
        // substr instead of LIKE so '_' and '%' in the prefix match literally
        let keys: Vec<String> = sqlx::query_scalar(
            "SELECT key FROM key_value WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }

    /// Every entry, sorted by key. Used to seed the in-memory store at startup.
    pub async fn load_all(&self) -> DbResult<Vec<(String, String)>> {
        let entries: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM key_value ORDER BY key")
                .fetch_all(&self.pool)
                .await?;
        Ok(entries)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
