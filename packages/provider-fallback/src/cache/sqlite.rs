//! SQLite cache backend.
//!
//! Keeps cached results across restarts. Timestamps are stored as unix
//! milliseconds so expiry can be evaluated in SQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use super::{CacheEntry, CacheStore};
use crate::error::{CacheError, CacheResult};

/// SQLite-backed cache store.
pub struct SqliteCacheStore {
    pool: SqlitePool,
}

fn storage(e: sqlx::Error) -> CacheError {
    CacheError::Storage(Box::new(e))
}

impl SqliteCacheStore {
    /// Open (and migrate) a store at the given connection URL.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - ephemeral
    /// - `sqlite://./cache.db?mode=rwc` - file, created if missing
    pub async fn new(database_url: &str) -> CacheResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(storage)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// In-memory store for tests. A single connection keeps the data alive.
    pub async fn in_memory() -> CacheResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(storage)?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    async fn run_migrations(&self) -> CacheResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS result_cache (
                key TEXT PRIMARY KEY,
                payload TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                ttl_seconds INTEGER NOT NULL,
                expires_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_result_cache_expires_at ON result_cache(expires_at);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(Debug, FromRow)]
struct CacheRow {
    key: String,
    payload: String,
    created_at: i64,
    ttl_seconds: i64,
}

impl TryFrom<CacheRow> for CacheEntry {
    type Error = CacheError;

    fn try_from(row: CacheRow) -> CacheResult<Self> {
        let created_at = DateTime::<Utc>::from_timestamp_millis(row.created_at).ok_or_else(|| {
            CacheError::Storage(format!("invalid created_at for key {}", row.key).into())
        })?;
        Ok(CacheEntry {
            key: row.key,
            payload: row.payload,
            created_at,
            ttl_seconds: u64::try_from(row.ttl_seconds).unwrap_or(0),
        })
    }
}

#[async_trait]
impl CacheStore for SqliteCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        let row: Option<CacheRow> = sqlx::query_as(
            "SELECT key, payload, created_at, ttl_seconds FROM result_cache WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        row.map(CacheEntry::try_from).transpose()
    }

    async fn put(&self, entry: CacheEntry) -> CacheResult<()> {
        let created_at = entry.created_at.timestamp_millis();
        let ttl_seconds = i64::try_from(entry.ttl_seconds).unwrap_or(i64::MAX);
        let expires_at = created_at.saturating_add(ttl_seconds.saturating_mul(1000));

        sqlx::query(
            r#"
            INSERT INTO result_cache (key, payload, created_at, ttl_seconds, expires_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                payload = excluded.payload,
                created_at = excluded.created_at,
                ttl_seconds = excluded.ttl_seconds,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(&entry.key)
        .bind(&entry.payload)
        .bind(created_at)
        .bind(ttl_seconds)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        sqlx::query("DELETE FROM result_cache WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(())
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> CacheResult<usize> {
        let result = sqlx::query("DELETE FROM result_cache WHERE expires_at <= ?")
            .bind(now.timestamp_millis())
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(result.rows_affected() as usize)
    }

    async fn clear(&self) -> CacheResult<usize> {
        let result = sqlx::query("DELETE FROM result_cache")
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(result.rows_affected() as usize)
    }
}
