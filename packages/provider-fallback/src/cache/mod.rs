//! TTL result cache.
//!
//! Payloads are stored as JSON text under a [`CacheKey`]. The [`ResultCache`]
//! front end never fails a resolution: backend errors are logged and treated
//! as a miss.

mod key;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::CacheResult;
use crate::types::config::CacheConfig;
use crate::types::request::Payload;

pub use key::{normalize_query, normalize_url, CacheKey};
pub use memory::MemoryCacheStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCacheStore;

/// A stored payload with its lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: String,
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl CacheEntry {
    /// Valid iff `now - created_at < ttl`.
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.created_at).num_seconds();
        age < 0 || (age as u64) < self.ttl_seconds
    }
}

/// Backend storage for cache entries.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get an entry regardless of expiry.
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>>;

    /// Insert or replace an entry.
    async fn put(&self, entry: CacheEntry) -> CacheResult<()>;

    /// Delete one entry.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Delete every entry expired at `now`. Returns the number removed.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> CacheResult<usize>;

    /// Delete everything. Returns the number removed.
    async fn clear(&self) -> CacheResult<usize>;
}

/// Cache front end used by the coordinator.
pub struct ResultCache {
    store: Arc<dyn CacheStore>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl ResultCache {
    pub fn new(store: Arc<dyn CacheStore>, config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// Look up a payload. Expired entries are deleted and reported as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        if !self.config.enabled {
            return None;
        }

        let entry = match self.store.get(key.as_str()).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache lookup failed, treating as miss");
                return None;
            }
        };

        if !entry.is_valid(self.clock.now()) {
            debug!(key = %key, "Cache entry expired");
            if let Err(e) = self.store.delete(key.as_str()).await {
                warn!(key = %key, error = %e, "Failed to delete expired cache entry");
            }
            return None;
        }

        match serde_json::from_str(&entry.payload) {
            Ok(value) => {
                debug!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cached payload unreadable, dropping");
                let _ = self.store.delete(key.as_str()).await;
                None
            }
        }
    }

    /// Store a payload with the configured TTL. Empty payloads are skipped.
    pub async fn put<T: Serialize + Payload>(&self, key: &CacheKey, payload: &T) {
        self.put_with_ttl(key, payload, self.config.ttl).await
    }

    /// Store a payload with an explicit TTL.
    pub async fn put_with_ttl<T: Serialize + Payload>(
        &self,
        key: &CacheKey,
        payload: &T,
        ttl: Duration,
    ) {
        if !self.config.enabled || payload.is_empty() {
            return;
        }

        let encoded = match serde_json::to_string(payload) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to encode cache payload");
                return;
            }
        };

        let entry = CacheEntry {
            key: key.as_str().to_string(),
            payload: encoded,
            created_at: self.clock.now(),
            ttl_seconds: ttl.as_secs(),
        };

        if let Err(e) = self.store.put(entry).await {
            warn!(key = %key, error = %e, "Failed to store cache entry");
        }
    }

    /// Remove expired entries. Returns the number removed.
    pub async fn sweep_expired(&self) -> usize {
        match self.store.sweep_expired(self.clock.now()).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "Cache sweep failed");
                0
            }
        }
    }

    /// Remove every entry. Returns the number removed.
    pub async fn clear(&self) -> usize {
        match self.store.clear().await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "Cache clear failed");
                0
            }
        }
    }
}
