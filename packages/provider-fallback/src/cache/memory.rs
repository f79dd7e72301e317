//! In-memory cache backend.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{CacheEntry, CacheStore};
use crate::error::CacheResult;

/// Cache entries held in a map.
///
/// Default backend. Entries are lost on restart.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn put(&self, entry: CacheEntry) -> CacheResult<()> {
        self.write().insert(entry.key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.write().remove(key);
        Ok(())
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> CacheResult<usize> {
        let mut entries = self.write();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_valid(now));
        Ok(before - entries.len())
    }

    async fn clear(&self) -> CacheResult<usize> {
        let mut entries = self.write();
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }
}
