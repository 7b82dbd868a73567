//! Key/value cache collaborator consumed by the fetchers.
//!
//! The store only moves strings around; freshness is decided by the reader
//! from the [`CacheEntry`] envelope timestamp.

use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::guards::MEMORY_CACHE_ENTRIES;
use crate::models::CacheEntry;

#[async_trait]
pub trait DocCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String);
    async fn clear(&self);
}

/// Read and decode an envelope; stale or undecodable entries count as misses.
pub async fn read_entry<T: DeserializeOwned>(
    cache: &dyn DocCache,
    key: &str,
    max_age: Duration,
) -> Option<T> {
    let raw = cache.get(key).await?;
    match serde_json::from_str::<CacheEntry<T>>(&raw) {
        Ok(entry) if entry.is_fresh(max_age) => Some(entry.data),
        Ok(_) => {
            debug!("cache entry {key} expired");
            None
        }
        Err(e) => {
            warn!("discarding undecodable cache entry {key}: {e}");
            None
        }
    }
}

/// Wrap `data` in a timestamped envelope and store it.
pub async fn write_entry<T: Serialize + Sync>(cache: &dyn DocCache, key: &str, data: &T) {
    match serde_json::to_string(&CacheEntry::new(data)) {
        Ok(raw) => cache.set(key, raw).await,
        Err(e) => warn!("failed to encode cache entry {key}: {e}"),
    }
}

/// Bounded in-process cache; the oldest insertion is evicted first.
pub struct MemoryCache {
    max_entries: usize,
    entries: Mutex<IndexMap<String, String>>,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries: max_entries.max(1),
            entries: Mutex::new(IndexMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(MEMORY_CACHE_ENTRIES)
    }
}

#[async_trait]
impl DocCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    async fn set(&self, key: &str, value: String) {
        let mut entries = self.entries.lock();
        // Re-inserting moves the key to the back of the eviction order.
        entries.shift_remove(key);
        entries.insert(key.to_string(), value);
        while entries.len() > self.max_entries {
            entries.shift_remove_index(0);
        }
    }

    async fn clear(&self) {
        self.entries.lock().clear();
    }
}
