//! In-Process Cache Backend
//!
//! HashMap storage behind an async RwLock. Expiration is checked on read and
//! expired entries are purged lazily; a background sweeper can also call
//! [`InMemoryCache::sweep_expired`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::{Cache, CacheEntry, CacheError};

// == In-Memory Cache ==
/// Concurrent in-process cache keyed by string.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    /// Key-value storage
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    // == Constructor ==
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    // == Sweep Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub async fn sweep_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    // == Length ==
    /// Returns the current number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    // == Is Empty ==
    /// Returns true if the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Err(CacheError::NotFound(key.to_string())),
                Some(entry) if !entry.is_expired() => return Ok(entry.value.clone()),
                Some(_) => {}
            }
        }

        // Expired: purge under the write lock, unless a writer replaced it meanwhile
        let mut entries = self.entries.write().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(key);
                debug!(key = %key, "Purged expired cache entry");
                Err(CacheError::Expired(key.to_string()))
            }
            Some(entry) => Ok(entry.value.clone()),
            None => Err(CacheError::Expired(key.to_string())),
        }
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry::new(value, ttl);
        self.entries.write().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
