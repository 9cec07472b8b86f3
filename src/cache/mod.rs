//! Cache Module
//!
//! Key/value cache with per-key TTL, polymorphic over backend: an in-process
//! expiring map and a remote Redis store.

mod entry;
mod memory;
mod redis;


use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

// Re-export public types
pub use self::redis::{build_key, RedisCache, KEY_PREFIX};
pub use entry::CacheEntry;
pub use memory::InMemoryCache;

// == Cache Error Enum ==
/// Failures reported by cache backends.
///
/// `NotFound` and `Expired` are both misses for callers but stay distinct so
/// backends can report what actually happened.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not present
    #[error("key not found: {0}")]
    NotFound(String),

    /// Key present but past its expiration
    #[error("key expired: {0}")]
    Expired(String),

    /// Value could not be encoded or decoded
    #[error("cache serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend unavailable or returned an error
    #[error("cache backend error: {0}")]
    Backend(String),
}

impl CacheError {
    /// True for the two conditions that mean "nothing usable is stored".
    pub fn is_miss(&self) -> bool {
        matches!(self, CacheError::NotFound(_) | CacheError::Expired(_))
    }
}

// == Cache Trait ==
/// Byte-level cache operations.
///
/// Kept free of generics so backends can be used as `Arc<dyn Cache>`; typed
/// access goes through [`CacheExt`]. A zero `ttl` stores the entry without
/// expiration. Implementations synchronize internally and are shared across
/// concurrent callers.
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    /// Returns the stored bytes, or `NotFound`/`Expired`.
    async fn get_raw(&self, key: &str) -> Result<Vec<u8>, CacheError>;

    /// Stores bytes under `key`, replacing any previous entry.
    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Removes `key`. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

// == Typed Extension ==
/// JSON-typed get/set on top of [`Cache`].
pub trait CacheExt: Cache {
    /// Reads and decodes a value.
    fn get<'a, V>(&'a self, key: &'a str) -> impl Future<Output = Result<V, CacheError>> + Send + 'a
    where
        V: DeserializeOwned + Send + 'a,
    {
        async move {
            let data = self.get_raw(key).await?;
            Ok(serde_json::from_slice(&data)?)
        }
    }

    /// Encodes and stores a value. Nothing is written if encoding fails.
    fn set<'a, V>(
        &'a self,
        key: &'a str,
        value: &'a V,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), CacheError>> + Send + 'a
    where
        V: Serialize + Sync + ?Sized + 'a,
    {
        async move {
            let data = serde_json::to_vec(value)?;
            self.set_raw(key, data, ttl).await
        }
    }
}

// Blanket implementation for all types implementing Cache
impl<T: Cache + ?Sized> CacheExt for T {}
