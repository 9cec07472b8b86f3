//! Redis Cache Backend
//!
//! One network round-trip per operation. Keys are namespaced with
//! [`KEY_PREFIX`] so the service can share a Redis instance with other
//! applications. Expiration is delegated to Redis.
//!
//! The connection is opened on first use. Until it succeeds every operation
//! fails fast with [`CacheError::Backend`], which callers treat as a miss.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};
use tokio::sync::OnceCell;
use tracing::info;

use crate::cache::{Cache, CacheError};

/// Namespace prepended to every key written by this service.
pub const KEY_PREFIX: &str = "item-service:";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);
const CONNECT_RETRIES: usize = 1;
/// Upper bound on the pause between connection attempts, in milliseconds
const MAX_RETRY_DELAY_MS: u64 = 200;

/// Returns the namespaced Redis key for a cache key.
pub fn build_key(key: &str) -> String {
    format!("{}{}", KEY_PREFIX, key)
}

fn manager_config() -> ConnectionManagerConfig {
    ConnectionManagerConfig::new()
        .set_number_of_retries(CONNECT_RETRIES)
        .set_factor(1)
        .set_max_delay(MAX_RETRY_DELAY_MS)
        .set_connection_timeout(CONNECT_TIMEOUT)
        .set_response_timeout(RESPONSE_TIMEOUT)
}

/// Converts a TTL to the `PX` argument. PX rejects 0, so sub-millisecond
/// TTLs round up.
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

// == Redis Cache ==
/// Redis-backed cache sharing one multiplexed connection.
#[derive(Clone)]
pub struct RedisCache {
    client: Client,
    connection: Arc<OnceCell<ConnectionManager>>,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("key_prefix", &KEY_PREFIX)
            .field("connected", &self.connection.initialized())
            .finish()
    }
}

impl RedisCache {
    /// Creates a cache for `url` (e.g. `redis://:secret@127.0.0.1:6379/`).
    ///
    /// Only the URL is checked here; no connection is attempted.
    pub fn new(url: &str) -> Result<Self, CacheError> {
        let client = Client::open(url)
            .map_err(|e| CacheError::Backend(format!("Failed to create Redis client: {}", e)))?;

        Ok(Self {
            client,
            connection: Arc::new(OnceCell::new()),
        })
    }

    /// Returns the shared connection, opening it if needed.
    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let connection = self
            .connection
            .get_or_try_init(|| async {
                let connection =
                    ConnectionManager::new_with_config(self.client.clone(), manager_config())
                        .await
                        .map_err(|e| {
                            CacheError::Backend(format!("Failed to connect to Redis: {}", e))
                        })?;
                info!("Connected to Redis");
                Ok::<_, CacheError>(connection)
            })
            .await?;

        Ok(connection.clone())
    }

    /// Round-trips a PING to the server.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(format!("Redis ping failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        let mut conn = self.connection().await?;

        let result: Option<Vec<u8>> = conn
            .get(build_key(key))
            .await
            .map_err(|e| CacheError::Backend(format!("Failed to get key '{}': {}", key, e)))?;

        result.ok_or_else(|| CacheError::NotFound(key.to_string()))
    }

    async fn set_raw(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;

        let mut cmd = redis::cmd("SET");
        cmd.arg(build_key(key)).arg(value);
        if !ttl.is_zero() {
            cmd.arg("PX").arg(ttl_millis(ttl));
        }

        let _: () = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(format!("Failed to set key '{}': {}", key, e)))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.connection().await?;

        let _: i64 = conn
            .del(build_key(key))
            .await
            .map_err(|e| CacheError::Backend(format!("Failed to delete key '{}': {}", key, e)))?;

        Ok(())
    }
}
