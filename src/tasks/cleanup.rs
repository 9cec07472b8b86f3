//! TTL Cleanup Task
//!
//! Background task that periodically removes expired entries from the
//! in-process cache. Reads already purge lazily; this bounds memory held by
//! keys that are never read again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::InMemoryCache;

/// Spawns a background task that sweeps expired cache entries every
/// `cleanup_interval`.
///
/// # Returns
/// A JoinHandle that completes once `shutdown` turns true or its sender is
/// dropped.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(InMemoryCache::new());
/// let (tx, rx) = watch::channel(false);
/// let cleanup_handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(60), rx);
/// // Later, during shutdown:
/// tx.send(true)?;
/// cleanup_handle.await?;
/// ```
pub fn spawn_cleanup_task(
    cache: Arc<InMemoryCache>,
    cleanup_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            interval_secs = cleanup_interval.as_secs(),
            "Starting TTL cleanup task"
        );

        let mut ticker = interval(cleanup_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick fires immediately and the cache is empty at startup
        ticker.tick().await;

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("TTL cleanup task shutting down");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let removed = cache.sweep_expired().await;
                    if removed > 0 {
                        info!(removed, "TTL cleanup removed expired entries");
                    } else {
                        debug!("TTL cleanup: no expired entries found");
                    }
                }
            }
        }
    })
}
