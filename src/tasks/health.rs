//! Health Monitor
//!
//! Probes the repository on a fixed interval and publishes the outcome into a
//! shared [`HealthStatus`] that request handlers read without blocking.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::repository::ItemRepository;

// == Health Status ==
/// Binary up/down flag. One writer (the monitor), any number of readers.
///
/// Starts down until the first successful probe.
#[derive(Debug, Clone, Default)]
pub struct HealthStatus {
    up: Arc<AtomicBool>,
}

impl HealthStatus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }

    pub fn set(&self, up: bool) {
        self.up.store(up, Ordering::Release);
    }
}

// == Configuration ==
#[derive(Debug, Clone, Copy)]
pub struct HealthMonitorConfig {
    /// Time between probes
    pub interval: Duration,
    /// Upper bound on a single probe
    pub probe_timeout: Duration,
}

impl Default for HealthMonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            probe_timeout: Duration::from_secs(5),
        }
    }
}

/// Runs one probe and records the result.
async fn probe(repository: &dyn ItemRepository, status: &HealthStatus, probe_timeout: Duration) {
    let up = match timeout(probe_timeout, repository.ping()).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            error!(error = %e, "Repository health check failed");
            false
        }
        Err(_) => {
            error!(timeout_ms = probe_timeout.as_millis() as u64, "Repository health check timed out");
            false
        }
    };

    if up != status.is_up() {
        info!(up, "Repository health changed");
    }
    status.set(up);
}

// == Spawn ==
/// Spawns the probing loop. It ends when `shutdown` turns true or its sender
/// is dropped, and never starts when `shutdown` is already true.
///
/// A failed probe only affects the current tick; late ticks are skipped
/// rather than bunched.
pub fn spawn_health_monitor(
    repository: Arc<dyn ItemRepository>,
    status: HealthStatus,
    config: HealthMonitorConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        if *shutdown.borrow_and_update() {
            debug!("Health monitor cancelled before start");
            return;
        }
        info!(
            interval_ms = config.interval.as_millis() as u64,
            "Starting health monitor"
        );

        let mut ticker = interval(config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Health monitor shutting down");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    probe(repository.as_ref(), &status, config.probe_timeout).await;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use crate::models::{Item, ItemCreateInput, ListQuery, UpdateItemInput};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    /// Repository whose ping outcome is switched by the test.
    #[derive(Debug, Default)]
    struct SwitchableRepository {
        failing: AtomicBool,
        hang: AtomicBool,
        pings: AtomicUsize,
    }

    #[async_trait]
    impl ItemRepository for SwitchableRepository {
        async fn get_by_name(&self, name: &str, _account_id: &str) -> Result<Item> {
            Err(AppError::NotFound(name.to_string()))
        }

        async fn get_by_id(&self, id: &str, _account_id: &str) -> Result<Item> {
            Err(AppError::NotFound(id.to_string()))
        }

        async fn save(&self, _input: &ItemCreateInput, _account_id: &str) -> Result<Item> {
            Err(AppError::internal("unused"))
        }

        async fn update(&self, _input: &UpdateItemInput, _account_id: &str) -> Result<Item> {
            Err(AppError::internal("unused"))
        }

        async fn list(&self, _query: &ListQuery, _account_id: &str) -> Result<Vec<Item>> {
            Ok(Vec::new())
        }

        async fn delete(&self, _id: &str, _account_id: &str) -> Result<()> {
            Ok(())
        }

        async fn ping(&self) -> Result<()> {
            self.pings.fetch_add(1, Ordering::SeqCst);
            if self.hang.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.failing.load(Ordering::SeqCst) {
                Err(AppError::internal("connection refused"))
            } else {
                Ok(())
            }
        }
    }

    fn fast_config() -> HealthMonitorConfig {
        HealthMonitorConfig {
            interval: Duration::from_millis(20),
            probe_timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn test_status_starts_down() {
        let status = HealthStatus::new();
        assert!(!status.is_up());

        let reader = status.clone();
        status.set(true);
        assert!(reader.is_up());
    }

    #[test]
    fn test_default_config() {
        let config = HealthMonitorConfig::default();
        assert_eq!(config.interval, Duration::from_secs(1));
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_failing_pings_mark_down_then_recover() {
        let repo = Arc::new(SwitchableRepository::default());
        let status = HealthStatus::new();
        let (tx, rx) = watch::channel(false);

        let handle = spawn_health_monitor(repo.clone(), status.clone(), fast_config(), rx);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(status.is_up());

        repo.failing.store(true, Ordering::SeqCst);
        let before = repo.pings.load(Ordering::SeqCst);
        while repo.pings.load(Ordering::SeqCst) < before + 3 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!status.is_up());

        repo.failing.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(status.is_up());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_hanging_ping_times_out_as_down() {
        let repo = Arc::new(SwitchableRepository::default());
        repo.hang.store(true, Ordering::SeqCst);
        let status = HealthStatus::new();
        status.set(true);
        let (tx, rx) = watch::channel(false);

        let handle = spawn_health_monitor(repo.clone(), status.clone(), fast_config(), rx);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(!status.is_up());

        tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_before_start_never_probes() {
        let repo = Arc::new(SwitchableRepository::default());
        let (_tx, rx) = watch::channel(true);

        let handle = spawn_health_monitor(repo.clone(), HealthStatus::new(), fast_config(), rx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor should not start")
            .unwrap();
        assert_eq!(repo.pings.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_stops_when_sender_dropped() {
        let repo = Arc::new(SwitchableRepository::default());
        let (tx, rx) = watch::channel(false);

        let handle = spawn_health_monitor(repo, HealthStatus::new(), fast_config(), rx);
        drop(tx);

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor should stop")
            .unwrap();
    }
}
