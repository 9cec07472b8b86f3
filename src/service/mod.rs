//! Item Service
//!
//! Cache-aside access to items. The repository is the source of truth; the
//! cache is consulted on reads and refreshed after writes. Cache failures are
//! logged and never surface to callers. Repository errors pass through
//! unchanged.

mod keys;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cache::{Cache, CacheExt};
use crate::error::Result;
use crate::models::{Item, ItemCreateInput, ListQuery, UpdateItemInput};
use crate::repository::ItemRepository;
use crate::tasks::{spawn_health_monitor, HealthMonitorConfig, HealthStatus};

pub use keys::{item_cache_key, list_cache_key};

/// TTL of a cached item
pub const ITEM_TTL: Duration = Duration::from_secs(60 * 60);
/// TTL of a cached list result
pub const LIST_TTL: Duration = Duration::from_secs(60);

// == Configuration ==
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceConfig {
    pub cache_enabled: bool,
    /// Probe cadence of the health loop started with the service
    pub health: HealthMonitorConfig,
}

/// Construction-time misconfiguration.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ServiceError {
    #[error("caching is enabled but no cache is configured")]
    CacheNotConfigured,
}

// == Item Service ==
/// Coordinator shared by all request handlers. Owns the health loop probing
/// its repository.
#[derive(Debug)]
pub struct ItemService {
    repository: Arc<dyn ItemRepository>,
    /// Present only when caching is enabled
    cache: Option<Arc<dyn Cache>>,
    health: HealthStatus,
    monitor: JoinHandle<()>,
}

impl ItemService {
    /// Builds the service and starts its health loop, which runs until
    /// `shutdown` turns true or the service is dropped. Fails when caching is
    /// enabled without a cache.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        config: ServiceConfig,
        repository: Arc<dyn ItemRepository>,
        cache: Option<Arc<dyn Cache>>,
        shutdown: watch::Receiver<bool>,
    ) -> std::result::Result<Self, ServiceError> {
        let cache = match (config.cache_enabled, cache) {
            (true, None) => return Err(ServiceError::CacheNotConfigured),
            (true, cache) => cache,
            (false, _) => None,
        };

        let health = HealthStatus::new();
        let monitor =
            spawn_health_monitor(repository.clone(), health.clone(), config.health, shutdown);

        Ok(Self {
            repository,
            cache,
            health,
            monitor,
        })
    }

    /// Whether the health loop has exited.
    pub fn monitor_finished(&self) -> bool {
        self.monitor.is_finished()
    }

    /// Shared readiness flag, written by the health monitor.
    pub fn health_status(&self) -> HealthStatus {
        self.health.clone()
    }

    /// Current readiness of the repository.
    pub fn health_check(&self) -> bool {
        self.health.is_up()
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_some()
    }

    // == Get By Name ==
    pub async fn get_by_name(&self, name: &str, account_id: &str) -> Result<Item> {
        let key = item_cache_key(name, account_id);

        if let Some(cache) = &self.cache {
            match cache.get::<Item>(&key).await {
                Ok(item) if item.name == name && item.account_id == account_id => {
                    debug!(key = %key, "Cache hit");
                    return Ok(item);
                }
                // Names and account ids may contain ':', so keys can collide
                Ok(_) => debug!(key = %key, "Cached entry belongs to another item"),
                Err(e) if e.is_miss() => debug!(key = %key, "Cache miss"),
                Err(e) => warn!(key = %key, error = %e, "Cache read failed, falling back to repository"),
            }
        }

        let item = self.repository.get_by_name(name, account_id).await?;
        self.populate(&key, &item, ITEM_TTL).await;
        Ok(item)
    }

    // == Create ==
    pub async fn create(&self, input: &ItemCreateInput, account_id: &str) -> Result<Item> {
        let item = self.repository.save(input, account_id).await?;

        if self.cache.is_some() {
            let key = item_cache_key(&item.name, account_id);
            self.populate(&key, &item, ITEM_TTL).await;
        }
        Ok(item)
    }

    // == Update ==
    /// Updates an item. With caching enabled, a rename drops the cache entry
    /// under the previous name before the new name is populated.
    pub async fn update(&self, input: &UpdateItemInput, account_id: &str) -> Result<Item> {
        let previous_name = match &self.cache {
            Some(_) => self.previous_name(&input.id, account_id).await,
            None => None,
        };

        let item = self.repository.update(input, account_id).await?;

        if let Some(cache) = &self.cache {
            if let Some(old) = previous_name.filter(|old| *old != item.name) {
                let old_key = item_cache_key(&old, account_id);
                if let Err(e) = cache.delete(&old_key).await {
                    warn!(key = %old_key, error = %e, "Failed to invalidate renamed item");
                }
            }
            let key = item_cache_key(&item.name, account_id);
            self.populate(&key, &item, ITEM_TTL).await;
        }
        Ok(item)
    }

    // == List ==
    pub async fn list(&self, query: &ListQuery, account_id: &str) -> Result<Vec<Item>> {
        let key = match &self.cache {
            Some(_) => match list_cache_key(query, account_id) {
                Ok(key) => Some(key),
                Err(e) => {
                    warn!(error = %e, "Failed to derive list cache key, bypassing cache");
                    None
                }
            },
            None => None,
        };

        if let (Some(cache), Some(key)) = (&self.cache, &key) {
            match cache.get::<Vec<Item>>(key).await {
                Ok(items) => {
                    debug!(key = %key, "Cache hit");
                    return Ok(items);
                }
                Err(e) if e.is_miss() => debug!(key = %key, "Cache miss"),
                Err(e) => warn!(key = %key, error = %e, "Cache read failed, falling back to repository"),
            }
        }

        let items = self.repository.list(query, account_id).await?;
        if let Some(key) = &key {
            self.populate(key, &items, LIST_TTL).await;
        }
        Ok(items)
    }

    // == Delete ==
    /// Deletes an item. The item's cache entry is left to expire on its own.
    pub async fn delete(&self, id: &str, account_id: &str) -> Result<()> {
        self.repository.delete(id, account_id).await
    }

    // == Helpers ==
    async fn populate<V>(&self, key: &str, value: &V, ttl: Duration)
    where
        V: serde::Serialize + Sync + ?Sized,
    {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(key, value, ttl).await {
                warn!(key = %key, error = %e, "Failed to populate cache");
            }
        }
    }

    async fn previous_name(&self, id: &str, account_id: &str) -> Option<String> {
        match self.repository.get_by_id(id, account_id).await {
            Ok(item) => Some(item.name),
            Err(e) => {
                debug!(id = %id, error = %e, "Could not read item before update");
                None
            }
        }
    }
}

impl Drop for ItemService {
    fn drop(&mut self) {
        self.monitor.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, InMemoryCache, RedisCache};
    use crate::error::AppError;
    use crate::models::{OrderBy, Sort};
    use crate::repository::InMemoryItemRepository;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // == Test Doubles ==
    /// Repository wrapper that counts calls per operation.
    #[derive(Debug, Default)]
    struct CountingRepository {
        inner: InMemoryItemRepository,
        get_by_name: AtomicUsize,
        list: AtomicUsize,
    }

    impl CountingRepository {
        fn get_by_name_calls(&self) -> usize {
            self.get_by_name.load(Ordering::SeqCst)
        }

        fn list_calls(&self) -> usize {
            self.list.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ItemRepository for CountingRepository {
        async fn get_by_name(&self, name: &str, account_id: &str) -> Result<Item> {
            self.get_by_name.fetch_add(1, Ordering::SeqCst);
            self.inner.get_by_name(name, account_id).await
        }

        async fn get_by_id(&self, id: &str, account_id: &str) -> Result<Item> {
            self.inner.get_by_id(id, account_id).await
        }

        async fn save(&self, input: &ItemCreateInput, account_id: &str) -> Result<Item> {
            self.inner.save(input, account_id).await
        }

        async fn update(&self, input: &UpdateItemInput, account_id: &str) -> Result<Item> {
            self.inner.update(input, account_id).await
        }

        async fn list(&self, query: &ListQuery, account_id: &str) -> Result<Vec<Item>> {
            self.list.fetch_add(1, Ordering::SeqCst);
            self.inner.list(query, account_id).await
        }

        async fn delete(&self, id: &str, account_id: &str) -> Result<()> {
            self.inner.delete(id, account_id).await
        }

        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    /// Cache whose every operation fails.
    #[derive(Debug)]
    struct BrokenCache;

    #[async_trait]
    impl Cache for BrokenCache {
        async fn get_raw(&self, _key: &str) -> std::result::Result<Vec<u8>, CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn set_raw(
            &self,
            _key: &str,
            _value: Vec<u8>,
            _ttl: Duration,
        ) -> std::result::Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn delete(&self, _key: &str) -> std::result::Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }
    }

    /// Shutdown receiver that keeps the health loop from starting.
    fn stopped_monitor() -> watch::Receiver<bool> {
        watch::channel(true).1
    }

    fn with_cache() -> ServiceConfig {
        ServiceConfig {
            cache_enabled: true,
            ..ServiceConfig::default()
        }
    }

    fn cached_service() -> (ItemService, Arc<CountingRepository>, Arc<InMemoryCache>) {
        let repo = Arc::new(CountingRepository::default());
        let cache = Arc::new(InMemoryCache::new());
        let service = ItemService::new(
            with_cache(),
            repo.clone(),
            Some(cache.clone()),
            stopped_monitor(),
        )
        .unwrap();
        (service, repo, cache)
    }

    // == Construction ==
    #[test]
    fn test_cache_enabled_without_cache_is_rejected() {
        let repo = Arc::new(InMemoryItemRepository::new());
        let result = ItemService::new(with_cache(), repo, None, stopped_monitor());
        assert_eq!(result.err(), Some(ServiceError::CacheNotConfigured));
    }

    #[tokio::test]
    async fn test_cache_disabled_ignores_cache() {
        let repo = Arc::new(InMemoryItemRepository::new());
        let service = ItemService::new(
            ServiceConfig::default(),
            repo,
            Some(Arc::new(InMemoryCache::new())),
            stopped_monitor(),
        )
        .unwrap();
        assert!(!service.cache_enabled());
        assert!(!service.health_check());
    }

    // == Health ==
    #[tokio::test]
    async fn test_health_loop_starts_with_service() {
        let (tx, rx) = watch::channel(false);
        let service = ItemService::new(
            ServiceConfig {
                health: HealthMonitorConfig {
                    interval: Duration::from_millis(20),
                    probe_timeout: Duration::from_millis(100),
                },
                ..ServiceConfig::default()
            },
            Arc::new(InMemoryItemRepository::new()),
            None,
            rx,
        )
        .unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            while !service.health_check() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("healthy repository should be reported up");

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), async {
            while !service.monitor_finished() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("health loop should stop on shutdown");
    }

    // == Reads ==
    #[tokio::test]
    async fn test_read_after_create_skips_repository() {
        let (service, repo, _) = cached_service();

        let created = service
            .create(&ItemCreateInput::new("widget", "blue"), "acct")
            .await
            .unwrap();
        let fetched = service.get_by_name("widget", "acct").await.unwrap();

        assert_eq!(fetched, created);
        assert_eq!(repo.get_by_name_calls(), 0);
    }

    #[tokio::test]
    async fn test_miss_populates_cache() {
        let (service, repo, cache) = cached_service();
        repo.inner
            .save(&ItemCreateInput::new("widget", "blue"), "acct")
            .await
            .unwrap();

        service.get_by_name("widget", "acct").await.unwrap();
        service.get_by_name("widget", "acct").await.unwrap();

        assert_eq!(repo.get_by_name_calls(), 1);
        assert!(cache.get_raw(&item_cache_key("widget", "acct")).await.is_ok());
    }

    #[tokio::test]
    async fn test_not_found_propagates_and_caches_nothing() {
        let (service, _, cache) = cached_service();

        let result = service.get_by_name("ghost", "acct").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_cache_disabled_always_reads_repository() {
        let repo = Arc::new(CountingRepository::default());
        let service =
            ItemService::new(ServiceConfig::default(), repo.clone(), None, stopped_monitor())
                .unwrap();

        service
            .create(&ItemCreateInput::new("widget", ""), "acct")
            .await
            .unwrap();
        service.get_by_name("widget", "acct").await.unwrap();
        service.get_by_name("widget", "acct").await.unwrap();

        assert_eq!(repo.get_by_name_calls(), 2);
    }

    #[tokio::test]
    async fn test_broken_cache_falls_through() {
        let repo = Arc::new(CountingRepository::default());
        let service = ItemService::new(
            with_cache(),
            repo.clone(),
            Some(Arc::new(BrokenCache)),
            stopped_monitor(),
        )
        .unwrap();

        let created = service
            .create(&ItemCreateInput::new("widget", "v"), "acct")
            .await
            .unwrap();
        let fetched = service.get_by_name("widget", "acct").await.unwrap();
        let updated = service
            .update(&UpdateItemInput::new(&created.id, "gadget", "v2"), "acct")
            .await
            .unwrap();
        let listed = service.list(&ListQuery::default(), "acct").await.unwrap();

        assert_eq!(fetched, created);
        assert_eq!(updated.version, 2);
        assert_eq!(listed.len(), 1);
        assert_eq!(repo.get_by_name_calls(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_through() {
        let repo = Arc::new(CountingRepository::default());
        let cache = RedisCache::new("redis://127.0.0.1:1/").unwrap();
        let service =
            ItemService::new(with_cache(), repo.clone(), Some(Arc::new(cache)), stopped_monitor())
                .unwrap();

        let fetched = tokio::time::timeout(Duration::from_secs(20), async {
            service
                .create(&ItemCreateInput::new("widget", "v"), "acct")
                .await
                .unwrap();
            service.get_by_name("widget", "acct").await.unwrap()
        })
        .await
        .expect("a dead cache should not stall requests");

        assert_eq!(fetched.value, "v");
        assert_eq!(repo.get_by_name_calls(), 1);
    }

    // == Writes ==
    #[tokio::test]
    async fn test_rename_invalidates_old_key() {
        let (service, repo, cache) = cached_service();

        let created = service
            .create(&ItemCreateInput::new("x", "v1"), "acct")
            .await
            .unwrap();
        service
            .update(&UpdateItemInput::new(&created.id, "y", "v1"), "acct")
            .await
            .unwrap();

        assert!(matches!(
            cache.get_raw(&item_cache_key("x", "acct")).await,
            Err(CacheError::NotFound(_))
        ));

        let result = service.get_by_name("x", "acct").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(repo.get_by_name_calls(), 1);

        let renamed = service.get_by_name("y", "acct").await.unwrap();
        assert_eq!(renamed.version, 2);
        assert_eq!(repo.get_by_name_calls(), 1);
    }

    #[tokio::test]
    async fn test_update_same_name_overwrites_entry() {
        let (service, repo, _) = cached_service();

        let created = service
            .create(&ItemCreateInput::new("x", "v1"), "acct")
            .await
            .unwrap();
        service
            .update(&UpdateItemInput::new(&created.id, "x", "v2"), "acct")
            .await
            .unwrap();

        let fetched = service.get_by_name("x", "acct").await.unwrap();
        assert_eq!(fetched.value, "v2");
        assert_eq!(fetched.version, 2);
        assert_eq!(repo.get_by_name_calls(), 0);
    }

    #[tokio::test]
    async fn test_version_lifecycle() {
        let (service, _, _) = cached_service();

        let created = service
            .create(&ItemCreateInput::new("x", "v1"), "acct")
            .await
            .unwrap();
        assert_eq!(created.version, 1);

        let second = service
            .update(&UpdateItemInput::new(&created.id, "x", "v2"), "acct")
            .await
            .unwrap();
        assert_eq!(second.version, 2);
        assert_eq!(second.id, created.id);
        assert_eq!(second.name, "x");

        let third = service
            .update(&UpdateItemInput::new(&created.id, "y", "v2"), "acct")
            .await
            .unwrap();
        assert_eq!(third.version, 3);

        assert!(matches!(
            service.get_by_name("x", "acct").await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(service.get_by_name("y", "acct").await.unwrap().id, created.id);
    }

    #[tokio::test]
    async fn test_update_foreign_tenant_is_not_found() {
        let (service, _, cache) = cached_service();

        let created = service
            .create(&ItemCreateInput::new("x", "v1"), "acct-a")
            .await
            .unwrap();
        let result = service
            .update(&UpdateItemInput::new(&created.id, "x", "stolen"), "acct-b")
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(cache.get_raw(&item_cache_key("x", "acct-b")).await.is_err());
        let kept = service.get_by_name("x", "acct-a").await.unwrap();
        assert_eq!(kept.value, "v1");
    }

    #[tokio::test]
    async fn test_duplicate_create_propagates() {
        let (service, _, _) = cached_service();

        service
            .create(&ItemCreateInput::new("x", ""), "acct")
            .await
            .unwrap();
        let result = service.create(&ItemCreateInput::new("x", ""), "acct").await;
        assert!(matches!(result, Err(AppError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let (service, _, _) = cached_service();

        service
            .create(&ItemCreateInput::new("widget", "a"), "acct-a")
            .await
            .unwrap();
        service
            .create(&ItemCreateInput::new("widget", "b"), "acct-b")
            .await
            .unwrap();

        assert_eq!(service.get_by_name("widget", "acct-a").await.unwrap().value, "a");
        assert_eq!(service.get_by_name("widget", "acct-b").await.unwrap().value, "b");
        assert!(service.get_by_name("widget", "acct-c").await.is_err());
    }

    #[tokio::test]
    async fn test_colliding_key_is_not_served_to_other_tenant() {
        let (service, repo, cache) = cached_service();

        // "a:b" in account "c" and "a" in account "b:c" share one key
        service
            .create(&ItemCreateInput::new("a:b", "secret"), "c")
            .await
            .unwrap();
        assert_eq!(item_cache_key("a:b", "c"), item_cache_key("a", "b:c"));

        let result = service.get_by_name("a", "b:c").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(repo.get_by_name_calls(), 1);

        repo.inner
            .save(&ItemCreateInput::new("a", "mine"), "b:c")
            .await
            .unwrap();
        let own = service.get_by_name("a", "b:c").await.unwrap();
        assert_eq!(own.value, "mine");
        assert_eq!(own.account_id, "b:c");

        let original = service.get_by_name("a:b", "c").await.unwrap();
        assert_eq!(original.value, "secret");
        assert!(cache.get_raw(&item_cache_key("a", "b:c")).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_leaves_cached_item() {
        let (service, _, cache) = cached_service();

        let created = service
            .create(&ItemCreateInput::new("x", ""), "acct")
            .await
            .unwrap();
        service.delete(&created.id, "acct").await.unwrap();

        // Stale until the item TTL runs out
        assert!(cache.get_raw(&item_cache_key("x", "acct")).await.is_ok());
        assert!(service.delete(&created.id, "acct").await.is_ok());
    }

    // == Lists ==
    #[tokio::test]
    async fn test_list_is_cached_per_query() {
        let (service, repo, _) = cached_service();
        service
            .create(&ItemCreateInput::new("a", ""), "acct")
            .await
            .unwrap();

        let query = ListQuery::new(Sort::Asc, OrderBy::Name, 0);
        let first = service.list(&query, "acct").await.unwrap();
        let second = service.list(&query, "acct").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(repo.list_calls(), 1);

        service
            .list(&ListQuery::new(Sort::Desc, OrderBy::Name, 0), "acct")
            .await
            .unwrap();
        service.list(&query, "other").await.unwrap();
        assert_eq!(repo.list_calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_list_is_empty_vec() {
        let (service, _, _) = cached_service();
        let items = service.list(&ListQuery::default(), "acct").await.unwrap();
        assert!(items.is_empty());
    }
}
