//! Item Service - multi-tenant item API with a cache-aside access layer

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use item_service::api::{create_router, AppState, StaticAuthenticator};
use item_service::cache::{Cache, InMemoryCache, RedisCache};
use item_service::config::{CacheProvider, Config, DataSource};
use item_service::repository::{
    InMemoryItemRepository, ItemRepository, MongoItemRepository, MySqlItemRepository,
};
use item_service::service::{ItemService, ServiceConfig};
use item_service::tasks::{spawn_cleanup_task, HealthMonitorConfig};

const MYSQL_MAX_CONNECTIONS: u32 = 10;

/// Main entry point for the item service.
///
/// # Startup Sequence
/// 1. Load `.env` and configuration
/// 2. Initialize tracing subscriber for logging
/// 3. Connect the repository and, when caching is enabled, the cache
/// 4. Build the service, which starts its health loop, and for the
///    in-process cache the TTL sweeper
/// 5. Serve HTTP until SIGINT/SIGTERM, then stop background tasks
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("Invalid configuration")?;

    // RUST_LOG overrides; DEBUG raises the default level
    let default_filter = if config.debug {
        "item_service=debug,tower_http=debug"
    } else {
        "item_service=info,tower_http=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        data_source = %config.data_source,
        cache_provider = %config.cache_provider,
        cache_enabled = config.cache_enabled,
        port = config.server_port,
        "Starting item service"
    );

    let repository = build_repository(&config).await?;
    let (cache, sweepable) = build_cache(&config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let service = ItemService::new(
        ServiceConfig {
            cache_enabled: config.cache_enabled,
            health: HealthMonitorConfig::default(),
        },
        repository,
        cache,
        shutdown_rx.clone(),
    )
    .map_err(|e| {
        anyhow!(
            "Failed to build item service: {} (CACHE_PROVIDER={})",
            e,
            config.cache_provider
        )
    })?;
    let service = Arc::new(service);

    let sweeper = sweepable.map(|memory_cache| {
        info!("Starting in-process cache sweeper");
        spawn_cleanup_task(memory_cache, config.cache_sweep_interval, shutdown_rx)
    });

    let auth = Arc::new(StaticAuthenticator::from_pairs(config.auth_tokens.clone()));
    let state = AppState::new(service, auth);
    let app = create_router(state, config.request_timeout);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("Server error")?;

    if let Some(handle) = sweeper {
        if let Err(e) = handle.await {
            warn!(error = %e, "Cache sweeper ended abnormally");
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn build_repository(config: &Config) -> anyhow::Result<Arc<dyn ItemRepository>> {
    let repository: Arc<dyn ItemRepository> = match config.data_source {
        DataSource::Mysql => {
            let url = config
                .mysql_connection
                .as_deref()
                .context("MYSQL_CONNECTION is not set")?;
            let repository = MySqlItemRepository::connect(url, MYSQL_MAX_CONNECTIONS).await?;
            repository.migrate().await?;
            Arc::new(repository)
        }
        DataSource::Mongo => {
            let uri = config.mongo_uri.as_deref().context("MONGO_URI is not set")?;
            let database = config.mongo_db.as_deref().context("MONGO_DB is not set")?;
            Arc::new(MongoItemRepository::connect(uri, database).await?)
        }
        DataSource::Memory => {
            warn!("Using in-process repository, data is lost on restart");
            Arc::new(InMemoryItemRepository::new())
        }
    };
    Ok(repository)
}

/// Returns the configured cache and, when it is the in-process backend, a
/// handle for the sweeper. Nothing is built while caching is disabled.
///
/// An unreachable Redis is logged and tolerated: cache operations fail and
/// the service falls back to the repository until Redis comes back.
async fn build_cache(
    config: &Config,
) -> anyhow::Result<(Option<Arc<dyn Cache>>, Option<Arc<InMemoryCache>>)> {
    if !config.cache_enabled {
        return Ok((None, None));
    }

    match config.cache_provider {
        CacheProvider::None => Ok((None, None)),
        CacheProvider::Memory => {
            let memory = Arc::new(InMemoryCache::new());
            let cache: Arc<dyn Cache> = memory.clone();
            Ok((Some(cache), Some(memory)))
        }
        CacheProvider::Redis => {
            let url = config.redis_url().context("REDIS_ADDR is not set")?;
            let cache = RedisCache::new(&url)?;
            if let Err(e) = cache.ping().await {
                warn!(error = %e, "Redis is unreachable, serving from the repository");
            }
            let cache: Arc<dyn Cache> = Arc::new(cache);
            Ok((Some(cache), None))
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, tells background tasks to stop and lets axum drain
/// in-flight requests.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    if shutdown_tx.send(true).is_err() {
        warn!("Background tasks already stopped");
    }
}
