//! Sync EOL gateway entry point.
//!
//! Connects the cache, keys the credential hasher, then starts the Axum
//! HTTP server with graceful shutdown. When the in-memory cache is in use a
//! background sweeper drops expired records and is cancelled on shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use synceol_cache::{Cache, MemoryCache};
use synceol_core::{CredentialHasher, RecordStore, SecretKey};

use synceol_server::config::{self, CacheBackendType, ServerConfig};
use synceol_server::routes;
use synceol_server::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config::log_level_from_env())),
        )
        .json()
        .init();

    let mut config = ServerConfig::from_env();

    info!(cache = config.cache_backend.name(), ttl_secs = config.record_ttl.as_secs(), "sync EOL gateway starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let (cache, sweeper) = connect_cache(&config, shutdown_rx).await?;

    let secret = config.secret.take().unwrap_or_else(|| {
        info!("no SYNCEOL_SECRET configured, generated a per-process credential secret");
        SecretKey::generate()
    });
    let hasher = CredentialHasher::new(&secret).context("failed to key credential hasher")?;
    drop(secret);

    let store = RecordStore::new(cache, hasher, config.cache_prefix.clone(), config.record_ttl);
    let state = Arc::new(
        AppState::new(store, &config.eol_alert).context("failed to render EOL alert")?,
    );

    let app = routes::build_router(state, config.max_concurrency);

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", config.bind_addr))?;

    info!(addr = %config.bind_addr, "sync EOL gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("server error")?;

    if let Some(handle) = sweeper {
        info!("waiting for cache sweeper to stop");
        let _ = tokio::time::timeout(Duration::from_secs(10), handle).await;
    }

    info!("sync EOL gateway stopped");
    Ok(())
}

/// Connect the configured cache. For the in-memory cache, also spawn the
/// expiry sweeper and return its handle.
async fn connect_cache(
    config: &ServerConfig,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<(Arc<dyn Cache>, Option<tokio::task::JoinHandle<()>>)> {
    match &config.cache_backend {
        CacheBackendType::Memory => {
            info!("using in-memory cache (records will not persist)");
            let cache = MemoryCache::new();
            let handle = tokio::spawn(cache_sweeper(
                cache.clone(),
                shutdown,
                config.sweep_interval,
            ));
            Ok((Arc::new(cache), Some(handle)))
        }
        #[cfg(feature = "redis-backend")]
        CacheBackendType::Redis { url } => {
            info!("using Redis cache");
            let cache = synceol_cache::RedisCache::connect(url)
                .await
                .context("failed to connect to Redis cache")?;
            Ok((Arc::new(cache), None))
        }
        #[cfg(not(feature = "redis-backend"))]
        CacheBackendType::Redis { .. } => {
            anyhow::bail!("Redis cache requested but feature 'redis-backend' is not enabled");
        }
    }
}

/// Periodically drop expired records from the in-memory cache.
async fn cache_sweeper(cache: MemoryCache, mut shutdown: watch::Receiver<bool>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    info!(interval_secs = every.as_secs(), "cache sweeper started");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let purged = cache.purge_expired().await;
                if purged > 0 {
                    debug!(purged, "expired records dropped");
                }
            }
            _ = shutdown.changed() => {
                info!("cache sweeper shutting down");
                return;
            }
        }
    }
}

/// Wait for SIGINT or SIGTERM, then broadcast shutdown.
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        if let Ok(mut sig) =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        {
            sig.recv().await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutdown signal received, stopping server");
    let _ = shutdown_tx.send(true);
}
