//! Server Lifecycle
//!
//! Clear-cache mode, listener setup and graceful shutdown around the proxy
//! router.

use std::future::Future;
use std::time::Duration;

use anyhow::{bail, Context};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::proxy::{create_router, AppState};
use crate::tasks::spawn_cleanup_task;

/// Printed when the proxy is started in clear-cache mode.
pub const CLEAR_CACHE_MESSAGE: &str = "Cache cleared.";

/// Runs the proxy until `shutdown` resolves, or clears the cache and returns
/// immediately when `config.clear_cache` is set.
pub async fn run<F>(config: Config, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Some(error_msg) = config.validate() {
        bail!("Invalid configuration: {}", error_msg);
    }

    if config.clear_cache {
        clear_cache();
        return Ok(());
    }

    let addr = format!("{}:{}", config.host, config.server_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    serve(listener, &config, shutdown).await
}

/// Clear-cache mode.
///
/// The store only ever lives inside a serving process, so a fresh process
/// has nothing to drop; this reports success without touching the network.
pub fn clear_cache() {
    println!("{}", CLEAR_CACHE_MESSAGE);
    info!("Cache cleared, exiting without starting the listener");
}

/// Serves the proxy on an already bound listener until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, config: &Config, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState::from_config(config).context("failed to build origin client")?;
    info!(
        ttl_secs = config.cache_ttl,
        origin_timeout_secs = ?config.origin_timeout,
        "Cache store initialized"
    );

    let cleanup_handle = (config.cleanup_interval > 0).then(|| {
        spawn_cleanup_task(
            state.cache.clone(),
            Duration::from_secs(config.cleanup_interval),
        )
    });

    let app = create_router(state.clone());

    let local_addr = listener.local_addr()?;
    info!(
        "Caching proxy server started on {} and forwarding to {}",
        local_addr, config.origin
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("server error")?;

    if let Some(handle) = cleanup_handle {
        handle.abort();
    }

    let stats = state.cache.read().await.stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        expired = stats.expired,
        entries = stats.total_entries,
        hit_rate = stats.hit_rate(),
        "Server shutdown complete"
    );

    Ok(())
}
