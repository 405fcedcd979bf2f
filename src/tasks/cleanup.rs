//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.
//! Lookups already treat expired entries as absent; this only bounds memory.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// # Arguments
/// * `cache` - shared reference to the cache
/// * `interval` - time between cleanup runs
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
pub fn spawn_cleanup_task(cache: Arc<RwLock<CacheStore>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let (removed, remaining) = {
                let mut cache_guard = cache.write().await;
                let removed = cache_guard.cleanup_expired();
                (removed, cache_guard.len())
            };

            if removed > 0 {
                info!(removed, remaining, "TTL cleanup: removed expired entries");
            } else {
                debug!(remaining, "TTL cleanup: no expired entries found");
            }
        }
    })
}
