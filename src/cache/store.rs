//! Cache Store Module
//!
//! HashMap-backed response store with lazy TTL expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheEntry, CacheStats, Clock, SystemClock};
use crate::error::{ProxyError, Result};

// == Cache Store ==
/// Response store keyed by raw request URL.
///
/// Growth is unbounded; entries only leave through expiry or `clear`.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Performance statistics
    stats: CacheStats,
    /// TTL applied when `set` is called without one
    default_ttl: Duration,
    /// Time source for expiry decisions
    clock: Arc<dyn Clock>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store on the wall clock.
    pub fn new(default_ttl: Duration) -> Self {
        Self::with_clock(default_ttl, Arc::new(SystemClock))
    }

    /// Creates an empty store driven by `clock`.
    pub fn with_clock(default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: HashMap::new(),
            stats: CacheStats::new(),
            default_ttl,
            clock,
        }
    }

    /// TTL applied by `set(.., None)`.
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // == Set ==
    /// Inserts or overwrites the entry for `key`, expiring `ttl` from now.
    ///
    /// # Arguments
    /// * `key` - The raw request URL
    /// * `value` - The origin response body
    /// * `ttl` - Optional TTL (uses default_ttl if None)
    pub fn set(&mut self, key: String, value: String, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = CacheEntry::new(value, ttl, self.clock.now_ms());
        self.entries.insert(key, entry);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Get ==
    /// Retrieves the body stored under `key`.
    ///
    /// Expired entries are removed and reported as `Expired`; both that and
    /// `NotFound` count as misses.
    pub fn get(&mut self, key: &str) -> Result<String> {
        let now = self.clock.now_ms();

        let Some(entry) = self.entries.get(key) else {
            self.stats.record_miss();
            return Err(ProxyError::NotFound(key.to_string()));
        };

        if entry.is_expired(now) {
            self.entries.remove(key);
            self.stats.record_expired(1);
            self.stats.set_total_entries(self.entries.len());
            self.stats.record_miss();
            return Err(ProxyError::Expired(key.to_string()));
        }

        self.stats.record_hit();
        entry
            .value
            .clone()
            .ok_or_else(|| ProxyError::CorruptedEntry(key.to_string()))
    }

    // == Clear ==
    /// Removes every entry, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        self.stats.set_total_entries(0);
        count
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));

        let removed = before - self.entries.len();
        self.stats.record_expired(removed);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Places a raw entry into the map, bypassing `set`.
    #[cfg(test)]
    pub(crate) fn insert_entry(&mut self, key: String, entry: CacheEntry) {
        self.entries.insert(key, entry);
    }
}
