//! Cache Entry Module
//!
//! Defines the structure for individual cached origin responses.

use std::time::Duration;

// == Cache Entry ==
/// A cached origin response body and its expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored response body. `None` only if the store was corrupted.
    pub value: Option<String>,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry that expires `ttl` after `now_ms`.
    pub fn new(value: String, ttl: Duration, now_ms: u64) -> Self {
        Self {
            value: Some(value),
            created_at: now_ms,
            expires_at: now_ms.saturating_add(ttl.as_millis() as u64),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now_ms`.
    ///
    /// The entry is still valid at exactly `expires_at`; it expires strictly
    /// after that instant.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, zero once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64) -> u64 {
        self.expires_at.saturating_sub(now_ms)
    }
}
