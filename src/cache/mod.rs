//! Cache Module
//!
//! In-memory response store with TTL expiration.

mod clock;
mod entry;
mod stats;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Public Constants ==
/// TTL shared by every cached response unless configured otherwise
pub const DEFAULT_TTL_SECS: u64 = 300;
