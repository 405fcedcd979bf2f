//! Caching Proxy - A forward proxy with an in-memory response cache
//!
//! Forwards cache misses to a configured origin and serves repeated requests
//! from a TTL-bounded store keyed by the raw request URL.

pub mod cache;
pub mod config;
pub mod error;
pub mod origin;
pub mod proxy;
pub mod server;
pub mod tasks;

pub use config::{CliArgs, Config};
pub use proxy::AppState;
pub use tasks::spawn_cleanup_task;
