//! Origin Module
//!
//! The upstream collaborator that cache misses are forwarded to.

mod client;

pub use client::{HttpOriginClient, OriginError};

use async_trait::async_trait;

/// Fetches a response body from the upstream server.
///
/// Only GET semantics are used against the origin; the inbound method and
/// body are not forwarded.
#[async_trait]
pub trait OriginClient: Send + Sync {
    /// GETs `url` and returns the body as text, or the reason it failed.
    async fn fetch(&self, url: &str) -> Result<String, OriginError>;
}
