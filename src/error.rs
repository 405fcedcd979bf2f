//! Error types for the caching proxy
//!
//! Every failure is translated into a response inside the request handler;
//! nothing here is allowed to take down the listener.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Body returned when a cached entry exists but carries no value.
pub const CORRUPTED_ENTRY_MESSAGE: &str = "Cached response is null.";

/// Prefix of the body returned when the origin fetch fails.
pub const ORIGIN_ERROR_PREFIX: &str = "Error fetching data from origin: ";

// == Proxy Error Enum ==
/// Unified error type for the proxy.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Key not present in the cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key present but past its expiry
    #[error("Key expired: {0}")]
    Expired(String),

    /// Entry found without a stored value
    #[error("Corrupted cache entry: {0}")]
    CorruptedEntry(String),

    /// Origin could not be reached or answered with a non-success status
    #[error("Error fetching data from origin: {0}")]
    OriginUnreachable(String),

    /// Request could not be mapped to a cache key
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ProxyError {
    /// Whether a lookup error should be handled as a cache miss.
    pub fn is_miss(&self) -> bool {
        matches!(
            self,
            ProxyError::NotFound(_) | ProxyError::Expired(_) | ProxyError::InvalidRequest(_)
        )
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ProxyError::NotFound(_) | ProxyError::Expired(_) => {
                (StatusCode::NOT_FOUND, self.to_string())
            }
            ProxyError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ProxyError::CorruptedEntry(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                CORRUPTED_ENTRY_MESSAGE.to_string(),
            ),
            ProxyError::OriginUnreachable(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        (status, message).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the proxy.
pub type Result<T> = std::result::Result<T, ProxyError>;
