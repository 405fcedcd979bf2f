//! Proxy Module
//!
//! Request handling and routing for the caching proxy.
//!
//! Every method and path is served by a single fallback handler; the raw URL
//! is the cache key and the only part of the request that matters.

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
