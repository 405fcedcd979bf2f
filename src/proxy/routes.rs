//! Proxy Routes
//!
//! Configures the Axum router for the caching proxy.

use axum::Router;
use tower_http::trace::TraceLayer;

use super::handlers::{proxy_handler, AppState};

/// Creates the router that sends every request through the cache.
///
/// # Middleware
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .fallback(proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
