//! Proxy Handler
//!
//! Hit/miss decision for every inbound request.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{OriginalUri, State},
    http::{HeaderValue, Uri},
    response::{IntoResponse, Response},
};
use tokio::sync::RwLock;
use tracing::{debug, error, instrument, warn};

use crate::cache::CacheStore;
use crate::config::Config;
use crate::error::{ProxyError, Result};
use crate::origin::{HttpOriginClient, OriginClient, OriginError};

/// Response header reporting whether the body came from the cache.
pub const X_CACHE: &str = "x-cache";

// == Cache Status ==
/// Where a successful response body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe cache store
    pub cache: Arc<RwLock<CacheStore>>,
    /// Upstream the misses are fetched from
    pub origin: Arc<dyn OriginClient>,
    /// Base URL the raw request URL is appended to
    pub origin_url: Arc<str>,
}

impl AppState {
    /// Creates a new AppState around an existing store and origin client.
    pub fn new(
        cache: CacheStore,
        origin: Arc<dyn OriginClient>,
        origin_url: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            cache: Arc::new(RwLock::new(cache)),
            origin,
            origin_url: origin_url.into(),
        }
    }

    /// Creates a new AppState from configuration, with a reqwest origin client.
    pub fn from_config(config: &Config) -> std::result::Result<Self, OriginError> {
        let cache = CacheStore::new(Duration::from_secs(config.cache_ttl));
        let origin = HttpOriginClient::new(config.origin_timeout.map(Duration::from_secs))?;
        Ok(Self::new(cache, Arc::new(origin), config.origin.as_str()))
    }

    /// Empties the cache, returning how many entries were dropped.
    pub async fn clear_cache(&self) -> usize {
        self.cache.write().await.clear()
    }
}

/// Derives the cache key from the raw request URL (path and query, untouched).
pub fn cache_key(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default()
}

/// Fallback handler for every method and path.
///
/// Writes exactly one response: the cached or freshly fetched body with an
/// `X-Cache` header, or a 500 describing what went wrong.
pub async fn proxy_handler(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let key = cache_key(&uri);

    match resolve(&state, &key).await {
        Ok((status, body)) => ([(X_CACHE, status.as_str())], body).into_response(),
        Err(err @ ProxyError::CorruptedEntry(_)) => {
            error!(key = %key, "cache entry found without a value");
            let mut response = err.into_response();
            response
                .headers_mut()
                .insert(X_CACHE, HeaderValue::from_static(CacheStatus::Hit.as_str()));
            response
        }
        Err(err) => err.into_response(),
    }
}

/// Serves `key` from the cache, falling back to the origin on a miss.
#[instrument(skip(state))]
async fn resolve(state: &AppState, key: &str) -> Result<(CacheStatus, String)> {
    let lookup = if key.is_empty() {
        Err(ProxyError::InvalidRequest("empty request URL".to_string()))
    } else {
        // Guard is released before any origin I/O.
        state.cache.write().await.get(key)
    };

    match lookup {
        Ok(body) => {
            debug!("cache hit");
            Ok((CacheStatus::Hit, body))
        }
        Err(err) if err.is_miss() => {
            debug!(reason = %err, "cache miss");
            let body = fetch_from_origin(state, key).await?;
            Ok((CacheStatus::Miss, body))
        }
        Err(err) => Err(err),
    }
}

/// Single GET against the origin; successful bodies are cached under `key`.
async fn fetch_from_origin(state: &AppState, key: &str) -> Result<String> {
    let url = format!("{}{}", state.origin_url, key);

    let body = state.origin.fetch(&url).await.map_err(|err| {
        warn!(url = %url, error = %err.detail(), "origin fetch failed");
        ProxyError::OriginUnreachable(err.detail())
    })?;

    if !key.is_empty() {
        state
            .cache
            .write()
            .await
            .set(key.to_string(), body.clone(), None);
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheEntry, ManualClock};
    use crate::error::{CORRUPTED_ENTRY_MESSAGE, ORIGIN_ERROR_PREFIX};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    const TTL: Duration = Duration::from_secs(300);
    const ORIGIN: &str = "http://origin.test";

    /// Origin that serves canned bodies and counts requests per URL.
    #[derive(Default)]
    struct StubOrigin {
        bodies: Mutex<HashMap<String, String>>,
        calls: Mutex<Vec<String>>,
        gate: Option<Arc<Notify>>,
    }

    impl StubOrigin {
        fn with(path: &str, body: &str) -> Self {
            let stub = Self::default();
            stub.serve(path, body);
            stub
        }

        fn serve(&self, path: &str, body: &str) {
            self.bodies
                .lock()
                .unwrap()
                .insert(format!("{}{}", ORIGIN, path), body.to_string());
        }

        fn calls_for(&self, path: &str) -> usize {
            let url = format!("{}{}", ORIGIN, path);
            self.calls.lock().unwrap().iter().filter(|u| **u == url).count()
        }
    }

    #[async_trait]
    impl OriginClient for StubOrigin {
        async fn fetch(&self, url: &str) -> std::result::Result<String, OriginError> {
            self.calls.lock().unwrap().push(url.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            let body = self.bodies.lock().unwrap().get(url).cloned();
            match body {
                Some(body) => Ok(body),
                None => Err(unreachable_error().await),
            }
        }
    }

    /// A genuine reqwest error from a refused connection.
    async fn unreachable_error() -> OriginError {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let err = reqwest::get(format!("http://{}/", addr)).await.unwrap_err();
        OriginError::from(err)
    }

    fn state_with(origin: Arc<StubOrigin>) -> AppState {
        AppState::new(CacheStore::new(TTL), origin, ORIGIN)
    }

    async fn request(state: &AppState, uri: &'static str) -> (StatusCode, Option<String>, String) {
        let response = proxy_handler(
            State(state.clone()),
            OriginalUri(Uri::from_static(uri)),
        )
        .await;

        let status = response.status();
        let cache = response
            .headers()
            .get(X_CACHE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, cache, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn test_cache_key_uses_raw_url() {
        assert_eq!(cache_key(&Uri::from_static("/foo")), "/foo");
        assert_eq!(cache_key(&Uri::from_static("/a?x=1&y=2")), "/a?x=1&y=2");
        assert_eq!(
            cache_key(&Uri::from_static("http://example.com/Path/?b=2&a=1")),
            "/Path/?b=2&a=1"
        );
        assert_eq!(cache_key(&Uri::from_static("example.com:443")), "");
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let origin = Arc::new(StubOrigin::with("/foo", "hello"));
        let state = state_with(origin.clone());

        let (status, cache, body) = request(&state, "/foo").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("MISS"));
        assert_eq!(body, "hello");

        let (status, cache, body) = request(&state, "/foo").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("HIT"));
        assert_eq!(body, "hello");

        assert_eq!(origin.calls_for("/foo"), 1);
    }

    #[tokio::test]
    async fn test_origin_failure_is_not_cached() {
        let origin = Arc::new(StubOrigin::default());
        let state = state_with(origin.clone());

        let (status, cache, body) = request(&state, "/bar").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(cache.is_none());
        assert!(body.starts_with(ORIGIN_ERROR_PREFIX));
        assert!(state.cache.read().await.is_empty());

        // Origin recovers; the next request fetches again instead of hitting.
        origin.serve("/bar", "back");
        let (status, cache, body) = request(&state, "/bar").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("MISS"));
        assert_eq!(body, "back");
        assert_eq!(origin.calls_for("/bar"), 2);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let origin = Arc::new(StubOrigin::with("/foo", "v1"));
        let clock = Arc::new(ManualClock::new(1_000_000));
        let state = AppState::new(
            CacheStore::with_clock(TTL, clock.clone()),
            origin.clone(),
            ORIGIN,
        );

        request(&state, "/foo").await;
        origin.serve("/foo", "v2");

        clock.advance(TTL + Duration::from_secs(1));
        let (status, cache, body) = request(&state, "/foo").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("MISS"));
        assert_eq!(body, "v2");
        assert_eq!(origin.calls_for("/foo"), 2);
    }

    #[tokio::test]
    async fn test_query_string_is_a_distinct_key() {
        let origin = Arc::new(StubOrigin::with("/a", "plain"));
        origin.serve("/a?x=1", "query");
        let state = state_with(origin.clone());

        request(&state, "/a").await;
        let (_, cache, body) = request(&state, "/a?x=1").await;
        assert_eq!(cache.as_deref(), Some("MISS"));
        assert_eq!(body, "query");
    }

    #[tokio::test]
    async fn test_corrupted_entry_returns_500() {
        let origin = Arc::new(StubOrigin::default());
        let state = state_with(origin.clone());
        {
            let mut entry = CacheEntry::new(String::new(), TTL, crate::cache::current_timestamp_ms());
            entry.value = None;
            state.cache.write().await.insert_entry("/broken".to_string(), entry);
        }

        let (status, cache, body) = request(&state, "/broken").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(cache.as_deref(), Some("HIT"));
        assert_eq!(body, CORRUPTED_ENTRY_MESSAGE);
        assert_eq!(origin.calls_for("/broken"), 0);
    }

    #[tokio::test]
    async fn test_empty_url_is_fetched_but_never_cached() {
        let origin = Arc::new(StubOrigin::with("", "root"));
        let state = state_with(origin.clone());

        let (status, cache, body) = request(&state, "example.com:443").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("MISS"));
        assert_eq!(body, "root");
        assert!(state.cache.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_pending_origin_fetch_does_not_block_hits() {
        let gate = Arc::new(Notify::new());
        let origin = Arc::new(StubOrigin {
            gate: Some(gate.clone()),
            ..StubOrigin::default()
        });
        origin.serve("/slow", "eventually");
        let state = state_with(origin.clone());
        state
            .cache
            .write()
            .await
            .set("/fast".to_string(), "cached".to_string(), None);

        let slow = tokio::spawn({
            let state = state.clone();
            async move { request(&state, "/slow").await }
        });

        // Wait until the slow request is parked inside the origin call.
        while origin.calls_for("/slow") == 0 {
            tokio::task::yield_now().await;
        }

        let (status, cache, body) =
            tokio::time::timeout(Duration::from_secs(5), request(&state, "/fast"))
                .await
                .expect("hit must not wait on the pending origin fetch");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("HIT"));
        assert_eq!(body, "cached");

        gate.notify_one();
        let (status, cache, body) = slow.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cache.as_deref(), Some("MISS"));
        assert_eq!(body, "eventually");
    }

    #[tokio::test]
    async fn test_concurrent_misses_may_both_fetch() {
        let origin = Arc::new(StubOrigin::with("/dup", "same"));
        let state = state_with(origin.clone());

        let (a, b) = tokio::join!(request(&state, "/dup"), request(&state, "/dup"));
        assert_eq!(a.2, "same");
        assert_eq!(b.2, "same");
        assert!((1..=2).contains(&origin.calls_for("/dup")));
        assert_eq!(state.cache.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let origin = Arc::new(StubOrigin::with("/foo", "hello"));
        let state = state_with(origin);

        request(&state, "/foo").await;
        assert_eq!(state.clear_cache().await, 1);

        let (_, cache, _) = request(&state, "/foo").await;
        assert_eq!(cache.as_deref(), Some("MISS"));
    }

    #[test]
    fn test_cache_status_labels() {
        assert_eq!(CacheStatus::Hit.as_str(), "HIT");
        assert_eq!(CacheStatus::Miss.as_str(), "MISS");
    }
}
