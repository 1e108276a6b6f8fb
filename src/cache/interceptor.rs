//! Cache-aware middleware for read endpoints.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::store::CacheStore;
use crate::context::Context;
use crate::middleware::{Middleware, Next};
use crate::{Request, Response, StatusCode};

/// Derive the cache key of a request: the path plus the raw query string.
///
/// Nothing is normalized, so `?page=1&limit=10` and `?limit=10&page=1` are
/// different keys. A request without a query string is keyed by its bare path.
pub fn cache_key(request: &Request) -> String {
    match request.query_string() {
        Some(query) => format!("{}?{}", request.path(), query),
        None => request.path().to_owned(),
    }
}

/// Response cache middleware.
///
/// On a hit the stored payload is sent as `200 OK` JSON and the route handler
/// never runs. On a miss the request's emission function is wrapped so that
/// whatever JSON payload the handler emits is put into the store and then
/// forwarded unchanged. Status codes and headers are left alone, and any
/// emitted payload is cached, error bodies included, unless
/// [`success_only`](Self::success_only) is set.
///
/// `get` and the later `put` are not atomic: concurrent misses on one key all
/// reach the handler and the last emission wins.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use movie_catalog::cache::{CacheStore, ResponseCache};
/// use movie_catalog::middleware::from_middleware;
///
/// let store = Arc::new(CacheStore::with_default_ttl());
/// let layer = from_middleware(Arc::new(
///     ResponseCache::new(Arc::clone(&store)).with_ttl(Duration::from_secs(30)),
/// ));
/// ```
pub struct ResponseCache {
    store: Arc<CacheStore>,
    ttl: Option<Duration>,
    success_only: bool,
}

impl ResponseCache {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self {
            store,
            ttl: None,
            success_only: false,
        }
    }

    /// Store entries from this layer with `ttl` instead of the store default.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Only cache payloads emitted with a `2xx` status.
    #[must_use]
    pub fn success_only(mut self, enabled: bool) -> Self {
        self.success_only = enabled;
        self
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }
}

impl Middleware for ResponseCache {
    fn handle(&self, mut ctx: Context, next: Next) -> Pin<Box<dyn Future<Output = Response> + Send>> {
        let key = cache_key(ctx.request());

        if let Some(payload) = self.store.get(&key) {
            debug!(key = %key, "cache hit");
            return Box::pin(async move { Response::json(StatusCode::Ok, &payload) });
        }
        debug!(key = %key, "cache miss");

        let store = Arc::clone(&self.store);
        let ttl = self.ttl;
        let success_only = self.success_only;
        ctx.wrap_emitter(Arc::new(move |status: StatusCode, payload: &Value| {
            if success_only && !status.is_success() {
                return;
            }
            match ttl {
                Some(ttl) => store.put_with_ttl(key.clone(), payload.clone(), ttl),
                None => store.put(key.clone(), payload.clone()),
            }
        }));

        Box::pin(next.run(ctx))
    }
}
