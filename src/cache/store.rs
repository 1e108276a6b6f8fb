//! TTL key/value table with eviction on read.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::trace;

/// TTL applied by [`CacheStore::put`] unless the store was built with another one.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    ttl: Duration,
}

impl<V> CacheEntry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.created_at + self.ttl
    }
}

/// Process-wide response cache: one entry per key, each with its own expiry.
///
/// Entries are only removed when a read finds them stale, or by an explicit
/// [`purge_expired`](Self::purge_expired) (which the optional sweeper calls).
/// Reads never refresh an entry's age.
///
/// Time comes from [`tokio::time::Instant`], so a paused test runtime controls
/// expiry.
///
/// # Examples
///
/// ```
/// use movie_catalog::cache::CacheStore;
/// use serde_json::json;
///
/// let store = CacheStore::with_default_ttl();
/// store.put("/movies/list-movies", json!([]));
/// assert_eq!(store.get("/movies/list-movies"), Some(json!([])));
/// assert_eq!(store.get("/movies/movies-genre"), None);
/// ```
#[derive(Debug)]
pub struct CacheStore<V = Value> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V: Clone> CacheStore<V> {
    /// Create an empty store whose [`put`](Self::put) uses `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Create an empty store with the one-hour [`DEFAULT_TTL`].
    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_TTL)
    }

    /// The TTL stamped on entries by [`put`](Self::put).
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Insert or overwrite `key` with the store's TTL.
    pub fn put(&self, key: impl Into<String>, value: V) {
        self.put_with_ttl(key, value, self.ttl);
    }

    /// Insert or overwrite `key` with a TTL of its own.
    pub fn put_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            created_at: Instant::now(),
            ttl,
        };
        self.lock().insert(key.into(), entry);
    }

    /// Return the value for `key` if it has not expired.
    ///
    /// A stale entry is removed as a side effect.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.lock();
        match entries.get(key) {
            Some(entry) if entry.is_fresh(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                trace!(key, "evicted stale cache entry on read");
                None
            }
            None => None,
        }
    }

    /// Whether an entry is stored for `key`, fresh or not. Does not evict.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of stored entries, including stale ones not yet evicted.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every stale entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        before - entries.len()
    }

    // A panic while holding the lock cannot leave a half-written entry behind,
    // so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<V: Clone> Default for CacheStore<V> {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}

/// Periodically purge stale entries from `store`.
///
/// Reads still evict on their own; the sweeper only bounds how long
/// never-read entries linger. Abort the returned handle to stop it.
pub fn spawn_sweeper<V>(store: Arc<CacheStore<V>>, interval: Duration) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = store.purge_expired();
            if removed > 0 {
                trace!(removed, remaining = store.len(), "cache sweep");
            }
        }
    })
}
