//! Time-bounded cache of fetched records, shared by the view controllers.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use cached::{Cached, TimedSizedCache};
use tracing::debug;

use super::ClientConfig;
use crate::models::Car;

/// How long fetched data stays fresh.
pub const DEFAULT_TTL_SECS: u64 = 300;
const DEFAULT_CAPACITY: usize = 256;

/// A keyed cache whose entries expire after a fixed lifetime.
pub struct QueryCache<V> {
    entries: Mutex<TimedSizedCache<String, V>>,
    ttl_secs: u64,
}

impl<V: Clone> QueryCache<V> {
    pub fn new(ttl_secs: u64) -> Self {
        QueryCache {
            entries: Mutex::new(TimedSizedCache::with_size_and_lifespan(
                DEFAULT_CAPACITY,
                ttl_secs,
            )),
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, TimedSizedCache<String, V>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.entries().cache_get(&key.to_string()).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.entries().cache_set(key.into(), value);
    }

    pub fn invalidate(&self, key: &str) {
        self.entries().cache_remove(&key.to_string());
    }

    pub fn clear(&self) {
        self.entries().cache_clear();
    }

    /// Returns the fresh cached value, or runs `fetch` and caches its success.
    /// Errors are passed through and leave the cache untouched.
    pub async fn get_or_fetch<E, F, Fut>(&self, key: &str, fetch: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key) {
            debug!(cache_key = key, cache_result = "hit", "query cache");
            return Ok(hit);
        }
        debug!(cache_key = key, cache_result = "miss", "query cache");
        // The lock is released while fetching.
        let value = fetch().await?;
        self.insert(key, value.clone());
        Ok(value)
    }
}

/// Cache keys for per-entity data.
pub fn car_key(id: &str) -> String {
    format!("car:{}", id)
}

pub fn favorites_key(user_id: &str) -> String {
    format!("favorites:{}", user_id)
}

/// The caches the view layer reads through.
pub struct QueryClient {
    pub cars: QueryCache<Car>,
    pub favorites: QueryCache<Vec<Car>>,
}

impl QueryClient {
    pub fn new(ttl_secs: u64) -> Self {
        QueryClient {
            cars: QueryCache::new(ttl_secs),
            favorites: QueryCache::new(ttl_secs),
        }
    }

    /// Caches with the freshness window from `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.cache_ttl_secs)
    }

    /// Drop everything. Called on logout so one user's data never shows for the next.
    pub fn clear(&self) {
        self.cars.clear();
        self.favorites.clear();
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new(DEFAULT_TTL_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let cache: QueryCache<u32> = QueryCache::new(DEFAULT_TTL_SECS);
        let calls = AtomicUsize::new(0);
        for _ in 0..2 {
            let value: Result<u32, ()> = cache
                .get_or_fetch("k", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(value, Ok(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: QueryCache<u32> = QueryCache::new(DEFAULT_TTL_SECS);
        let failed: Result<u32, &str> = cache.get_or_fetch("k", || async { Err("down") }).await;
        assert_eq!(failed, Err("down"));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn test_query_client_uses_configured_ttl() {
        let mut config = ClientConfig::new("http://localhost:5000");
        assert_eq!(QueryClient::from_config(&config).cars.ttl_secs(), DEFAULT_TTL_SECS);

        config.cache_ttl_secs = 30;
        let queries = QueryClient::from_config(&config);
        assert_eq!(queries.cars.ttl_secs(), 30);
        assert_eq!(queries.favorites.ttl_secs(), 30);
    }

    #[test]
    fn test_invalidate_removes_entry() {
        let cache: QueryCache<u32> = QueryCache::new(DEFAULT_TTL_SECS);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.invalidate("a");
        assert!(cache.get("a").is_none());
        assert_eq!(cache.get("b"), Some(2));
        cache.clear();
        assert!(cache.get("b").is_none());
    }
}
