//! In-memory TTL response cache.
//!
//! Memoizes the results of expensive upstream lookups (resolved episode
//! sources, skip times, schedules, catalog listings). Entries are written once
//! and never updated in place; an expired entry is dropped the next time it is
//! read.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;

/// Entry in the response cache.
struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe TTL cache keyed by string.
///
/// Values are type-erased so one cache can serve every endpoint; a lookup
/// with the wrong type behaves like a miss.
#[derive(Default)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a live value, dropping it if it has expired.
    pub fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let now = Instant::now();
        {
            let entry = self.entries.get(key)?;
            if !entry.is_expired(now) {
                return Arc::clone(&entry.value).downcast::<T>().ok();
            }
        }
        // Stale; only remove it if nobody replaced it in the meantime.
        self.entries.remove_if(key, |_, e| e.is_expired(now));
        None
    }

    /// Store `value` under `key` for `ttl`.
    pub fn insert<T>(&self, key: impl Into<String>, value: T, ttl: Duration) -> Arc<T>
    where
        T: Send + Sync + 'static,
    {
        let value = Arc::new(value);
        self.entries.insert(
            key.into(),
            CacheEntry {
                value: Arc::clone(&value) as Arc<dyn Any + Send + Sync>,
                expires_at: Instant::now() + ttl,
            },
        );
        value
    }

    /// Return the cached value for `key`, or run `compute` and cache its
    /// result for `ttl`.
    pub async fn get_or_compute<T, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Arc<T>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(hit) = self.get::<T>(key) {
            tracing::trace!(key, "cache hit");
            return hit;
        }
        tracing::trace!(key, "cache miss");
        let value = compute().await;
        self.insert(key, value, ttl)
    }

    /// Like [`get_or_compute`](Self::get_or_compute) for fallible work.
    /// Errors are returned to the caller and never stored.
    pub async fn get_or_try_compute<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        compute: F,
    ) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(key) {
            tracing::trace!(key, "cache hit");
            return Ok(hit);
        }
        tracing::trace!(key, "cache miss");
        let value = compute().await?;
        Ok(self.insert(key, value, ttl))
    }

    /// Remove an entry from the cache.
    pub fn invalidate(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn hit_skips_compute() {
        let cache = ResponseCache::new();
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let v = cache
                .get_or_compute("k", Duration::from_secs(60), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    42u32
                })
                .await;
            assert_eq!(*v, 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn expired_entry_is_recomputed() {
        let cache = ResponseCache::new();
        cache.insert("k", 1u32, Duration::ZERO);

        let v = cache
            .get_or_compute("k", Duration::from_secs(60), || async { 2u32 })
            .await;
        assert_eq!(*v, 2);
    }

    #[tokio::test]
    async fn expired_entry_is_dropped_on_read() {
        let cache = ResponseCache::new();
        cache.insert("k", "v".to_string(), Duration::ZERO);
        assert_eq!(cache.len(), 1);
        assert!(cache.get::<String>("k").is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = ResponseCache::new();

        let err: Result<Arc<u32>, &str> = cache
            .get_or_try_compute("k", Duration::from_secs(60), || async { Err("boom") })
            .await;
        assert!(err.is_err());
        assert!(cache.is_empty());

        let ok: Result<Arc<u32>, &str> = cache
            .get_or_try_compute("k", Duration::from_secs(60), || async { Ok(7) })
            .await;
        assert_eq!(*ok.unwrap(), 7);
    }

    #[test]
    fn wrong_type_is_a_miss() {
        let cache = ResponseCache::new();
        cache.insert("k", 1u32, Duration::from_secs(60));
        assert!(cache.get::<String>("k").is_none());
        assert_eq!(*cache.get::<u32>("k").unwrap(), 1);
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = ResponseCache::new();
        cache.insert("k", 1u32, Duration::from_secs(60));
        cache.invalidate("k");
        assert!(cache.get::<u32>("k").is_none());
    }
}
