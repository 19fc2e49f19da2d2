//! Bounded, keyed memoization for the clustering serving path.
//!
//! Pure memoization: for a fixed key and identical underlying data the
//! cached payload is equivalent to calling the compute function directly.
//! Eviction is FIFO by insertion order (not recency of access), capped at
//! [`DEFAULT_CAPACITY`] live entries, with an explicit wall-clock TTL
//! giving every entry a bounded lifetime.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Maximum number of live entries.
pub const DEFAULT_CAPACITY: usize = 20;
/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct CacheEntry<T> {
    key: String,
    payload: Arc<T>,
    inserted_at: Instant,
}

/// Bounded FIFO cache keyed by filter-derived strings.
///
/// Concurrent callers racing on the same missing key may each run the
/// compute function; that duplicate work is accepted rather than holding
/// a lock across a potentially multi-second computation.
pub struct ResultCache<T> {
    capacity: usize,
    ttl: Duration,
    entries: Mutex<VecDeque<CacheEntry<T>>>,
}

impl<T> ResultCache<T> {
    /// Creates a cache with an explicit capacity and entry lifetime.
    #[must_use]
    pub const fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            capacity,
            ttl,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Returns the cached payload for `key`, computing and inserting it
    /// on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the error from `compute`; nothing is inserted on failure,
    /// so a failing compute degrades to recomputing on every call.
    pub fn get_or_compute<E>(
        &self,
        key: &str,
        compute: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        if let Some(hit) = self.get(key) {
            log::info!("cache hit: {key}");
            return Ok(hit);
        }

        log::info!("cache miss, computing: {key}");
        let payload = Arc::new(compute()?);
        self.insert(key, Arc::clone(&payload));
        Ok(payload)
    }

    /// Returns a live cached payload for `key`, if present and unexpired.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        let entries = self.lock();
        entries
            .iter()
            .find(|e| e.key == key && e.inserted_at.elapsed() < self.ttl)
            .map(|e| Arc::clone(&e.payload))
    }

    /// Number of live (unexpired) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        let entries = self.lock();
        entries
            .iter()
            .filter(|e| e.inserted_at.elapsed() < self.ttl)
            .count()
    }

    /// Returns `true` if no live entry exists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, key: &str, payload: Arc<T>) {
        let mut entries = self.lock();

        // Drop expired entries and any stale entry under the same key so
        // the FIFO order reflects live insertions only.
        entries.retain(|e| e.key != key && e.inserted_at.elapsed() < self.ttl);

        entries.push_back(CacheEntry {
            key: key.to_string(),
            payload,
            inserted_at: Instant::now(),
        });

        while entries.len() > self.capacity {
            if let Some(evicted) = entries.pop_front() {
                log::debug!("evicting oldest cache entry: {}", evicted.key);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<CacheEntry<T>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for ResultCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::convert::Infallible;

    fn compute(value: u32) -> impl FnOnce() -> Result<u32, Infallible> {
        move || Ok(value)
    }

    #[test]
    fn returns_cached_payload_without_recomputing() {
        let cache: ResultCache<u32> = ResultCache::default();
        let first = cache.get_or_compute("k", compute(1)).unwrap();
        let second = cache
            .get_or_compute("k", || -> Result<u32, Infallible> {
                panic!("should not recompute a fresh key")
            })
            .unwrap();
        assert_eq!(*first, 1);
        assert_eq!(*second, 1);
    }

    #[test]
    fn inserting_25_keys_keeps_the_latest_20() {
        let cache: ResultCache<u32> = ResultCache::default();
        for i in 0..25 {
            cache.get_or_compute(&format!("key-{i}"), compute(i)).unwrap();
        }

        assert_eq!(cache.len(), 20);
        for i in 0..5 {
            assert!(cache.get(&format!("key-{i}")).is_none());
        }
        for i in 5..25 {
            assert!(cache.get(&format!("key-{i}")).is_some());
        }
    }

    #[test]
    fn eviction_is_fifo_not_lru() {
        let cache: ResultCache<u32> = ResultCache::new(2, DEFAULT_TTL);
        cache.get_or_compute("a", compute(1)).unwrap();
        cache.get_or_compute("b", compute(2)).unwrap();
        // Touching "a" must not save it from eviction.
        assert!(cache.get("a").is_some());
        cache.get_or_compute("c", compute(3)).unwrap();

        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn expired_entries_are_recomputed() {
        let cache: ResultCache<u32> = ResultCache::new(20, Duration::ZERO);
        cache.get_or_compute("k", compute(1)).unwrap();
        let recomputed = cache.get_or_compute("k", compute(2)).unwrap();
        assert_eq!(*recomputed, 2);
    }

    #[test]
    fn failed_compute_inserts_nothing() {
        let cache: ResultCache<u32> = ResultCache::default();
        let err: Result<Arc<u32>, &str> = cache.get_or_compute("k", || Err("boom"));
        assert!(err.is_err());
        assert!(cache.is_empty());

        let ok = cache.get_or_compute("k", compute(7)).unwrap();
        assert_eq!(*ok, 7);
    }
}
