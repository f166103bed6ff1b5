//! Query Cache
//!
//! Read-through memoization of aggregation results for a bounded time
//! window. Supports:
//! - TTL-based expiration (15 minutes by default)
//! - LRU eviction once `max_entries` is reached
//! - Miss coalescing: concurrent misses on the same fingerprint run the
//!   computation once; the other callers wait and read the stored value
//!
//! Errors are never cached: a failed computation leaves the slot empty and
//! waiting callers compute again, one at a time. A fingerprint's lock stays
//! registered while any caller holds or waits on it, so a caller arriving
//! after a failure queues behind the waiters instead of computing alongside.
//!
//! ```text
//! cached(key) ── hit ──────────────────────────────► value
//!     │
//!     └─ miss ─► lock(key) ─► re-check ── hit ─────► value (coalesced)
//!                                │
//!                                └─ miss ─► compute ─► store ─► value
//! ```

use crate::config::CacheSettings;
use crate::metrics::Recorder;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

// ============================================================================
// Cache Configuration
// ============================================================================

/// Configuration for result caching
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries (default: 10,000)
    pub max_entries: usize,

    /// Default TTL for cache entries (default: 15 minutes)
    pub default_ttl: Duration,

    /// Enable cache (default: true)
    pub enabled: bool,

    /// Metrics sink for lookups
    pub metrics: Recorder,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            default_ttl: Duration::from_secs(15 * 60),
            enabled: true,
            metrics: Recorder::default(),
        }
    }
}

impl CacheConfig {
    /// Set maximum entries
    pub fn with_max_entries(mut self, entries: usize) -> Self {
        self.max_entries = entries;
        self
    }

    /// Set default TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Disable caching
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Record lookups through `metrics`
    pub fn with_metrics(mut self, metrics: Recorder) -> Self {
        self.metrics = metrics;
        self
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            max_entries: settings.max_entries.max(1),
            default_ttl: settings.ttl(),
            enabled: settings.enabled,
            metrics: Recorder::default(),
        }
    }
}

// ============================================================================
// Fingerprint
// ============================================================================

/// Hash of every input that affects a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Fingerprint a value through its `Debug` representation
    ///
    /// Two values with the same `Debug` output share a fingerprint, so every
    /// result-affecting input must show up in it.
    pub fn of<T: Debug + ?Sized>(value: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        format!("{:?}", value).hash(&mut hasher);
        Fingerprint(hasher.finish())
    }

    /// Raw hash
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

// ============================================================================
// Cache Entry
// ============================================================================

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    ttl: Duration,
    last_accessed: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            ttl,
            last_accessed: now,
        }
    }

    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

// ============================================================================
// In-flight locks
// ============================================================================

type InFlightMap = DashMap<Fingerprint, Arc<tokio::sync::Mutex<()>>>;

/// Unregisters a fingerprint's lock once no caller holds a clone of it
///
/// Runs when a caller finishes, fails or is cancelled. Must be declared
/// before the caller's clone so that the clone is dropped first.
struct InFlightCleanup<'a> {
    map: &'a InFlightMap,
    key: Fingerprint,
}

impl Drop for InFlightCleanup<'_> {
    fn drop(&mut self) {
        // Clones are taken under the shard lock, so a count of one means
        // only the map still holds it
        self.map
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

// ============================================================================
// Query Cache
// ============================================================================

/// Cache statistics
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hits: AtomicU64,

    /// Lookups that ran the computation
    pub misses: AtomicU64,

    /// Lookups that waited on another caller's computation
    pub coalesced: AtomicU64,

    /// Entries dropped to make room
    pub evictions: AtomicU64,
}

/// TTL cache with miss coalescing
pub struct QueryCache<V> {
    /// Label used in metrics and logs
    name: &'static str,

    config: CacheConfig,

    entries: RwLock<HashMap<Fingerprint, CacheEntry<V>>>,

    /// One async lock per fingerprint currently being computed
    in_flight: InFlightMap,

    stats: CacheStats,
}

impl<V: Clone + Send + Sync> QueryCache<V> {
    /// Create a new cache
    pub fn new(name: &'static str, config: CacheConfig) -> Self {
        Self {
            name,
            config,
            entries: RwLock::new(HashMap::new()),
            in_flight: DashMap::new(),
            stats: CacheStats::default(),
        }
    }

    /// Read-through lookup with the default TTL
    pub async fn get_or_compute<F, Fut, E>(&self, key: Fingerprint, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        self.cached(key, self.config.default_ttl, compute).await
    }

    /// Read-through lookup
    ///
    /// Returns the cached value for `key` if it is fresh; otherwise runs
    /// `compute` (at most once across concurrent callers with the same key)
    /// and stores its `Ok` value for `ttl`.
    pub async fn cached<F, Fut, E>(&self, key: Fingerprint, ttl: Duration, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if !self.config.enabled {
            return compute().await;
        }

        if let Some(value) = self.lookup(key) {
            self.record("hit", &self.stats.hits);
            return Ok(value);
        }

        let _cleanup = InFlightCleanup {
            map: &self.in_flight,
            key,
        };
        let lock = self
            .in_flight
            .entry(key)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _held = lock.lock().await;

        // Another caller may have filled the slot while we waited
        if let Some(value) = self.lookup(key) {
            self.record("coalesced", &self.stats.coalesced);
            return Ok(value);
        }

        self.record("miss", &self.stats.misses);
        let result = compute().await;
        if let Ok(value) = &result {
            self.put_with_ttl(key, value.clone(), ttl);
        }
        result
    }

    /// Fresh value for `key`, if any (no statistics recorded)
    pub fn get(&self, key: Fingerprint) -> Option<V> {
        if !self.config.enabled {
            return None;
        }
        self.lookup(key)
    }

    /// Store a value with the default TTL
    pub fn put(&self, key: Fingerprint, value: V) {
        self.put_with_ttl(key, value, self.config.default_ttl)
    }

    /// Store a value with a custom TTL
    pub fn put_with_ttl(&self, key: Fingerprint, value: V, ttl: Duration) {
        if !self.config.enabled {
            return;
        }

        let mut entries = self.entries.write();
        if !entries.contains_key(&key) && entries.len() >= self.config.max_entries {
            self.evict(&mut entries);
        }
        entries.insert(key, CacheEntry::new(value, ttl));
    }

    /// Drop one entry
    pub fn invalidate(&self, key: Fingerprint) {
        self.entries.write().remove(&key);
    }

    /// Clear all cache entries
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Get number of cached entries (expired ones included until touched)
    pub fn entry_count(&self) -> usize {
        self.entries.read().len()
    }

    /// Get cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Get hit ratio (0.0 to 1.0), coalesced waits counted as hits
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.stats.hits.load(Ordering::Relaxed)
            + self.stats.coalesced.load(Ordering::Relaxed);
        let misses = self.stats.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    fn lookup(&self, key: Fingerprint) -> Option<V> {
        let mut entries = self.entries.write();
        match entries.get_mut(&key) {
            Some(entry) if entry.is_expired() => {
                entries.remove(&key);
                None
            },
            Some(entry) => {
                entry.last_accessed = Instant::now();
                Some(entry.value.clone())
            },
            None => None,
        }
    }

    /// Drop expired entries, then the least recently used one if still full
    fn evict(&self, entries: &mut HashMap<Fingerprint, CacheEntry<V>>) {
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired());
        let mut evicted = (before - entries.len()) as u64;

        if entries.len() >= self.config.max_entries {
            let lru = entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| *k);
            if let Some(k) = lru {
                entries.remove(&k);
                evicted += 1;
            }
        }

        if evicted > 0 {
            self.stats.evictions.fetch_add(evicted, Ordering::Relaxed);
            debug!(cache = self.name, evicted, "Cache eviction");
        }
    }

    fn record(&self, result: &'static str, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
        self.config.metrics.cache_lookup(self.name, result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn test_read_through() {
        let cache: QueryCache<u32> = QueryCache::new("test", CacheConfig::default());
        let key = Fingerprint::of("a");

        let v: Result<u32, ()> = cache.get_or_compute(key, || async { Ok(1) }).await;
        assert_eq!(v, Ok(1));
        let v: Result<u32, ()> = cache.get_or_compute(key, || async { Ok(2) }).await;
        assert_eq!(v, Ok(1));
        assert_eq!(cache.stats().hits.load(Ordering::Relaxed), 1);
        assert_eq!(cache.stats().misses.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: QueryCache<u32> = QueryCache::new("test", CacheConfig::default());
        let key = Fingerprint::of("a");

        let v: Result<u32, &str> = cache.get_or_compute(key, || async { Err("boom") }).await;
        assert_eq!(v, Err("boom"));
        let v: Result<u32, &str> = cache.get_or_compute(key, || async { Ok(3) }).await;
        assert_eq!(v, Ok(3));
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let cache: QueryCache<u32> = QueryCache::new("test", CacheConfig::default());
        let key = Fingerprint::of("a");
        cache.put_with_ttl(key, 1, Duration::from_millis(10));
        assert_eq!(cache.get(key), Some(1));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(cache.get(key), None);
    }

    #[tokio::test]
    async fn test_concurrent_misses_coalesce() {
        let cache: Arc<QueryCache<u32>> =
            Arc::new(QueryCache::new("test", CacheConfig::default()));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = Fingerprint::of("same");

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_compute(key, || async {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(50)).await;
                            Ok::<u32, ()>(42)
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_caller_after_failure_queues_behind_waiters() {
        let cache: Arc<QueryCache<u32>> =
            Arc::new(QueryCache::new("test", CacheConfig::default()));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let calls = Arc::new(AtomicUsize::new(0));
        let key = Fingerprint::of("retry");

        let spawn = |fail: bool| {
            let (cache, running, peak, calls) =
                (cache.clone(), running.clone(), peak.clone(), calls.clone());
            tokio::spawn(async move {
                cache
                    .get_or_compute(key, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                        if fail {
                            Err("boom")
                        } else {
                            Ok(7)
                        }
                    })
                    .await
            })
        };

        // leader fails at t=20 while a waiter is queued; the waiter computes
        // until t=40 and a late caller arrives at t=35
        let leader = spawn(true);
        tokio::time::sleep(Duration::from_millis(5)).await;
        let waiter = spawn(false);
        tokio::time::sleep(Duration::from_millis(30)).await;
        let late = spawn(false);

        assert_eq!(leader.await.unwrap(), Err("boom"));
        assert_eq!(waiter.await.unwrap(), Ok(7));
        assert_eq!(late.await.unwrap(), Ok(7));
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.in_flight.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_caller_releases_lock() {
        let cache: Arc<QueryCache<u32>> =
            Arc::new(QueryCache::new("test", CacheConfig::default()));
        let key = Fingerprint::of("cancelled");

        let task = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute(key, || async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok::<u32, ()>(1)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(cache.in_flight.len(), 1);

        task.abort();
        assert!(task.await.unwrap_err().is_cancelled());
        assert!(cache.in_flight.is_empty());

        let v: Result<u32, ()> = cache.get_or_compute(key, || async { Ok(2) }).await;
        assert_eq!(v, Ok(2));
    }

    #[test]
    fn test_lru_eviction() {
        let cache: QueryCache<u32> =
            QueryCache::new("test", CacheConfig::default().with_max_entries(2));
        cache.put(Fingerprint::of("a"), 1);
        std::thread::sleep(Duration::from_millis(2));
        cache.put(Fingerprint::of("b"), 2);
        std::thread::sleep(Duration::from_millis(2));
        assert_eq!(cache.get(Fingerprint::of("a")), Some(1));
        cache.put(Fingerprint::of("c"), 3);

        assert_eq!(cache.entry_count(), 2);
        assert_eq!(cache.get(Fingerprint::of("b")), None);
        assert_eq!(cache.get(Fingerprint::of("a")), Some(1));
    }

    #[test]
    fn test_disabled_cache_stores_nothing() {
        let cache: QueryCache<u32> = QueryCache::new("test", CacheConfig::default().disabled());
        cache.put(Fingerprint::of("a"), 1);
        assert_eq!(cache.get(Fingerprint::of("a")), None);
    }
}
