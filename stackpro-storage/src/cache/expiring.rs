//! TTL cache over a sharded concurrent map.

use std::fmt::Display;
use std::hash::Hash;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use stackpro_core::clock::add_std;
use stackpro_core::{Clock, ResolutionKey, SystemClock, Timestamp, DEFAULT_CACHE_TTL};

use super::stats::CacheStats;

/// The cache shared by all resolvers, keyed by typed resolution keys.
pub type ResolutionCache<V> = ExpiringCache<ResolutionKey, V>;

/// One cached value with its timing metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    pub value: V,
    pub cached_at: Timestamp,
    pub expires_at: Timestamp,
}

impl<V> CacheEntry<V> {
    /// Logically present at `now`.
    pub fn is_live(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }
}

/// Process-local mapping from key to value plus absolute expiry.
///
/// All operations are infallible and safe to call concurrently. Expired
/// entries are dropped when read, by [`ExpiringCache::purge_expired`], by
/// [`ExpiringCache::clear`], and by a sweep that runs on write at most once per
/// default TTL. Stored entries are therefore bounded by what was written in
/// roughly the last two TTL windows, even for keys that are never read again.
pub struct ExpiringCache<K, V>
where
    K: Eq + Hash + Clone + Display,
    V: Clone,
{
    entries: DashMap<K, CacheEntry<V>>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
    /// Millisecond timestamp of the last write-path sweep.
    last_sweep_ms: AtomicI64,
}

impl<K, V> ExpiringCache<K, V>
where
    K: Eq + Hash + Clone + Display,
    V: Clone,
{
    /// Create a cache with the default TTL of 60 seconds.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_ttl(clock, DEFAULT_CACHE_TTL)
    }

    pub fn with_ttl(clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        let created_ms = clock.now().timestamp_millis();
        Self {
            entries: DashMap::new(),
            last_sweep_ms: AtomicI64::new(created_ms),
            clock,
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    /// Cache on the wall clock with the default TTL.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock))
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Get a live value; an expired entry is evicted and reported absent.
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_entry(key).map(|entry| entry.value)
    }

    /// Like [`ExpiringCache::get`] but keeps the timing metadata.
    pub fn get_entry(&self, key: &K) -> Option<CacheEntry<V>> {
        let now = self.clock.now();

        if let Some(entry) = self.entries.get(key) {
            if entry.is_live(now) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value().clone());
            }
            // Release the shard lock before removing.
            drop(entry);

            // A concurrent writer may have refreshed the entry in between.
            if self
                .entries
                .remove_if(key, |_, entry| !entry.is_live(now))
                .is_some()
            {
                self.expirations.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key = %key, "Evicted expired cache entry");
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert or overwrite with an explicit TTL.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let cached_at = self.clock.now();
        let entry = CacheEntry {
            value,
            cached_at,
            expires_at: add_std(cached_at, ttl),
        };
        self.entries.insert(key, entry);
        self.sweep_if_due(cached_at);
    }

    /// Purge expired entries if a full default TTL has passed since the last
    /// sweep. Only one concurrent writer wins the sweep.
    fn sweep_if_due(&self, now: Timestamp) {
        let now_ms = now.timestamp_millis();
        let last = self.last_sweep_ms.load(Ordering::Acquire);
        let interval_ms = i64::try_from(self.default_ttl.as_millis()).unwrap_or(i64::MAX);
        if now_ms.saturating_sub(last) < interval_ms {
            return;
        }
        if self
            .last_sweep_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let purged = self.purge_expired_at(now);
        if purged > 0 {
            tracing::debug!(purged, remaining = self.entries.len(), "Swept expired cache entries");
        }
    }

    /// Insert or overwrite with the default TTL.
    pub fn set_default(&self, key: K, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Remove one entry. Returns whether it was present.
    pub fn remove(&self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Remove every entry. Idempotent; returns the number removed.
    pub fn clear(&self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    /// Drop every expired entry now instead of waiting for a read.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(self.clock.now())
    }

    fn purge_expired_at(&self, now: Timestamp) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        let purged = before.saturating_sub(self.entries.len());
        self.expirations
            .fetch_add(purged as u64, Ordering::Relaxed);
        purged
    }

    /// Read-only snapshot. Expired entries are excluded but not evicted.
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_live(now))
            .map(|entry| entry.key().to_string())
            .collect();
        keys.sort();

        CacheStats {
            size: keys.len(),
            keys,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stored: self.entries.len(),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    /// Number of stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> std::fmt::Debug for ExpiringCache<K, V>
where
    K: Eq + Hash + Clone + Display,
    V: Clone,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringCache")
            .field("entries", &self.entries.len())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackpro_core::ManualClock;

    fn cache_with_clock() -> (ExpiringCache<String, u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let cache = ExpiringCache::new(clock.clone());
        (cache, clock)
    }

    #[test]
    fn test_default_ttl_is_sixty_seconds() {
        let (cache, _) = cache_with_clock();
        assert_eq!(cache.default_ttl(), Duration::from_millis(60_000));
    }

    #[test]
    fn test_get_returns_live_value() {
        let (cache, _) = cache_with_clock();
        cache.set_default("a".to_string(), 1);
        assert_eq!(cache.get(&"a".to_string()), Some(1));
    }

    #[test]
    fn test_get_missing_is_none() {
        let (cache, _) = cache_with_clock();
        assert_eq!(cache.get(&"missing".to_string()), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_expired_entry_is_absent_and_evicted() {
        let (cache, clock) = cache_with_clock();
        cache.set("a".to_string(), 1, Duration::from_secs(10));

        clock.advance(Duration::from_secs(9));
        assert_eq!(cache.get(&"a".to_string()), Some(1));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&"a".to_string()), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_set_overwrites_and_restarts_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.set("a".to_string(), 1, Duration::from_secs(10));
        clock.advance(Duration::from_secs(8));
        cache.set("a".to_string(), 2, Duration::from_secs(10));
        clock.advance(Duration::from_secs(8));
        assert_eq!(cache.get(&"a".to_string()), Some(2));
    }

    #[test]
    fn test_get_does_not_extend_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.set("a".to_string(), 1, Duration::from_secs(10));
        for _ in 0..9 {
            clock.advance(Duration::from_secs(1));
            assert_eq!(cache.get(&"a".to_string()), Some(1));
        }
        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get(&"a".to_string()), None);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (cache, _) = cache_with_clock();
        cache.set_default("a".to_string(), 1);
        cache.set_default("b".to_string(), 2);
        assert_eq!(cache.clear(), 2);
        assert_eq!(cache.clear(), 0);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_stats_does_not_mutate() {
        let (cache, clock) = cache_with_clock();
        cache.set("b".to_string(), 2, Duration::from_secs(100));
        cache.set("a".to_string(), 1, Duration::from_secs(100));
        cache.set("old".to_string(), 0, Duration::from_secs(1));
        clock.advance(Duration::from_secs(2));

        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        assert_eq!(stats.keys, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        // The expired entry is hidden but still stored.
        assert_eq!(cache.len(), 3);
        assert_eq!(stats.stored, 3);
        assert_eq!(cache.stats(), stats);
    }

    #[test]
    fn test_purge_expired() {
        let (cache, clock) = cache_with_clock();
        cache.set("short".to_string(), 1, Duration::from_secs(1));
        cache.set("long".to_string(), 2, Duration::from_secs(100));
        clock.advance(Duration::from_secs(5));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unread_expired_entries_are_swept_on_write() {
        let (cache, clock) = cache_with_clock();
        for i in 0..500 {
            cache.set_default(format!("tenant-{}", i), i);
        }
        clock.advance(Duration::from_secs(3600));
        for i in 0..10 {
            cache.set_default(format!("fresh-{}", i), i);
        }

        assert_eq!(cache.len(), 10);
        assert_eq!(cache.stats().size, 10);
        assert_eq!(cache.stats().stored, 10);
        assert_eq!(cache.stats().expirations, 500);
    }

    #[test]
    fn test_sweep_waits_for_a_full_ttl() {
        let (cache, clock) = cache_with_clock();
        cache.set("short".to_string(), 1, Duration::from_secs(1));
        clock.advance(Duration::from_secs(30));
        cache.set_default("other".to_string(), 2);

        // Expired but not yet swept: the last sweep was under a TTL ago.
        assert_eq!(cache.len(), 2);

        clock.advance(Duration::from_secs(30));
        cache.set_default("third".to_string(), 3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"short".to_string()), None);
    }

    #[test]
    fn test_remove() {
        let (cache, _) = cache_with_clock();
        cache.set_default("a".to_string(), 1);
        assert!(cache.remove(&"a".to_string()));
        assert!(!cache.remove(&"a".to_string()));
    }

    #[test]
    fn test_get_entry_metadata() {
        let (cache, clock) = cache_with_clock();
        let start = clock.now();
        cache.set("a".to_string(), 7, Duration::from_secs(30));
        let entry = cache.get_entry(&"a".to_string()).unwrap();
        assert_eq!(entry.cached_at, start);
        assert_eq!(
            entry.expires_at.signed_duration_since(start),
            chrono::Duration::seconds(30)
        );
    }

    #[test]
    fn test_concurrent_reads_and_clear() {
        let cache: Arc<ExpiringCache<String, u32>> = Arc::new(ExpiringCache::system());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for j in 0..200 {
                        let key = format!("k{}", (i * 200 + j) % 50);
                        cache.set_default(key.clone(), j);
                        let _ = cache.get(&key);
                        if j % 50 == 0 {
                            cache.clear();
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.stats().size <= 50);
    }

    proptest::proptest! {
        #[test]
        fn prop_entry_lives_exactly_its_ttl(ttl_secs in 1u64..600, elapsed_secs in 0u64..1200) {
            let (cache, clock) = cache_with_clock();
            cache.set("k".to_string(), 7, Duration::from_secs(ttl_secs));

            clock.advance(Duration::from_secs(elapsed_secs));
            let hit = cache.get(&"k".to_string());

            let expected = if elapsed_secs < ttl_secs { Some(7) } else { None };
            proptest::prop_assert_eq!(hit, expected);
        }
    }
}
