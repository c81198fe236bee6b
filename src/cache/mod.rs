//! # Chunk Cache
//!
//! A fixed-capacity least-recently-used map with an eviction callback.
//!
//! Recency order and O(1) lookup come from [`lru::LruCache`]. The cache enforces its own
//! capacity on top of an unbounded `LruCache` so that every capacity-driven removal goes
//! through the eviction callback, which runs *before* the entry leaves the map.
//!
//! All operations take a single mutex, so a cache can be shared between threads. The
//! eviction callback runs while that mutex is held and must not call back into the cache.
//!
//! | Operation        | Recency | Counters          | Callback |
//! |------------------|---------|-------------------|----------|
//! | `try_get*`       | yes     | hit or miss       | no       |
//! | `peek_with*`     | no      | none              | no       |
//! | `contains`       | no      | none              | no       |
//! | `promote`        | yes     | none              | no       |
//! | `put` (new key)  | yes     | eviction on overflow | on the LRU entry |
//! | `put` (same key) | yes     | none              | on the displaced value |
//! | `remove`/`clear` | n/a     | none              | no       |
//! | `evict_all`      | n/a     | none              | on every entry |
//! | `set_capacity`   | n/a     | eviction per entry | on every dropped entry |

use std::fmt;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::trace;
use lru::LruCache;

mod stats;

pub use stats::CacheStatistics;

/// Invoked with the key and value of an entry that is about to be removed.
pub type EvictionCallback<K, V> = Box<dyn FnMut(&K, &mut V) + Send>;

struct CacheInner<K: Hash + Eq, V> {
    entries: LruCache<K, V>,
    capacity: usize,
    on_evict: Option<EvictionCallback<K, V>>,
    statistics: CacheStatistics,
}

impl<K: Hash + Eq + Clone, V> CacheInner<K, V> {
    fn notify(&mut self, key: &K, value: &mut V) {
        if let Some(on_evict) = self.on_evict.as_mut() {
            on_evict(key, value);
        }
    }

    /// Runs the callback on the least recently used entry, then removes it.
    fn evict_lru(&mut self) -> Option<(K, V)> {
        let key = self.entries.peek_lru().map(|(key, _)| key.clone())?;
        if let (Some(on_evict), Some(value)) = (self.on_evict.as_mut(), self.entries.peek_mut(&key)) {
            on_evict(&key, value);
        }
        let evicted = self.entries.pop_lru();
        self.statistics.record_eviction();
        evicted
    }
}

/// Least-recently-used cache bounded by entry count.
pub struct ChunkCache<K: Hash + Eq, V> {
    inner: Mutex<CacheInner<K, V>>,
}

impl<K: Hash + Eq + Clone, V> ChunkCache<K, V> {
    /// Creates an empty cache without an eviction callback.
    ///
    /// A capacity of 0 is accepted: every `put` is immediately evicted.
    pub fn new(capacity: usize) -> Self {
        ChunkCache {
            inner: Mutex::new(CacheInner {
                entries: LruCache::unbounded(),
                capacity,
                on_evict: None,
                statistics: CacheStatistics::default(),
            }),
        }
    }

    /// Creates an empty cache that calls `on_evict` before removing an entry to make room.
    pub fn with_eviction_callback(
        capacity: usize,
        on_evict: impl FnMut(&K, &mut V) + Send + 'static,
    ) -> Self {
        let cache = Self::new(capacity);
        cache.set_eviction_callback(on_evict);
        cache
    }

    /// Installs or replaces the eviction callback.
    pub fn set_eviction_callback(&self, on_evict: impl FnMut(&K, &mut V) + Send + 'static) {
        self.lock().on_evict = Some(Box::new(on_evict));
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner<K, V>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a clone of the value for `key`, marking it most recently used.
    pub fn try_get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.try_get_with(key, |value| value.clone())
    }

    /// Runs `f` on the value for `key`, marking it most recently used.
    ///
    /// Counts a hit when the key is present and a miss otherwise.
    pub fn try_get_with<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        let mut inner = self.lock();
        let inner = &mut *inner;
        match inner.entries.get_mut(key) {
            Some(value) => {
                inner.statistics.record_hit();
                Some(f(value))
            }
            None => {
                inner.statistics.record_miss();
                None
            }
        }
    }

    /// Runs `f` on the value for `key` without touching recency or counters.
    pub fn peek_with<R>(&self, key: &K, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.lock().entries.peek(key).map(f)
    }

    /// Runs `f` on the value for `key` mutably, without touching recency or counters.
    pub fn peek_mut_with<R>(&self, key: &K, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        self.lock().entries.peek_mut(key).map(f)
    }

    /// Marks `key` most recently used without counting a hit. Returns whether it is cached.
    pub fn promote(&self, key: &K) -> bool {
        let mut inner = self.lock();
        if !inner.entries.contains(key) {
            return false;
        }
        inner.entries.promote(key);
        true
    }

    /// Runs `f` on every entry, most recently used first, without touching recency.
    pub fn peek_each(&self, mut f: impl FnMut(&K, &V)) {
        for (key, value) in self.lock().entries.iter() {
            f(key, value);
        }
    }

    /// Inserts or replaces the value for `key` and marks it most recently used.
    ///
    /// # Returns
    /// The entry that left the cache, if any, after the eviction callback has run on it:
    /// * the least recently used entry, when `key` is new and the cache is full
    /// * the displaced value, when `key` was already present
    /// * the given entry itself, when the capacity is 0
    pub fn put(&self, key: K, mut value: V) -> Option<(K, V)> {
        let mut inner = self.lock();

        if inner.capacity == 0 {
            inner.notify(&key, &mut value);
            inner.statistics.record_eviction();
            return Some((key, value));
        }

        if inner.entries.contains(&key) {
            let mut displaced = inner.entries.put(key.clone(), value)?;
            inner.notify(&key, &mut displaced);
            return Some((key, displaced));
        }

        let mut evicted = None;
        while inner.entries.len() >= inner.capacity {
            match inner.evict_lru() {
                Some(entry) => evicted = Some(entry),
                None => break,
            }
        }
        inner.entries.put(key, value);
        evicted
    }

    /// Whether `key` is cached, without touching recency or counters.
    pub fn contains(&self, key: &K) -> bool {
        self.lock().entries.contains(key)
    }

    /// Removes and returns the value for `key`. The eviction callback is not invoked.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.lock().entries.pop(key)
    }

    /// Removes every entry without invoking the eviction callback.
    ///
    /// The removed values are dropped; anything they own that needs explicit teardown is
    /// the caller's responsibility. Use [`evict_all`](Self::evict_all) to dispose through
    /// the callback instead.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Removes every entry, invoking the eviction callback on each, least recently used
    /// first. Does not count evictions. Returns the number of entries removed.
    pub fn evict_all(&self) -> usize {
        let mut inner = self.lock();
        let mut removed = 0;
        while let Some((key, mut value)) = inner.entries.pop_lru() {
            inner.notify(&key, &mut value);
            removed += 1;
        }
        trace!("Evicted all {} cache entries", removed);
        removed
    }

    /// Changes the capacity, evicting least recently used entries through the callback
    /// until the cache fits. Returns the evicted entries.
    pub fn set_capacity(&self, capacity: usize) -> Vec<(K, V)> {
        let mut inner = self.lock();
        inner.capacity = capacity;
        let mut evicted = Vec::new();
        while inner.entries.len() > capacity {
            match inner.evict_lru() {
                Some(entry) => evicted.push(entry),
                None => break,
            }
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Snapshot of the counters.
    pub fn statistics(&self) -> CacheStatistics {
        self.lock().statistics
    }

    pub fn reset_statistics(&self) {
        self.lock().statistics = CacheStatistics::default();
    }

    /// Keys ordered from most to least recently used.
    pub fn keys_by_recency(&self) -> Vec<K> {
        self.lock().entries.iter().map(|(key, _)| key.clone()).collect()
    }
}

impl<K: Hash + Eq + Clone, V> fmt::Debug for ChunkCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("ChunkCache")
            .field("len", &inner.entries.len())
            .field("capacity", &inner.capacity)
            .field("statistics", &inner.statistics)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_cache(capacity: usize) -> (ChunkCache<char, u32>, Arc<Mutex<Vec<(char, u32)>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let cache = ChunkCache::with_eviction_callback(capacity, move |key: &char, value: &mut u32| {
            sink.lock().unwrap().push((*key, *value));
        });
        (cache, log)
    }

    #[test]
    fn capacity_two_evicts_first_inserted() {
        let (cache, log) = recording_cache(2);

        assert!(cache.put('A', 1).is_none());
        assert!(cache.put('B', 2).is_none());
        assert_eq!(cache.put('C', 3), Some(('A', 1)));

        assert!(!cache.contains(&'A'));
        assert!(cache.contains(&'B'));
        assert!(cache.contains(&'C'));
        assert_eq!(*log.lock().unwrap(), vec![('A', 1)]);
        assert_eq!(cache.statistics().evictions, 1);
    }

    #[test]
    fn size_never_exceeds_capacity() {
        let cache = ChunkCache::new(3);
        for i in 0..50u32 {
            cache.put(i % 7, i);
            assert!(cache.len() <= 3);
        }
    }

    #[test]
    fn get_refreshes_recency() {
        let cache = ChunkCache::new(3);
        cache.put(1, "one");
        cache.put(2, "two");
        cache.put(3, "three");

        assert_eq!(cache.try_get(&1), Some("one"));
        cache.put(4, "four");
        cache.put(5, "five");

        assert!(cache.contains(&1));
        assert!(!cache.contains(&2));
        assert!(!cache.contains(&3));
    }

    #[test]
    fn promote_protects_entry_without_counting() {
        let (cache, log) = recording_cache(2);
        cache.put('A', 1);
        cache.put('B', 2);

        assert!(cache.promote(&'A'));
        assert!(!cache.promote(&'Z'));
        cache.put('C', 3);

        assert!(cache.contains(&'A'));
        assert_eq!(*log.lock().unwrap(), vec![('B', 2)]);
        let statistics = cache.statistics();
        assert_eq!((statistics.hits, statistics.misses), (0, 0));
    }

    #[test]
    fn contains_does_not_refresh_recency() {
        let cache = ChunkCache::new(2);
        cache.put(1, ());
        cache.put(2, ());
        assert!(cache.contains(&1));
        assert!(cache.peek_with(&1, |_| ()).is_some());

        assert_eq!(cache.put(3, ()), Some((1, ())));
    }

    #[test]
    fn statistics_count_every_lookup() {
        let cache = ChunkCache::new(2);
        cache.put("a", 1);

        let lookups = ["a", "b", "a", "c", "a"];
        for key in lookups {
            cache.try_get(&key);
        }

        let statistics = cache.statistics();
        assert_eq!(statistics.hits, 3);
        assert_eq!(statistics.misses, 2);
        assert_eq!(statistics.total_lookups(), lookups.len() as u64);
        assert!((statistics.hit_rate() - 0.6).abs() < 1e-9);

        cache.reset_statistics();
        assert_eq!(cache.statistics(), CacheStatistics::default());
    }

    #[test]
    fn callback_sees_entry_before_removal() {
        let observed_len: Arc<Mutex<Option<usize>>> = Arc::new(Mutex::new(None));
        let observed = Arc::clone(&observed_len);
        let chunk_cache = ChunkCache::with_eviction_callback(1, move |_key: &u8, value: &mut Vec<u8>| {
            *observed.lock().unwrap() = Some(value.len());
            value.clear();
        });

        chunk_cache.put(1, vec![1, 2, 3]);
        let (key, value) = chunk_cache.put(2, vec![4]).unwrap();

        assert_eq!(key, 1);
        assert!(value.is_empty());
        assert_eq!(*observed_len.lock().unwrap(), Some(3));
    }

    #[test]
    fn replacing_a_key_disposes_the_old_value_without_counting_eviction() {
        let (cache, log) = recording_cache(2);
        cache.put('A', 1);

        assert_eq!(cache.put('A', 2), Some(('A', 1)));
        assert_eq!(cache.try_get(&'A'), Some(2));
        assert_eq!(*log.lock().unwrap(), vec![('A', 1)]);
        assert_eq!(cache.statistics().evictions, 0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_capacity_rejects_everything() {
        let (cache, log) = recording_cache(0);

        assert_eq!(cache.put('A', 1), Some(('A', 1)));
        assert!(cache.is_empty());
        assert_eq!(*log.lock().unwrap(), vec![('A', 1)]);
    }

    #[test]
    fn clear_skips_callback_but_evict_all_does_not() {
        let (cache, log) = recording_cache(4);
        cache.put('A', 1);
        cache.put('B', 2);
        cache.clear();
        assert!(cache.is_empty());
        assert!(log.lock().unwrap().is_empty());

        cache.put('C', 3);
        cache.put('D', 4);
        assert_eq!(cache.evict_all(), 2);
        assert!(cache.is_empty());
        assert_eq!(*log.lock().unwrap(), vec![('C', 3), ('D', 4)]);
        assert_eq!(cache.statistics().evictions, 0);
    }

    #[test]
    fn remove_skips_callback() {
        let (cache, log) = recording_cache(2);
        cache.put('A', 1);

        assert_eq!(cache.remove(&'A'), Some(1));
        assert_eq!(cache.remove(&'A'), None);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn shrinking_capacity_evicts_oldest() {
        let (cache, log) = recording_cache(4);
        for (key, value) in [('A', 1), ('B', 2), ('C', 3), ('D', 4)] {
            cache.put(key, value);
        }

        let evicted = cache.set_capacity(2);

        assert_eq!(evicted, vec![('A', 1), ('B', 2)]);
        assert_eq!(*log.lock().unwrap(), evicted);
        assert_eq!(cache.capacity(), 2);
        assert_eq!(cache.keys_by_recency(), vec!['D', 'C']);
    }

    #[test]
    fn try_get_with_mutates_in_place() {
        let cache = ChunkCache::new(2);
        cache.put(1, 10);
        assert_eq!(cache.try_get_with(&1, |value| { *value += 1; *value }), Some(11));
        assert_eq!(cache.peek_with(&1, |value| *value), Some(11));
        assert_eq!(cache.peek_mut_with(&1, |value| { *value = 0; *value }), Some(0));
        assert_eq!(cache.statistics().hits, 1);
        assert_eq!(cache.try_get_with(&2, |value: &mut i32| *value), None);
    }

    #[test]
    fn shared_between_threads() {
        let cache = Arc::new(ChunkCache::new(64));
        let handles: Vec<_> = (0..4u32)
            .map(|t| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for i in 0..16 {
                        cache.put(t * 100 + i, i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 64);
    }
}
