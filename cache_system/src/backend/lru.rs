//! A capacity-bounded, least-recently-used [`CacheBackend`].

use super::{resource_consumption::Resource, CacheBackend};
use observability_deps::tracing::debug;
use parking_lot::Mutex;
use precise_metric::{Registry, U64Counter};
use precise_time::TimeProvider;
use std::{collections::HashMap, fmt::Debug, hash::Hash, sync::Arc};

/// Tracks how much of a bounded resource (byte size, entry count, ...) is in
/// use and exposes eviction bookkeeping (hit/miss/eviction counters) shared by
/// every [`LruBackend`] built on top of it.
///
/// A pool is constructed once per cache (see `ConnectionCache`,
/// `DocumentCache`, `ResultChunkCache` in the `dump_store`/`resolver` crates)
/// with that cache's configured capacity.
pub struct ResourcePool<S> {
    name: &'static str,
    limit: S,
    time_provider: Arc<dyn TimeProvider>,
    evictions: U64Counter,
    hits: U64Counter,
    misses: U64Counter,
}

impl<S: Resource> ResourcePool<S> {
    /// Create a new pool with the given name (used as a metric attribute) and
    /// capacity limit.
    pub fn new(
        name: &'static str,
        limit: S,
        time_provider: Arc<dyn TimeProvider>,
        metrics: Arc<Registry>,
    ) -> Self {
        Self {
            name,
            limit,
            time_provider,
            evictions: metrics.register_counter("cache_evictions", &[("cache", name)]),
            hits: metrics.register_counter("cache_hits", &[("cache", name)]),
            misses: metrics.register_counter("cache_misses", &[("cache", name)]),
        }
    }

    /// Name this pool was constructed with.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Configured capacity limit.
    pub fn limit(&self) -> S {
        self.limit
    }

    /// The time provider this pool was constructed with, exposed so backends
    /// can timestamp eviction decisions consistently.
    pub fn time_provider(&self) -> &Arc<dyn TimeProvider> {
        &self.time_provider
    }
}

impl<S: Debug> Debug for ResourcePool<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("name", &self.name)
            .field("limit", &self.limit)
            .finish()
    }
}

struct Entry<V, S> {
    value: V,
    size: S,
    tick: u64,
}

/// A [`CacheBackend`] that evicts the least-recently-used entry whenever
/// inserting would exceed its [`ResourcePool`]'s capacity.
///
/// "Recently used" is tracked by a monotonic tick bumped on every `get`/`set`,
/// not by wall-clock time — this keeps eviction order deterministic in tests
/// regardless of the configured [`precise_time::TimeProvider`].
pub struct LruBackend<K, V, S> {
    pool: Arc<ResourcePool<S>>,
    size_fn: Arc<dyn Fn(&V) -> S + Send + Sync>,
    entries: HashMap<K, Entry<V, S>>,
    used: S,
    tick: u64,
}

impl<K, V, S> LruBackend<K, V, S>
where
    K: Clone + Eq + Hash + Debug + Ord + Send + 'static,
    V: Clone + Debug + Send + 'static,
    S: Resource,
{
    /// Create a new, empty backend bounded by `pool`'s capacity, sizing each
    /// value with `size_fn`.
    pub fn new(pool: Arc<ResourcePool<S>>, size_fn: impl Fn(&V) -> S + Send + Sync + 'static) -> Self {
        Self {
            pool,
            size_fn: Arc::new(size_fn),
            entries: HashMap::new(),
            used: S::zero(),
            tick: 0,
        }
    }

    fn next_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Evict least-recently-used entries until `additional` more of the
    /// resource would fit under the pool's limit, or there is nothing left to
    /// evict.
    fn make_room_for(&mut self, additional: S) {
        while self.used + additional > self.pool.limit() {
            let Some(lru_key) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.tick)
                .map(|(k, _)| k.clone())
            else {
                break;
            };

            if let Some(evicted) = self.entries.remove(&lru_key) {
                self.used = self.used - evicted.size;
                self.pool.evictions.inc();
                debug!(cache = self.pool.name(), ?lru_key, "evicting cache entry");
            }
        }
    }
}

impl<K, V, S> CacheBackend for LruBackend<K, V, S>
where
    K: Clone + Eq + Hash + Debug + Ord + Send + 'static,
    V: Clone + Debug + Send + 'static,
    S: Resource,
{
    type K = K;
    type V = V;

    fn get(&mut self, k: &Self::K) -> Option<Self::V> {
        let tick = self.next_tick();
        match self.entries.get_mut(k) {
            Some(entry) => {
                entry.tick = tick;
                self.pool.hits.inc();
                Some(entry.value.clone())
            }
            None => {
                self.pool.misses.inc();
                None
            }
        }
    }

    fn set(&mut self, k: Self::K, v: Self::V) {
        let size = (self.size_fn)(&v);

        if let Some(old) = self.entries.remove(&k) {
            self.used = self.used - old.size;
        }

        self.make_room_for(size);

        let tick = self.next_tick();
        self.entries.insert(
            k,
            Entry {
                value: v,
                size,
                tick,
            },
        );
        self.used = self.used + size;
    }

    fn remove(&mut self, k: &Self::K) {
        if let Some(old) = self.entries.remove(k) {
            self.used = self.used - old.size;
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<K, V, S: Debug> Debug for LruBackend<K, V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruBackend")
            .field("pool", &self.pool.name)
            .field("used", &self.used)
            .field("len", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::resource_consumption::EntryCount;
    use precise_time::{SystemProvider, Time};

    fn test_pool(limit: usize) -> Arc<ResourcePool<EntryCount>> {
        Arc::new(ResourcePool::new(
            "test",
            EntryCount(limit),
            Arc::new(SystemProvider),
            Arc::new(Registry::new()),
        ))
    }

    #[test]
    fn evicts_least_recently_used_entry_over_capacity() {
        let mut backend: LruBackend<u32, String, EntryCount> =
            LruBackend::new(test_pool(2), |_| EntryCount(1));

        backend.set(1, "one".to_string());
        backend.set(2, "two".to_string());
        // touch `1` so `2` becomes the LRU entry
        assert_eq!(backend.get(&1), Some("one".to_string()));
        backend.set(3, "three".to_string());

        assert_eq!(backend.get(&2), None);
        assert_eq!(backend.get(&1), Some("one".to_string()));
        assert_eq!(backend.get(&3), Some("three".to_string()));
        assert_eq!(backend.len(), 2);
    }

    #[test]
    fn overwriting_a_key_does_not_double_count_its_size() {
        let mut backend: LruBackend<u32, String, EntryCount> =
            LruBackend::new(test_pool(1), |_| EntryCount(1));

        backend.set(1, "one".to_string());
        backend.set(1, "uno".to_string());

        assert_eq!(backend.get(&1), Some("uno".to_string()));
        assert_eq!(backend.len(), 1);
    }

    #[test]
    fn unbounded_pool_never_evicts() {
        let mut backend: LruBackend<u32, String, EntryCount> =
            LruBackend::new(test_pool(usize::MAX), |_| EntryCount(1));

        for i in 0..100u32 {
            backend.set(i, i.to_string());
        }

        assert_eq!(backend.len(), 100);
    }

    #[test]
    fn removed_entries_free_up_capacity() {
        let mut backend: LruBackend<u32, String, EntryCount> =
            LruBackend::new(test_pool(1), |_| EntryCount(1));

        backend.set(1, "one".to_string());
        backend.remove(&1);
        backend.set(2, "two".to_string());

        assert_eq!(backend.get(&1), None);
        assert_eq!(backend.get(&2), Some("two".to_string()));
    }

    #[test]
    fn time_provider_unused_time_still_accessible() {
        let pool = test_pool(1);
        let _ = pool.time_provider().now() >= Time::from_timestamp_millis(0);
    }
}
