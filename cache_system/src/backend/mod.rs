//! Storage backends for [`crate::cache::Cache`] implementations.

pub mod lru;
pub mod resource_consumption;

use std::{fmt::Debug, hash::Hash};

/// A simple, synchronous key/value store.
///
/// [`crate::cache::driver::CacheDriver`] is generic over this trait so the
/// same single-flight/loader machinery can sit on top of an unbounded
/// [`std::collections::HashMap`] in tests or a capacity-bounded
/// [`lru::LruBackend`] in production.
pub trait CacheBackend: Debug + Send + 'static {
    /// Cache key.
    type K: Clone + Eq + Hash + Debug + Ord + Send + 'static;
    /// Cache value.
    type V: Clone + Debug + Send + 'static;

    /// Look up `k`, returning a clone of the cached value if present.
    fn get(&mut self, k: &Self::K) -> Option<Self::V>;

    /// Insert or overwrite the entry for `k`.
    fn set(&mut self, k: Self::K, v: Self::V);

    /// Remove the entry for `k`, if any.
    fn remove(&mut self, k: &Self::K);

    /// Number of entries currently stored.
    fn len(&self) -> usize;

    /// `true` iff [`CacheBackend::len`] is zero.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> CacheBackend for std::collections::HashMap<K, V>
where
    K: Clone + Eq + Hash + Debug + Ord + Send + 'static,
    V: Clone + Debug + Send + 'static,
{
    type K = K;
    type V = V;

    fn get(&mut self, k: &Self::K) -> Option<Self::V> {
        std::collections::HashMap::get(self, k).cloned()
    }

    fn set(&mut self, k: Self::K, v: Self::V) {
        self.insert(k, v);
    }

    fn remove(&mut self, k: &Self::K) {
        std::collections::HashMap::remove(self, k);
    }

    fn len(&self) -> usize {
        std::collections::HashMap::len(self)
    }
}
