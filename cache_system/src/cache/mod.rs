//! The [`Cache`] trait and its status types.

pub mod driver;
#[cfg(test)]
pub mod test_util;

use async_trait::async_trait;
use std::fmt::Debug;

/// Result status of [`Cache::get_with_status`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CacheGetStatus {
    /// The requested key was present in the underlying backend.
    Hit,

    /// The requested key was missing and had to be loaded, with no other
    /// request racing to load the same key.
    Miss,

    /// The requested key was missing but another request was already loading
    /// it; this request piggy-backed on that load.
    MissAlreadyLoading,
}

/// Result status of [`Cache::peek_with_status`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CachePeekStatus {
    /// The requested key was present in the underlying backend.
    Hit,

    /// The requested key was missing but another request was already loading
    /// it; this peek piggy-backed on that load.
    MissAlreadyLoading,
}

/// A cache that single-flights concurrent loads for the same key.
///
/// `get` always returns a value, loading it if necessary. `peek` only returns
/// a value if one is already cached or already being loaded by someone
/// else — it never triggers a new load, which lets callers probe a cache
/// without paying for a miss.
#[async_trait]
pub trait Cache: Debug + Send + Sync + 'static {
    /// Cache key.
    type K: Clone + Eq + std::hash::Hash + Debug + Ord + Send + 'static;
    /// Cache value.
    type V: Clone + Debug + Send + 'static;
    /// Extra, per-request data passed to the loader on a miss (e.g. a tracing span).
    type GetExtra: Debug + Send + 'static;
    /// Extra, per-request data passed to a peek.
    type PeekExtra: Debug + Send + 'static;

    /// Get the value for `k`, loading it on a miss.
    async fn get(&self, k: Self::K, extra: Self::GetExtra) -> Self::V {
        self.get_with_status(k, extra).await.0
    }

    /// Get the value for `k` together with the status describing how it was obtained.
    async fn get_with_status(&self, k: Self::K, extra: Self::GetExtra) -> (Self::V, CacheGetStatus);

    /// Look up `k` without triggering a new load.
    async fn peek(&self, k: Self::K, extra: Self::PeekExtra) -> Option<Self::V> {
        self.peek_with_status(k, extra).await.map(|(v, _)| v)
    }

    /// Look up `k` without triggering a new load, together with the status.
    async fn peek_with_status(
        &self,
        k: Self::K,
        extra: Self::PeekExtra,
    ) -> Option<(Self::V, CachePeekStatus)>;

    /// Side-load a value for `k`, short-circuiting any in-flight load for that key.
    async fn set(&self, k: Self::K, v: Self::V);
}
