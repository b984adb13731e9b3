//! Value factories invoked on a cache miss.

use async_trait::async_trait;
use std::fmt::Debug;

/// Produces a value for a cache key on a miss.
///
/// [`crate::cache::driver::CacheDriver`] guarantees that, for a given key, at
/// most one [`Loader::load`] call is in flight at a time: concurrent misses
/// for the same key share the first call's result (single-flight).
#[async_trait]
pub trait Loader: std::fmt::Debug + Send + Sync + 'static {
    /// Cache key.
    type K: Send + 'static;
    /// Cache value.
    type V: Send + 'static;
    /// Extra, per-request data that does not participate in the cache key
    /// (e.g. a tracing span).
    type Extra: Debug + Send + 'static;

    /// Load the value for `k`.
    async fn load(&self, k: Self::K, extra: Self::Extra) -> Self::V;
}

/// A [`Loader`] built from a closure, convenient in tests.
pub struct FunctionLoader<K, V, Extra, F> {
    function: F,
    _phantom: std::marker::PhantomData<fn(K, Extra) -> V>,
}

impl<K, V, Extra, F> FunctionLoader<K, V, Extra, F> {
    /// Wrap `function` as a [`Loader`].
    pub fn new(function: F) -> Self {
        Self {
            function,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<K, V, Extra, F> Debug for FunctionLoader<K, V, Extra, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionLoader").finish_non_exhaustive()
    }
}

#[async_trait]
impl<K, V, Extra, F, Fut> Loader for FunctionLoader<K, V, Extra, F>
where
    K: Send + 'static,
    V: Send + 'static,
    Extra: Debug + Send + 'static,
    F: Fn(K, Extra) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = V> + Send,
{
    type K = K;
    type V = V;
    type Extra = Extra;

    async fn load(&self, k: Self::K, extra: Self::Extra) -> Self::V {
        (self.function)(k, extra).await
    }
}
