//! Shared test harness for [`crate::cache::Cache`] implementations.

use crate::loader::Loader;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::{collections::VecDeque, fmt::Debug, sync::Arc};
use tokio::sync::Barrier;

use super::Cache;

/// A [`Loader`] for `K=u8, V=String, Extra=bool` that lets tests control
/// exactly when a load finishes and count how many times it actually ran.
#[derive(Debug)]
pub struct TestLoader {
    inner: Mutex<TestLoaderInner>,
}

#[derive(Debug)]
struct TestLoaderInner {
    loaded: Vec<(u8, bool)>,
    blocking: Option<Arc<Barrier>>,
}

impl TestLoader {
    /// A loader that resolves immediately, returning `k` rendered as a string.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(TestLoaderInner {
                loaded: Vec::new(),
                blocking: None,
            }),
        })
    }

    /// Make the next `load` call wait on a 2-party barrier, so the test can
    /// line up a concurrent second request before releasing the first.
    pub fn block_next(self: &Arc<Self>) -> Arc<Barrier> {
        let barrier = Arc::new(Barrier::new(2));
        self.inner.lock().blocking = Some(Arc::clone(&barrier));
        barrier
    }

    /// All `(key, extra)` pairs that actually reached the loader, in order.
    pub fn loaded(&self) -> Vec<(u8, bool)> {
        self.inner.lock().loaded.clone()
    }

    /// Number of times the loader actually ran (as opposed to being
    /// single-flighted).
    pub fn load_count(&self) -> usize {
        self.inner.lock().loaded.len()
    }
}

#[async_trait]
impl Loader for TestLoader {
    type K = u8;
    type V = String;
    type Extra = bool;

    async fn load(&self, k: Self::K, extra: Self::Extra) -> Self::V {
        let barrier = {
            let mut inner = self.inner.lock();
            inner.loaded.push((k, extra));
            inner.blocking.take()
        };

        if let Some(barrier) = barrier {
            barrier.wait().await;
        }

        k.to_string()
    }
}

/// Binds a concrete [`Cache`] implementation to the shared generic test suite
/// below so every implementation is exercised the same way.
pub trait TestAdapter: Send + Sync + 'static {
    /// Extra type this implementation's `get` takes.
    type GetExtra: Debug + Send + 'static;
    /// Extra type this implementation's `peek` takes.
    type PeekExtra: Debug + Send + 'static;
    /// The cache implementation under test.
    type Cache: Cache<K = u8, V = String, GetExtra = Self::GetExtra, PeekExtra = Self::PeekExtra>;

    /// Build a cache on top of `loader`.
    fn construct(&self, loader: Arc<TestLoader>) -> Arc<Self::Cache>;

    /// Produce a `GetExtra` carrying `inner`, so tests can assert it reached the loader.
    fn get_extra(&self, inner: bool) -> Self::GetExtra;

    /// Produce a `PeekExtra`.
    fn peek_extra(&self) -> Self::PeekExtra;
}

/// Generic behaviour every [`Cache`] implementation must satisfy, run against
/// whatever adapter a concrete backend provides.
pub async fn run_test_generic<A: TestAdapter>(adapter: A) {
    miss_then_hit(&adapter).await;
    concurrent_misses_single_flight(&adapter).await;
    peek_never_triggers_a_load(&adapter).await;
    set_side_loads_a_running_query(&adapter).await;
}

async fn miss_then_hit<A: TestAdapter>(adapter: &A) {
    let loader = TestLoader::new();
    let cache = adapter.construct(Arc::clone(&loader));

    let v1 = cache.get(1, adapter.get_extra(true)).await;
    assert_eq!(v1, "1");
    assert_eq!(loader.load_count(), 1);

    let v2 = cache.get(1, adapter.get_extra(false)).await;
    assert_eq!(v2, "1");
    // second call was a hit, no extra load
    assert_eq!(loader.load_count(), 1);
}

async fn concurrent_misses_single_flight<A: TestAdapter>(adapter: &A) {
    let loader = TestLoader::new();
    let barrier = loader.block_next();
    let cache = adapter.construct(Arc::clone(&loader));

    let cache_captured = Arc::clone(&cache);
    let get_extra = adapter.get_extra(true);
    let task = tokio::spawn(async move { cache_captured.get(7, get_extra).await });

    // give the first request a chance to register as "running" before the
    // second one piggy-backs on it.
    tokio::task::yield_now().await;

    let get_extra2 = adapter.get_extra(true);
    let second = cache.get(7, get_extra2);

    barrier.wait().await;

    let (first, second) = tokio::join!(task, second);
    assert_eq!(first.unwrap(), "7");
    assert_eq!(second, "7");
    assert_eq!(loader.load_count(), 1);
}

async fn peek_never_triggers_a_load<A: TestAdapter>(adapter: &A) {
    let loader = TestLoader::new();
    let cache = adapter.construct(Arc::clone(&loader));

    let peeked = cache.peek(42, adapter.peek_extra()).await;
    assert_eq!(peeked, None);
    assert_eq!(loader.load_count(), 0);

    cache.get(42, adapter.get_extra(true)).await;
    let peeked = cache.peek(42, adapter.peek_extra()).await;
    assert_eq!(peeked, Some("42".to_string()));
}

async fn set_side_loads_a_running_query<A: TestAdapter>(adapter: &A) {
    let loader = TestLoader::new();
    let cache = adapter.construct(Arc::clone(&loader));

    cache.set(9, "side-loaded".to_string()).await;
    let v = cache.get(9, adapter.get_extra(true)).await;

    assert_eq!(v, "side-loaded");
    assert_eq!(loader.load_count(), 0);
}

/// Utility retained for adapters that want to drain a queue of expected calls
/// in order; unused by the default suite above but handy when extending it.
#[allow(dead_code)]
pub fn assert_in_order<T: PartialEq + Debug>(expected: VecDeque<T>, actual: VecDeque<T>) {
    assert_eq!(expected, actual);
}
