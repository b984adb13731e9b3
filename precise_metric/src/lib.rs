//! A minimal metrics registry.
//!
//! The cache layer and resolver report hit/miss/eviction counts through this
//! registry rather than coupling to a specific exporter (Prometheus, StatsD,
//! ...); wiring a real exporter on top is left to the binary that embeds this
//! core, keeping this crate exporter-agnostic in its own right.
#![warn(missing_copy_implementations, missing_docs)]

use parking_lot::Mutex;
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

/// A monotonically increasing counter, cheap to clone and share.
#[derive(Debug, Clone, Default)]
pub struct U64Counter(Arc<AtomicU64>);

impl U64Counter {
    /// Increment the counter by one.
    pub fn inc(&self) {
        self.add(1);
    }

    /// Increment the counter by `delta`.
    pub fn add(&self, delta: u64) {
        self.0.fetch_add(delta, Ordering::Relaxed);
    }

    /// Current value.
    pub fn value(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A registry of named [`U64Counter`]s, grouped by metric name then by
/// attribute set (e.g. `cache = "document"`).
#[derive(Debug, Default)]
pub struct Registry {
    counters: Mutex<BTreeMap<(&'static str, Vec<(&'static str, String)>), U64Counter>>,
}

impl Registry {
    /// Create a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch (or create) the counter named `metric_name` carrying `attributes`.
    ///
    /// Attributes are compared by value, so `register_counter("cache_hits", &[("cache", "document")])`
    /// always returns the same counter for the same name + attribute set.
    pub fn register_counter(
        &self,
        metric_name: &'static str,
        attributes: &[(&'static str, &str)],
    ) -> U64Counter {
        let key = (
            metric_name,
            attributes
                .iter()
                .map(|(k, v)| (*k, v.to_string()))
                .collect::<Vec<_>>(),
        );
        self.counters.lock().entry(key).or_default().clone()
    }
}
