//! Resource-bounded, single-flighted caches.
//!
//! The precise-query core builds three independent caches on top of this
//! crate: connection handles to per-dump stores, decoded documents, and
//! decoded result chunks. Each is a [`cache::driver::CacheDriver`] stacked on
//! a [`backend::CacheBackend`] — usually a capacity-bounded
//! [`backend::lru::LruBackend`] — so the caching policy (single-flight,
//! eviction) is shared code and only the key/value types and the loader
//! differ between the three.
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::clone_on_ref_ptr
)]

pub mod backend;
pub mod cache;
pub mod loader;
