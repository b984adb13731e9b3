//! The three shared, capacity-bounded caches the per-dump `Database` reads
//! through: opened connections, decoded documents, decoded result chunks.
//!
//! All three are constructed once (see [`Caches::new`]) and shared across
//! every [`crate::database::Database`] instance in the process — there is no
//! hidden per-database cache.

use crate::connection::DumpConnection;
use crate::error::StoreError;
use async_trait::async_trait;
use cache_system::{
    backend::{
        lru::{LruBackend, ResourcePool},
        resource_consumption::EntryCount,
    },
    cache::driver::CacheDriver,
    cache::Cache,
    loader::Loader,
};
use precise_metric::Registry as MetricRegistry;
use precise_time::TimeProvider;
use precise_trace::Span;
use precise_types::document::{Document, ResultChunk};
use std::sync::Arc;

/// A cache value paired with the (rare, single-flighted) failure to produce it.
///
/// Caching the error alongside the success is a deliberate simplification:
/// dumps are immutable files, so "failed to open" is not a transient
/// condition this reference store expects to clear on retry within a
/// request's lifetime. It trades away the idealised "share the failure once,
/// then forget it" behaviour the design notes describe for a much simpler
/// cache wiring; see `DESIGN.md`.
pub type Loaded<V> = Result<V, Arc<StoreError>>;

/// Opened connection to a dump file, keyed by filename.
pub type ConnectionCache =
    dyn Cache<K = String, V = Loaded<Arc<DumpConnection>>, GetExtra = Option<Span>, PeekExtra = ()>;

/// Decoded document, keyed by `(dumpId, filename, documentPath)`. The
/// filename rides along in the key (rather than only `dumpId`) because the
/// loader needs it to reach the connection cache; dumps never change
/// filename, so this is equivalent to keying on `dumpId` alone.
pub type DocumentCache = dyn Cache<
    K = (i64, String, String),
    V = Loaded<Option<Arc<Document>>>,
    GetExtra = Option<Span>,
    PeekExtra = (),
>;

/// Decoded result chunk, keyed by `(dumpId, filename, chunkId)`.
pub type ResultChunkCache = dyn Cache<
    K = (i64, String, u32),
    V = Loaded<Option<Arc<ResultChunk>>>,
    GetExtra = Option<Span>,
    PeekExtra = (),
>;

/// Configured capacities for the three caches, in their own size units
/// (connections and documents/chunks are both counted by entry, a cheap
/// proxy for actual memory cost).
#[derive(Debug, Clone, Copy)]
pub struct CacheCapacities {
    /// Max number of simultaneously open dump connections.
    pub connections: usize,
    /// Max number of decoded documents held in memory.
    pub documents: usize,
    /// Max number of decoded result chunks held in memory.
    pub result_chunks: usize,
}

impl Default for CacheCapacities {
    fn default() -> Self {
        Self {
            connections: 64,
            documents: 1024,
            result_chunks: 1024,
        }
    }
}

#[derive(Debug)]
struct ConnectionLoader;

#[async_trait]
impl Loader for ConnectionLoader {
    type K = String;
    type V = Loaded<Arc<DumpConnection>>;
    type Extra = Option<Span>;

    async fn load(&self, filename: Self::K, _extra: Self::Extra) -> Self::V {
        let filename_owned = filename.clone();
        tokio::task::spawn_blocking(move || DumpConnection::open(&filename_owned))
            .await
            .unwrap_or_else(|join_err| {
                Err(StoreError::Internal {
                    filename: filename.clone(),
                    what: format!("connection open task panicked: {join_err}"),
                })
            })
            .map(Arc::new)
            .map_err(Arc::new)
    }
}

struct DocumentLoader {
    connections: Arc<ConnectionCache>,
}

impl std::fmt::Debug for DocumentLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentLoader").finish_non_exhaustive()
    }
}

#[async_trait]
impl Loader for DocumentLoader {
    type K = (i64, String, String);
    type V = Loaded<Option<Arc<Document>>>;
    type Extra = Option<Span>;

    async fn load(&self, (_dump_id, filename, path): Self::K, extra: Self::Extra) -> Self::V {
        let conn = self.connections.get(filename, extra).await?;
        tokio::task::spawn_blocking(move || conn.read_document(&path))
            .await
            .unwrap_or_else(|join_err| {
                Err(StoreError::Internal {
                    filename: "<document load>".to_string(),
                    what: format!("document decode task panicked: {join_err}"),
                })
            })
            .map(|doc| doc.map(Arc::new))
            .map_err(Arc::new)
    }
}

struct ResultChunkLoader {
    connections: Arc<ConnectionCache>,
}

impl std::fmt::Debug for ResultChunkLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultChunkLoader").finish_non_exhaustive()
    }
}

#[async_trait]
impl Loader for ResultChunkLoader {
    type K = (i64, String, u32);
    type V = Loaded<Option<Arc<ResultChunk>>>;
    type Extra = Option<Span>;

    async fn load(&self, (_dump_id, filename, chunk_id): Self::K, extra: Self::Extra) -> Self::V {
        let conn = self.connections.get(filename, extra).await?;
        tokio::task::spawn_blocking(move || conn.read_result_chunk(chunk_id))
            .await
            .unwrap_or_else(|join_err| {
                Err(StoreError::Internal {
                    filename: "<result chunk load>".to_string(),
                    what: format!("result chunk decode task panicked: {join_err}"),
                })
            })
            .map(|chunk| chunk.map(Arc::new))
            .map_err(Arc::new)
    }
}

/// The three process-wide caches the per-dump `Database` is built on.
#[derive(Debug, Clone)]
pub struct Caches {
    pub(crate) connections: Arc<ConnectionCache>,
    pub(crate) documents: Arc<DocumentCache>,
    pub(crate) result_chunks: Arc<ResultChunkCache>,
}

impl Caches {
    /// Build the three caches with the given capacities, metrics registry
    /// and time provider (used only for eviction/hit/miss instrumentation,
    /// not for any TTL — dumps never expire on their own).
    pub fn new(
        capacities: CacheCapacities,
        metrics: Arc<MetricRegistry>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        let connection_backend: LruBackend<String, Loaded<Arc<DumpConnection>>, EntryCount> =
            LruBackend::new(
                Arc::new(ResourcePool::new(
                    "connection",
                    EntryCount(capacities.connections),
                    Arc::clone(&time_provider),
                    Arc::clone(&metrics),
                )),
                |_: &Loaded<Arc<DumpConnection>>| EntryCount(1),
            );
        let connection_driver: CacheDriver<String, Loaded<Arc<DumpConnection>>, Option<Span>> =
            CacheDriver::new(Arc::new(ConnectionLoader), Box::new(connection_backend));
        let connections: Arc<ConnectionCache> = Arc::new(connection_driver);

        let document_backend: LruBackend<
            (i64, String, String),
            Loaded<Option<Arc<Document>>>,
            EntryCount,
        > = LruBackend::new(
            Arc::new(ResourcePool::new(
                "document",
                EntryCount(capacities.documents),
                Arc::clone(&time_provider),
                Arc::clone(&metrics),
            )),
            |_: &Loaded<Option<Arc<Document>>>| EntryCount(1),
        );
        let document_driver: CacheDriver<
            (i64, String, String),
            Loaded<Option<Arc<Document>>>,
            Option<Span>,
        > = CacheDriver::new(
            Arc::new(DocumentLoader {
                connections: Arc::clone(&connections),
            }),
            Box::new(document_backend),
        );
        let documents: Arc<DocumentCache> = Arc::new(document_driver);

        let result_chunk_backend: LruBackend<
            (i64, String, u32),
            Loaded<Option<Arc<ResultChunk>>>,
            EntryCount,
        > = LruBackend::new(
            Arc::new(ResourcePool::new(
                "result_chunk",
                EntryCount(capacities.result_chunks),
                Arc::clone(&time_provider),
                Arc::clone(&metrics),
            )),
            |_: &Loaded<Option<Arc<ResultChunk>>>| EntryCount(1),
        );
        let result_chunk_driver: CacheDriver<
            (i64, String, u32),
            Loaded<Option<Arc<ResultChunk>>>,
            Option<Span>,
        > = CacheDriver::new(
            Arc::new(ResultChunkLoader {
                connections: Arc::clone(&connections),
            }),
            Box::new(result_chunk_backend),
        );
        let result_chunks: Arc<ResultChunkCache> = Arc::new(result_chunk_driver);

        Self {
            connections,
            documents,
            result_chunks,
        }
    }
}
