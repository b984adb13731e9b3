//! Subcommands: `definitions`, `references`, `hover`.

mod definitions;
mod hover;
mod references;

use crate::fixture;
use dump_store::caches::{CacheCapacities, Caches};
use precise_time::SystemProvider;
use precise_types::Dump;
use resolver::{Backend, BackendConfig, QueryLocation};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Location the query resolves against, shared by every subcommand.
#[derive(Debug, clap::Args)]
pub struct QueryArgs {
    /// Path to the JSON metadata fixture (see `metadata_store::memory` for
    /// the shape the builder accepts; the CLI loads `dumps`/`packages`/
    /// `dependents` arrays).
    #[clap(long, env = "PRECISE_QUERY_METADATA_FIXTURE")]
    metadata_fixture: PathBuf,

    /// Repository id the query is scoped to.
    #[clap(long)]
    repository_id: i64,

    /// Commit the query is scoped to.
    #[clap(long)]
    commit: String,

    /// Repo-relative source path.
    #[clap(long)]
    path: String,

    /// Zero-based line.
    #[clap(long)]
    line: u32,

    /// Zero-based character offset.
    #[clap(long)]
    character: u32,

    /// Resolve against this dump id directly, bypassing closest-dump
    /// selection.
    #[clap(long)]
    dump_id: Option<i64>,
}

impl QueryArgs {
    fn into_query_location(self) -> QueryLocation {
        QueryLocation {
            repository_id: self.repository_id,
            commit: self.commit,
            path: self.path,
            line: self.line,
            character: self.character,
            dump_id: self.dump_id,
        }
    }
}

/// Cache capacities, in entry counts, for the three per-dump caches.
#[derive(Debug, Clone, Copy, clap::Args)]
pub struct CacheArgs {
    /// Max number of simultaneously open dump connections.
    #[clap(long, default_value = "64")]
    connection_cache_capacity: usize,

    /// Max number of decoded documents held in memory.
    #[clap(long, default_value = "1024")]
    document_cache_capacity: usize,

    /// Max number of decoded result chunks held in memory.
    #[clap(long, default_value = "1024")]
    result_chunk_cache_capacity: usize,
}

impl From<CacheArgs> for CacheCapacities {
    fn from(args: CacheArgs) -> Self {
        Self {
            connections: args.connection_cache_capacity,
            documents: args.document_cache_capacity,
            result_chunks: args.result_chunk_cache_capacity,
        }
    }
}

/// Top-level subcommands.
#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Resolve the definition(s) of the symbol at a position.
    Definitions {
        #[clap(flatten)]
        query: QueryArgs,
        #[clap(flatten)]
        caches: CacheArgs,
    },
    /// Resolve the references of the symbol at a position, optionally
    /// continuing a prior page via `--cursor`.
    References {
        #[clap(flatten)]
        query: QueryArgs,
        #[clap(flatten)]
        caches: CacheArgs,
        /// Opaque pagination cursor returned by a previous `references` call.
        #[clap(long)]
        cursor: Option<String>,
        /// Max dumps requested per metadata-store page while paginating.
        #[clap(long, default_value = "50")]
        page_limit: usize,
    },
    /// Resolve hover markup for the symbol at a position.
    Hover {
        #[clap(flatten)]
        query: QueryArgs,
        #[clap(flatten)]
        caches: CacheArgs,
    },
}

/// Failures a subcommand can report.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The metadata fixture could not be loaded.
    #[error(transparent)]
    Fixture(#[from] fixture::FixtureError),

    /// The resolver reported a failure.
    #[error(transparent)]
    Resolver(#[from] resolver::Error),

    /// A client-supplied `--cursor` was malformed.
    #[error("invalid cursor: {0}")]
    Cursor(#[from] precise_types::CursorError),

    /// Serialising the result to JSON failed.
    #[error("serialising output: {0}")]
    Output(#[from] serde_json::Error),
}

fn build_backend(metadata: Arc<dyn metadata_store::MetadataStore>, caches: CacheArgs, config: BackendConfig) -> Backend {
    let metrics = Arc::new(precise_metric::Registry::new());
    let time_provider = Arc::new(SystemProvider);
    let caches = Caches::new(caches.into(), metrics, time_provider);
    Backend::new(metadata, caches, config)
}

/// A repo-relative location as printed on the wire, trimmed to what a CLI
/// user needs: the dump's identity plus path/range, not the full [`Dump`]
/// record.
#[derive(Debug, serde::Serialize)]
struct LocationOutput {
    dump_id: i64,
    repository_id: i64,
    commit: String,
    path: String,
    range: precise_types::position::Range,
}

impl From<&precise_types::location::InternalLocation> for LocationOutput {
    fn from(loc: &precise_types::location::InternalLocation) -> Self {
        Self {
            dump_id: loc.dump.id,
            repository_id: loc.dump.repository_id,
            commit: loc.dump.commit.clone(),
            path: loc.path.clone(),
            range: loc.range,
        }
    }
}

fn dump_output(dump: &Dump) -> serde_json::Value {
    serde_json::json!({
        "dump_id": dump.id,
        "repository_id": dump.repository_id,
        "commit": dump.commit,
    })
}

/// Dispatch a parsed subcommand.
pub async fn run(command: Command) -> Result<(), CommandError> {
    let token = CancellationToken::new();
    match command {
        Command::Definitions { query, caches } => definitions::run(query, caches, &token).await,
        Command::References {
            query,
            caches,
            cursor,
            page_limit,
        } => references::run(query, caches, cursor, page_limit, &token).await,
        Command::Hover { query, caches } => hover::run(query, caches, &token).await,
    }
}
