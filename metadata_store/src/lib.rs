//! Thin interface over the external relational store that owns dump and
//! package/dependency rows.
//!
//! The resolver never talks to Postgres (or whatever backs a production
//! deployment) directly; it consults a [`MetadataStore`]. This crate defines
//! that trait plus [`memory::InMemoryMetadataStore`], a fixture-driven
//! implementation standing in for "typically Postgres" the same way
//! `dump_store`'s SQLite reader stands in for "typically SQLite".
#![warn(missing_copy_implementations, missing_debug_implementations)]

pub mod error;
pub mod memory;

use async_trait::async_trait;
use precise_trace::Span;
use precise_types::Dump;
use std::fmt::Debug;

pub use error::MetadataError;

/// A dump row together with the package information the caller already had
/// (the `{dump}` shape `getPackage` returns).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDump {
    /// The dump that declares (exports) the requested package.
    pub dump: Dump,
}

/// Parameters for [`MetadataStore::get_references`] and
/// [`MetadataStore::get_same_repo_remote_references`]: the moniker identity
/// a remote-reference page is being paginated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferencesParams {
    /// The repository the originating query resolved against.
    pub repository_id: i64,
    /// Moniker scheme being paginated.
    pub scheme: String,
    /// Moniker identifier being paginated.
    pub identifier: String,
    /// Package name associated with the moniker, if any.
    pub name: Option<String>,
    /// Package version associated with the moniker, if any.
    pub version: Option<String>,
    /// Max number of dumps to return in this page.
    pub limit: usize,
    /// Number of leading dumps (in the store's own order) already consumed.
    pub offset: usize,
}

/// A page of dumps that depend on the moniker a [`ReferencesParams`] names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReferencesPage {
    /// Dumps returned by this page.
    pub references: Vec<Dump>,
    /// Total number of dumps in the underlying scope, independent of
    /// `limit`/`offset`.
    pub total_count: usize,
    /// `offset + references.len()`, the offset a follow-up page should ask for.
    pub new_offset: usize,
}

/// Relational interface over dump and package/dependency rows.
///
/// Every method accepts an optional tracing [`Span`] per the core's
/// tracing-context convention: implementations must never fabricate a span
/// above what they were given.
#[async_trait]
pub trait MetadataStore: Debug + Send + Sync {
    /// Dumps covering `path` in `repository_id` at `commit`, ordered by
    /// commit distance (nearest first), each with a `root` that is a prefix
    /// of `path`. `frontend_url` is carried for parity with the production
    /// interface (a cross-service callback endpoint) but is not consulted by
    /// this adapter's in-process callers.
    async fn find_closest_dumps(
        &self,
        repository_id: i64,
        commit: &str,
        path: &str,
        frontend_url: &str,
        span: Option<Span>,
    ) -> Result<Vec<Dump>, MetadataError>;

    /// Look up a dump by id, e.g. to resolve a pagination cursor's `dumpId`.
    async fn get_dump_by_id(&self, id: i64, span: Option<Span>) -> Result<Option<Dump>, MetadataError>;

    /// The dump that declares `(scheme, name, version)`, if the store knows
    /// of one; used to follow an import moniker to its defining dump.
    async fn get_package(
        &self,
        scheme: &str,
        name: &str,
        version: Option<&str>,
        span: Option<Span>,
    ) -> Result<Option<PackageDump>, MetadataError>;

    /// Dumps in repositories other than `params.repository_id` that depend
    /// on the moniker `params` names.
    async fn get_references(
        &self,
        params: ReferencesParams,
        span: Option<Span>,
    ) -> Result<ReferencesPage, MetadataError>;

    /// Dumps in the same repository as `params.repository_id` (excluding the
    /// originating dump, which the resolver filters out itself) that depend
    /// on the moniker `params` names.
    async fn get_same_repo_remote_references(
        &self,
        params: ReferencesParams,
        span: Option<Span>,
    ) -> Result<ReferencesPage, MetadataError>;
}
