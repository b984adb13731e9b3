//! Crate-local error type for the metadata store adapter.

/// Failures talking to the external relational store.
///
/// Resolver-facing code converts every variant here into the core's
/// `StoreUnavailable` error kind at the seam it crosses.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The underlying relational store could not be reached or returned an
    /// error executing the query.
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),
}
