//! The resolver's public error type.
//!
//! One variant per error kind named in the core's error-handling design.
//! `NoDumpFound` and `DumpGone` are deliberately absent here: per that
//! design they are not errors, they are `None`/empty results a caller
//! distinguishes from "found, but empty" by type (see
//! [`crate::backend::Backend::definitions`] returning `Option<Vec<_>>`, and
//! [`crate::pagination`] returning an empty page with no cursor).

/// Failures the resolver can report to its caller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The per-dump store failed to open or answer a query.
    #[error("dump store unavailable: {0}")]
    DumpStore(#[from] dump_store::error::StoreError),

    /// The metadata store failed to answer a query.
    #[error("metadata store unavailable: {0}")]
    Metadata(#[from] metadata_store::MetadataError),

    /// A client-supplied pagination cursor was malformed or carried an
    /// unsupported version.
    #[error("cursor invalid: {0}")]
    CursorInvalid(#[from] precise_types::CursorError),

    /// The query's cancellation context fired. Takes precedence over any
    /// concurrent store error observed in the same fan-out.
    #[error("query cancelled")]
    Cancelled,

    /// An invariant the core relies on was violated by the underlying data
    /// (e.g. a range referencing a moniker id absent from its document).
    #[error("internal error: {0}")]
    Internal(String),
}
