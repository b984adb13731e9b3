//! Crate-local error type for per-dump store I/O.

/// Failures opening or reading a dump's on-disk store.
///
/// Callers at the resolver boundary convert this into the core's
/// `StoreUnavailable` (for anything I/O-shaped) or `Internal` (for
/// unrecognised format versions and the like) error kind.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying SQLite connection or query failed.
    #[error("sqlite error opening or reading {filename}: {source}")]
    Sqlite {
        /// Dump filename being accessed when the error occurred.
        filename: String,
        /// Underlying rusqlite error.
        #[source]
        source: rusqlite::Error,
    },

    /// A document/result-chunk blob did not decode as the JSON payload the
    /// reference store expects.
    #[error("malformed payload in {filename}: {source}")]
    Malformed {
        /// Dump filename being accessed when the error occurred.
        filename: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The dump's `meta` table records a format version this reader does not
    /// recognise; per the data-model invariant, this must fail loudly rather
    /// than be silently misparsed.
    #[error("dump {filename} has unsupported format version {format_version}")]
    UnsupportedFormatVersion {
        /// Dump filename being accessed when the error occurred.
        filename: String,
        /// The unrecognised format version.
        format_version: u32,
    },

    /// A range referenced a moniker/result id that does not exist in its
    /// document; an indexer-produced invariant violation.
    #[error("{filename}: {what}")]
    Internal {
        /// Dump filename being accessed when the error occurred.
        filename: String,
        /// Description of the violated invariant.
        what: String,
    },
}

impl From<(&str, rusqlite::Error)> for StoreError {
    fn from((filename, source): (&str, rusqlite::Error)) -> Self {
        Self::Sqlite {
            filename: filename.to_string(),
            source,
        }
    }
}
