//! Dump metadata records, as returned by the metadata store.

use serde::{Deserialize, Serialize};

/// A read-only index bundle for a (repository, commit, root).
///
/// This is the metadata-store's record, not the opened on-disk store; see
/// the `dump_store` crate's `Database` trait for the latter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dump {
    /// Unique id, stable for the lifetime of the dump row.
    pub id: i64,
    /// The repository this dump was produced for.
    pub repository_id: i64,
    /// The commit this dump was produced at.
    pub commit: String,
    /// Path prefix within the repository this dump covers, e.g. `"src/"`.
    pub root: String,
    /// On-disk filename for the dump's own per-dump store.
    pub filename: String,
}

impl Dump {
    /// Map a repo-relative path to its dump-relative on-disk form, or `None`
    /// if `path` does not fall under this dump's `root`.
    pub fn path_to_database(&self, path: &str) -> Option<String> {
        path.strip_prefix(self.root.as_str()).map(|s| s.to_string())
    }

    /// Map a dump-relative on-disk path back to repo-relative form.
    pub fn path_from_database(&self, stored: &str) -> String {
        format!("{}{stored}", self.root)
    }
}
