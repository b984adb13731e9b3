//! Query results: locations produced by the definitions/references/hover
//! pipelines.

use crate::dump::Dump;
use crate::position::Range;
use std::hash::{Hash, Hasher};

/// A single location produced by a query: the dump it came from, a
/// repo-relative path, and a range within that file.
///
/// Equality and hashing are defined over `(dump.id, path, range)` only, per
/// the data-model deduplication invariant — two locations naming the same
/// dump/path/range are the same location even if, say, `dump.commit` were
/// (impossibly) inconsistent between them.
#[derive(Debug, Clone)]
pub struct InternalLocation {
    /// The dump this location was produced from.
    pub dump: Dump,
    /// Repo-relative path (already mapped out of the dump's on-disk root).
    pub path: String,
    /// The range within `path`.
    pub range: Range,
}

impl InternalLocation {
    /// Construct a new location.
    pub fn new(dump: Dump, path: impl Into<String>, range: Range) -> Self {
        Self {
            dump,
            path: path.into(),
            range,
        }
    }

    fn dedup_key(&self) -> (i64, &str, Range) {
        (self.dump.id, self.path.as_str(), self.range)
    }
}

impl PartialEq for InternalLocation {
    fn eq(&self, other: &Self) -> bool {
        self.dedup_key() == other.dedup_key()
    }
}

impl Eq for InternalLocation {}

impl Hash for InternalLocation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dedup_key().hash(state);
    }
}

/// Remove duplicate locations (by value equality on `(dump.id, path,
/// range)`), preserving the order of first occurrence.
pub fn dedup_locations(locations: Vec<InternalLocation>) -> Vec<InternalLocation> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::with_capacity(locations.len());
    for loc in locations {
        if seen.insert(loc.dedup_key_owned()) {
            out.push(loc);
        }
    }
    out
}

impl InternalLocation {
    fn dedup_key_owned(&self) -> (i64, String, Range) {
        (self.dump.id, self.path.clone(), self.range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    fn dump(id: i64) -> Dump {
        Dump {
            id,
            repository_id: 1,
            commit: "abc".to_string(),
            root: "src/".to_string(),
            filename: format!("dump-{id}.db"),
        }
    }

    fn range() -> Range {
        Range::new(Position::new(0, 0), Position::new(0, 5))
    }

    #[test]
    fn equality_ignores_fields_outside_the_dedup_key() {
        let mut a = dump(1);
        let b = a.clone();
        a.commit = "different".to_string();

        let loc_a = InternalLocation::new(a, "src/a.ts", range());
        let loc_b = InternalLocation::new(b, "src/a.ts", range());
        assert_eq!(loc_a, loc_b);
    }

    #[test]
    fn dedup_locations_preserves_first_occurrence_order() {
        let locs = vec![
            InternalLocation::new(dump(1), "src/a.ts", range()),
            InternalLocation::new(dump(1), "src/b.ts", range()),
            InternalLocation::new(dump(1), "src/a.ts", range()),
        ];
        let deduped = dedup_locations(locs);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].path, "src/a.ts");
        assert_eq!(deduped[1].path, "src/b.ts");
    }
}
