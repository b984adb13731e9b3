//! Monikers: named, cross-file/cross-repo symbol handles.

use serde::{Deserialize, Serialize};

/// Opaque per-document identifier for a [`Moniker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonikerId(pub u64);

/// Opaque per-document identifier for a [`PackageInformation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageInformationId(pub u64);

/// Whether a moniker is local to the dump, or crosses a dump boundary as an
/// import (consumed dependency) or export (published symbol).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MonikerKind {
    /// Crosses into this dump from a dependency.
    Import,
    /// Crosses out of this dump to dependents.
    Export,
    /// Never leaves the dump it was recorded in.
    Local,
}

impl MonikerKind {
    /// Priority used by [`sort_monikers`]: lower sorts first.
    fn priority(self) -> u8 {
        match self {
            MonikerKind::Import => 0,
            MonikerKind::Export => 1,
            MonikerKind::Local => 2,
        }
    }
}

/// A named cross-file/cross-repo symbol handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Moniker {
    /// This dump's id for the moniker; ranges reference monikers by this id.
    pub id: MonikerId,
    /// Local / import / export.
    pub kind: MonikerKind,
    /// The indexer/language scheme that minted `identifier`, e.g. `"npm"` or `"gomod"`.
    pub scheme: String,
    /// The scheme-specific identifier, e.g. `"lodash::debounce"`.
    pub identifier: String,
    /// Present iff `kind == Import` (per the data-model invariant); an
    /// `Export` moniker may also carry one.
    pub package_information_id: Option<PackageInformationId>,
}

/// The (name, version) metadata tying an import/export moniker to a
/// dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInformation {
    /// This dump's id for the package, referenced by [`Moniker::package_information_id`].
    pub id: PackageInformationId,
    /// Package name, e.g. `"lodash"`.
    pub name: String,
    /// Package version, absent when the indexer could not determine one.
    pub version: Option<String>,
}

/// Fixed scheme preference used to break ties within a [`MonikerKind`] before
/// falling back to lexicographic `(scheme, identifier)` ordering.
///
/// Schemes not listed here sort after all listed ones, in lexicographic
/// order among themselves.
const SCHEME_PREFERENCE: &[&str] = &["npm", "semanticdb", "gomod", "cargo", "pip"];

fn scheme_rank(scheme: &str) -> usize {
    SCHEME_PREFERENCE
        .iter()
        .position(|s| *s == scheme)
        .unwrap_or(SCHEME_PREFERENCE.len())
}

/// Impose the deterministic moniker priority the resolver depends on to
/// decide which moniker "wins" for a given range: `import` before `export`
/// before `local`; within a kind, the [`SCHEME_PREFERENCE`] list, then
/// lexicographic `(scheme, identifier)`.
///
/// Idempotent and stable: `sort_monikers(sort_monikers(xs)) == sort_monikers(xs)`.
pub fn sort_monikers(mut monikers: Vec<Moniker>) -> Vec<Moniker> {
    monikers.sort_by(|a, b| {
        a.kind
            .priority()
            .cmp(&b.kind.priority())
            .then_with(|| scheme_rank(&a.scheme).cmp(&scheme_rank(&b.scheme)))
            .then_with(|| a.scheme.cmp(&b.scheme))
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
    monikers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moniker(kind: MonikerKind, scheme: &str, identifier: &str) -> Moniker {
        Moniker {
            id: MonikerId(0),
            kind,
            scheme: scheme.to_string(),
            identifier: identifier.to_string(),
            package_information_id: None,
        }
    }

    #[test]
    fn import_sorts_before_export_before_local() {
        let sorted = sort_monikers(vec![
            moniker(MonikerKind::Local, "npm", "a"),
            moniker(MonikerKind::Export, "npm", "b"),
            moniker(MonikerKind::Import, "npm", "c"),
        ]);
        assert_eq!(
            sorted.iter().map(|m| m.kind).collect::<Vec<_>>(),
            vec![MonikerKind::Import, MonikerKind::Export, MonikerKind::Local]
        );
    }

    #[test]
    fn scheme_preference_breaks_ties_within_a_kind() {
        let sorted = sort_monikers(vec![
            moniker(MonikerKind::Import, "cargo", "a"),
            moniker(MonikerKind::Import, "npm", "b"),
        ]);
        assert_eq!(sorted[0].scheme, "npm");
    }

    #[test]
    fn unknown_schemes_fall_back_to_lexicographic_order() {
        let sorted = sort_monikers(vec![
            moniker(MonikerKind::Import, "zzz", "a"),
            moniker(MonikerKind::Import, "aaa", "b"),
        ]);
        assert_eq!(sorted[0].scheme, "aaa");
    }

    #[test]
    fn sorting_is_idempotent() {
        let xs = vec![
            moniker(MonikerKind::Local, "npm", "a"),
            moniker(MonikerKind::Import, "npm", "c"),
            moniker(MonikerKind::Export, "gomod", "b"),
        ];
        let once = sort_monikers(xs);
        let twice = sort_monikers(once.clone());
        assert_eq!(once, twice);
    }
}
