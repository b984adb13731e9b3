//! Decoded documents, ranges and result chunks.

use crate::moniker::{Moniker, MonikerId, PackageInformation, PackageInformationId};
use crate::position::{Position, Range};
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-document identifier for a [`RangeData`]; stable only within the
/// document that assigned it. An [`crate::location::InternalLocation`]
/// pairs this with a document path to name a range globally within a dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RangeId(pub u64);

/// Identifier for a definition/reference/hover result, dereferenced through
/// the dump's result-chunk table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResultId(pub u64);

/// Selects which on-disk table a moniker lookup scans: no runtime type
/// lookup, just a tagged selector threaded through the call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Model {
    /// Scan the `definitions` table.
    Definition,
    /// Scan the `references` table.
    Reference,
}

/// A single markup payload returned by a hover query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoverResult {
    /// Markup text (as recorded by the indexer, e.g. Markdown).
    pub text: String,
}

/// An immutable range within a [`Document`]: a span plus the ids of any
/// monikers/results attached to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeData {
    /// This document's id for the range.
    pub id: RangeId,
    /// The span this range covers.
    pub range: Range,
    /// Monikers attached to this range, in no particular order (sorted on demand).
    pub moniker_ids: Vec<MonikerId>,
    /// Result id dereferencing to this range's definition sites, if any.
    pub definition_result_id: Option<ResultId>,
    /// Result id dereferencing to this range's reference sites, if any.
    pub reference_result_id: Option<ResultId>,
    /// Result id for this range's hover markup, if any.
    pub hover_result_id: Option<ResultId>,
}

impl RangeData {
    /// Start position, convenience over `self.range.start`.
    pub fn start(&self) -> Position {
        self.range.start
    }
}

/// A decoded document: its ranges plus the monikers/package information those
/// ranges reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Ranges in this document. Not required to be pre-sorted by the store;
    /// callers that need innermost-first order should use
    /// [`Document::ranges_covering`].
    pub ranges: Vec<RangeData>,
    /// Monikers referenced by this document's ranges, keyed by id.
    pub monikers: BTreeMap<MonikerId, Moniker>,
    /// Package information referenced by this document's monikers, keyed by id.
    pub package_information: BTreeMap<PackageInformationId, PackageInformation>,
    /// Hover markup referenced by this document's ranges, keyed by result id.
    pub hover_results: BTreeMap<ResultId, HoverResult>,
}

impl Document {
    /// All ranges covering `pos`, innermost first (smallest span first);
    /// ties are stable, preserving the document's own range order.
    pub fn ranges_covering(&self, pos: Position) -> Vec<&RangeData> {
        let mut covering: Vec<&RangeData> = self
            .ranges
            .iter()
            .filter(|r| r.range.contains(pos))
            .collect();
        covering.sort_by_key(|r| r.range.innermost_first_key());
        covering
    }

    /// Resolve a [`MonikerId`] recorded on one of this document's ranges.
    pub fn moniker(&self, id: MonikerId) -> Option<&Moniker> {
        self.monikers.get(&id)
    }

    /// Resolve the [`PackageInformation`] for a moniker, if it has one and
    /// the dump declares it.
    pub fn package_information(&self, moniker: &Moniker) -> Option<&PackageInformation> {
        moniker
            .package_information_id
            .and_then(|id| self.package_information.get(&id))
    }

    /// Monikers attached to `range`, resolved from [`RangeData::moniker_ids`].
    pub fn monikers_for(&self, range: &RangeData) -> Vec<Moniker> {
        range
            .moniker_ids
            .iter()
            .filter_map(|id| self.monikers.get(id).cloned())
            .collect()
    }
}

/// A single entry in a [`ResultChunk`]: the document a result location lives
/// in, and the id of the range within that document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultChunkEntry {
    /// Dump-relative document path.
    pub document_path: String,
    /// Range id within that document.
    pub range_id: RangeId,
}

/// A paged table keyed by result id; each entry is a list of
/// `(documentPath, rangeId)` pairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultChunk {
    /// Entries for each result id this chunk covers.
    pub entries: BTreeMap<ResultId, Vec<ResultChunkEntry>>,
}

impl ResultChunk {
    /// Entries for `id`, or an empty slice if this chunk doesn't cover it.
    pub fn entries_for(&self, id: ResultId) -> &[ResultChunkEntry] {
        self.entries.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Pure function assigning a result id to a result-chunk id, identical on the
/// (out-of-scope) writer and the reader: no side index is needed to find a
/// result's chunk.
pub fn result_chunk_id(result_id: ResultId, num_result_chunks: u32) -> u32 {
    if num_result_chunks == 0 {
        return 0;
    }
    (result_id.0 % num_result_chunks as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_covering_orders_innermost_first() {
        let mut doc = Document::default();
        doc.ranges.push(RangeData {
            id: RangeId(0),
            range: Range::new(Position::new(0, 0), Position::new(20, 0)),
            moniker_ids: vec![],
            definition_result_id: None,
            reference_result_id: None,
            hover_result_id: None,
        });
        doc.ranges.push(RangeData {
            id: RangeId(1),
            range: Range::new(Position::new(10, 0), Position::new(10, 5)),
            moniker_ids: vec![],
            definition_result_id: None,
            reference_result_id: None,
            hover_result_id: None,
        });

        let covering = doc.ranges_covering(Position::new(10, 2));
        assert_eq!(covering.len(), 2);
        assert_eq!(covering[0].id, RangeId(1));
        assert_eq!(covering[1].id, RangeId(0));
    }

    #[test]
    fn result_chunk_id_is_a_pure_modulo() {
        assert_eq!(result_chunk_id(ResultId(7), 4), 3);
        assert_eq!(result_chunk_id(ResultId(8), 4), 0);
        assert_eq!(result_chunk_id(ResultId(7), 4), result_chunk_id(ResultId(7), 4));
    }
}
