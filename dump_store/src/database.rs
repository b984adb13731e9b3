//! The per-dump reader: opens a dump by filename (through the shared
//! caches) and answers `exists`/`definitions`/`references`/`hover`/
//! `getRangeByPosition`/`monikerResults` against it.

use crate::caches::Caches;
use crate::error::StoreError;
use crate::connection::DumpConnection;
use observability_deps::tracing::{debug, trace};
use precise_trace::Span;
use precise_types::{
    document::{result_chunk_id, Document, Model, RangeData, ResultChunkEntry},
    dump::Dump,
    location::InternalLocation,
    moniker::Moniker,
    position::{Position, Range},
};
use std::sync::Arc;

/// All ranges covering a position, innermost first, together with the
/// document they came from.
#[derive(Debug, Clone)]
pub struct RangesAtPosition {
    /// The document the ranges were read from.
    pub document: Arc<Document>,
    /// Ranges covering the queried position, innermost first.
    pub ranges: Vec<RangeData>,
}

/// Hover markup plus the range that produced it.
#[derive(Debug, Clone)]
pub struct HoverResult {
    /// Markup text.
    pub text: String,
    /// The range the hover was attached to.
    pub range: Range,
}

/// A page of moniker-table results.
#[derive(Debug, Clone, Default)]
pub struct MonikerResultsPage {
    /// Locations in this page.
    pub locations: Vec<InternalLocation>,
    /// Total number of rows in the underlying table for this moniker,
    /// independent of `skip`/`take`.
    pub count: usize,
}

/// Pagination parameters for [`Database::moniker_results`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MonikerResultsArgs {
    /// Number of leading rows to skip.
    pub skip: usize,
    /// Max number of rows to return; `None` returns every remaining row.
    pub take: Option<usize>,
}

/// A reader over a single opened dump.
///
/// Cheap to construct and clone: all state lives in the shared [`Caches`],
/// this struct is just `(dump, caches)`.
#[derive(Debug, Clone)]
pub struct Database {
    dump: Dump,
    caches: Caches,
}

impl Database {
    /// Build a reader for `dump`, backed by the given shared caches.
    pub fn new(dump: Dump, caches: Caches) -> Self {
        Self { dump, caches }
    }

    /// The dump this reader was constructed for.
    pub fn dump(&self) -> &Dump {
        &self.dump
    }

    async fn connection(&self, span: Option<Span>) -> Result<Arc<DumpConnection>, StoreError> {
        self.caches
            .connections
            .get(self.dump.filename.clone(), span)
            .await
            .map_err(|e| e.clone_into_store_error())
    }

    async fn document(
        &self,
        path: &str,
        span: Option<Span>,
    ) -> Result<Option<Arc<Document>>, StoreError> {
        self.caches
            .documents
            .get((self.dump.id, self.dump.filename.clone(), path.to_string()), span)
            .await
            .map_err(|e| e.clone_into_store_error())
    }

    async fn result_chunk(
        &self,
        chunk_id: u32,
        span: Option<Span>,
    ) -> Result<Option<Arc<precise_types::document::ResultChunk>>, StoreError> {
        self.caches
            .result_chunks
            .get((self.dump.id, self.dump.filename.clone(), chunk_id), span)
            .await
            .map_err(|e| e.clone_into_store_error())
    }

    /// `true` iff this dump contains a document at `path` (dump-relative).
    pub async fn exists(&self, path: &str, span: Option<Span>) -> Result<bool, StoreError> {
        let conn = self.connection(span).await?;
        let conn2 = Arc::clone(&conn);
        let path = path.to_string();
        tokio::task::spawn_blocking(move || conn2.document_exists(&path))
            .await
            .map_err(|e| StoreError::Internal {
                filename: conn.filename().to_string(),
                what: format!("exists task panicked: {e}"),
            })?
    }

    /// All ranges covering `position` in `path`, innermost first, along with
    /// the containing document.
    pub async fn get_range_by_position(
        &self,
        path: &str,
        position: Position,
        span: Option<Span>,
    ) -> Result<Option<RangesAtPosition>, StoreError> {
        let Some(document) = self.document(path, span).await? else {
            return Ok(None);
        };
        let ranges: Vec<RangeData> = document
            .ranges_covering(position)
            .into_iter()
            .cloned()
            .collect();
        Ok(Some(RangesAtPosition { document, ranges }))
    }

    /// Dereference a definition/reference/hover result id through the
    /// result-chunk table into locations within this dump.
    async fn locations_for_result(
        &self,
        result_id: precise_types::document::ResultId,
        num_result_chunks: u32,
        span: Option<Span>,
    ) -> Result<Vec<InternalLocation>, StoreError> {
        let chunk_id = result_chunk_id(result_id, num_result_chunks);
        let Some(chunk) = self.result_chunk(chunk_id, span.clone()).await? else {
            return Ok(vec![]);
        };

        let mut out = Vec::new();
        for ResultChunkEntry {
            document_path,
            range_id,
        } in chunk.entries_for(result_id)
        {
            let Some(doc) = self.document(document_path, span.clone()).await? else {
                continue;
            };
            let Some(range) = doc.ranges.iter().find(|r| r.id == *range_id) else {
                continue;
            };
            out.push(InternalLocation::new(
                self.dump.clone(),
                self.dump.path_from_database(document_path),
                range.range,
            ));
        }
        Ok(out)
    }

    /// Find the innermost range at `position`; if it has a
    /// `definitionResultId`, dereference it into repo-relative locations.
    pub async fn definitions(
        &self,
        path: &str,
        position: Position,
        span: Option<Span>,
    ) -> Result<Vec<InternalLocation>, StoreError> {
        let Some(at) = self.get_range_by_position(path, position, span.clone()).await? else {
            return Ok(vec![]);
        };
        let Some(innermost) = at.ranges.first() else {
            return Ok(vec![]);
        };
        let Some(result_id) = innermost.definition_result_id else {
            return Ok(vec![]);
        };

        let num_result_chunks = self.connection(span.clone()).await?.num_result_chunks();
        trace!(path, ?position, "resolving definition result");
        self.locations_for_result(result_id, num_result_chunks, span).await
    }

    /// Like [`Database::definitions`] but dereferences the reference result
    /// and also unions any definition-result locations reachable from the
    /// same range, since a "find references" query must include the
    /// defining site.
    pub async fn references(
        &self,
        path: &str,
        position: Position,
        span: Option<Span>,
    ) -> Result<Vec<InternalLocation>, StoreError> {
        let Some(at) = self.get_range_by_position(path, position, span.clone()).await? else {
            return Ok(vec![]);
        };
        let Some(innermost) = at.ranges.first() else {
            return Ok(vec![]);
        };

        let num_result_chunks = self.connection(span.clone()).await?.num_result_chunks();
        let mut out = Vec::new();

        if let Some(result_id) = innermost.reference_result_id {
            out.extend(
                self.locations_for_result(result_id, num_result_chunks, span.clone())
                    .await?,
            );
        }
        if let Some(result_id) = innermost.definition_result_id {
            out.extend(
                self.locations_for_result(result_id, num_result_chunks, span.clone())
                    .await?,
            );
        }

        Ok(precise_types::location::dedup_locations(out))
    }

    /// The innermost range with a `hoverResultId`, and its markup.
    pub async fn hover(
        &self,
        path: &str,
        position: Position,
        span: Option<Span>,
    ) -> Result<Option<HoverResult>, StoreError> {
        let Some(at) = self.get_range_by_position(path, position, span).await? else {
            return Ok(None);
        };

        for range in &at.ranges {
            let Some(result_id) = range.hover_result_id else {
                continue;
            };
            if let Some(hover) = at.document.hover_results.get(&result_id) {
                return Ok(Some(HoverResult {
                    text: hover.text.clone(),
                    range: range.range,
                }));
            }
        }
        Ok(None)
    }

    /// Table lookup by `(scheme, identifier)` against the dump's
    /// definitions or references table, paginated.
    pub async fn moniker_results(
        &self,
        model: Model,
        moniker: &Moniker,
        args: MonikerResultsArgs,
        span: Option<Span>,
    ) -> Result<MonikerResultsPage, StoreError> {
        let table = match model {
            Model::Definition => "definitions",
            Model::Reference => "references",
        };
        let conn = self.connection(span).await?;
        let conn2 = Arc::clone(&conn);
        let scheme = moniker.scheme.clone();
        let identifier = moniker.identifier.clone();
        let take = args.take.unwrap_or(usize::MAX);
        let skip = args.skip;

        let (rows, count) = tokio::task::spawn_blocking(move || {
            conn2.moniker_table_rows(table, &scheme, &identifier, skip, take)
        })
        .await
        .map_err(|e| StoreError::Internal {
            filename: conn.filename().to_string(),
            what: format!("moniker_results task panicked: {e}"),
        })??;

        debug!(table, scheme = %moniker.scheme, identifier = %moniker.identifier, rows = rows.len(), count, "moniker table scan");

        let locations = rows
            .into_iter()
            .map(
                |(document_path, start_line, start_character, end_line, end_character)| {
                    InternalLocation::new(
                        self.dump.clone(),
                        self.dump.path_from_database(&document_path),
                        Range::new(
                            Position::new(start_line, start_character),
                            Position::new(end_line, end_character),
                        ),
                    )
                },
            )
            .collect();

        Ok(MonikerResultsPage { locations, count })
    }
}

trait ArcStoreErrorExt {
    fn clone_into_store_error(self) -> StoreError;
}

impl ArcStoreErrorExt for Arc<StoreError> {
    fn clone_into_store_error(self) -> StoreError {
        // `StoreError` isn't `Clone` (its `rusqlite`/`serde_json` sources
        // aren't), so a cached `Arc<StoreError>` is re-described rather than
        // cloned bit-for-bit; the filename/kind is preserved.
        match &*self {
            StoreError::Sqlite { filename, source } => StoreError::Internal {
                filename: filename.clone(),
                what: format!("sqlite error (cached): {source}"),
            },
            StoreError::Malformed { filename, source } => StoreError::Internal {
                filename: filename.clone(),
                what: format!("malformed payload (cached): {source}"),
            },
            StoreError::UnsupportedFormatVersion {
                filename,
                format_version,
            } => StoreError::UnsupportedFormatVersion {
                filename: filename.clone(),
                format_version: *format_version,
            },
            StoreError::Internal { filename, what } => StoreError::Internal {
                filename: filename.clone(),
                what: what.clone(),
            },
        }
    }
}
