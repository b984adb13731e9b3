//! The backend resolver: the definitions, references and hover pipelines,
//! built on [`crate::closest`], [`crate::moniker_lookup`] and
//! [`crate::pagination`].

use crate::cancel::cancellable;
use crate::closest::resolve_closest_dump;
use crate::error::Error;
use crate::moniker_lookup::lookup_moniker;
use crate::pagination::{drive_to_non_empty_page, DEFAULT_MAX_PAGINATION_HOPS};
use dump_store::{
    caches::Caches,
    database::{Database, MonikerResultsArgs},
};
use metadata_store::MetadataStore;
use observability_deps::tracing::error;
use precise_trace::Span;
use precise_types::{
    cursor::{Phase, ReferencePaginationCursor},
    document::Model,
    location::{dedup_locations, InternalLocation},
    moniker::{sort_monikers, MonikerKind},
    position::{Position, Range},
    Dump,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The position a query resolves against, plus the (repo, commit) it names
/// and an optional direct dump override (bypasses closest-dump selection
/// entirely).
#[derive(Debug, Clone)]
pub struct QueryLocation {
    /// Repository the query is scoped to.
    pub repository_id: i64,
    /// Commit the query is scoped to.
    pub commit: String,
    /// Repo-relative source path.
    pub path: String,
    /// Zero-based line.
    pub line: u32,
    /// Zero-based character.
    pub character: u32,
    /// If set, resolve against this dump directly rather than running
    /// closest-dump selection; the caller asserts its validity.
    pub dump_id: Option<i64>,
}

impl QueryLocation {
    fn position(&self) -> Position {
        Position::new(self.line, self.character)
    }
}

/// Result of a references query: a page of locations plus the cursor a
/// follow-up request should present, if the pagination state machine has
/// more to offer.
#[derive(Debug, Clone, Default)]
pub struct ReferencesOutcome {
    /// Locations in this page.
    pub locations: Vec<InternalLocation>,
    /// Cursor for a follow-up page, or `None` if exhausted.
    pub new_cursor: Option<ReferencePaginationCursor>,
}

/// Hover markup plus the dump/path/range it came from.
#[derive(Debug, Clone)]
pub struct HoverOutcome {
    /// Markup text.
    pub text: String,
    /// The dump the hover was read from (the queried dump, or — if hover
    /// fell back to the definitions pipeline — the definition's home dump).
    pub dump: Dump,
    /// Repo-relative path the hover applies to.
    pub path: String,
    /// The range that triggered the hover.
    pub range: Range,
}

/// Tunables that aren't part of a single query's parameters.
#[derive(Debug, Clone, Copy)]
pub struct BackendConfig {
    /// Max dumps requested per metadata-store page during reference
    /// pagination.
    pub reference_page_limit: usize,
    /// Bound on skip-empty-page recursion.
    pub max_pagination_hops: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            reference_page_limit: 50,
            max_pagination_hops: DEFAULT_MAX_PAGINATION_HOPS,
        }
    }
}

/// Orchestrates the query pipeline against a metadata store and the shared
/// per-dump caches. Cheap to clone: all state is held behind `Arc`/shared
/// caches.
#[derive(Debug, Clone)]
pub struct Backend {
    metadata: Arc<dyn MetadataStore>,
    caches: Caches,
    config: BackendConfig,
}

impl Backend {
    /// Build a resolver against `metadata`, backed by the shared `caches`.
    pub fn new(metadata: Arc<dyn MetadataStore>, caches: Caches, config: BackendConfig) -> Self {
        Self {
            metadata,
            caches,
            config,
        }
    }

    /// Local lookup, then moniker-table/import fallback, in priority order.
    /// `Ok(None)` is `NoDumpFound`; `Ok(Some(vec![]))` is "found, but nothing
    /// there".
    pub async fn definitions(
        &self,
        query: &QueryLocation,
        token: &CancellationToken,
        span: Option<Span>,
    ) -> Result<Option<Vec<InternalLocation>>, Error> {
        let Some((dump, database)) = resolve_closest_dump(
            self.metadata.as_ref(),
            &self.caches,
            query.repository_id,
            &query.commit,
            &query.path,
            query.dump_id,
            token,
            span.clone(),
        )
        .await?
        else {
            return Ok(None);
        };

        let Some(path_in_db) = dump.path_to_database(&query.path) else {
            return Ok(Some(vec![]));
        };
        let position = query.position();

        let local = cancellable(token, async {
            database
                .definitions(&path_in_db, position, span.clone())
                .await
                .map_err(Error::from)
        })
        .await?;
        if !local.is_empty() {
            return Ok(Some(local));
        }

        let Some(at) = cancellable(token, async {
            database
                .get_range_by_position(&path_in_db, position, span.clone())
                .await
                .map_err(Error::from)
        })
        .await?
        else {
            return Ok(Some(vec![]));
        };

        for range in &at.ranges {
            let monikers = sort_monikers(at.document.monikers_for(range));
            for moniker in &monikers {
                if let Some(span) = &span {
                    span.set_tag("moniker", format!("{}:{}", moniker.scheme, moniker.identifier));
                }
                let locations = if moniker.kind == MonikerKind::Import {
                    lookup_moniker(
                        self.metadata.as_ref(),
                        &self.caches,
                        &at.document,
                        moniker,
                        Model::Definition,
                        MonikerResultsArgs::default(),
                        token,
                        span.clone(),
                    )
                    .await?
                    .locations
                } else {
                    cancellable(token, async {
                        database
                            .moniker_results(Model::Definition, moniker, MonikerResultsArgs::default(), span.clone())
                            .await
                            .map_err(Error::from)
                    })
                    .await?
                    .locations
                };

                if !locations.is_empty() {
                    return Ok(Some(locations));
                }
            }
        }

        Ok(Some(vec![]))
    }

    /// Local references, moniker-table fan-out, and the cross-dump
    /// pagination state machine. `Ok(None)` is `NoDumpFound`.
    pub async fn references(
        &self,
        query: &QueryLocation,
        cursor: Option<ReferencePaginationCursor>,
        token: &CancellationToken,
        span: Option<Span>,
    ) -> Result<Option<ReferencesOutcome>, Error> {
        if let Some(cursor) = cursor {
            return self.continue_references(cursor, token, span).await.map(Some);
        }

        let Some((dump, database)) = resolve_closest_dump(
            self.metadata.as_ref(),
            &self.caches,
            query.repository_id,
            &query.commit,
            &query.path,
            query.dump_id,
            token,
            span.clone(),
        )
        .await?
        else {
            return Ok(None);
        };

        let Some(path_in_db) = dump.path_to_database(&query.path) else {
            return Ok(Some(ReferencesOutcome::default()));
        };
        let position = query.position();

        let mut locations = cancellable(token, async {
            database
                .references(&path_in_db, position, span.clone())
                .await
                .map_err(Error::from)
        })
        .await?;

        let Some(at) = cancellable(token, async {
            database
                .get_range_by_position(&path_in_db, position, span.clone())
                .await
                .map_err(Error::from)
        })
        .await?
        else {
            return Ok(Some(ReferencesOutcome {
                locations: dedup_locations(locations),
                new_cursor: None,
            }));
        };

        let mut new_cursor = None;
        'ranges: for range in &at.ranges {
            let monikers = sort_monikers(at.document.monikers_for(range));

            for moniker in &monikers {
                if let Some(span) = &span {
                    span.set_tag("moniker", format!("{}:{}", moniker.scheme, moniker.identifier));
                }
                let page = cancellable(token, async {
                    database
                        .moniker_results(Model::Reference, moniker, MonikerResultsArgs::default(), span.clone())
                        .await
                        .map_err(Error::from)
                })
                .await?;
                locations.extend(page.locations);
            }

            let first_import_with_package = monikers
                .iter()
                .find(|m| m.kind == MonikerKind::Import && at.document.package_information(m).is_some());

            if let Some(moniker) = first_import_with_package {
                let lookup = lookup_moniker(
                    self.metadata.as_ref(),
                    &self.caches,
                    &at.document,
                    moniker,
                    Model::Reference,
                    MonikerResultsArgs::default(),
                    token,
                    span.clone(),
                )
                .await?;
                locations.extend(lookup.locations);

                let package_information = at
                    .document
                    .package_information(moniker)
                    .expect("checked by find() predicate above");
                let initial_cursor = ReferencePaginationCursor {
                    dump_id: dump.id,
                    scheme: moniker.scheme.clone(),
                    identifier: moniker.identifier.clone(),
                    name: Some(package_information.name.clone()),
                    version: package_information.version.clone(),
                    phase: Phase::SameRepo,
                    offset: 0,
                };

                let outcome = drive_to_non_empty_page(
                    self.metadata.as_ref(),
                    &self.caches,
                    initial_cursor,
                    dump.repository_id,
                    self.config.reference_page_limit,
                    self.config.max_pagination_hops,
                    token,
                    span.clone(),
                )
                .await?;
                locations.extend(outcome.locations);
                new_cursor = outcome.new_cursor;

                // Processing stops at the first range/moniker that
                // produced a cursor.
                break 'ranges;
            }
        }

        Ok(Some(ReferencesOutcome {
            locations: dedup_locations(locations),
            new_cursor,
        }))
    }

    async fn continue_references(
        &self,
        cursor: ReferencePaginationCursor,
        token: &CancellationToken,
        span: Option<Span>,
    ) -> Result<ReferencesOutcome, Error> {
        let Some(dump) = cancellable(token, async {
            self.metadata
                .get_dump_by_id(cursor.dump_id, span.clone())
                .await
                .map_err(Error::from)
        })
        .await?
        else {
            // DumpGone: empty page, no error, no cursor.
            return Ok(ReferencesOutcome::default());
        };

        let outcome = drive_to_non_empty_page(
            self.metadata.as_ref(),
            &self.caches,
            cursor,
            dump.repository_id,
            self.config.reference_page_limit,
            self.config.max_pagination_hops,
            token,
            span,
        )
        .await?;

        Ok(ReferencesOutcome {
            locations: outcome.locations,
            new_cursor: outcome.new_cursor,
        })
    }

    /// The dump's own hover table, falling back to the home dump of the
    /// first definition when the dump has none. Outer `None` is
    /// `NoDumpFound`; inner `None` is "no hover available".
    pub async fn hover(
        &self,
        query: &QueryLocation,
        token: &CancellationToken,
        span: Option<Span>,
    ) -> Result<Option<Option<HoverOutcome>>, Error> {
        let Some((dump, database)) = resolve_closest_dump(
            self.metadata.as_ref(),
            &self.caches,
            query.repository_id,
            &query.commit,
            &query.path,
            query.dump_id,
            token,
            span.clone(),
        )
        .await?
        else {
            return Ok(None);
        };

        let Some(path_in_db) = dump.path_to_database(&query.path) else {
            return Ok(Some(None));
        };
        let position = query.position();

        if let Some(hover) = cancellable(token, async {
            database.hover(&path_in_db, position, span.clone()).await.map_err(Error::from)
        })
        .await?
        {
            return Ok(Some(Some(HoverOutcome {
                text: hover.text,
                dump,
                path: query.path.clone(),
                range: hover.range,
            })));
        }

        let Some(definitions) = self.definitions(query, token, span.clone()).await? else {
            return Ok(Some(None));
        };
        let Some(first) = definitions.into_iter().next() else {
            return Ok(Some(None));
        };

        let Some(def_path_in_db) = first.dump.path_to_database(&first.path) else {
            let what = format!(
                "definition location {:?} is not under its own dump's root {:?}",
                first.path, first.dump.root
            );
            error!(dump_id = first.dump.id, path = %first.path, root = %first.dump.root, "{what}");
            return Err(Error::Internal(what));
        };
        let def_database = Database::new(first.dump.clone(), self.caches.clone());

        let hover = cancellable(token, async {
            def_database
                .hover(&def_path_in_db, first.range.start, span.clone())
                .await
                .map_err(Error::from)
        })
        .await?;

        Ok(Some(hover.map(|h| HoverOutcome {
            text: h.text,
            dump: first.dump,
            path: first.path,
            range: h.range,
        })))
    }
}
