//! The cross-dump reference pagination state machine: same-repo, then
//! remote-repo, with skip-empty-page recursion bounded against adversarial
//! metadata content.

use crate::cancel::cancellable;
use crate::error::Error;
use dump_store::{
    caches::Caches,
    database::{Database, MonikerResultsArgs},
};
use metadata_store::{MetadataStore, ReferencesParams};
use observability_deps::tracing::warn;
use precise_trace::Span;
use precise_types::{
    document::Model,
    location::InternalLocation,
    moniker::{Moniker, MonikerId, MonikerKind},
    cursor::{Phase, ReferencePaginationCursor},
};
use tokio_util::sync::CancellationToken;

/// Default max number of same-repo/remote-repo hops
/// [`drive_to_non_empty_page`] will take while chasing the skip-empty-page
/// rule before giving up, matching the bounded visited-set guard the design
/// notes prescribe for the LSIF result-set graph's own cycles.
pub const DEFAULT_MAX_PAGINATION_HOPS: usize = 64;

/// One page of a paginated references query: the locations this page
/// produced, and the cursor a follow-up request should present (`None` once
/// the state machine has terminated).
#[derive(Debug, Clone, Default)]
pub struct PaginationOutcome {
    /// Locations produced by this page.
    pub locations: Vec<InternalLocation>,
    /// Cursor for the next page, or `None` if exhausted.
    pub new_cursor: Option<ReferencePaginationCursor>,
}

fn synthetic_moniker(cursor: &ReferencePaginationCursor) -> Moniker {
    // `Database::moniker_results` only reads `scheme`/`identifier` off the
    // moniker it's given; the rest is irrelevant for a table lookup keyed on
    // those two fields.
    Moniker {
        id: MonikerId(0),
        kind: MonikerKind::Import,
        scheme: cursor.scheme.clone(),
        identifier: cursor.identifier.clone(),
        package_information_id: None,
    }
}

fn params_for(cursor: &ReferencePaginationCursor, repository_id: i64, limit: usize) -> ReferencesParams {
    ReferencesParams {
        repository_id,
        scheme: cursor.scheme.clone(),
        identifier: cursor.identifier.clone(),
        name: cursor.name.clone(),
        version: cursor.version.clone(),
        limit,
        offset: cursor.offset,
    }
}

/// Probe whether any remote-repo dump depends on the moniker `cursor` names,
/// without fetching any locations (`hasRemoteReferences`).
async fn has_remote_references(
    metadata: &dyn MetadataStore,
    cursor: &ReferencePaginationCursor,
    repository_id: i64,
    token: &CancellationToken,
    span: Option<Span>,
) -> Result<bool, Error> {
    let params = ReferencesParams {
        limit: 1,
        offset: 0,
        ..params_for(cursor, repository_id, 1)
    };
    let page = cancellable(token, async {
        metadata.get_references(params, span).await.map_err(Error::from)
    })
    .await?;
    Ok(page.total_count > 0)
}

/// Run one hop of the state machine at `cursor`'s current phase: query the
/// metadata store for the page of dumps at `cursor.offset`, fan out
/// `monikerResults` against each, and compute the next cursor (if any).
async fn one_hop(
    metadata: &dyn MetadataStore,
    caches: &Caches,
    cursor: &ReferencePaginationCursor,
    repository_id: i64,
    limit: usize,
    token: &CancellationToken,
    span: Option<Span>,
) -> Result<PaginationOutcome, Error> {
    let params = params_for(cursor, repository_id, limit);
    let page = cancellable(token, async {
        match cursor.phase {
            Phase::SameRepo => metadata.get_same_repo_remote_references(params, span.clone()).await,
            Phase::RemoteRepo => metadata.get_references(params, span.clone()).await,
        }
        .map_err(Error::from)
    })
    .await?;

    if let Some(span) = &span {
        span.set_tag(
            "package_references",
            format!("{:?}:offset={}:total={}", cursor.phase, cursor.offset, page.total_count),
        );
    }

    let moniker = synthetic_moniker(cursor);
    let fetches = page
        .references
        .iter()
        .filter(|dump| dump.id != cursor.dump_id)
        .cloned()
        .map(|dump| {
            let caches = caches.clone();
            let token = token.clone();
            let span = span.clone();
            let moniker = moniker.clone();
            async move {
                let database = Database::new(dump, caches);
                cancellable(&token, async {
                    database
                        .moniker_results(Model::Reference, &moniker, MonikerResultsArgs::default(), span)
                        .await
                        .map_err(Error::from)
                })
                .await
            }
        });

    let pages = crate::cancel::collapse_fan_out(futures::future::join_all(fetches).await)?;
    let locations = pages.into_iter().flat_map(|p| p.locations).collect();

    let new_cursor = match cursor.phase {
        Phase::SameRepo => {
            if page.new_offset < page.total_count {
                Some(ReferencePaginationCursor {
                    offset: page.new_offset,
                    ..cursor.clone()
                })
            } else if has_remote_references(metadata, cursor, repository_id, token, span.clone()).await? {
                Some(ReferencePaginationCursor {
                    phase: Phase::RemoteRepo,
                    offset: 0,
                    ..cursor.clone()
                })
            } else {
                None
            }
        }
        Phase::RemoteRepo => {
            if page.new_offset < page.total_count {
                Some(ReferencePaginationCursor {
                    offset: page.new_offset,
                    ..cursor.clone()
                })
            } else {
                None
            }
        }
    };

    Ok(PaginationOutcome { locations, new_cursor })
}

/// Drive the state machine starting at `cursor`, applying the skip-empty-page
/// rule: if a hop produces no locations but does advance the cursor, recurse
/// into the new cursor rather than handing the client an empty page,
/// stopping once locations are non-empty, the machine terminates, or
/// `max_hops` is exceeded.
pub async fn drive_to_non_empty_page(
    metadata: &dyn MetadataStore,
    caches: &Caches,
    mut cursor: ReferencePaginationCursor,
    repository_id: i64,
    limit: usize,
    max_hops: usize,
    token: &CancellationToken,
    span: Option<Span>,
) -> Result<PaginationOutcome, Error> {
    for _ in 0..max_hops {
        let outcome = one_hop(metadata, caches, &cursor, repository_id, limit, token, span.clone()).await?;
        if !outcome.locations.is_empty() || outcome.new_cursor.is_none() {
            return Ok(outcome);
        }
        cursor = outcome.new_cursor.expect("checked above");
    }

    warn!(
        dump_id = cursor.dump_id,
        scheme = %cursor.scheme,
        identifier = %cursor.identifier,
        max_hops,
        "pagination state machine exceeded max hops chasing empty pages; terminating"
    );
    Ok(PaginationOutcome {
        locations: vec![],
        new_cursor: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dump_store::caches::CacheCapacities;
    use metadata_store::memory::InMemoryMetadataStore;
    use precise_metric::Registry;
    use precise_time::SystemProvider;
    use precise_types::Dump;
    use std::sync::Arc;

    fn caches() -> Caches {
        Caches::new(CacheCapacities::default(), Arc::new(Registry::new()), Arc::new(SystemProvider))
    }

    fn dump(id: i64, repository_id: i64) -> Dump {
        Dump {
            id,
            repository_id,
            commit: "abc".to_string(),
            root: "".to_string(),
            filename: format!("/nonexistent/{id}.db"),
        }
    }

    fn base_cursor(dump_id: i64) -> ReferencePaginationCursor {
        ReferencePaginationCursor {
            dump_id,
            scheme: "npm".to_string(),
            identifier: "lodash::debounce".to_string(),
            name: Some("lodash".to_string()),
            version: Some("4.17.0".to_string()),
            phase: Phase::SameRepo,
            offset: 0,
        }
    }

    #[tokio::test]
    async fn terminates_immediately_when_no_dependents_exist() {
        let metadata = InMemoryMetadataStore::builder().dump(dump(1, 42)).build();

        let outcome = drive_to_non_empty_page(
            &metadata,
            &caches(),
            base_cursor(1),
            42,
            10,
            DEFAULT_MAX_PAGINATION_HOPS,
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

        assert!(outcome.locations.is_empty());
        assert!(outcome.new_cursor.is_none());
    }

    #[tokio::test]
    async fn transitions_from_same_repo_to_remote_repo_when_exhausted_and_remote_exists() {
        // The only dependent is in a different repository, so the
        // same-repo page is empty (no dump to fan out `moniker_results`
        // against); the remote probe then finds it and the cursor
        // transitions phases instead of terminating.
        let metadata = InMemoryMetadataStore::builder()
            .dump(dump(1, 42))
            .dump(dump(2, 99))
            .dependents("npm", "lodash::debounce", Some("lodash"), Some("4.17.0"), vec![2])
            .build();

        let outcome = drive_to_non_empty_page(
            &metadata,
            &caches(),
            base_cursor(1),
            42,
            10,
            DEFAULT_MAX_PAGINATION_HOPS,
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

        assert!(outcome.locations.is_empty());
        let cursor = outcome.new_cursor.expect("remote phase should be offered");
        assert_eq!(cursor.phase, Phase::RemoteRepo);
        assert_eq!(cursor.offset, 0);
    }

    #[tokio::test]
    async fn cursor_excludes_the_originating_dump_from_its_own_page() {
        let metadata = InMemoryMetadataStore::builder()
            .dump(dump(1, 42))
            .dependents("npm", "lodash::debounce", Some("lodash"), Some("4.17.0"), vec![1])
            .build();

        let outcome = drive_to_non_empty_page(
            &metadata,
            &caches(),
            base_cursor(1),
            42,
            10,
            DEFAULT_MAX_PAGINATION_HOPS,
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

        assert!(outcome.locations.is_empty());
        assert!(outcome.new_cursor.is_none());
    }

    #[tokio::test]
    async fn max_hops_overflow_terminates_with_no_cursor() {
        // Every dependent row names the originating dump itself, so every
        // hop's page is excluded down to nothing (no `moniker_results`
        // fan-out ever runs) while the offset keeps advancing: the
        // skip-empty-page rule would recurse forever without the hop bound.
        let ids = vec![1; DEFAULT_MAX_PAGINATION_HOPS + 5];
        let metadata = InMemoryMetadataStore::builder()
            .dump(dump(1, 42))
            .dependents("npm", "lodash::debounce", Some("lodash"), Some("4.17.0"), ids)
            .build();

        let outcome = drive_to_non_empty_page(
            &metadata,
            &caches(),
            base_cursor(1),
            42,
            1,
            DEFAULT_MAX_PAGINATION_HOPS,
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

        assert!(outcome.locations.is_empty());
        assert!(outcome.new_cursor.is_none());
    }
}
