//! Closest-dump selection: pick the nearest dump whose `root` covers
//! the queried path and which actually contains a document there.

use crate::cancel::{cancellable, collapse_fan_out};
use crate::error::Error;
use dump_store::{caches::Caches, database::Database};
use metadata_store::MetadataStore;
use observability_deps::tracing::warn;
use precise_trace::Span;
use precise_types::Dump;
use tokio_util::sync::CancellationToken;

/// Resolve the dump a query should run against.
///
/// If `dump_id` is supplied, the caller is asserting that dump's validity:
/// it is looked up directly and no `exists` check is performed. Otherwise
/// the metadata store's candidates (nearest commit first) are filtered in
/// parallel by `database.exists`, and the first (nearest) survivor, in the
/// store's own order, wins.
///
/// Returns `Ok(None)` for "no dump answers this query" (`NoDumpFound`),
/// which callers distinguish from "found, but produced no results".
pub async fn resolve_closest_dump(
    metadata: &dyn MetadataStore,
    caches: &Caches,
    repository_id: i64,
    commit: &str,
    path: &str,
    dump_id: Option<i64>,
    token: &CancellationToken,
    span: Option<Span>,
) -> Result<Option<(Dump, Database)>, Error> {
    if let Some(id) = dump_id {
        let dump = cancellable(token, async {
            metadata.get_dump_by_id(id, span.clone()).await.map_err(Error::from)
        })
        .await?;
        return Ok(dump.map(|dump| {
            if let Some(span) = &span {
                span.set_tag("closestCommit", &dump.commit);
            }
            let database = Database::new(dump.clone(), caches.clone());
            (dump, database)
        }));
    }

    let candidates = cancellable(token, async {
        metadata
            .find_closest_dumps(repository_id, commit, path, "", span.clone())
            .await
            .map_err(Error::from)
    })
    .await?;

    let checks = candidates.into_iter().map(|dump| {
        let caches = caches.clone();
        let token = token.clone();
        let span = span.clone();
        async move {
            let Some(path_in_db) = dump.path_to_database(path) else {
                return Ok::<_, Error>(None);
            };
            let database = Database::new(dump.clone(), caches);
            let exists = cancellable(&token, async {
                database.exists(&path_in_db, span).await.map_err(Error::from)
            })
            .await?;
            Ok(exists.then_some((dump, database)))
        }
    });

    let results = futures::future::join_all(checks).await;
    let survivors = collapse_fan_out(results)?;
    let found = survivors.into_iter().flatten().next();

    match &found {
        Some((dump, _)) => {
            if let Some(span) = &span {
                span.set_tag("closestCommit", &dump.commit);
            }
        }
        None => warn!(repository_id, commit, path, "no dump found for closest-dump resolution"),
    }

    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dump_store::caches::CacheCapacities;
    use metadata_store::memory::InMemoryMetadataStore;
    use precise_metric::Registry;
    use precise_time::SystemProvider;
    use std::sync::Arc;

    fn dump(id: i64, repository_id: i64, root: &str, filename: &str) -> Dump {
        Dump {
            id,
            repository_id,
            commit: "abc".to_string(),
            root: root.to_string(),
            filename: filename.to_string(),
        }
    }

    fn caches() -> Caches {
        Caches::new(CacheCapacities::default(), Arc::new(Registry::new()), Arc::new(SystemProvider))
    }

    #[tokio::test]
    async fn dump_id_supplied_skips_the_exists_check() {
        // A nonexistent on-disk file would fail `exists`, but since we pass
        // `dump_id` directly the caller's assertion of validity is trusted
        // and no store I/O happens during selection.
        let metadata = InMemoryMetadataStore::builder()
            .dump(dump(1, 42, "src/", "/nonexistent/dump.db"))
            .build();

        let found = resolve_closest_dump(
            &metadata,
            &caches(),
            42,
            "abc",
            "src/a.ts",
            Some(1),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();
        assert_eq!(found.unwrap().0.id, 1);
    }

    #[tokio::test]
    async fn no_candidates_is_no_dump_found() {
        let metadata = InMemoryMetadataStore::builder().build();

        let found = resolve_closest_dump(
            &metadata,
            &caches(),
            42,
            "abc",
            "src/a.ts",
            None,
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();
        assert!(found.is_none());
    }
}
