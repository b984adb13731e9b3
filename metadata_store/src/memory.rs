//! An in-memory [`MetadataStore`], fixture-driven and intended for tests and
//! the CLI, standing in for a production Postgres-backed implementation.

use crate::{MetadataError, MetadataStore, PackageDump, ReferencesPage, ReferencesParams};
use async_trait::async_trait;
use parking_lot::RwLock;
use precise_trace::Span;
use precise_types::Dump;
use std::collections::HashMap;

type PackageKey = (String, String, Option<String>);
type DependentKey = (String, String, Option<String>, Option<String>);

#[derive(Debug, Default, Clone)]
struct Inner {
    /// Dumps in the order the fixture registered them. `find_closest_dumps`
    /// relies on this order standing in for "nearest commit first" — the
    /// builder is responsible for adding dumps in that order.
    dumps: Vec<Dump>,
    /// `(scheme, name, version) -> id of the dump declaring that package`,
    /// used by [`MetadataStore::get_package`].
    packages: HashMap<PackageKey, i64>,
    /// `(scheme, identifier, name, version) -> ids of dumps that depend on
    /// it`, in fixture-registration order, used by `get_references` and
    /// `get_same_repo_remote_references`.
    dependents: HashMap<DependentKey, Vec<i64>>,
}

/// An in-memory, fixture-driven [`MetadataStore`].
///
/// Build one with [`InMemoryMetadataStore::builder`]; once built it is
/// read-only and safe to share behind an `Arc` across concurrent queries.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    inner: RwLock<Inner>,
}

impl InMemoryMetadataStore {
    /// Start building a fixture.
    pub fn builder() -> Builder {
        Builder::default()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn find_closest_dumps(
        &self,
        repository_id: i64,
        _commit: &str,
        path: &str,
        _frontend_url: &str,
        _span: Option<Span>,
    ) -> Result<Vec<Dump>, MetadataError> {
        let inner = self.inner.read();
        Ok(inner
            .dumps
            .iter()
            .filter(|d| d.repository_id == repository_id && path.starts_with(d.root.as_str()))
            .cloned()
            .collect())
    }

    async fn get_dump_by_id(&self, id: i64, _span: Option<Span>) -> Result<Option<Dump>, MetadataError> {
        let inner = self.inner.read();
        Ok(inner.dumps.iter().find(|d| d.id == id).cloned())
    }

    async fn get_package(
        &self,
        scheme: &str,
        name: &str,
        version: Option<&str>,
        _span: Option<Span>,
    ) -> Result<Option<PackageDump>, MetadataError> {
        let inner = self.inner.read();
        let key = (scheme.to_string(), name.to_string(), version.map(str::to_string));
        let Some(dump_id) = inner.packages.get(&key) else {
            return Ok(None);
        };
        Ok(inner
            .dumps
            .iter()
            .find(|d| d.id == *dump_id)
            .cloned()
            .map(|dump| PackageDump { dump }))
    }

    async fn get_references(
        &self,
        params: ReferencesParams,
        span: Option<Span>,
    ) -> Result<ReferencesPage, MetadataError> {
        self.scoped_references(params, span, Scope::OtherRepos).await
    }

    async fn get_same_repo_remote_references(
        &self,
        params: ReferencesParams,
        span: Option<Span>,
    ) -> Result<ReferencesPage, MetadataError> {
        self.scoped_references(params, span, Scope::SameRepo).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    SameRepo,
    OtherRepos,
}

impl InMemoryMetadataStore {
    async fn scoped_references(
        &self,
        params: ReferencesParams,
        _span: Option<Span>,
        scope: Scope,
    ) -> Result<ReferencesPage, MetadataError> {
        let inner = self.inner.read();
        let key = (
            params.scheme.clone(),
            params.identifier.clone(),
            params.name.clone(),
            params.version.clone(),
        );
        let candidate_ids = inner.dependents.get(&key).cloned().unwrap_or_default();

        let matching: Vec<Dump> = candidate_ids
            .iter()
            .filter_map(|id| inner.dumps.iter().find(|d| d.id == *id))
            .filter(|d| match scope {
                Scope::SameRepo => d.repository_id == params.repository_id,
                Scope::OtherRepos => d.repository_id != params.repository_id,
            })
            .cloned()
            .collect();

        let total_count = matching.len();
        let page: Vec<Dump> = matching
            .into_iter()
            .skip(params.offset)
            .take(params.limit)
            .collect();
        let new_offset = params.offset + page.len();

        Ok(ReferencesPage {
            references: page,
            total_count,
            new_offset,
        })
    }
}

/// Builds an [`InMemoryMetadataStore`] fixture.
#[derive(Debug, Default)]
pub struct Builder {
    inner: Inner,
}

impl Builder {
    /// Register a dump. Dumps that should win `find_closest_dumps` ties must
    /// be added before dumps further away, since this fixture's "commit
    /// distance" is registration order.
    pub fn dump(mut self, dump: Dump) -> Self {
        self.inner.dumps.push(dump);
        self
    }

    /// Register `dump_id` as the dump that declares package
    /// `(scheme, name, version)`.
    pub fn package(mut self, scheme: &str, name: &str, version: Option<&str>, dump_id: i64) -> Self {
        self.inner.packages.insert(
            (scheme.to_string(), name.to_string(), version.map(str::to_string)),
            dump_id,
        );
        self
    }

    /// Register `dump_ids` as depending on moniker
    /// `(scheme, identifier, name, version)`, in the order a page should
    /// return them.
    pub fn dependents(
        mut self,
        scheme: &str,
        identifier: &str,
        name: Option<&str>,
        version: Option<&str>,
        dump_ids: Vec<i64>,
    ) -> Self {
        self.inner.dependents.insert(
            (
                scheme.to_string(),
                identifier.to_string(),
                name.map(str::to_string),
                version.map(str::to_string),
            ),
            dump_ids,
        );
        self
    }

    /// Finish building.
    pub fn build(self) -> InMemoryMetadataStore {
        InMemoryMetadataStore {
            inner: RwLock::new(self.inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump(id: i64, repository_id: i64, root: &str) -> Dump {
        Dump {
            id,
            repository_id,
            commit: "abc".to_string(),
            root: root.to_string(),
            filename: format!("dump-{id}.db"),
        }
    }

    #[tokio::test]
    async fn find_closest_dumps_filters_by_repo_and_root_prefix() {
        let store = InMemoryMetadataStore::builder()
            .dump(dump(1, 42, "src/"))
            .dump(dump(2, 42, "lib/"))
            .dump(dump(3, 7, "src/"))
            .build();

        let found = store
            .find_closest_dumps(42, "abc", "src/a.ts", "", None)
            .await
            .unwrap();
        assert_eq!(found.iter().map(|d| d.id).collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test]
    async fn find_closest_dumps_preserves_registration_order() {
        let store = InMemoryMetadataStore::builder()
            .dump(dump(1, 42, ""))
            .dump(dump(2, 42, ""))
            .build();

        let found = store
            .find_closest_dumps(42, "abc", "a.ts", "", None)
            .await
            .unwrap();
        assert_eq!(found.iter().map(|d| d.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn get_package_resolves_registered_dependency() {
        let store = InMemoryMetadataStore::builder()
            .dump(dump(9, 1, ""))
            .package("npm", "lodash", Some("4.17.0"), 9)
            .build();

        let found = store
            .get_package("npm", "lodash", Some("4.17.0"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.dump.id, 9);

        assert!(store
            .get_package("npm", "lodash", Some("3.0.0"), None)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn references_are_scoped_by_repository_and_paginated() {
        let store = InMemoryMetadataStore::builder()
            .dump(dump(1, 42, ""))
            .dump(dump(2, 42, ""))
            .dump(dump(3, 99, ""))
            .dependents("npm", "lodash::debounce", Some("lodash"), Some("4.17.0"), vec![2, 3])
            .build();

        let same_repo = store
            .get_same_repo_remote_references(
                ReferencesParams {
                    repository_id: 42,
                    scheme: "npm".to_string(),
                    identifier: "lodash::debounce".to_string(),
                    name: Some("lodash".to_string()),
                    version: Some("4.17.0".to_string()),
                    limit: 10,
                    offset: 0,
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(same_repo.references.iter().map(|d| d.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(same_repo.total_count, 1);

        let remote = store
            .get_references(
                ReferencesParams {
                    repository_id: 42,
                    scheme: "npm".to_string(),
                    identifier: "lodash::debounce".to_string(),
                    name: Some("lodash".to_string()),
                    version: Some("4.17.0".to_string()),
                    limit: 10,
                    offset: 0,
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(remote.references.iter().map(|d| d.id).collect::<Vec<_>>(), vec![3]);
    }

    #[tokio::test]
    async fn dump_referencing_a_deleted_id_is_silently_dropped() {
        let store = InMemoryMetadataStore::builder()
            .dump(dump(1, 42, ""))
            .dependents("npm", "x", None, None, vec![1, 404])
            .build();

        let page = store
            .get_same_repo_remote_references(
                ReferencesParams {
                    repository_id: 42,
                    scheme: "npm".to_string(),
                    identifier: "x".to_string(),
                    name: None,
                    version: None,
                    limit: 10,
                    offset: 0,
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(page.references.len(), 1);
        assert_eq!(page.total_count, 1);
    }
}
