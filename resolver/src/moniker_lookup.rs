//! `lookupMoniker`: follow an import moniker to the dump that declares its
//! package, then run a table lookup there.

use crate::cancel::cancellable;
use crate::error::Error;
use dump_store::{
    caches::Caches,
    database::{Database, MonikerResultsArgs, MonikerResultsPage},
};
use metadata_store::MetadataStore;
use precise_trace::Span;
use precise_types::{document::Document, document::Model, moniker::Moniker};
use tokio_util::sync::CancellationToken;

/// Resolve `moniker`'s package information to the dump that declares it, and
/// run `monikerResults` there.
///
/// Per the data-model invariant, an import moniker's `packageInformationId`
/// lookup succeeds iff the dump declares the dependency — if the document
/// has no package information for this moniker, or the metadata store
/// doesn't know the package, this is absence, not an error: an empty page.
pub async fn lookup_moniker(
    metadata: &dyn MetadataStore,
    caches: &Caches,
    document: &Document,
    moniker: &Moniker,
    model: Model,
    args: MonikerResultsArgs,
    token: &CancellationToken,
    span: Option<Span>,
) -> Result<MonikerResultsPage, Error> {
    let Some(package_information) = document.package_information(moniker) else {
        return Ok(MonikerResultsPage::default());
    };

    if let Some(span) = &span {
        span.set_tag(
            "packageInformation",
            format!(
                "{}:{}@{}",
                moniker.scheme,
                package_information.name,
                package_information.version.as_deref().unwrap_or("")
            ),
        );
    }

    let package = cancellable(token, async {
        metadata
            .get_package(
                &moniker.scheme,
                &package_information.name,
                package_information.version.as_deref(),
                span.clone(),
            )
            .await
            .map_err(Error::from)
    })
    .await?;

    let Some(package) = package else {
        return Ok(MonikerResultsPage::default());
    };

    let database = Database::new(package.dump, caches.clone());
    cancellable(token, async {
        database.moniker_results(model, moniker, args, span).await.map_err(Error::from)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use dump_store::caches::CacheCapacities;
    use metadata_store::memory::InMemoryMetadataStore;
    use precise_metric::Registry;
    use precise_time::SystemProvider;
    use precise_types::moniker::{MonikerId, MonikerKind, PackageInformation, PackageInformationId};
    use std::sync::Arc;

    fn caches() -> Caches {
        Caches::new(CacheCapacities::default(), Arc::new(Registry::new()), Arc::new(SystemProvider))
    }

    fn import_moniker(package_information_id: PackageInformationId) -> Moniker {
        Moniker {
            id: MonikerId(0),
            kind: MonikerKind::Import,
            scheme: "npm".to_string(),
            identifier: "lodash::debounce".to_string(),
            package_information_id: Some(package_information_id),
        }
    }

    #[tokio::test]
    async fn no_package_information_on_the_document_is_empty_not_an_error() {
        let metadata = InMemoryMetadataStore::builder().build();
        let document = Document::default();
        let moniker = import_moniker(PackageInformationId(0));

        let page = lookup_moniker(
            &metadata,
            &caches(),
            &document,
            &moniker,
            Model::Definition,
            MonikerResultsArgs::default(),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();
        assert!(page.locations.is_empty());
    }

    #[tokio::test]
    async fn unknown_package_is_empty_not_an_error() {
        let metadata = InMemoryMetadataStore::builder().build();
        let mut document = Document::default();
        let package_id = PackageInformationId(1);
        document.package_information.insert(
            package_id,
            PackageInformation {
                id: package_id,
                name: "lodash".to_string(),
                version: Some("4.17.0".to_string()),
            },
        );
        let moniker = import_moniker(package_id);

        let page = lookup_moniker(
            &metadata,
            &caches(),
            &document,
            &moniker,
            Model::Definition,
            MonikerResultsArgs::default(),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();
        assert!(page.locations.is_empty());
    }

    // Exercising the success path (package known, dump opened, table scanned)
    // requires a real on-disk dump file; that is covered end-to-end by
    // `backend::tests` against a `dump_store` test fixture.
}
