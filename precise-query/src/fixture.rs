//! JSON fixture format loaded by the CLI into an
//! [`metadata_store::memory::InMemoryMetadataStore`], standing in for a call
//! to the production metadata service.

use metadata_store::memory::InMemoryMetadataStore;
use precise_types::Dump;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct FixtureDump {
    id: i64,
    repository_id: i64,
    commit: String,
    #[serde(default)]
    root: String,
    filename: String,
}

#[derive(Debug, Deserialize)]
struct FixturePackage {
    scheme: String,
    name: String,
    #[serde(default)]
    version: Option<String>,
    dump_id: i64,
}

#[derive(Debug, Deserialize)]
struct FixtureDependents {
    scheme: String,
    identifier: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    version: Option<String>,
    dump_ids: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct Fixture {
    #[serde(default)]
    dumps: Vec<FixtureDump>,
    #[serde(default)]
    packages: Vec<FixturePackage>,
    #[serde(default)]
    dependents: Vec<FixtureDependents>,
}

/// Failures loading or parsing a metadata fixture file.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    /// The fixture file could not be read.
    #[error("reading metadata fixture {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// The fixture file was not valid JSON in the expected shape.
    #[error("parsing metadata fixture {path}: {source}")]
    Json {
        /// Path that failed to parse.
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Load a fixture file into a ready-to-query [`InMemoryMetadataStore`].
pub fn load(path: &Path) -> Result<InMemoryMetadataStore, FixtureError> {
    let text = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let fixture: Fixture = serde_json::from_str(&text).map_err(|source| FixtureError::Json {
        path: path.display().to_string(),
        source,
    })?;

    let mut builder = InMemoryMetadataStore::builder();
    for d in fixture.dumps {
        builder = builder.dump(Dump {
            id: d.id,
            repository_id: d.repository_id,
            commit: d.commit,
            root: d.root,
            filename: d.filename,
        });
    }
    for p in fixture.packages {
        builder = builder.package(&p.scheme, &p.name, p.version.as_deref(), p.dump_id);
    }
    for dep in fixture.dependents {
        builder = builder.dependents(
            &dep.scheme,
            &dep.identifier,
            dep.name.as_deref(),
            dep.version.as_deref(),
            dep.dump_ids,
        );
    }
    Ok(builder.build())
}
