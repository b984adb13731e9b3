//! `precise-query definitions`

use super::{build_backend, CacheArgs, CommandError, LocationOutput, QueryArgs};
use crate::fixture;
use resolver::BackendConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run(query: QueryArgs, caches: CacheArgs, token: &CancellationToken) -> Result<(), CommandError> {
    let metadata = Arc::new(fixture::load(&query.metadata_fixture)?);
    let backend = build_backend(metadata, caches, BackendConfig::default());
    let query = query.into_query_location();

    let result = backend.definitions(&query, token, None).await?;
    let output = match result {
        None => serde_json::json!({ "found": false, "locations": [] }),
        Some(locations) => {
            let locations: Vec<LocationOutput> = locations.iter().map(LocationOutput::from).collect();
            serde_json::json!({ "found": true, "locations": locations })
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
