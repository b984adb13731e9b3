//! `precise-query references`

use super::{build_backend, CacheArgs, CommandError, LocationOutput, QueryArgs};
use crate::fixture;
use precise_types::cursor::ReferencePaginationCursor;
use resolver::BackendConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run(
    query: QueryArgs,
    caches: CacheArgs,
    cursor: Option<String>,
    page_limit: usize,
    token: &CancellationToken,
) -> Result<(), CommandError> {
    let metadata = Arc::new(fixture::load(&query.metadata_fixture)?);
    let config = BackendConfig {
        reference_page_limit: page_limit,
        ..BackendConfig::default()
    };
    let backend = build_backend(metadata, caches, config);
    let query = query.into_query_location();

    let cursor = cursor.map(|c| ReferencePaginationCursor::decode(&c)).transpose()?;
    let result = backend.references(&query, cursor, token, None).await?;

    let output = match result {
        None => serde_json::json!({ "found": false, "locations": [], "next_cursor": null }),
        Some(outcome) => {
            let locations: Vec<LocationOutput> = outcome.locations.iter().map(LocationOutput::from).collect();
            serde_json::json!({
                "found": true,
                "locations": locations,
                "next_cursor": outcome.new_cursor.map(|c| c.encode()),
            })
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
