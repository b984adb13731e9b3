//! `precise-query hover`

use super::{build_backend, dump_output, CacheArgs, CommandError, QueryArgs};
use crate::fixture;
use resolver::BackendConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn run(query: QueryArgs, caches: CacheArgs, token: &CancellationToken) -> Result<(), CommandError> {
    let metadata = Arc::new(fixture::load(&query.metadata_fixture)?);
    let backend = build_backend(metadata, caches, BackendConfig::default());
    let query = query.into_query_location();

    let result = backend.hover(&query, token, None).await?;
    let output = match result {
        None => serde_json::json!({ "found": false, "hover": null }),
        Some(None) => serde_json::json!({ "found": true, "hover": null }),
        Some(Some(outcome)) => serde_json::json!({
            "found": true,
            "hover": {
                "text": outcome.text,
                "path": outcome.path,
                "range": outcome.range,
                "dump": dump_output(&outcome.dump),
            },
        }),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
