//! The backend resolver: wires the metadata store and the per-dump stores
//! ([`dump_store`]) together into the definitions/references/hover query
//! pipelines.
#![warn(missing_debug_implementations)]

pub mod backend;
pub mod cancel;
pub mod closest;
pub mod error;
pub mod moniker_lookup;
pub mod pagination;

pub use backend::{Backend, BackendConfig, HoverOutcome, QueryLocation, ReferencesOutcome};
pub use error::Error;
pub use pagination::DEFAULT_MAX_PAGINATION_HOPS;
