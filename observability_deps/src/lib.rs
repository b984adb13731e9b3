//! Observability ecosystem dependencies for the precise-query core.
//!
//! Every other crate in this workspace logs through `observability_deps::tracing`
//! rather than depending on `tracing` directly, so the whole workspace moves to a
//! new version of the logging ecosystem in one place.

pub use tracing;
