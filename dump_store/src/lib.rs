//! The per-dump reader: opens a dump file by filename and answers
//! `exists`/`definitions`/`references`/`hover`/`getRangeByPosition`/
//! `monikerResults` against it, behind three shared resource-bounded caches
//! ([`caches::Caches`]).
//!
//! The on-disk shape this crate reads (a SQLite file with `meta`,
//! `documents`, `result_chunks`, `definitions`, `references` tables) is a
//! reference decoder for the abstract Database contract, not the contract
//! itself — see `DESIGN.md`.
#![warn(missing_debug_implementations)]

pub mod caches;
pub mod connection;
pub mod database;
pub mod error;

pub use caches::{CacheCapacities, Caches};
pub use connection::{DumpConnection, SUPPORTED_FORMAT_VERSION};
pub use database::{Database, HoverResult, MonikerResultsArgs, MonikerResultsPage, RangesAtPosition};
pub use error::StoreError;
