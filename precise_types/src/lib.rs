//! Shared data model for the precise-query core.
//!
//! Every other crate in this workspace (`dump_store`, `metadata_store`,
//! `resolver`) builds on the same positions, ranges, monikers, dumps and
//! locations defined here, so the on-the-wire shapes and the in-memory
//! shapes never drift apart.
#![warn(missing_copy_implementations, missing_debug_implementations)]

pub mod cursor;
pub mod document;
pub mod dump;
pub mod location;
pub mod moniker;
pub mod position;

pub use cursor::{CursorError, Phase, ReferencePaginationCursor};
pub use document::{Document, HoverResult, Model, RangeData, RangeId, ResultChunk, ResultChunkEntry, ResultId, result_chunk_id};
pub use dump::Dump;
pub use location::{dedup_locations, InternalLocation};
pub use moniker::{sort_monikers, Moniker, MonikerId, MonikerKind, PackageInformation, PackageInformationId};
pub use position::{Position, Range};
