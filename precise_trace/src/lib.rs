//! Distributed tracing context for the precise-query core.
#![warn(missing_debug_implementations)]

pub mod span;

pub use span::{Span, SpanRecorder};
