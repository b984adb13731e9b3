//! Explicit tracing context.
//!
//! This is deliberately distinct from the `tracing` crate re-exported by
//! `observability_deps`: a [`Span`] here is caller-supplied context threaded
//! through a single query (used to tag `closestCommit`, `moniker`,
//! `packageInformation` and `package_references` per operation), not a
//! process-wide subscriber hook. A function that receives `None` never
//! fabricates a span of its own — it simply does not trace.

use chrono::{DateTime, Utc};
use observability_deps::tracing::trace;
use parking_lot::Mutex;
use std::collections::BTreeMap;

/// A single span of work, with a name, a start time, and a bag of string tags.
#[derive(Debug)]
pub struct Span {
    name: String,
    start: DateTime<Utc>,
    tags: Mutex<BTreeMap<String, String>>,
}

impl Clone for Span {
    /// Snapshots the current tags into a new, independently-lockable `Mutex`
    /// (`parking_lot::Mutex` itself isn't `Clone`). Every query pipeline
    /// threads its `Option<Span>` through many concurrent fan-out branches by
    /// value, so this needs to be cheap and infallible, not a derive.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            start: self.start,
            tags: Mutex::new(self.tags.lock().clone()),
        }
    }
}

impl Span {
    /// Create a new root span.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            start: Utc::now(),
            tags: Mutex::new(BTreeMap::new()),
        }
    }

    /// Create a child span, tagged with this span's name as `parent`.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let child = Self::new(name);
        child.set_tag("parent", self.name.clone());
        child
    }

    /// Name of this span.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach (or overwrite) a tag.
    pub fn set_tag(&self, key: &str, value: impl ToString) {
        self.tags.lock().insert(key.to_string(), value.to_string());
    }

    /// Snapshot of the tags currently attached to this span.
    pub fn tags(&self) -> BTreeMap<String, String> {
        self.tags.lock().clone()
    }

    /// Elapsed time since the span started.
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.start
    }
}

/// Owns an optional [`Span`] for the duration of a single operation.
///
/// `child_span` is the only way to obtain context for a nested call: when the
/// recorder holds `None` it returns `None`, so the "no span above what was
/// given" rule holds transitively.
#[derive(Debug)]
pub struct SpanRecorder {
    span: Option<Span>,
}

impl SpanRecorder {
    /// Wrap an optional caller-supplied span.
    pub fn new(span: Option<Span>) -> Self {
        Self { span }
    }

    /// Create a tagged child span for a nested operation, or `None` if this
    /// recorder has no span to begin with.
    pub fn child_span(&self, name: &'static str) -> Option<Span> {
        self.span.as_ref().map(|s| s.child(name))
    }

    /// Attach a tag to the span this recorder holds, a no-op if there is none.
    pub fn set_tag(&self, key: &str, value: impl ToString) {
        if let Some(span) = &self.span {
            span.set_tag(key, value);
        }
    }

    /// Borrow the underlying span, if any.
    pub fn span(&self) -> Option<&Span> {
        self.span.as_ref()
    }
}

impl Drop for SpanRecorder {
    fn drop(&mut self) {
        if let Some(span) = &self.span {
            trace!(span = %span.name(), elapsed_ms = span.elapsed().num_milliseconds(), tags = ?span.tags(), "span finished");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_with_no_span_never_yields_a_child() {
        let recorder = SpanRecorder::new(None);
        assert!(recorder.child_span("child").is_none());
    }

    #[test]
    fn child_span_records_parent_tag() {
        let root = Span::new("root");
        let recorder = SpanRecorder::new(Some(root));
        let child = recorder.child_span("child").unwrap();
        assert_eq!(child.tags().get("parent").map(String::as_str), Some("root"));
    }

    #[test]
    fn set_tag_is_visible_in_snapshot() {
        let span = Span::new("op");
        span.set_tag("moniker", "npm:lodash:4.17.0");
        assert_eq!(
            span.tags().get("moniker").map(String::as_str),
            Some("npm:lodash:4.17.0")
        );
    }
}
