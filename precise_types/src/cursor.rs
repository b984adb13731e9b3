//! The reference-query pagination cursor: an opaque, server-issued token.

use serde::{Deserialize, Serialize};

/// Current wire version of [`ReferencePaginationCursor`]'s encoding. Bump
/// this whenever the fields change shape and reject anything else in
/// [`ReferencePaginationCursor::decode`].
const CURSOR_VERSION: u8 = 1;

/// Which half of the two-phase state machine a cursor is paused in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Paginating dumps in the same repository as the original query.
    SameRepo,
    /// Paginating dumps in other repositories.
    RemoteRepo,
}

/// Opaque cursor threading a paginated references query through the
/// same-repo/remote-repo state machine. Clients must treat this as an opaque
/// token; only the server constructs and interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePaginationCursor {
    /// The dump the originating query resolved against.
    pub dump_id: i64,
    /// Moniker scheme being paginated.
    pub scheme: String,
    /// Moniker identifier being paginated.
    pub identifier: String,
    /// Package name associated with the moniker, if any.
    pub name: Option<String>,
    /// Package version associated with the moniker, if any.
    pub version: Option<String>,
    /// Current phase of the state machine.
    pub phase: Phase,
    /// Offset already consumed within the current phase's result set.
    pub offset: usize,
}

/// Errors decoding a cursor presented by a client.
#[derive(Debug, thiserror::Error)]
pub enum CursorError {
    /// The cursor was not valid base64.
    #[error("cursor is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The decoded bytes were not a valid cursor envelope.
    #[error("cursor payload is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The envelope's version tag is not one this server understands.
    #[error("cursor version {0} is not supported")]
    UnsupportedVersion(u8),
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u8,
    cursor: ReferencePaginationCursor,
}

impl ReferencePaginationCursor {
    /// Encode as an opaque base64 string for the wire.
    pub fn encode(&self) -> String {
        let envelope = Envelope {
            version: CURSOR_VERSION,
            cursor: self.clone(),
        };
        // `Envelope` serialises via plain structs/enums with no maps, so this
        // cannot fail.
        let json = serde_json::to_vec(&envelope).expect("cursor envelope is always serialisable");
        base64::encode(json)
    }

    /// Decode a cursor previously produced by [`ReferencePaginationCursor::encode`].
    pub fn decode(encoded: &str) -> Result<Self, CursorError> {
        let bytes = base64::decode(encoded)?;
        let envelope: Envelope = serde_json::from_slice(&bytes)?;
        if envelope.version != CURSOR_VERSION {
            return Err(CursorError::UnsupportedVersion(envelope.version));
        }
        Ok(envelope.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReferencePaginationCursor {
        ReferencePaginationCursor {
            dump_id: 7,
            scheme: "npm".to_string(),
            identifier: "lodash::debounce".to_string(),
            name: Some("lodash".to_string()),
            version: Some("4.17.0".to_string()),
            phase: Phase::SameRepo,
            offset: 0,
        }
    }

    #[test]
    fn round_trips_through_encode_decode() {
        let cursor = sample();
        let encoded = cursor.encode();
        let decoded = ReferencePaginationCursor::decode(&encoded).unwrap();
        assert_eq!(cursor, decoded);
    }

    #[test]
    fn unknown_version_is_rejected() {
        let envelope = Envelope {
            version: CURSOR_VERSION + 1,
            cursor: sample(),
        };
        let json = serde_json::to_vec(&envelope).unwrap();
        let encoded = base64::encode(json);

        let err = ReferencePaginationCursor::decode(&encoded).unwrap_err();
        assert!(matches!(err, CursorError::UnsupportedVersion(v) if v == CURSOR_VERSION + 1));
    }

    #[test]
    fn garbage_input_is_rejected_not_panicked() {
        let err = ReferencePaginationCursor::decode("not-base64!!!").unwrap_err();
        assert!(matches!(err, CursorError::Base64(_)));
    }
}
