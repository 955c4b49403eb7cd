//! Opaque page tokens for keyset pagination.
//!
//! A token is the JSON form of [`Cursor`] encoded as URL-safe base64 without
//! padding. Callers must treat it as an unintelligible string; only the
//! identifier ever reaches a query, and always as a bound parameter.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HelpdeskError, Result};

/// Last-seen position in a descending-by-id walk.
///
/// Filtering or ordering by anything other than `id` requires changing this
/// shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Cursor {
    pub id: i64,
    pub time: DateTime<Utc>,
}

impl Cursor {
    #[must_use]
    pub const fn new(id: i64, time: DateTime<Utc>) -> Self {
        Self { id, time }
    }
}

/// Encode a cursor into a page token.
#[must_use]
pub fn encode(cursor: &Cursor) -> String {
    // A struct of an integer and a timestamp always serializes.
    let json = serde_json::to_vec(cursor).unwrap_or_default();
    URL_SAFE_NO_PAD.encode(json)
}

/// Decode a page token produced by [`encode`].
///
/// # Errors
///
/// Returns [`HelpdeskError::InvalidCursor`] if the token is not base64 or does
/// not contain a cursor.
pub fn decode(token: &str) -> Result<Cursor> {
    let bytes = URL_SAFE_NO_PAD
        .decode(token.trim())
        .map_err(|e| HelpdeskError::InvalidCursor(format!("not base64: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| HelpdeskError::InvalidCursor(format!("malformed cursor: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use chrono::TimeZone;

    fn at(secs: i64, nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, nanos).single().expect("valid timestamp")
    }

    #[test]
    fn round_trip_preserves_subsecond_time() {
        let cursor = Cursor::new(4_821, at(1_717_171_717, 123_456_789));
        let token = encode(&cursor);
        assert_eq!(decode(&token).expect("decode"), cursor);
    }

    #[test]
    fn token_is_url_safe() {
        let token = encode(&Cursor::new(i64::MAX, at(4_102_444_800, 999_999_999)));
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "token has non url-safe characters: {token}"
        );
    }

    #[test]
    fn garbage_is_invalid_cursor() {
        for token in ["!!!", "not a token", "eyJ"] {
            let err = decode(token).expect_err("garbage must not decode");
            assert_eq!(err.kind(), ErrorKind::InvalidCursor, "token {token}");
        }
    }

    #[test]
    fn well_formed_base64_with_wrong_shape_is_rejected() {
        let token = URL_SAFE_NO_PAD.encode(br#"{"id":"12","time":"yesterday"}"#);
        assert_eq!(
            decode(&token).expect_err("wrong shape").kind(),
            ErrorKind::InvalidCursor
        );

        let token = URL_SAFE_NO_PAD
            .encode(br#"{"id":1,"time":"2024-01-01T00:00:00Z","offset":500}"#);
        assert_eq!(
            decode(&token).expect_err("extra field").kind(),
            ErrorKind::InvalidCursor
        );
    }
}
