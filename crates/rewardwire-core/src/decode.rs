//! Top-level decoding of a response body.

use crate::error::{Error, Result};
use crate::tree::{self, Tree};
use crate::value::materialize_all;
use crate::wire::decode_fields;
use serde::Serialize;
use tracing::debug;

/// Decode a complete message into a [`Tree`].
///
/// Fails only if the top-level tag stream is malformed; nested payloads that
/// do not parse fall back to text or bytes instead.
///
/// Besides [`Error::MalformedVarint`], [`Error::TruncatedMessage`] and
/// [`Error::UnsupportedWireType`], a tag carrying field number 0 or a number
/// above [`MAX_FIELD_NUMBER`](crate::wire::MAX_FIELD_NUMBER) fails with
/// [`Error::InvalidFieldNumber`]. [`Error::is_decode_failure`] matches all
/// four.
pub fn decode_message(data: &[u8]) -> Result<Tree> {
    let fields = decode_fields(data)?;
    debug!("Decoded {} top-level fields from {} bytes", fields.len(), data.len());
    Ok(tree::build(materialize_all(fields)))
}

/// The outcome of decoding one response body, for reporting.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeOutcome {
    /// The body was empty
    Empty,
    /// The body decoded
    Decoded(Tree),
    /// The body did not decode
    Failed {
        /// Why decoding failed
        error: Error,
        /// The original body, lowercase hex
        raw_hex: String,
    },
}

impl DecodeOutcome {
    /// Decodes `data`, capturing a failure together with the offending bytes
    pub fn from_bytes(data: &[u8]) -> Self {
        if data.is_empty() {
            return Self::Empty;
        }

        match decode_message(data) {
            Ok(tree) => Self::Decoded(tree),
            Err(error) => {
                debug!("Decode failed: {}", error);
                Self::Failed {
                    error,
                    raw_hex: hex::encode(data),
                }
            }
        }
    }

    /// The decoded tree; empty bodies yield an empty tree
    pub fn tree(&self) -> Option<&Tree> {
        static EMPTY: Tree = Tree::empty();
        match self {
            Self::Empty => Some(&EMPTY),
            Self::Decoded(tree) => Some(tree),
            Self::Failed { .. } => None,
        }
    }

    /// Consumes the outcome, returning the tree or the failure
    pub fn into_result(self) -> Result<Tree> {
        match self {
            Self::Empty => Ok(Tree::empty()),
            Self::Decoded(tree) => Ok(tree),
            Self::Failed { error, .. } => Err(error),
        }
    }
}

impl Serialize for DecodeOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;

        match self {
            Self::Decoded(tree) => tree.serialize(serializer),
            Self::Empty => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("info", "Empty response body")?;
                map.end()
            }
            Self::Failed { error, raw_hex } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("error", &format!("Failed to decode: {}", error))?;
                map.serialize_entry("raw_hex", raw_hex)?;
                map.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode_message(&[]).unwrap(), Tree::empty());
        assert_eq!(DecodeOutcome::from_bytes(&[]), DecodeOutcome::Empty);
    }

    #[test]
    fn test_decode_message() {
        // 'G' = 0x47 is wire type 7, so "Go" cannot parse as a message
        let data = [0x08, 0x01, 0x08, 0x02, 0x12, 0x02, b'G', b'o'];
        let tree = decode_message(&data).unwrap();
        assert_eq!(tree.values(1), &[Value::Integer(1), Value::Integer(2)]);
        assert_eq!(tree.first(2), Some(&Value::Text("Go".into())));
    }

    #[test]
    fn test_short_ascii_can_decode_as_message() {
        // "hi" is tag 0x68 (field 13, varint) followed by 0x69
        let data = [0x12, 0x02, b'h', b'i'];
        let tree = decode_message(&data).unwrap();
        let expected: Tree = [(13, Value::Integer(0x69))].into_iter().collect();
        assert_eq!(tree.first(2), Some(&Value::Message(expected)));
    }

    #[test]
    fn test_failed_outcome_carries_hex() {
        let outcome = DecodeOutcome::from_bytes(&[0x0A, 0x05, 0xAB]);
        match &outcome {
            DecodeOutcome::Failed { error, raw_hex } => {
                assert!(matches!(error, Error::TruncatedMessage { .. }));
                assert_eq!(raw_hex, "0a05ab");
            }
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(outcome.tree().is_none());
    }

    #[test]
    fn test_decode_twice_is_equal() {
        let data = [
            0x0A, 0x09, 0x72, 0x07, 0x08, 0xEA, 0x0F, 0x10, 0x03, 0x18, 0x0F, 0x10, 0x05,
        ];
        assert_eq!(decode_message(&data).unwrap(), decode_message(&data).unwrap());
    }

    #[test]
    fn test_outcome_json() {
        let json = serde_json::to_string(&DecodeOutcome::Empty).unwrap();
        assert_eq!(json, r#"{"info":"Empty response body"}"#);

        let json = serde_json::to_value(DecodeOutcome::from_bytes(&[0x0F])).unwrap();
        assert_eq!(json["raw_hex"], "0f");
        assert!(json["error"].as_str().unwrap().starts_with("Failed to decode"));
    }

    #[test]
    fn test_round_trip_against_reference_encoder() {
        use bytes::Bytes;
        use prost::encoding;

        let mut buf = Vec::new();
        encoding::uint64::encode(1, &150, &mut buf);
        encoding::float::encode(2, &35.7721, &mut buf);
        encoding::double::encode(3, &-78.6386, &mut buf);
        encoding::string::encode(4, &"Grilled Nuggets".to_string(), &mut buf);
        encoding::uint64::encode(1, &u64::MAX, &mut buf);
        encoding::bytes::encode(5, &vec![0xFFu8, 0x00], &mut buf);
        encoding::uint32::encode(6, &0, &mut buf);

        let expected: Tree = [
            (1, Value::Integer(150)),
            (2, Value::Float32(35.7721)),
            (3, Value::Float64(-78.6386)),
            (4, Value::Text("Grilled Nuggets".into())),
            (1, Value::Integer(u64::MAX)),
            (5, Value::Bytes(Bytes::from_static(&[0xFF, 0x00]))),
            (6, Value::Integer(0)),
        ]
        .into_iter()
        .collect();

        assert_eq!(decode_message(&buf).unwrap(), expected);
    }

    /// xorshift64, enough to spread buffers across the tag space
    fn next_random(state: &mut u64) -> u64 {
        *state ^= *state << 13;
        *state ^= *state >> 7;
        *state ^= *state << 17;
        *state
    }

    #[test]
    fn test_random_buffers_never_panic() {
        let mut state = 0x9E37_79B9_7F4A_7C15;
        let mut decoded = 0;

        for _ in 0..5_000 {
            let len = (next_random(&mut state) % 96) as usize;
            let buf: Vec<u8> = (0..len).map(|_| next_random(&mut state) as u8).collect();

            match DecodeOutcome::from_bytes(&buf) {
                DecodeOutcome::Empty => assert!(buf.is_empty()),
                DecodeOutcome::Decoded(tree) => {
                    decoded += 1;
                    // Floats may be NaN, so compare the rendered form
                    let again = decode_message(&buf).unwrap();
                    assert_eq!(format!("{:?}", tree), format!("{:?}", again));
                }
                DecodeOutcome::Failed { error, raw_hex } => {
                    assert!(error.is_decode_failure(), "unexpected error {:?}", error);
                    assert_eq!(raw_hex.len(), buf.len() * 2);
                }
            }
        }

        assert!(decoded > 0);
    }
}
