//! Error types for the rewardwire-core library.
//!
//! This module provides error handling using the `thiserror` crate. Only the
//! wire decoder and the manual encoder can fail; materialization and reward
//! projection are total and degrade to fallbacks instead.

use thiserror::Error;

/// Result type alias for rewardwire operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all rewardwire operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A varint kept its continuation bit set for ten bytes, or the buffer
    /// ended in the middle of one
    #[error("malformed varint at offset {offset}")]
    MalformedVarint {
        /// Byte offset where the varint started
        offset: usize,
    },

    /// A declared length or fixed width runs past the end of the buffer
    #[error("truncated message at offset {offset}: need {needed} bytes, have {available}")]
    TruncatedMessage {
        /// Byte offset where the payload starts
        offset: usize,
        /// Bytes the field declares
        needed: u64,
        /// Bytes left in the buffer
        available: usize,
    },

    /// Wire type outside {0, 1, 2, 5}, including the deprecated group markers
    #[error("unsupported wire type {wire_type} at offset {offset}")]
    UnsupportedWireType {
        /// Byte offset of the tag
        offset: usize,
        /// The raw 3-bit wire type
        wire_type: u8,
    },

    /// Field number zero or above the protobuf maximum
    #[error("invalid field number {number} at offset {offset}")]
    InvalidFieldNumber {
        /// Byte offset of the tag
        offset: usize,
        /// The decoded field number
        number: u64,
    },

    /// An encoder input does not fit the encoding used for it
    #[error("value {value} for '{field}' does not fit in a single varint byte")]
    ValueOutOfRange {
        /// Name of the offending input
        field: &'static str,
        /// The rejected value
        value: u32,
    },
}

impl Error {
    /// Creates a new malformed varint error
    pub fn malformed_varint(offset: usize) -> Self {
        Self::MalformedVarint { offset }
    }

    /// Creates a new truncated message error
    pub fn truncated(offset: usize, needed: u64, available: usize) -> Self {
        Self::TruncatedMessage {
            offset,
            needed,
            available,
        }
    }

    /// Creates a new unsupported wire type error
    pub fn unsupported_wire_type(offset: usize, wire_type: u8) -> Self {
        Self::UnsupportedWireType { offset, wire_type }
    }

    /// Returns true if this error comes from parsing a tag stream
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            Self::MalformedVarint { .. }
                | Self::TruncatedMessage { .. }
                | Self::UnsupportedWireType { .. }
                | Self::InvalidFieldNumber { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::truncated(3, 10, 4);
        assert_eq!(
            err.to_string(),
            "truncated message at offset 3: need 10 bytes, have 4"
        );

        let err = Error::ValueOutOfRange {
            field: "flag_a",
            value: 300,
        };
        assert!(err.to_string().contains("flag_a"));
        assert!(err.to_string().contains("300"));
    }

    #[test]
    fn test_is_decode_failure() {
        assert!(Error::malformed_varint(0).is_decode_failure());
        assert!(Error::unsupported_wire_type(0, 3).is_decode_failure());
        assert!(!Error::ValueOutOfRange {
            field: "flag_b",
            value: 128
        }
        .is_decode_failure());
    }
}
