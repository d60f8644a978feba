//! Low-level protobuf wire format parsing.
//!
//! This module splits a buffer into raw `(field number, wire type, payload)`
//! triples without any schema. Interpreting the payloads is left to
//! [`crate::value`].
//!
//! ## Wire Format Overview
//!
//! Each protobuf field is encoded as:
//! - A varint "tag" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types:
//! - 0: VARINT (int32, int64, uint32, uint64, sint32, sint64, bool, enum)
//! - 1: I64 (fixed64, sfixed64, double)
//! - 2: LEN (string, bytes, embedded messages, packed repeated fields)
//! - 5: I32 (fixed32, sfixed32, float)
//!
//! The deprecated group wire types (3 and 4) and the unassigned values 6 and
//! 7 are rejected.

mod varint;

use crate::error::{Error, Result};
use std::iter::FusedIterator;

pub use varint::{put_varint, read_varint, varint_len, write_varint, MAX_VARINT_LEN};

/// Maximum valid protobuf field number (2^29 - 1)
pub const MAX_FIELD_NUMBER: u32 = 536_870_911;

/// Protobuf wire types understood by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    I64 = 1,
    /// Length-delimited (strings, bytes, embedded messages)
    Len = 2,
    /// 32-bit fixed-width
    I32 = 5,
}

impl WireType {
    /// Builds the tag value for `field_number` with this wire type
    pub const fn tag(self, field_number: u32) -> u64 {
        ((field_number as u64) << 3) | self as u64
    }

    /// Width of the payload for fixed-width wire types
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            WireType::I64 => Some(8),
            WireType::I32 => Some(4),
            WireType::Varint | WireType::Len => None,
        }
    }
}

impl TryFrom<u8> for WireType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            5 => Ok(WireType::I32),
            _ => Err(Error::unsupported_wire_type(0, value)),
        }
    }
}

/// One field occurrence as it appears on the wire.
///
/// `payload` borrows from the decoded buffer. For varint fields it holds the
/// varint bytes, for length-delimited fields the bytes after the length
/// prefix, for fixed-width fields the 4 or 8 raw bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawField<'a> {
    /// Field number from the tag
    pub number: u32,
    /// Wire type from the tag
    pub wire_type: WireType,
    /// Payload bytes
    pub payload: &'a [u8],
    /// Offset of the tag in the buffer
    pub offset: usize,
}

/// Iterator over the fields of a buffer.
///
/// Yields at most one error, after which it is exhausted.
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    data: &'a [u8],
    position: usize,
    failed: bool,
}

impl<'a> Fields<'a> {
    /// Creates an iterator positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            failed: false,
        }
    }

    /// Reads `len` bytes at `start`, or reports how far short the buffer is
    fn take_bytes(&self, start: usize, len: u64) -> Result<&'a [u8]> {
        let data = self.data;
        let available = data.len().saturating_sub(start);
        match usize::try_from(len) {
            Ok(len) if len <= available => Ok(&data[start..start + len]),
            _ => Err(Error::truncated(start, len, available)),
        }
    }

    fn next_field(&mut self) -> Result<RawField<'a>> {
        let data = self.data;
        let offset = self.position;
        let (tag, tag_len) = read_varint(data, offset)?;

        let wire_type = WireType::try_from((tag & 0x07) as u8)
            .map_err(|_| Error::unsupported_wire_type(offset, (tag & 0x07) as u8))?;
        let number = tag >> 3;
        if number == 0 || number > u64::from(MAX_FIELD_NUMBER) {
            return Err(Error::InvalidFieldNumber { offset, number });
        }

        let start = offset + tag_len;
        let (payload, consumed) = match wire_type {
            WireType::Varint => {
                let (_, len) = read_varint(data, start)?;
                (&data[start..start + len], len)
            }
            WireType::I64 | WireType::I32 => {
                let width = wire_type.fixed_width().unwrap_or_default();
                (self.take_bytes(start, width as u64)?, width)
            }
            WireType::Len => {
                let (length, prefix_len) = read_varint(data, start)?;
                let payload = self.take_bytes(start + prefix_len, length)?;
                (payload, prefix_len + payload.len())
            }
        };

        self.position = start + consumed;
        Ok(RawField {
            number: number as u32,
            wire_type,
            payload,
            offset,
        })
    }
}

impl<'a> Iterator for Fields<'a> {
    type Item = Result<RawField<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.position >= self.data.len() {
            return None;
        }

        let result = self.next_field();
        self.failed = result.is_err();
        Some(result)
    }
}

impl FusedIterator for Fields<'_> {}

/// Split `data` into its fields, consuming the whole buffer.
///
/// An empty buffer decodes to an empty list. Any malformed tag, varint or
/// length fails the whole buffer.
pub fn decode_fields(data: &[u8]) -> Result<Vec<RawField<'_>>> {
    Fields::new(data).collect()
}
