//! Base-128 variable-length integers.
//!
//! Each byte carries seven payload bits, least significant group first. The
//! high bit is the continuation flag. A 64-bit value needs at most ten bytes.

use crate::error::{Error, Result};
use bytes::BufMut;

/// Longest valid encoding of a 64-bit varint
pub const MAX_VARINT_LEN: usize = 10;

/// Decode a varint starting at `offset` in `data`.
///
/// Returns the decoded value and the number of bytes consumed.
pub fn read_varint(data: &[u8], offset: usize) -> Result<(u64, usize)> {
    let bytes = data.get(offset..).unwrap_or_default();
    let mut result: u64 = 0;

    for (i, &byte) in bytes.iter().take(MAX_VARINT_LEN).enumerate() {
        result |= u64::from(byte & 0x7F) << (7 * i);

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    // Either ten continuation bytes in a row or the buffer ran out
    Err(Error::malformed_varint(offset))
}

/// Append the varint encoding of `value` to `buf`.
pub fn put_varint<B: BufMut>(buf: &mut B, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

/// Encode `value` as a standalone varint.
pub fn write_varint(value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(varint_len(value));
    put_varint(&mut buf, value);
    buf
}

/// Number of bytes [`write_varint`] produces for `value`.
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}
