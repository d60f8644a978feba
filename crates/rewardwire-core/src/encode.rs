//! Hand-rolled encoding of the outbound location payload.
//!
//! The payload is a fixed four-field message:
//!
//! | Field | Wire type | Content   |
//! |-------|-----------|-----------|
//! | 1     | I32       | latitude  |
//! | 2     | I32       | longitude |
//! | 3     | VARINT    | flag A    |
//! | 4     | VARINT    | flag B    |
//!
//! Flags are written as a single varint byte, so they must be below 128.
//! Nothing here goes through the decoder.

use crate::error::{Error, Result};
use crate::wire::WireType;
use bytes::{BufMut, Bytes, BytesMut};

/// Flag A value observed in live traffic
pub const DEFAULT_FLAG_A: u32 = 2;

/// Flag B value observed in live traffic
pub const DEFAULT_FLAG_B: u32 = 1;

/// Largest flag value that fits in one varint byte
pub const MAX_FLAG_VALUE: u32 = 0x7F;

/// Encoded size of a location payload
pub const LOCATION_PAYLOAD_LEN: usize = 14;

const LATITUDE_TAG: u8 = WireType::I32.tag(1) as u8;
const LONGITUDE_TAG: u8 = WireType::I32.tag(2) as u8;
const FLAG_A_TAG: u8 = WireType::Varint.tag(3) as u8;
const FLAG_B_TAG: u8 = WireType::Varint.tag(4) as u8;

/// Inputs of the location payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationPayload {
    /// Latitude in decimal degrees
    pub latitude: f32,
    /// Longitude in decimal degrees
    pub longitude: f32,
    /// Field 3
    pub flag_a: u32,
    /// Field 4
    pub flag_b: u32,
}

impl LocationPayload {
    /// Creates a payload for the given coordinates with the default flags
    pub fn new(latitude: f32, longitude: f32) -> Self {
        Self {
            latitude,
            longitude,
            flag_a: DEFAULT_FLAG_A,
            flag_b: DEFAULT_FLAG_B,
        }
    }

    /// Sets both flags
    pub fn flags(mut self, flag_a: u32, flag_b: u32) -> Self {
        self.flag_a = flag_a;
        self.flag_b = flag_b;
        self
    }

    /// Encodes the payload
    pub fn encode(&self) -> Result<Bytes> {
        encode_location_payload(self.latitude, self.longitude, self.flag_a, self.flag_b)
    }
}

/// Encode the location payload.
///
/// Fails with [`Error::ValueOutOfRange`] if either flag exceeds
/// [`MAX_FLAG_VALUE`].
pub fn encode_location_payload(
    latitude: f32,
    longitude: f32,
    flag_a: u32,
    flag_b: u32,
) -> Result<Bytes> {
    let flag_a = single_byte("flag_a", flag_a)?;
    let flag_b = single_byte("flag_b", flag_b)?;

    let mut buf = BytesMut::with_capacity(LOCATION_PAYLOAD_LEN);
    buf.put_u8(LATITUDE_TAG);
    buf.put_f32_le(latitude);
    buf.put_u8(LONGITUDE_TAG);
    buf.put_f32_le(longitude);
    buf.put_u8(FLAG_A_TAG);
    buf.put_u8(flag_a);
    buf.put_u8(FLAG_B_TAG);
    buf.put_u8(flag_b);

    Ok(buf.freeze())
}

fn single_byte(field: &'static str, value: u32) -> Result<u8> {
    if value > MAX_FLAG_VALUE {
        return Err(Error::ValueOutOfRange { field, value });
    }
    Ok(value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode_message;
    use crate::value::Value;

    #[test]
    fn test_zero_location() {
        let bytes = encode_location_payload(0.0, 0.0, 2, 1).unwrap();
        assert_eq!(
            &bytes[..],
            &[0x0D, 0, 0, 0, 0, 0x15, 0, 0, 0, 0, 0x18, 0x02, 0x20, 0x01]
        );
        assert_eq!(bytes.len(), LOCATION_PAYLOAD_LEN);
    }

    #[test]
    fn test_floats_little_endian() {
        let bytes = encode_location_payload(1.0, -2.0, 0, 127).unwrap();
        assert_eq!(&bytes[1..5], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[6..10], &(-2.0f32).to_le_bytes());
        assert_eq!(bytes[13], 0x7F);
    }

    #[test]
    fn test_flag_out_of_range() {
        assert_eq!(
            encode_location_payload(0.0, 0.0, 128, 1),
            Err(Error::ValueOutOfRange {
                field: "flag_a",
                value: 128
            })
        );
        assert!(matches!(
            LocationPayload::new(0.0, 0.0).flags(1, 1000).encode(),
            Err(Error::ValueOutOfRange { field: "flag_b", .. })
        ));
    }

    #[test]
    fn test_defaults() {
        let payload = LocationPayload::new(35.7721, -78.6386);
        assert_eq!(payload.flag_a, DEFAULT_FLAG_A);
        assert_eq!(payload.flag_b, DEFAULT_FLAG_B);
    }

    #[test]
    fn test_decoder_reads_encoder_output() {
        let bytes = LocationPayload::new(35.7721, -78.6386).encode().unwrap();
        let tree = decode_message(&bytes).unwrap();
        assert_eq!(tree.first(1), Some(&Value::Float32(35.7721)));
        assert_eq!(tree.first(2), Some(&Value::Float32(-78.6386)));
        assert_eq!(tree.first(3), Some(&Value::Integer(2)));
        assert_eq!(tree.first(4), Some(&Value::Integer(1)));
    }
}
