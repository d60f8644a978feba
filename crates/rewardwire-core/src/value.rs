//! Materializing raw wire fields into typed values.
//!
//! Without a schema the wire type is the only hint about what a field holds.
//! Varints become integers and fixed-width fields become floats. For
//! length-delimited payloads the materializer tries, in order:
//!
//! 1. a nested message (the whole payload must parse, with at least one field)
//! 2. UTF-8 text
//! 3. opaque bytes
//!
//! The order matters: downstream record shapes depend on it, so it is kept
//! exactly as is even where a schema would disagree.

use crate::tree::{Tree, TreeBuilder};
use crate::wire::{read_varint, Fields, RawField, WireType};
use bytes::Bytes;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use tracing::trace;

/// Nesting ceiling for the nested-message attempt.
///
/// Payloads nested deeper than this are kept as [`Value::Bytes`].
pub const MAX_NESTING_DEPTH: usize = 32;

/// The materialized form of one field occurrence
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Varint, as its unsigned magnitude
    Integer(u64),
    /// 32-bit fixed-width field read as an IEEE-754 single
    Float32(f32),
    /// 64-bit fixed-width field read as an IEEE-754 double
    Float64(f64),
    /// Length-delimited payload that is valid UTF-8 but not a message
    Text(String),
    /// Length-delimited payload that is neither a message nor UTF-8
    Bytes(Bytes),
    /// Length-delimited payload that parsed as a nested message
    Message(Tree),
}

impl Value {
    /// Returns the integer, if this is one
    pub fn as_integer(&self) -> Option<u64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the nested message, if this is one
    pub fn as_message(&self) -> Option<&Tree> {
        match self {
            Value::Message(tree) => Some(tree),
            _ => None,
        }
    }

    /// Returns the value as text.
    ///
    /// Opaque bytes are converted lossily; integers, floats and messages
    /// have no text form.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Text(s) => Some(Cow::Borrowed(s)),
            Value::Bytes(b) => Some(String::from_utf8_lossy(b)),
            _ => None,
        }
    }

    /// Short name of the variant, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Integer(_) => "integer",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Text(_) => "text",
            Value::Bytes(_) => "bytes",
            Value::Message(_) => "message",
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Integer(v) => serializer.serialize_u64(*v),
            Value::Float32(v) => serializer.serialize_f32(*v),
            Value::Float64(v) => serializer.serialize_f64(*v),
            Value::Text(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_str(&hex::encode(b)),
            Value::Message(tree) => tree.serialize(serializer),
        }
    }
}

/// Materialize a top-level field.
pub fn materialize(field: &RawField<'_>) -> Value {
    materialize_with_depth(field, 0)
}

/// Materialize a field found `depth` messages below the top level.
///
/// Never fails: every payload maps to some [`Value`].
pub fn materialize_with_depth(field: &RawField<'_>, depth: usize) -> Value {
    match field.wire_type {
        WireType::Varint => match read_varint(field.payload, 0) {
            Ok((value, _)) => Value::Integer(value),
            Err(_) => Value::Bytes(Bytes::copy_from_slice(field.payload)),
        },
        WireType::I64 => match <[u8; 8]>::try_from(field.payload) {
            Ok(raw) => Value::Float64(f64::from_le_bytes(raw)),
            Err(_) => Value::Bytes(Bytes::copy_from_slice(field.payload)),
        },
        WireType::I32 => match <[u8; 4]>::try_from(field.payload) {
            Ok(raw) => Value::Float32(f32::from_le_bytes(raw)),
            Err(_) => Value::Bytes(Bytes::copy_from_slice(field.payload)),
        },
        WireType::Len => materialize_len(field, depth),
    }
}

fn materialize_len(field: &RawField<'_>, depth: usize) -> Value {
    if depth >= MAX_NESTING_DEPTH {
        trace!(
            "Field {} at offset {} exceeds nesting depth {}, keeping bytes",
            field.number,
            field.offset,
            MAX_NESTING_DEPTH
        );
        return Value::Bytes(Bytes::copy_from_slice(field.payload));
    }

    if let Some(tree) = try_nested(field.payload, depth + 1) {
        return Value::Message(tree);
    }

    match std::str::from_utf8(field.payload) {
        Ok(text) => Value::Text(text.to_owned()),
        Err(_) => Value::Bytes(Bytes::copy_from_slice(field.payload)),
    }
}

/// Decode `payload` as a message whose fields sit at `depth`.
///
/// Succeeds only if the whole payload parses and holds at least one field.
fn try_nested(payload: &[u8], depth: usize) -> Option<Tree> {
    let mut builder = TreeBuilder::new();

    for field in Fields::new(payload) {
        match field {
            Ok(field) => builder.push(field.number, materialize_with_depth(&field, depth)),
            Err(e) => {
                trace!("Not a nested message: {}", e);
                return None;
            }
        }
    }

    if builder.is_empty() {
        return None;
    }
    Some(builder.build())
}

/// Materialize every field of an already split buffer at the top level.
pub fn materialize_all<'a>(
    fields: impl IntoIterator<Item = RawField<'a>>,
) -> Vec<(RawField<'a>, Value)> {
    fields
        .into_iter()
        .map(|field| {
            let value = materialize(&field);
            (field, value)
        })
        .collect()
}
