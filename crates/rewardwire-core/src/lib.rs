//! # rewardwire-core
//!
//! A schema-less Protocol Buffer codec and the reward extraction built on it.
//!
//! This crate provides the core functionality for:
//! - Splitting raw protobuf wire data into fields without a `.proto` schema
//! - Inferring a typed [`Value`] for every field, nested messages included
//! - Projecting a decoded loyalty summary into [`RewardRecord`]s
//! - Encoding the fixed outbound location payload by hand
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`wire`]: Varints and the raw field splitter
//! - [`value`]: Type inference for individual fields
//! - [`tree`]: Generic decoded message trees
//! - [`decode`]: Top-level decoding and failure reporting
//! - [`reward`]: Reward record projection
//! - [`encode`]: Location payload encoding
//! - [`error`]: Error types and handling
//!
//! Every operation is a pure function of its input; nothing is shared
//! between calls.
//!
//! ## Example
//!
//! ```
//! use rewardwire_core::{decode_message, RewardProjector};
//!
//! // Field 1 { 8: 1, 10: "Free Sandwich" }
//! let body = b"\x0a\x11\x40\x01\x52\x0dFree Sandwich";
//!
//! let tree = decode_message(body)?;
//! let rewards = RewardProjector::new().project(&tree);
//! assert_eq!(rewards[0].title, "Free Sandwich");
//! # Ok::<(), rewardwire_core::Error>(())
//! ```
//!
//! ## Known limitations
//!
//! - Fixed-width fields are always read as floats; a `fixed32` integer will
//!   come out as a meaningless [`Value::Float32`].
//! - Whether a length-delimited payload is a message, text or bytes is a
//!   guess. Text that happens to be a valid message decodes as a message;
//!   short strings such as `"hi"` often do. A reward title, item or
//!   description hit by this has no text form and reads as its default
//!   (for example `"Unknown Title"`).
//! - A zero year, month, day or redemption timestamp counts as missing.
//! - [`encode_location_payload`] writes each flag as a single byte and
//!   rejects values of 128 or more.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod decode;
pub mod encode;
pub mod error;
pub mod reward;
pub mod tree;
pub mod value;
pub mod wire;

// Re-export primary types for convenience
pub use decode::{decode_message, DecodeOutcome};
pub use encode::{encode_location_payload, LocationPayload};
pub use error::{Error, Result};
pub use reward::{
    project, DateLabel, ProjectorConfig, RewardProjector, RewardRecord, RewardStatus, Scope,
    StatusFilter,
};
pub use tree::{Entry, Tree, TreeBuilder};
pub use value::{materialize, Value, MAX_NESTING_DEPTH};
pub use wire::{decode_fields, RawField, WireType};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
