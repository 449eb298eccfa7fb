//! dynproto: protobuf-compatible encoding synthesized from runtime type shapes.
//!
//! This crate encodes and decodes structured Rust values in the protocol
//! buffers wire format without per-type serialization code. Types describe
//! their structure once (the [`message!`] macro does this for structs); the
//! first time a type is used, a codec is synthesized from that description
//! and cached for the rest of the process.
//!
//! # Quick Start
//!
//! ```rust
//! use dynproto::{marshal, message, unmarshal};
//!
//! message! {
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct Point {
//!         pub x: i32 = 1,
//!         pub y: i32 = 2,
//!         pub label: String = 3,
//!     }
//! }
//!
//! let point = Point { x: 150, y: 0, label: "origin".to_string() };
//!
//! // y is zero, so it is not sent
//! let bytes = marshal(&point).unwrap();
//! assert_eq!(&bytes[..3], &[0x08, 0x96, 0x01]);
//!
//! let mut decoded = Point::default();
//! unmarshal(&bytes, &mut decoded).unwrap();
//! assert_eq!(point, decoded);
//! ```
//!
//! # Modules
//!
//! - [`reflect`]: Runtime type shapes ([`Reflect`], [`Message`], [`TypeRef`])
//! - [`codec`]: Codec synthesis, the wire primitives and the codec cache
//! - [`types`]: Newtypes selecting `sint*` and `fixed*` encodings
//! - [`error`]: Error types
//! - [`limits`]: Wire format bounds
//!
//! # Supported types
//!
//! | Rust | protobuf |
//! |---|---|
//! | `bool`, `i32`, `i64`, `isize`, `u32`, `u64`, `usize` | `bool`, `int32`, `int64`, `uint32`, `uint64` |
//! | `f32`, `f64` | `float`, `double` |
//! | [`Sint32`], [`Sint64`], [`Fixed32`], [`Fixed64`], [`Sfixed32`], [`Sfixed64`] | same name |
//! | `String` | `string` |
//! | `Vec<u8>`, `[u8; N]` | `bytes` |
//! | structs declared with [`message!`] | message |
//! | `Option<T>`, `Box<T>` | the pointee, with explicit presence |
//! | `Vec<T>` struct fields | `repeated T` (packed input accepted) |
//! | `HashMap<K, V>`, `BTreeMap<K, V>` struct fields | `map<K, V>` |
//!
//! # Security
//!
//! Decoding untrusted input never panics on malformed data: truncated
//! input, overlong varints, oversized length prefixes, bad tags and invalid
//! UTF-8 are all reported as [`DecodeError`]s. Message nesting is capped at
//! [`limits::MAX_DECODE_DEPTH`], so deeply nested input for a recursive type
//! fails with an error instead of exhausting the stack.

pub mod codec;
pub mod error;
pub mod limits;
mod macros;
pub mod marshal;
pub mod reflect;
pub mod types;

// Re-export commonly used types at crate root
pub use codec::builder::Builder;
pub use codec::cache::CodecCache;
pub use codec::{Codec, Flags};
pub use error::{BuildError, DecodeError, EncodeError, Error, ErrorCode};
pub use marshal::{marshal, marshal_into, prepare, size, unmarshal};
pub use reflect::{Message, Reflect, TypeRef, inspect, inspect_mut};
pub use types::{Fixed32, Fixed64, Sfixed32, Sfixed64, Sint32, Sint64};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
