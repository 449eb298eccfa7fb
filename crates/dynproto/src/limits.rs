//! Wire-format limits.
//!
//! Most of these are properties of the protobuf encoding itself. The decode
//! depth bound protects the stack from hostile input.

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT_BYTES: usize = 10;

/// Smallest legal field number.
pub const MIN_FIELD_NUMBER: u32 = 1;

/// Largest legal field number (29 bits; the low 3 bits of a tag hold the wire type).
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

/// Maximum encoded length of a tag.
pub const MAX_TAG_BYTES: usize = 5;

/// Maximum nesting of messages accepted when decoding.
pub const MAX_DECODE_DEPTH: usize = 100;
