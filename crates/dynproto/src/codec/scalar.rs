//! Codecs for scalars, strings and byte sequences.

use std::any::Any;

use crate::codec::wire::{
    self, WireType, decode_fixed32, decode_fixed64, decode_varint, decode_varlen, encode_fixed32,
    encode_fixed64, encode_varint, encode_varlen, varint_size, varlen_size,
};
use crate::codec::{Codec, Flags};
use crate::error::DecodeError;
use crate::reflect::{ArrayShape, downcast_mut, downcast_ref};
use crate::types::{Fixed32, Fixed64, Sfixed32, Sfixed64, Sint32, Sint64};

// =============================================================================
// NUMERIC
// =============================================================================

/// Returns the value unless it is zero and zeros are not wanted.
#[inline]
fn present<T: Copy + PartialEq + Default + Any>(value: &dyn Any, flags: Flags) -> Option<T> {
    let value = *downcast_ref::<T>(value);
    (value != T::default() || flags.keeps_zero()).then_some(value)
}

/// A varint codec for `T`, given its conversions to and from the 64-bit wire value.
pub fn varint<T>(type_name: &'static str, to_wire: fn(T) -> u64, from_wire: fn(u64) -> T) -> Codec
where
    T: Copy + PartialEq + Default + Any,
{
    Codec::new(
        type_name,
        WireType::Varint,
        move |value, flags| present::<T>(value, flags).map_or(0, |v| varint_size(to_wire(v))),
        move |buf, value, flags| match present::<T>(value, flags) {
            Some(v) => encode_varint(buf, to_wire(v)),
            None => Ok(0),
        },
        move |buf, value, _| {
            let (raw, n) = decode_varint(buf)?;
            *downcast_mut::<T>(value) = from_wire(raw);
            Ok(n)
        },
    )
}

/// A four-byte little-endian codec for `T`.
pub fn fixed32<T>(type_name: &'static str, to_wire: fn(T) -> u32, from_wire: fn(u32) -> T) -> Codec
where
    T: Copy + PartialEq + Default + Any,
{
    Codec::new(
        type_name,
        WireType::Fixed32,
        |value, flags| present::<T>(value, flags).map_or(0, |_| 4),
        move |buf, value, flags| match present::<T>(value, flags) {
            Some(v) => encode_fixed32(buf, to_wire(v)),
            None => Ok(0),
        },
        move |buf, value, _| {
            let (raw, n) = decode_fixed32(buf)?;
            *downcast_mut::<T>(value) = from_wire(raw);
            Ok(n)
        },
    )
}

/// An eight-byte little-endian codec for `T`.
pub fn fixed64<T>(type_name: &'static str, to_wire: fn(T) -> u64, from_wire: fn(u64) -> T) -> Codec
where
    T: Copy + PartialEq + Default + Any,
{
    Codec::new(
        type_name,
        WireType::Fixed64,
        |value, flags| present::<T>(value, flags).map_or(0, |_| 8),
        move |buf, value, flags| match present::<T>(value, flags) {
            Some(v) => encode_fixed64(buf, to_wire(v)),
            None => Ok(0),
        },
        move |buf, value, _| {
            let (raw, n) = decode_fixed64(buf)?;
            *downcast_mut::<T>(value) = from_wire(raw);
            Ok(n)
        },
    )
}

pub fn boolean(type_name: &'static str) -> Codec {
    varint::<bool>(type_name, u64::from, |raw| raw != 0)
}

/// Negative values are sign-extended to ten bytes, as protobuf `int64` does.
pub fn int(type_name: &'static str) -> Codec {
    varint::<isize>(type_name, |v| v as i64 as u64, |raw| raw as i64 as isize)
}

/// Negative values are sign-extended to ten bytes, as protobuf `int32` does.
pub fn int32(type_name: &'static str) -> Codec {
    varint::<i32>(type_name, |v| i64::from(v) as u64, |raw| raw as i32)
}

pub fn int64(type_name: &'static str) -> Codec {
    varint::<i64>(type_name, |v| v as u64, |raw| raw as i64)
}

pub fn uint(type_name: &'static str) -> Codec {
    varint::<usize>(type_name, |v| v as u64, |raw| raw as usize)
}

pub fn uint32(type_name: &'static str) -> Codec {
    varint::<u32>(type_name, u64::from, |raw| raw as u32)
}

pub fn uint64(type_name: &'static str) -> Codec {
    varint::<u64>(type_name, |v| v, |raw| raw)
}

pub fn sint32(type_name: &'static str) -> Codec {
    varint::<Sint32>(
        type_name,
        |v| wire::zigzag_encode(i64::from(v.0)),
        |raw| Sint32(wire::zigzag_decode(raw) as i32),
    )
}

pub fn sint64(type_name: &'static str) -> Codec {
    varint::<Sint64>(
        type_name,
        |v| wire::zigzag_encode(v.0),
        |raw| Sint64(wire::zigzag_decode(raw)),
    )
}

pub fn float32(type_name: &'static str) -> Codec {
    fixed32::<f32>(type_name, f32::to_bits, f32::from_bits)
}

pub fn float64(type_name: &'static str) -> Codec {
    fixed64::<f64>(type_name, f64::to_bits, f64::from_bits)
}

pub fn fixed32_codec(type_name: &'static str) -> Codec {
    fixed32::<Fixed32>(type_name, |v| v.0, Fixed32)
}

pub fn fixed64_codec(type_name: &'static str) -> Codec {
    fixed64::<Fixed64>(type_name, |v| v.0, Fixed64)
}

pub fn sfixed32(type_name: &'static str) -> Codec {
    fixed32::<Sfixed32>(type_name, |v| v.0 as u32, |raw| Sfixed32(raw as i32))
}

pub fn sfixed64(type_name: &'static str) -> Codec {
    fixed64::<Sfixed64>(type_name, |v| v.0 as u64, |raw| Sfixed64(raw as i64))
}

// =============================================================================
// LENGTH-DELIMITED
// =============================================================================

#[inline]
fn elide(bytes: &[u8], flags: Flags) -> bool {
    bytes.is_empty() && !flags.keeps_zero()
}

pub fn string(type_name: &'static str) -> Codec {
    Codec::new(
        type_name,
        WireType::Varlen,
        |value, flags| {
            let text = downcast_ref::<String>(value);
            if elide(text.as_bytes(), flags) {
                0
            } else {
                varlen_size(text.len())
            }
        },
        |buf, value, flags| {
            let text = downcast_ref::<String>(value);
            if elide(text.as_bytes(), flags) {
                return Ok(0);
            }
            encode_varlen(buf, text.as_bytes())
        },
        |buf, value, _| {
            let (block, n) = decode_varlen(buf)?;
            let text = std::str::from_utf8(block)
                .map_err(|_| DecodeError::InvalidUtf8 { context: "string" })?;
            let target = downcast_mut::<String>(value);
            target.clear();
            target.push_str(text);
            Ok(n)
        },
    )
}

/// Codec for `Vec<u8>`.
pub fn bytes(type_name: &'static str) -> Codec {
    Codec::new(
        type_name,
        WireType::Varlen,
        |value, flags| {
            let bytes = downcast_ref::<Vec<u8>>(value);
            if elide(bytes, flags) {
                0
            } else {
                varlen_size(bytes.len())
            }
        },
        |buf, value, flags| {
            let bytes = downcast_ref::<Vec<u8>>(value);
            if elide(bytes, flags) {
                return Ok(0);
            }
            encode_varlen(buf, bytes)
        },
        |buf, value, _| {
            let (block, n) = decode_varlen(buf)?;
            let target = downcast_mut::<Vec<u8>>(value);
            target.clear();
            target.extend_from_slice(block);
            Ok(n)
        },
    )
}

/// Codec for `[u8; N]`. An all-zero array is the zero value and is elided.
pub fn byte_array(type_name: &'static str, shape: ArrayShape) -> Codec {
    let ArrayShape {
        len,
        bytes,
        bytes_mut,
    } = shape;
    let is_zero = move |value: &dyn Any, flags: Flags| {
        !flags.keeps_zero() && bytes(value).iter().all(|&b| b == 0)
    };
    Codec::new(
        type_name,
        WireType::Varlen,
        move |value, flags| {
            if is_zero(value, flags) {
                0
            } else {
                varlen_size(len)
            }
        },
        move |buf, value, flags| {
            if is_zero(value, flags) {
                return Ok(0);
            }
            encode_varlen(buf, bytes(value))
        },
        move |buf, value, _| {
            let (block, n) = decode_varlen(buf)?;
            if block.len() != len {
                return Err(DecodeError::ByteArrayLength {
                    expected: len,
                    found: block.len(),
                });
            }
            bytes_mut(value).copy_from_slice(block);
            Ok(n)
        },
    )
}
