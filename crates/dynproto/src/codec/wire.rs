//! Physical encodings of the protobuf wire format.
//!
//! Implements varint, fixed32, fixed64 and length-delimited blocks over
//! caller-provided buffers. Size functions are pure arithmetic; encoders
//! report the bytes written and decoders the bytes consumed.

use std::fmt;

use crate::error::{DecodeError, EncodeError};
use crate::limits::MAX_VARINT_BYTES;

// =============================================================================
// WIRE TYPES AND TAGS
// =============================================================================

/// Physical layout of a field's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    Varint,
    Fixed64,
    Varlen,
    Fixed32,
}

impl WireType {
    /// Returns the 3-bit code stored in the low bits of a tag.
    pub fn code(self) -> u8 {
        match self {
            WireType::Varint => 0,
            WireType::Fixed64 => 1,
            WireType::Varlen => 2,
            WireType::Fixed32 => 5,
        }
    }

    /// Maps a tag code back to a wire type.
    ///
    /// Groups (3, 4) and the unassigned codes are not supported.
    pub fn from_code(code: u8) -> Result<Self, DecodeError> {
        match code {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::Varlen),
            5 => Ok(WireType::Fixed32),
            _ => Err(DecodeError::InvalidWireType { code }),
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WireType::Varint => "varint",
            WireType::Fixed64 => "fixed64",
            WireType::Varlen => "varlen",
            WireType::Fixed32 => "fixed32",
        })
    }
}

/// Builds the tag `(number << 3) | wire`.
#[inline]
pub fn make_tag(number: u32, wire: WireType) -> u64 {
    (u64::from(number) << 3) | u64::from(wire.code())
}

/// Splits a tag into its field number and raw wire type code.
#[inline]
pub fn split_tag(tag: u64) -> (u64, u8) {
    (tag >> 3, (tag & 0x7) as u8)
}

// =============================================================================
// VARINT
// =============================================================================

/// Returns the number of bytes `value` occupies as a varint.
#[inline]
pub fn varint_size(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Writes `value` as a varint at the start of `buf`.
#[inline]
pub fn encode_varint(buf: &mut [u8], mut value: u64) -> Result<usize, EncodeError> {
    let size = varint_size(value);
    let Some(out) = buf.get_mut(..size) else {
        return Err(EncodeError::BufferTooSmall {
            needed: size,
            available: buf.len(),
        });
    };
    for byte in &mut out[..size - 1] {
        *byte = (value as u8 & 0x7F) | 0x80;
        value >>= 7;
    }
    out[size - 1] = value as u8;
    Ok(size)
}

/// Reads a varint from the start of `buf`, returning the value and its length.
#[inline]
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize), DecodeError> {
    let mut result: u64 = 0;

    for (i, &byte) in buf.iter().take(MAX_VARINT_BYTES).enumerate() {
        let value = u64::from(byte & 0x7F);

        // The tenth byte may only carry the top bit of a u64.
        if i == MAX_VARINT_BYTES - 1 && value > 1 {
            return Err(DecodeError::VarintOverflow);
        }

        result |= value << (7 * i);

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    if buf.len() < MAX_VARINT_BYTES {
        Err(DecodeError::UnexpectedEof { context: "varint" })
    } else {
        Err(DecodeError::VarintTooLong)
    }
}

// =============================================================================
// FIXED WIDTH
// =============================================================================

/// Writes a little-endian u32.
#[inline]
pub fn encode_fixed32(buf: &mut [u8], value: u32) -> Result<usize, EncodeError> {
    write_raw(buf, &value.to_le_bytes())
}

/// Reads a little-endian u32.
#[inline]
pub fn decode_fixed32(buf: &[u8]) -> Result<(u32, usize), DecodeError> {
    let bytes = read_array::<4>(buf, "fixed32")?;
    Ok((u32::from_le_bytes(bytes), 4))
}

/// Writes a little-endian u64.
#[inline]
pub fn encode_fixed64(buf: &mut [u8], value: u64) -> Result<usize, EncodeError> {
    write_raw(buf, &value.to_le_bytes())
}

/// Reads a little-endian u64.
#[inline]
pub fn decode_fixed64(buf: &[u8]) -> Result<(u64, usize), DecodeError> {
    let bytes = read_array::<8>(buf, "fixed64")?;
    Ok((u64::from_le_bytes(bytes), 8))
}

fn read_array<const N: usize>(buf: &[u8], context: &'static str) -> Result<[u8; N], DecodeError> {
    buf.get(..N)
        .and_then(|bytes| bytes.try_into().ok())
        .ok_or(DecodeError::UnexpectedEof { context })
}

// =============================================================================
// LENGTH-DELIMITED
// =============================================================================

/// Returns the size of a varlen block holding `len` bytes.
#[inline]
pub fn varlen_size(len: usize) -> usize {
    varint_size(len as u64) + len
}

/// Writes a length prefix followed by `bytes`.
pub fn encode_varlen(buf: &mut [u8], bytes: &[u8]) -> Result<usize, EncodeError> {
    let needed = varlen_size(bytes.len());
    if buf.len() < needed {
        return Err(EncodeError::BufferTooSmall {
            needed,
            available: buf.len(),
        });
    }
    let n = encode_varint(buf, bytes.len() as u64)?;
    buf[n..needed].copy_from_slice(bytes);
    Ok(needed)
}

/// Reads a length prefix and borrows the block it announces.
///
/// Returns the block and the total number of bytes consumed.
pub fn decode_varlen(buf: &[u8]) -> Result<(&[u8], usize), DecodeError> {
    let (len, n) = decode_varint(buf)?;
    let remaining = buf.len() - n;
    if len > remaining as u64 {
        return Err(DecodeError::LengthExceedsRemaining { len, remaining });
    }
    let end = n + len as usize;
    Ok((&buf[n..end], end))
}

/// Copies `bytes` verbatim to the start of `buf`.
#[inline]
pub fn write_raw(buf: &mut [u8], bytes: &[u8]) -> Result<usize, EncodeError> {
    match buf.get_mut(..bytes.len()) {
        Some(out) => {
            out.copy_from_slice(bytes);
            Ok(bytes.len())
        }
        None => Err(EncodeError::BufferTooSmall {
            needed: bytes.len(),
            available: buf.len(),
        }),
    }
}

// =============================================================================
// UNKNOWN FIELDS
// =============================================================================

/// Returns the length of a field value of the given wire type without decoding it.
pub fn skip_field(buf: &[u8], wire: WireType) -> Result<usize, DecodeError> {
    match wire {
        WireType::Varint => decode_varint(buf).map(|(_, n)| n),
        WireType::Fixed64 => decode_fixed64(buf).map(|(_, n)| n),
        WireType::Fixed32 => decode_fixed32(buf).map(|(_, n)| n),
        WireType::Varlen => decode_varlen(buf).map(|(_, n)| n),
    }
}

// =============================================================================
// ZIGZAG ENCODING
// =============================================================================

/// Encodes a signed integer using zigzag encoding.
///
/// Maps negative numbers to odd positive numbers:
/// 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
#[inline]
pub fn zigzag_encode(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Decodes a zigzag-encoded unsigned integer back to signed.
#[inline]
pub fn zigzag_decode(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_varint_300() {
        let mut buf = [0u8; 10];
        let n = encode_varint(&mut buf, 300).unwrap();
        assert_eq!(&buf[..n], &[0xAC, 0x02]);
        assert_eq!(decode_varint(&buf[..n]).unwrap(), (300, 2));
    }

    #[test]
    fn test_varint_sizes() {
        assert_eq!(varint_size(0), 1);
        assert_eq!(varint_size(127), 1);
        assert_eq!(varint_size(128), 2);
        assert_eq!(varint_size(16383), 2);
        assert_eq!(varint_size(16384), 3);
        assert_eq!(varint_size(u64::MAX), 10);
    }

    #[test]
    fn test_varint_roundtrip() {
        let test_values = [0u64, 1, 127, 128, 255, 256, 16383, 16384, u32::MAX as u64, u64::MAX];

        for v in test_values {
            let mut buf = [0u8; 10];
            let n = encode_varint(&mut buf, v).unwrap();
            assert_eq!(n, varint_size(v));
            let (decoded, read) = decode_varint(&buf).unwrap();
            assert_eq!(v, decoded, "failed for {}", v);
            assert_eq!(read, n);
        }
    }

    #[test]
    fn test_varint_too_long() {
        // 11 continuation bytes should fail
        let data = [0x80u8; 11];
        assert!(matches!(decode_varint(&data), Err(DecodeError::VarintTooLong)));
    }

    #[test]
    fn test_varint_overflow() {
        let mut data = [0xFFu8; 10];
        data[9] = 0x02;
        assert!(matches!(decode_varint(&data), Err(DecodeError::VarintOverflow)));
    }

    #[test]
    fn test_varint_truncated() {
        assert!(matches!(
            decode_varint(&[0x96]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
        assert!(matches!(
            decode_varint(&[]),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_varint_buffer_too_small() {
        let mut buf = [0u8; 1];
        assert_eq!(
            encode_varint(&mut buf, 300),
            Err(EncodeError::BufferTooSmall { needed: 2, available: 1 })
        );
    }

    #[test]
    fn test_fixed_little_endian() {
        let mut buf = [0u8; 8];
        assert_eq!(encode_fixed32(&mut buf, 0x0102_0304).unwrap(), 4);
        assert_eq!(&buf[..4], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(decode_fixed32(&buf).unwrap(), (0x0102_0304, 4));

        assert_eq!(encode_fixed64(&mut buf, 1).unwrap(), 8);
        assert_eq!(buf, [1, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(decode_fixed64(&buf).unwrap(), (1, 8));
    }

    #[test]
    fn test_fixed_truncated() {
        assert!(matches!(
            decode_fixed32(&[1, 2, 3]),
            Err(DecodeError::UnexpectedEof { context: "fixed32" })
        ));
        assert!(matches!(
            decode_fixed64(&[0; 7]),
            Err(DecodeError::UnexpectedEof { context: "fixed64" })
        ));
    }

    #[test]
    fn test_varlen_roundtrip() {
        let mut buf = [0u8; 8];
        let n = encode_varlen(&mut buf, &[1, 2, 3]).unwrap();
        assert_eq!(&buf[..n], &[0x03, 0x01, 0x02, 0x03]);
        let (block, read) = decode_varlen(&buf[..n]).unwrap();
        assert_eq!(block, &[1, 2, 3]);
        assert_eq!(read, 4);
    }

    #[test]
    fn test_varlen_length_exceeds_remaining() {
        let result = decode_varlen(&[0x05, 0x01, 0x02]);
        assert_eq!(
            result,
            Err(DecodeError::LengthExceedsRemaining { len: 5, remaining: 2 })
        );
    }

    #[test]
    fn test_tags() {
        assert_eq!(make_tag(1, WireType::Varint), 0x08);
        assert_eq!(make_tag(2, WireType::Varlen), 0x12);
        assert_eq!(split_tag(0x12), (2, 2));
        assert_eq!(WireType::from_code(5).unwrap(), WireType::Fixed32);
        assert_eq!(
            WireType::from_code(3),
            Err(DecodeError::InvalidWireType { code: 3 })
        );
    }

    #[test]
    fn test_largest_tag_fits_limit() {
        use crate::limits::{MAX_FIELD_NUMBER, MAX_TAG_BYTES};
        let tag = make_tag(MAX_FIELD_NUMBER, WireType::Fixed32);
        assert_eq!(varint_size(tag), MAX_TAG_BYTES);
    }

    #[test]
    fn test_skip_field() {
        assert_eq!(skip_field(&[0x96, 0x01, 0xFF], WireType::Varint).unwrap(), 2);
        assert_eq!(skip_field(&[0; 9], WireType::Fixed64).unwrap(), 8);
        assert_eq!(skip_field(&[0; 4], WireType::Fixed32).unwrap(), 4);
        assert_eq!(skip_field(&[0x02, 0xAA, 0xBB, 0xCC], WireType::Varlen).unwrap(), 3);
    }

    #[test]
    fn test_zigzag_values() {
        assert_eq!(zigzag_encode(0), 0);
        assert_eq!(zigzag_encode(-1), 1);
        assert_eq!(zigzag_encode(1), 2);
        assert_eq!(zigzag_encode(-2), 3);
        assert_eq!(zigzag_encode(2), 4);
        for v in [0i64, 1, -1, 127, -128, i64::MAX, i64::MIN] {
            assert_eq!(zigzag_decode(zigzag_encode(v)), v);
        }
    }
}
