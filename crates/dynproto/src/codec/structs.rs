//! Struct codecs: ordered, numbered fields in a length-delimited body.

use std::any::Any;
use std::cell::Cell;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::codec::wire::{
    WireType, decode_varint, decode_varlen, encode_varint, make_tag, skip_field, split_tag,
    varint_size, varlen_size,
};
use crate::codec::{Codec, Flags, encode_tagged};
use crate::error::{DecodeError, EncodeError};
use crate::limits::{MAX_DECODE_DEPTH, MAX_FIELD_NUMBER, MIN_FIELD_NUMBER};
use crate::reflect::{Field, Getter, GetterMut};

// =============================================================================
// TAGS
// =============================================================================

/// Reads a tag, returning the field number, wire type and tag length.
pub(crate) fn read_tag(buf: &[u8]) -> Result<(u32, WireType, usize), DecodeError> {
    let (tag, n) = decode_varint(buf)?;
    let (number, code) = split_tag(tag);
    if number < u64::from(MIN_FIELD_NUMBER) || number > u64::from(MAX_FIELD_NUMBER) {
        return Err(DecodeError::InvalidFieldNumber { number });
    }
    let wire = WireType::from_code(code)?;
    Ok((number as u32, wire, n))
}

/// Decodes one occurrence of field `number` carried with wire type `wire`.
///
/// Scalar repeated fields also accept the packed form.
pub(crate) fn decode_value(
    codec: &Codec,
    number: u32,
    buf: &[u8],
    value: &mut dyn Any,
    wire: WireType,
    flags: Flags,
) -> Result<usize, DecodeError> {
    if wire == codec.wire() {
        return codec.decode(buf, value, flags);
    }
    if wire == WireType::Varlen {
        if let Some(result) = codec.decode_packed(buf, value, flags) {
            return result;
        }
    }
    Err(DecodeError::WireTypeMismatch {
        field: number,
        expected: codec.wire(),
        found: wire,
    })
}

// =============================================================================
// FRAMING
// =============================================================================

/// Size of a body of `len` bytes, without its prefix when the caller frames it.
#[inline]
fn block_size(len: usize, flags: Flags) -> usize {
    if flags.contains(Flags::INLINE) {
        len
    } else {
        varlen_size(len)
    }
}

/// Reads one body: the whole buffer when the caller frames it, else a varlen.
///
/// Returns the body and the number of bytes consumed.
#[inline]
fn decode_block(buf: &[u8], flags: Flags) -> Result<(&[u8], usize), DecodeError> {
    if flags.contains(Flags::INLINE) {
        Ok((buf, buf.len()))
    } else {
        decode_varlen(buf)
    }
}

// =============================================================================
// NESTING DEPTH
// =============================================================================

thread_local! {
    static DECODE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Counts one level of message nesting on the current thread while alive.
///
/// Every cycle in a type graph passes through a struct, so counting struct
/// bodies bounds the recursion of any decode.
struct DepthGuard;

impl DepthGuard {
    fn enter() -> Result<Self, DecodeError> {
        DECODE_DEPTH.with(|depth| {
            let next = depth.get() + 1;
            if next > MAX_DECODE_DEPTH {
                return Err(DecodeError::RecursionLimitExceeded {
                    limit: MAX_DECODE_DEPTH,
                });
            }
            depth.set(next);
            Ok(DepthGuard)
        })
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DECODE_DEPTH.with(|depth| depth.set(depth.get() - 1));
    }
}

// =============================================================================
// FIELDS
// =============================================================================

/// A struct field bound to the codec of its type.
pub struct FieldCodec {
    number: u32,
    name: &'static str,
    tag: u64,
    tag_size: usize,
    codec: Arc<Codec>,
    get: Getter,
    get_mut: GetterMut,
}

impl FieldCodec {
    pub fn new(field: Field, codec: Arc<Codec>) -> Self {
        let tag = make_tag(field.number, codec.wire());
        Self {
            number: field.number,
            name: field.name,
            tag,
            tag_size: varint_size(tag),
            codec,
            get: field.get,
            get_mut: field.get_mut,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn codec(&self) -> &Arc<Codec> {
        &self.codec
    }

    fn size(&self, parent: &dyn Any, flags: Flags) -> usize {
        let value = (self.get)(parent);
        let n = self.codec.size(value, flags);
        if n == 0 || self.codec.is_repeated() {
            n
        } else {
            self.tag_size + n
        }
    }

    fn encode(&self, buf: &mut [u8], parent: &dyn Any, flags: Flags) -> Result<usize, EncodeError> {
        let value = (self.get)(parent);
        if self.codec.is_repeated() {
            return self.codec.encode(buf, value, flags);
        }
        encode_tagged(buf, self.tag, self.tag_size, |out| {
            self.codec.encode(out, value, flags)
        })
    }

    fn decode(
        &self,
        buf: &[u8],
        parent: &mut dyn Any,
        wire: WireType,
        flags: Flags,
    ) -> Result<usize, DecodeError> {
        let value = (self.get_mut)(parent);
        decode_value(&self.codec, self.number, buf, value, wire, flags)
    }
}

// =============================================================================
// STRUCT CODEC
// =============================================================================

struct StructCodec {
    type_name: &'static str,
    fields: Vec<FieldCodec>,
    index: FxHashMap<u32, usize>,
}

impl StructCodec {
    fn body_size(&self, value: &dyn Any, flags: Flags) -> usize {
        self.fields.iter().map(|field| field.size(value, flags)).sum()
    }

    fn size(&self, value: &dyn Any, flags: Flags) -> usize {
        let body = self.body_size(value, flags.nested());
        if body == 0 && !flags.keeps_zero() {
            return 0;
        }
        block_size(body, flags)
    }

    fn encode(&self, buf: &mut [u8], value: &dyn Any, flags: Flags) -> Result<usize, EncodeError> {
        let nested = flags.nested();
        let body = self.body_size(value, nested);
        if body == 0 && !flags.keeps_zero() {
            return Ok(0);
        }

        let mut offset = if flags.contains(Flags::INLINE) {
            0
        } else {
            encode_varint(buf, body as u64)?
        };
        let end = offset + body;
        if buf.len() < end {
            return Err(EncodeError::BufferTooSmall {
                needed: end,
                available: buf.len(),
            });
        }

        for field in &self.fields {
            offset += field.encode(&mut buf[offset..end], value, nested)?;
        }
        debug_assert_eq!(offset, end, "{}: size and encode disagree", self.type_name);
        Ok(offset)
    }

    fn decode(&self, buf: &[u8], value: &mut dyn Any, flags: Flags) -> Result<usize, DecodeError> {
        let (body, consumed) = decode_block(buf, flags)?;
        let _depth = DepthGuard::enter()?;
        let nested = flags.nested();

        let mut pos = 0;
        while pos < body.len() {
            let (number, wire, n) = read_tag(&body[pos..])?;
            pos += n;
            let rest = &body[pos..];
            pos += match self.index.get(&number) {
                Some(&i) => self.fields[i].decode(rest, value, wire, nested)?,
                None => {
                    log::trace!(
                        "{}: skipping unknown field {} ({})",
                        self.type_name,
                        number,
                        wire
                    );
                    skip_field(rest, wire)?
                }
            };
        }
        Ok(consumed)
    }
}

/// Builds the codec of a struct from its field codecs, in declaration order.
///
/// Field numbers must already be validated and unique.
pub fn codec(type_name: &'static str, fields: Vec<FieldCodec>) -> Codec {
    let single = match fields.as_slice() {
        [field] => Some(field.codec.clone()),
        _ => None,
    };
    let index = fields
        .iter()
        .enumerate()
        .map(|(i, field)| (field.number, i))
        .collect();
    let inner = Arc::new(StructCodec {
        type_name,
        fields,
        index,
    });

    let size = inner.clone();
    let encode = inner.clone();
    let codec = Codec::new(
        type_name,
        WireType::Varlen,
        move |value, flags| size.size(value, flags),
        move |buf, value, flags| encode.encode(buf, value, flags),
        move |buf, value, flags| inner.decode(buf, value, flags),
    );
    match single {
        Some(field) => codec.inlined_like(field),
        None => codec,
    }
}
