//! Codecs for map fields.
//!
//! A map is a repeated field of entries. Each entry is a length-delimited
//! message with the key as field 1 and the value as field 2, both subject to
//! zero elision. Entries themselves are always written, even when empty.

use std::any::Any;
use std::sync::Arc;

use crate::codec::structs::{decode_value, read_tag};
use crate::codec::wire::{
    WireType, decode_varlen, encode_varint, make_tag, skip_field, varint_size, varlen_size,
};
use crate::codec::{Codec, Flags, encode_tagged};
use crate::error::{DecodeError, EncodeError};
use crate::reflect::MapShape;

const KEY_FIELD: u32 = 1;
const VALUE_FIELD: u32 = 2;

/// One side of an entry: a codec and the tag it is written under.
struct Slot {
    number: u32,
    codec: Arc<Codec>,
    tag: u64,
    tag_size: usize,
}

impl Slot {
    fn new(number: u32, codec: Arc<Codec>) -> Self {
        let tag = make_tag(number, codec.wire());
        Self {
            number,
            codec,
            tag,
            tag_size: varint_size(tag),
        }
    }

    fn size(&self, value: &dyn Any, flags: Flags) -> usize {
        match self.codec.size(value, flags) {
            0 => 0,
            n => self.tag_size + n,
        }
    }

    fn encode(&self, buf: &mut [u8], value: &dyn Any, flags: Flags) -> Result<usize, EncodeError> {
        encode_tagged(buf, self.tag, self.tag_size, |out| {
            self.codec.encode(out, value, flags)
        })
    }
}

struct Entry {
    key: Slot,
    value: Slot,
}

impl Entry {
    fn size(&self, key: &dyn Any, value: &dyn Any, flags: Flags) -> usize {
        self.key.size(key, flags) + self.value.size(value, flags)
    }

    fn encode(
        &self,
        buf: &mut [u8],
        key: &dyn Any,
        value: &dyn Any,
        flags: Flags,
    ) -> Result<usize, EncodeError> {
        let n = self.key.encode(buf, key, flags)?;
        let rest = buf.get_mut(n..).unwrap_or_default();
        Ok(n + self.value.encode(rest, value, flags)?)
    }

    fn decode(
        &self,
        block: &[u8],
        key: &mut dyn Any,
        value: &mut dyn Any,
        flags: Flags,
    ) -> Result<usize, DecodeError> {
        let mut pos = 0;
        while pos < block.len() {
            let (number, wire, n) = read_tag(&block[pos..])?;
            pos += n;
            let rest = &block[pos..];
            pos += match number {
                KEY_FIELD => decode_value(&self.key.codec, self.key.number, rest, key, wire, flags)?,
                VALUE_FIELD => {
                    decode_value(&self.value.codec, self.value.number, rest, value, wire, flags)?
                }
                _ => skip_field(rest, wire)?,
            };
        }
        Ok(pos)
    }
}

/// Builds the codec of map field `number`.
pub fn codec(
    number: u32,
    type_name: &'static str,
    shape: MapShape,
    key: Arc<Codec>,
    value: Arc<Codec>,
) -> Codec {
    let MapShape {
        len,
        visit,
        insert_with,
        ..
    } = shape;
    let tag = make_tag(number, WireType::Varlen);
    let tag_size = varint_size(tag);
    let entry = Arc::new(Entry {
        key: Slot::new(KEY_FIELD, key),
        value: Slot::new(VALUE_FIELD, value),
    });

    let size = entry.clone();
    let encode = entry.clone();
    Codec::new(
        type_name,
        WireType::Varlen,
        move |map, flags| {
            if len(map) == 0 {
                return 0;
            }
            let flags = flags.nested();
            let mut total = 0;
            // Infallible: the callback never returns an error.
            let _ = visit(map, &mut |key, value| {
                total += tag_size + varlen_size(size.size(key, value, flags));
                Ok(())
            });
            total
        },
        move |buf, map, flags| {
            let flags = flags.nested();
            let mut offset = 0;
            visit(map, &mut |key, value| {
                let out = buf.get_mut(offset..).unwrap_or_default();
                let len = encode.size(key, value, flags);
                let mut n = encode_varint(out, tag)?;
                n += encode_varint(&mut out[n..], len as u64)?;
                n += encode.encode(&mut out[n..], key, value, flags)?;
                offset += n;
                Ok(())
            })?;
            Ok(offset)
        },
        move |buf, map, flags| {
            let (block, consumed) = decode_varlen(buf)?;
            insert_with(map, &mut |key, value| {
                entry.decode(block, key, value, flags.nested())
            })?;
            Ok(consumed)
        },
    )
    .with_inlined(true)
    .with_repeated()
}
