//! Codecs for repeated fields (`Vec<T>` struct fields other than bytes).
//!
//! Each element is written as its own tagged value, zeros included. Decoding
//! appends one element per occurrence. Elements with a fixed or varint wire
//! type also decode from the packed form, one length-delimited block holding
//! the bare values back to back.

use std::sync::Arc;

use crate::codec::wire::{WireType, decode_varlen, make_tag, varint_size};
use crate::codec::{Codec, Flags, encode_tagged};
use crate::reflect::SliceShape;

/// Builds the codec of repeated field `number` with elements encoded by `elem`.
pub fn codec(number: u32, type_name: &'static str, shape: SliceShape, elem: Arc<Codec>) -> Codec {
    let SliceShape {
        len,
        visit,
        push_with,
        ..
    } = shape;
    let tag = make_tag(number, elem.wire());
    let tag_size = varint_size(tag);

    let size = elem.clone();
    let encode = elem.clone();
    let decode = elem.clone();
    let codec = Codec::new(
        type_name,
        elem.wire(),
        move |value, flags| {
            if len(value) == 0 {
                return 0;
            }
            let flags = flags.nested() | Flags::PRESENT;
            let mut total = 0;
            // Infallible: the callback never returns an error.
            let _ = visit(value, &mut |item| {
                total += tag_size + size.size(item, flags);
                Ok(())
            });
            total
        },
        move |buf, value, flags| {
            let flags = flags.nested() | Flags::PRESENT;
            let mut offset = 0;
            visit(value, &mut |item| {
                let out = buf.get_mut(offset..).unwrap_or_default();
                offset += encode_tagged(out, tag, tag_size, |out| encode.encode(out, item, flags))?;
                Ok(())
            })?;
            Ok(offset)
        },
        move |buf, value, flags| {
            push_with(value, &mut |item| decode.decode(buf, item, flags.nested()))
        },
    )
    .with_inlined(true)
    .with_repeated();

    if elem.wire() == WireType::Varlen {
        return codec;
    }
    codec.with_packed(move |buf, value, flags| {
        let (block, consumed) = decode_varlen(buf)?;
        let mut pos = 0;
        while pos < block.len() {
            let rest = &block[pos..];
            pos += push_with(value, &mut |item| elem.decode(rest, item, flags.nested()))?;
        }
        Ok(consumed)
    })
}
