//! Public entry points.
//!
//! Each call inspects the value, fetches the codec of its type from the
//! global [`CodecCache`] (building it on first use) and runs it on the
//! top-level value with [`Flags::INLINE`]: the output buffer is the frame,
//! so a top-level message is its bare field list.
//!
//! # Panics
//!
//! A type that cannot be given a codec is a programming error, and every
//! entry point panics with the [`BuildError`] the first time it meets one.
//! Call [`prepare`] at startup to surface these as values instead.

use std::sync::Arc;

use crate::codec::Codec;
use crate::codec::Flags;
use crate::codec::cache::CodecCache;
use crate::error::{BuildError, Error};
use crate::reflect::{Message, Reflect, TypeRef, inspect, inspect_mut};

fn codec_for(ty: TypeRef) -> Arc<Codec> {
    match CodecCache::global().codec_of(ty) {
        Ok(codec) => codec,
        Err(err) => panic!("{err}"),
    }
}

/// Returns the number of bytes [`marshal`] produces for `value`.
pub fn size<M: Message + ?Sized>(value: &M) -> usize {
    let (ty, handle) = inspect(value);
    codec_for(ty).size(handle, Flags::INLINE)
}

/// Encodes `value` into a new buffer of exactly the right size.
pub fn marshal<M: Message + ?Sized>(value: &M) -> Result<Vec<u8>, Error> {
    let (ty, handle) = inspect(value);
    let codec = codec_for(ty);
    let mut buf = vec![0u8; codec.size(handle, Flags::INLINE)];
    let n = codec
        .encode(&mut buf, handle, Flags::INLINE)
        .map_err(|source| Error::Encode {
            op: "marshal",
            type_name: ty.name(),
            source,
        })?;
    debug_assert_eq!(n, buf.len(), "{}: size and encode disagree", ty.name());
    Ok(buf)
}

/// Encodes `value` at the start of `buf`, returning the number of bytes written.
///
/// Fails with a buffer-too-small error if `buf` is shorter than [`size`].
pub fn marshal_into<M: Message + ?Sized>(buf: &mut [u8], value: &M) -> Result<usize, Error> {
    let (ty, handle) = inspect(value);
    codec_for(ty)
        .encode(buf, handle, Flags::INLINE)
        .map_err(|source| Error::Encode {
            op: "marshal_into",
            type_name: ty.name(),
            source,
        })
}

/// Decodes `buf` into `value`, which must consume every byte.
///
/// Decoding merges into the current contents: scalars present in the input
/// are overwritten, nested messages are merged, repeated fields and maps are
/// extended. An empty buffer is valid and leaves `value` untouched.
pub fn unmarshal<M: Message + ?Sized>(buf: &[u8], value: &mut M) -> Result<(), Error> {
    if buf.is_empty() {
        return Ok(());
    }
    let (ty, handle) = inspect_mut(value);
    let read = codec_for(ty)
        .decode(buf, handle, Flags::INLINE)
        .map_err(|source| Error::Decode {
            op: "unmarshal",
            type_name: ty.name(),
            source,
        })?;
    if read < buf.len() {
        return Err(Error::TrailingBytes {
            op: "unmarshal",
            type_name: ty.name(),
            read,
            len: buf.len(),
        });
    }
    Ok(())
}

/// Builds and caches the codec of `T` ahead of time.
///
/// Returns the error the entry points would otherwise panic with.
pub fn prepare<T: Reflect>() -> Result<(), BuildError> {
    CodecCache::global()
        .codec_of(TypeRef::of::<T>())
        .map(|_| ())
}
