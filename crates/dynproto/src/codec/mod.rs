//! Synthesized codecs.
//!
//! A [`Codec`] bundles the wire type of one Rust type with three functions
//! over type-erased handles: `size`, `encode` and `decode`. Codecs are built
//! once per type by the [`builder`] and shared through the [`cache`].
//!
//! ## Framing
//!
//! [`Flags::INLINE`] tells a struct codec that its caller supplies the
//! framing (or that it is the top-level message), so it emits its bare field
//! list. Otherwise a struct body carries a varint length prefix. Strings,
//! bytes and byte arrays are always length-prefixed. Pointers forward the
//! flag to their pointee; structs never forward it to their fields, since
//! each field owns its tagged slot.
//!
//! ## Zero elision
//!
//! A codec reporting a size of 0 has nothing to say: the enclosing struct
//! omits the field and its tag entirely. [`Flags::WANT_ZERO`] forces zero
//! values to be emitted and propagates into every nested evaluation.
//! [`Flags::PRESENT`] forces only the value it is passed with: pointers and
//! repeated fields use it so a present zero element is still sent, while the
//! element's own fields keep their usual elision.

pub mod builder;
pub mod cache;
pub mod map;
pub mod pointer;
pub mod repeated;
pub mod scalar;
pub mod structs;
pub mod wire;

use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

use bitflags::bitflags;

use crate::error::{DecodeError, EncodeError};
use wire::WireType;

bitflags! {
    /// Per-call codec options. Never stored in a codec.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u8 {
        /// The caller supplies the framing; a struct emits its bare body.
        const INLINE = 1 << 0;
        /// Emit zero values instead of eliding them, at every depth.
        const WANT_ZERO = 1 << 1;
        /// Emit this value even if it is zero. Not passed on to nested values.
        const PRESENT = 1 << 2;
    }
}

impl Flags {
    /// Flags for a nested value in its own tagged slot.
    #[inline]
    pub fn nested(self) -> Self {
        self - (Flags::INLINE | Flags::PRESENT)
    }

    /// True if a zero value must be emitted rather than elided.
    #[inline]
    pub fn keeps_zero(self) -> bool {
        self.intersects(Flags::WANT_ZERO | Flags::PRESENT)
    }
}

/// Computes the encoded size of a value.
pub type SizeFn = Arc<dyn Fn(&dyn Any, Flags) -> usize + Send + Sync>;

/// Encodes a value at the start of a buffer, returning the bytes written.
pub type EncodeFn =
    Arc<dyn Fn(&mut [u8], &dyn Any, Flags) -> Result<usize, EncodeError> + Send + Sync>;

/// Decodes a value from the start of a buffer, returning the bytes consumed.
pub type DecodeFn =
    Arc<dyn Fn(&[u8], &mut dyn Any, Flags) -> Result<usize, DecodeError> + Send + Sync>;

/// How a codec answers [`Codec::is_inlined`].
#[derive(Clone)]
enum Inlined {
    Fixed(bool),
    /// Same answer as the codec of the single contained value.
    Like(Arc<Codec>),
    /// Same answer as the codec the builder puts in the slot.
    Forward(Arc<OnceLock<Arc<Codec>>>),
}

/// Size, encode and decode functions for exactly one type.
///
/// Immutable once built. `size` and `encode` agree: for any value and flags,
/// `encode` writes exactly `size` bytes into a large enough buffer.
#[derive(Clone)]
pub struct Codec {
    type_name: &'static str,
    wire: WireType,
    inlined: Inlined,
    repeated: bool,
    size: SizeFn,
    encode: EncodeFn,
    decode: DecodeFn,
    decode_packed: Option<DecodeFn>,
}

impl Codec {
    pub fn new<S, E, D>(type_name: &'static str, wire: WireType, size: S, encode: E, decode: D) -> Self
    where
        S: Fn(&dyn Any, Flags) -> usize + Send + Sync + 'static,
        E: Fn(&mut [u8], &dyn Any, Flags) -> Result<usize, EncodeError> + Send + Sync + 'static,
        D: Fn(&[u8], &mut dyn Any, Flags) -> Result<usize, DecodeError> + Send + Sync + 'static,
    {
        Self {
            type_name,
            wire,
            inlined: Inlined::Fixed(false),
            repeated: false,
            size: Arc::new(size),
            encode: Arc::new(encode),
            decode: Arc::new(decode),
            decode_packed: None,
        }
    }

    /// Marks whether the representation collapses into a single contained value.
    pub fn with_inlined(mut self, inlined: bool) -> Self {
        self.inlined = Inlined::Fixed(inlined);
        self
    }

    /// Marks the codec as inlined exactly when `inner` is.
    pub(crate) fn inlined_like(mut self, inner: Arc<Codec>) -> Self {
        self.inlined = Inlined::Like(inner);
        self
    }

    /// Marks the codec as self-framing: it writes one tag per element itself.
    pub fn with_repeated(mut self) -> Self {
        self.repeated = true;
        self
    }

    /// Adds a decoder for the packed (single length-delimited block) form.
    pub fn with_packed<D>(mut self, decode: D) -> Self
    where
        D: Fn(&[u8], &mut dyn Any, Flags) -> Result<usize, DecodeError> + Send + Sync + 'static,
    {
        self.decode_packed = Some(Arc::new(decode));
        self
    }

    /// A codec for a type whose real codec is still being built.
    ///
    /// Delegates every call through `slot`, which the builder fills once the
    /// type's codec is complete.
    pub(crate) fn forward(type_name: &'static str, slot: Arc<OnceLock<Arc<Codec>>>) -> Self {
        let size_slot = slot.clone();
        let encode_slot = slot.clone();
        let decode_slot = slot.clone();
        let mut codec = Codec::new(
            type_name,
            WireType::Varlen,
            move |value, flags| resolve(&size_slot, type_name).size(value, flags),
            move |buf, value, flags| resolve(&encode_slot, type_name).encode(buf, value, flags),
            move |buf, value, flags| resolve(&decode_slot, type_name).decode(buf, value, flags),
        );
        codec.inlined = Inlined::Forward(slot);
        codec
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn wire(&self) -> WireType {
        self.wire
    }

    /// True if the type's representation collapses into its single contained value.
    ///
    /// Evaluated on each call, so a struct whose only field is still being
    /// built reports the final answer once the build completes. A forward
    /// codec reports `false` until then.
    pub fn is_inlined(&self) -> bool {
        match &self.inlined {
            Inlined::Fixed(inlined) => *inlined,
            Inlined::Like(inner) => inner.is_inlined(),
            Inlined::Forward(slot) => slot.get().is_some_and(|codec| codec.is_inlined()),
        }
    }

    /// True for repeated fields and maps, which write their own tags.
    pub fn is_repeated(&self) -> bool {
        self.repeated
    }

    #[inline]
    pub fn size(&self, value: &dyn Any, flags: Flags) -> usize {
        (self.size)(value, flags)
    }

    #[inline]
    pub fn encode(&self, buf: &mut [u8], value: &dyn Any, flags: Flags) -> Result<usize, EncodeError> {
        (self.encode)(buf, value, flags)
    }

    #[inline]
    pub fn decode(&self, buf: &[u8], value: &mut dyn Any, flags: Flags) -> Result<usize, DecodeError> {
        (self.decode)(buf, value, flags)
    }

    /// Decodes a packed block, if this codec accepts one.
    pub fn decode_packed(
        &self,
        buf: &[u8],
        value: &mut dyn Any,
        flags: Flags,
    ) -> Option<Result<usize, DecodeError>> {
        self.decode_packed
            .as_ref()
            .map(|decode| decode(buf, value, flags))
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec")
            .field("type_name", &self.type_name)
            .field("wire", &self.wire)
            .field("inlined", &self.is_inlined())
            .field("repeated", &self.repeated)
            .field("packed", &self.decode_packed.is_some())
            .finish()
    }
}

fn resolve<'a>(slot: &'a OnceLock<Arc<Codec>>, type_name: &'static str) -> &'a Codec {
    match slot.get() {
        Some(codec) => codec.as_ref(),
        None => panic!("codec for {type_name} used before its build finished"),
    }
}

/// Writes `tag` followed by a value, or nothing if the value encodes to zero bytes.
///
/// The value is encoded first, after room for the tag, so the size does not
/// have to be computed twice.
pub(crate) fn encode_tagged<F>(
    buf: &mut [u8],
    tag: u64,
    tag_size: usize,
    encode_value: F,
) -> Result<usize, EncodeError>
where
    F: FnOnce(&mut [u8]) -> Result<usize, EncodeError>,
{
    let rest = buf.get_mut(tag_size..).unwrap_or_default();
    let n = encode_value(rest)?;
    if n == 0 {
        return Ok(0);
    }
    wire::encode_varint(buf, tag)?;
    Ok(tag_size + n)
}
