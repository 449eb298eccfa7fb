//! Recursive codec synthesis.
//!
//! A [`Builder`] turns a [`TypeRef`] into a [`Codec`] by dispatching on the
//! type's [`Shape`] and building nested types first. One builder is one
//! session: it remembers every type it has seen, so shared subtypes are
//! built once and cyclic types terminate.
//!
//! Every cycle in a Rust type graph passes through a named struct. Before a
//! struct's fields are built, the session holds a forward codec for it that
//! delegates to the finished codec once it exists.

use std::any::TypeId;
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashMap;

use crate::codec::cache::CodecCache;
use crate::codec::structs::FieldCodec;
use crate::codec::{Codec, map, pointer, repeated, scalar, structs};
use crate::error::BuildError;
use crate::limits::{MAX_FIELD_NUMBER, MIN_FIELD_NUMBER};
use crate::reflect::{Field, MapShape, PointerShape, Shape, SliceShape, StructShape, TypeRef};

/// One codec synthesis session.
pub struct Builder<'a> {
    cache: Option<&'a CodecCache>,
    seen: FxHashMap<TypeId, Arc<Codec>>,
}

impl<'a> Builder<'a> {
    /// A session that reuses codecs already published in `cache`.
    pub fn new(cache: &'a CodecCache) -> Self {
        Self {
            cache: Some(cache),
            seen: FxHashMap::default(),
        }
    }

    /// A session that builds everything from scratch.
    pub fn standalone() -> Self {
        Self {
            cache: None,
            seen: FxHashMap::default(),
        }
    }

    /// Builds (or reuses) the codec for `ty`.
    pub fn build(&mut self, ty: TypeRef) -> Result<Arc<Codec>, BuildError> {
        if let Some(codec) = self.seen.get(&ty.id()) {
            return Ok(codec.clone());
        }
        if let Some(codec) = self.cache.and_then(|cache| cache.lookup(ty.id())) {
            self.seen.insert(ty.id(), codec.clone());
            return Ok(codec);
        }

        let name = ty.name();
        let codec = match ty.shape() {
            Shape::Bool => scalar::boolean(name),
            Shape::Int => scalar::int(name),
            Shape::Int32 => scalar::int32(name),
            Shape::Int64 => scalar::int64(name),
            Shape::Uint => scalar::uint(name),
            Shape::Uint32 => scalar::uint32(name),
            Shape::Uint64 => scalar::uint64(name),
            Shape::Float32 => scalar::float32(name),
            Shape::Float64 => scalar::float64(name),
            Shape::Sint32 => scalar::sint32(name),
            Shape::Sint64 => scalar::sint64(name),
            Shape::Fixed32 => scalar::fixed32_codec(name),
            Shape::Fixed64 => scalar::fixed64_codec(name),
            Shape::Sfixed32 => scalar::sfixed32(name),
            Shape::Sfixed64 => scalar::sfixed64(name),
            Shape::String => scalar::string(name),
            Shape::Byte => {
                return Err(unsupported(
                    ty,
                    "a single byte has no wire form, use Vec<u8> or [u8; N]",
                ));
            }
            Shape::Array(array) => scalar::byte_array(name, array),
            Shape::Slice(slice) => {
                if !is_byte(&slice) {
                    return Err(unsupported(
                        ty,
                        "repeated fields are only supported as struct fields",
                    ));
                }
                scalar::bytes(name)
            }
            Shape::Map(_) => {
                return Err(unsupported(ty, "maps are only supported as struct fields"));
            }
            Shape::Pointer(shape) => self.build_pointer(ty, shape)?,
            Shape::Struct(shape) => return self.build_struct(ty, shape),
        };

        log::debug!("built {} codec for {}", codec.wire(), name);
        let codec = Arc::new(codec);
        self.seen.insert(ty.id(), codec.clone());
        Ok(codec)
    }

    fn build_pointer(&mut self, ty: TypeRef, shape: PointerShape) -> Result<Codec, BuildError> {
        match shape.elem.shape() {
            Shape::Slice(slice) if !is_byte(&slice) => {
                return Err(unsupported(ty, "pointers to repeated fields are not supported"));
            }
            Shape::Map(_) => {
                return Err(unsupported(ty, "pointers to maps are not supported"));
            }
            _ => {}
        }
        let elem = self.build(shape.elem)?;
        Ok(pointer::codec(ty.name(), shape, elem))
    }

    fn build_struct(&mut self, ty: TypeRef, shape: StructShape) -> Result<Arc<Codec>, BuildError> {
        let name = ty.name();
        let slot = Arc::new(OnceLock::new());
        self.seen
            .insert(ty.id(), Arc::new(Codec::forward(name, slot.clone())));

        let mut fields: Vec<FieldCodec> = Vec::with_capacity(shape.fields.len());
        for field in shape.fields {
            if !(MIN_FIELD_NUMBER..=MAX_FIELD_NUMBER).contains(&field.number) {
                return Err(BuildError::InvalidFieldNumber {
                    type_name: name,
                    field: field.name,
                    number: field.number,
                });
            }
            if let Some(first) = fields.iter().find(|f| f.number() == field.number) {
                return Err(BuildError::DuplicateFieldNumber {
                    type_name: name,
                    number: field.number,
                    first: first.name(),
                    second: field.name,
                });
            }
            let codec = self.build_field(ty, &field)?;
            fields.push(FieldCodec::new(field, codec));
        }

        let codec = Arc::new(structs::codec(name, fields));
        log::debug!(
            "built struct codec for {} (inlined: {})",
            name,
            codec.is_inlined()
        );
        // The slot is fresh, so this is the only set.
        let _ = slot.set(codec.clone());
        self.seen.insert(ty.id(), codec.clone());
        Ok(codec)
    }

    /// Builds the codec of one struct field.
    ///
    /// Repeated fields and maps are only valid here, since their encoding
    /// depends on the field number.
    fn build_field(&mut self, owner: TypeRef, field: &Field) -> Result<Arc<Codec>, BuildError> {
        let name = field.ty.name();
        match field.ty.shape() {
            Shape::Slice(slice) if !is_byte(&slice) => {
                let elem = self.build_element(owner, &slice)?;
                Ok(Arc::new(repeated::codec(field.number, name, slice, elem)))
            }
            Shape::Map(shape) => {
                let (key, value) = self.build_entry(owner, &shape)?;
                Ok(Arc::new(map::codec(field.number, name, shape, key, value)))
            }
            _ => self.build(field.ty),
        }
    }

    fn build_element(&mut self, owner: TypeRef, slice: &SliceShape) -> Result<Arc<Codec>, BuildError> {
        match slice.elem.shape() {
            Shape::Slice(inner) if !is_byte(&inner) => Err(unsupported(
                owner,
                "repeated fields cannot hold repeated fields",
            )),
            Shape::Map(_) => Err(unsupported(owner, "repeated fields cannot hold maps")),
            Shape::Pointer(_) => Err(unsupported(owner, "repeated fields cannot hold pointers")),
            _ => self.build(slice.elem),
        }
    }

    fn build_entry(
        &mut self,
        owner: TypeRef,
        shape: &MapShape,
    ) -> Result<(Arc<Codec>, Arc<Codec>), BuildError> {
        if !shape.key.shape().is_map_key() {
            return Err(unsupported(owner, "map keys must be booleans, integers or strings"));
        }
        match shape.value.shape() {
            Shape::Slice(inner) if !is_byte(&inner) => {
                return Err(unsupported(owner, "map values cannot be repeated fields"));
            }
            Shape::Map(_) => {
                return Err(unsupported(owner, "map values cannot be maps"));
            }
            _ => {}
        }
        Ok((self.build(shape.key)?, self.build(shape.value)?))
    }
}

fn is_byte(slice: &SliceShape) -> bool {
    matches!(slice.elem.shape(), Shape::Byte)
}

fn unsupported(ty: TypeRef, reason: &'static str) -> BuildError {
    BuildError::Unsupported {
        type_name: ty.name(),
        reason,
    }
}
