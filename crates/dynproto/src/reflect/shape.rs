//! Runtime descriptions of a type's structure.
//!
//! A [`Shape`] is what the codec builder dispatches on. Composite shapes
//! carry type-erased accessors so the builder never needs to know the
//! concrete Rust types involved.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{DecodeError, EncodeError};
use crate::reflect::{Reflect, TypeRef, downcast_mut, downcast_ref};

/// Borrows a struct field out of a type-erased struct.
pub type Getter = Arc<dyn (Fn(&dyn Any) -> &dyn Any) + Send + Sync>;

/// Mutably borrows a struct field out of a type-erased struct.
pub type GetterMut = Arc<dyn (Fn(&mut dyn Any) -> &mut dyn Any) + Send + Sync>;

/// Visits each element of a collection, stopping at the first error.
pub type VisitFn =
    fn(&dyn Any, &mut dyn FnMut(&dyn Any) -> Result<(), EncodeError>) -> Result<(), EncodeError>;

/// Visits each entry of a map, stopping at the first error.
pub type VisitEntriesFn = fn(
    &dyn Any,
    &mut dyn FnMut(&dyn Any, &dyn Any) -> Result<(), EncodeError>,
) -> Result<(), EncodeError>;

/// Creates a default element, lets the callback fill it, and appends it on success.
pub type PushWithFn = fn(
    &mut dyn Any,
    &mut dyn FnMut(&mut dyn Any) -> Result<usize, DecodeError>,
) -> Result<usize, DecodeError>;

/// Creates a default key and value, lets the callback fill them, and inserts on success.
pub type InsertWithFn = fn(
    &mut dyn Any,
    &mut dyn FnMut(&mut dyn Any, &mut dyn Any) -> Result<usize, DecodeError>,
) -> Result<usize, DecodeError>;

/// The structural kind of a type, closed over everything the codec supports.
#[derive(Clone)]
pub enum Shape {
    Bool,
    /// `isize`, encoded as a 64-bit varint.
    Int,
    Int32,
    Int64,
    /// `usize`, encoded as a 64-bit varint.
    Uint,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    /// `u8`; only meaningful as the element of a byte sequence.
    Byte,
    String,
    Array(ArrayShape),
    Slice(SliceShape),
    Struct(StructShape),
    Pointer(PointerShape),
    Map(MapShape),
}

impl Shape {
    /// Returns a short name of the kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Bool => "bool",
            Shape::Int => "int",
            Shape::Int32 => "int32",
            Shape::Int64 => "int64",
            Shape::Uint => "uint",
            Shape::Uint32 => "uint32",
            Shape::Uint64 => "uint64",
            Shape::Float32 => "float32",
            Shape::Float64 => "float64",
            Shape::Sint32 => "sint32",
            Shape::Sint64 => "sint64",
            Shape::Fixed32 => "fixed32",
            Shape::Fixed64 => "fixed64",
            Shape::Sfixed32 => "sfixed32",
            Shape::Sfixed64 => "sfixed64",
            Shape::Byte => "byte",
            Shape::String => "string",
            Shape::Array(_) => "array",
            Shape::Slice(_) => "slice",
            Shape::Struct(_) => "struct",
            Shape::Pointer(_) => "pointer",
            Shape::Map(_) => "map",
        }
    }

    /// Returns true for shapes that protobuf allows as map keys.
    pub fn is_map_key(&self) -> bool {
        matches!(
            self,
            Shape::Bool
                | Shape::Int
                | Shape::Int32
                | Shape::Int64
                | Shape::Uint
                | Shape::Uint32
                | Shape::Uint64
                | Shape::Sint32
                | Shape::Sint64
                | Shape::Fixed32
                | Shape::Fixed64
                | Shape::Sfixed32
                | Shape::Sfixed64
                | Shape::String
        )
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Array(array) => write!(f, "Array({})", array.len),
            Shape::Slice(slice) => write!(f, "Slice({:?})", slice.elem),
            Shape::Struct(s) => f.debug_tuple("Struct").field(&s.fields).finish(),
            Shape::Pointer(pointer) => write!(f, "Pointer({:?})", pointer.elem),
            Shape::Map(map) => write!(f, "Map({:?}, {:?})", map.key, map.value),
            other => f.write_str(other.kind()),
        }
    }
}

/// A fixed-length byte array.
#[derive(Clone)]
pub struct ArrayShape {
    pub len: usize,
    pub bytes: fn(&dyn Any) -> &[u8],
    pub bytes_mut: fn(&mut dyn Any) -> &mut [u8],
}

/// A growable sequence: raw bytes when the element is `u8`, a repeated field otherwise.
#[derive(Clone)]
pub struct SliceShape {
    pub elem: TypeRef,
    pub len: fn(&dyn Any) -> usize,
    pub visit: VisitFn,
    pub push_with: PushWithFn,
}

/// Zero-or-one contained value.
#[derive(Clone)]
pub struct PointerShape {
    pub elem: TypeRef,
    pub get: fn(&dyn Any) -> Option<&dyn Any>,
    /// Returns the contained value, allocating a default one if absent.
    pub get_or_insert: fn(&mut dyn Any) -> &mut dyn Any,
}

/// A key to value collection.
#[derive(Clone)]
pub struct MapShape {
    pub key: TypeRef,
    pub value: TypeRef,
    pub len: fn(&dyn Any) -> usize,
    pub visit: VisitEntriesFn,
    pub insert_with: InsertWithFn,
}

/// An ordered list of numbered fields.
#[derive(Debug, Clone)]
pub struct StructShape {
    pub fields: Vec<Field>,
}

impl StructShape {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }
}

/// One member of a struct: its wire identity, its type and how to reach it.
#[derive(Clone)]
pub struct Field {
    pub number: u32,
    pub name: &'static str,
    pub ty: TypeRef,
    pub get: Getter,
    pub get_mut: GetterMut,
}

impl Field {
    /// Describes field `name` of struct `S`, of type `F`, carried on the wire as `number`.
    ///
    /// The accessors are plain projections such as `|s: &S| &s.name`.
    pub fn new<S: Any, F: Reflect>(
        number: u32,
        name: &'static str,
        get: fn(&S) -> &F,
        get_mut: fn(&mut S) -> &mut F,
    ) -> Self {
        Self {
            number,
            name,
            ty: TypeRef::of::<F>(),
            get: getter(move |value| {
                let field: &dyn Any = get(downcast_ref::<S>(value));
                field
            }),
            get_mut: getter_mut(move |value| {
                let field: &mut dyn Any = get_mut(downcast_mut::<S>(value));
                field
            }),
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("number", &self.number)
            .field("name", &self.name)
            .field("ty", &self.ty)
            .finish()
    }
}

fn getter<G>(get: G) -> Getter
where
    G: for<'a> Fn(&'a dyn Any) -> &'a dyn Any,
    G: Send + Sync + 'static,
{
    Arc::new(get)
}

fn getter_mut<G>(get: G) -> GetterMut
where
    G: for<'a> Fn(&'a mut dyn Any) -> &'a mut dyn Any,
    G: Send + Sync + 'static,
{
    Arc::new(get)
}
