//! Runtime type introspection.
//!
//! [`Reflect`] lets a type describe its own structure ([`Shape`]) without
//! writing any encoding logic. [`Message`] is the object-safe view used by the
//! entry points: it yields a stable type identity ([`TypeRef`]) and a borrowed,
//! type-erased handle to the value's storage. Nothing is copied.

pub mod impls;
pub mod shape;

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

pub use shape::{
    ArrayShape, Field, Getter, GetterMut, MapShape, PointerShape, Shape, SliceShape, StructShape,
};

/// A type whose structure can be inspected at runtime.
///
/// Scalars, strings, byte arrays, `Vec`, `Option`, `Box` and the std maps are
/// implemented by this crate. Structs get an implementation from the
/// [`message!`](crate::message) macro.
pub trait Reflect: Any + Send + Sync + Sized {
    /// Describes the structural kind of `Self`.
    fn shape() -> Shape;
}

/// Stable identity of a reflected type.
///
/// Equality and hashing use the [`TypeId`] only.
#[derive(Clone, Copy)]
pub struct TypeRef {
    id: TypeId,
    name: &'static str,
    shape: fn() -> Shape,
}

impl TypeRef {
    /// Returns the identity of `T`.
    pub fn of<T: Reflect>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
            shape: T::shape,
        }
    }

    /// Returns the [`TypeId`] the cache is keyed by.
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Returns the type's name, for diagnostics only.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Builds the shape description of the type.
    pub fn shape(&self) -> Shape {
        (self.shape)()
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Object-safe access to a reflected value.
///
/// Implemented for every [`Reflect`] type, so both `&T` and `&dyn Message`
/// can be handed to the entry points.
pub trait Message: Any + Send + Sync {
    /// Returns the identity of the concrete type.
    fn type_ref(&self) -> TypeRef;

    /// Returns a shared type-erased handle to the value.
    fn as_any(&self) -> &dyn Any;

    /// Returns an exclusive type-erased handle to the value.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Reflect> Message for T {
    fn type_ref(&self) -> TypeRef {
        TypeRef::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Returns the identity of a value and a shared handle to it.
#[inline]
pub fn inspect<M: Message + ?Sized>(value: &M) -> (TypeRef, &dyn Any) {
    (value.type_ref(), value.as_any())
}

/// Returns the identity of a value and an exclusive handle to it.
///
/// Decoding needs a mutation target, so it only accepts this form.
#[inline]
pub fn inspect_mut<M: Message + ?Sized>(value: &mut M) -> (TypeRef, &mut dyn Any) {
    (value.type_ref(), value.as_any_mut())
}

/// Recovers the concrete type behind a handle.
///
/// # Panics
///
/// Panics if the handle holds another type. Codecs are keyed by type, so
/// this only happens when a hand-written [`Shape`] lies about its accessors.
#[inline]
pub fn downcast_ref<T: Any>(value: &dyn Any) -> &T {
    match value.downcast_ref::<T>() {
        Some(value) => value,
        None => handle_mismatch::<T>(),
    }
}

/// Mutable counterpart of [`downcast_ref`].
#[inline]
pub fn downcast_mut<T: Any>(value: &mut dyn Any) -> &mut T {
    match value.downcast_mut::<T>() {
        Some(value) => value,
        None => handle_mismatch::<T>(),
    }
}

#[cold]
fn handle_mismatch<T>() -> ! {
    panic!("value handle does not hold a {}", type_name::<T>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_ref_identity() {
        assert_eq!(TypeRef::of::<i32>(), TypeRef::of::<i32>());
        assert_ne!(TypeRef::of::<i32>(), TypeRef::of::<i64>());
        assert!(TypeRef::of::<Vec<u8>>().name().ends_with("Vec<u8>"));
    }

    #[test]
    fn test_inspect_does_not_copy() {
        let value = 42i64;
        let (ty, handle) = inspect(&value);
        assert_eq!(ty.id(), TypeId::of::<i64>());
        assert!(std::ptr::eq(downcast_ref::<i64>(handle), &value));
    }

    #[test]
    fn test_inspect_through_trait_object() {
        let boxed: Box<dyn Message> = Box::new(String::from("hi"));
        let (ty, handle) = inspect(boxed.as_ref());
        assert_eq!(ty, TypeRef::of::<String>());
        assert_eq!(downcast_ref::<String>(handle), "hi");
    }

    #[test]
    fn test_inspect_mut_writes_in_place() {
        let mut value = 1u32;
        let (_, handle) = inspect_mut(&mut value);
        *downcast_mut::<u32>(handle) = 7;
        assert_eq!(value, 7);
    }

    #[test]
    #[should_panic(expected = "value handle does not hold a u64")]
    fn test_downcast_mismatch_panics() {
        let value = 1u32;
        downcast_ref::<u64>(&value);
    }
}
