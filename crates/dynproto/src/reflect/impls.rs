//! [`Reflect`] implementations for std types.

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use crate::reflect::{
    ArrayShape, MapShape, PointerShape, Reflect, Shape, SliceShape, TypeRef, downcast_mut,
    downcast_ref,
};
use crate::types::{Fixed32, Fixed64, Sfixed32, Sfixed64, Sint32, Sint64};

macro_rules! impl_scalar {
    ($($ty:ty => $shape:ident),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn shape() -> Shape {
                    Shape::$shape
                }
            }
        )*
    };
}

impl_scalar! {
    bool => Bool,
    isize => Int,
    i32 => Int32,
    i64 => Int64,
    usize => Uint,
    u32 => Uint32,
    u64 => Uint64,
    f32 => Float32,
    f64 => Float64,
    u8 => Byte,
    String => String,
    Sint32 => Sint32,
    Sint64 => Sint64,
    Fixed32 => Fixed32,
    Fixed64 => Fixed64,
    Sfixed32 => Sfixed32,
    Sfixed64 => Sfixed64,
}

impl<const N: usize> Reflect for [u8; N] {
    fn shape() -> Shape {
        Shape::Array(ArrayShape {
            len: N,
            bytes: |value| downcast_ref::<[u8; N]>(value).as_slice(),
            bytes_mut: |value| downcast_mut::<[u8; N]>(value).as_mut_slice(),
        })
    }
}

impl<T: Reflect + Default> Reflect for Vec<T> {
    fn shape() -> Shape {
        Shape::Slice(SliceShape {
            elem: TypeRef::of::<T>(),
            len: |value| downcast_ref::<Vec<T>>(value).len(),
            visit: |value, f| {
                for item in downcast_ref::<Vec<T>>(value) {
                    let item: &dyn Any = item;
                    f(item)?;
                }
                Ok(())
            },
            push_with: |value, fill| {
                let mut item = T::default();
                let n = fill(&mut item)?;
                downcast_mut::<Vec<T>>(value).push(item);
                Ok(n)
            },
        })
    }
}

impl<T: Reflect + Default> Reflect for Option<T> {
    fn shape() -> Shape {
        Shape::Pointer(PointerShape {
            elem: TypeRef::of::<T>(),
            get: |value| {
                let inner = downcast_ref::<Option<T>>(value).as_ref()?;
                let inner: &dyn Any = inner;
                Some(inner)
            },
            get_or_insert: |value| {
                let inner: &mut dyn Any =
                    downcast_mut::<Option<T>>(value).get_or_insert_with(T::default);
                inner
            },
        })
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn shape() -> Shape {
        Shape::Pointer(PointerShape {
            elem: TypeRef::of::<T>(),
            get: |value| {
                let inner: &dyn Any = downcast_ref::<Box<T>>(value).as_ref();
                Some(inner)
            },
            get_or_insert: |value| {
                let inner: &mut dyn Any = downcast_mut::<Box<T>>(value).as_mut();
                inner
            },
        })
    }
}

impl<K, V, S> Reflect for HashMap<K, V, S>
where
    K: Reflect + Default + Eq + Hash,
    V: Reflect + Default,
    S: BuildHasher + Default + Send + Sync + 'static,
{
    fn shape() -> Shape {
        Shape::Map(MapShape {
            key: TypeRef::of::<K>(),
            value: TypeRef::of::<V>(),
            len: |value| downcast_ref::<HashMap<K, V, S>>(value).len(),
            visit: |value, f| {
                for (key, item) in downcast_ref::<HashMap<K, V, S>>(value) {
                    let key: &dyn Any = key;
                    let item: &dyn Any = item;
                    f(key, item)?;
                }
                Ok(())
            },
            insert_with: |value, fill| {
                let mut key = K::default();
                let mut item = V::default();
                let n = fill(&mut key, &mut item)?;
                downcast_mut::<HashMap<K, V, S>>(value).insert(key, item);
                Ok(n)
            },
        })
    }
}

impl<K, V> Reflect for BTreeMap<K, V>
where
    K: Reflect + Default + Ord,
    V: Reflect + Default,
{
    fn shape() -> Shape {
        Shape::Map(MapShape {
            key: TypeRef::of::<K>(),
            value: TypeRef::of::<V>(),
            len: |value| downcast_ref::<BTreeMap<K, V>>(value).len(),
            visit: |value, f| {
                for (key, item) in downcast_ref::<BTreeMap<K, V>>(value) {
                    let key: &dyn Any = key;
                    let item: &dyn Any = item;
                    f(key, item)?;
                }
                Ok(())
            },
            insert_with: |value, fill| {
                let mut key = K::default();
                let mut item = V::default();
                let n = fill(&mut key, &mut item)?;
                downcast_mut::<BTreeMap<K, V>>(value).insert(key, item);
                Ok(n)
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_shapes() {
        assert_eq!(i32::shape().kind(), "int32");
        assert_eq!(usize::shape().kind(), "uint");
        assert_eq!(String::shape().kind(), "string");
        assert_eq!(Sint64::shape().kind(), "sint64");
    }

    #[test]
    fn test_option_pointer_accessors() {
        let Shape::Pointer(pointer) = Option::<i32>::shape() else {
            panic!("expected pointer shape");
        };
        let mut value: Option<i32> = None;
        assert!((pointer.get)(&value).is_none());

        *downcast_mut::<i32>((pointer.get_or_insert)(&mut value)) = 5;
        assert_eq!(value, Some(5));
        assert_eq!(downcast_ref::<i32>((pointer.get)(&value).unwrap()), &5);
    }

    #[test]
    fn test_vec_push_with_keeps_failed_items_out() {
        let Shape::Slice(slice) = Vec::<u32>::shape() else {
            panic!("expected slice shape");
        };
        let mut value = vec![1u32];
        let n = (slice.push_with)(&mut value, &mut |item| {
            *downcast_mut::<u32>(item) = 2;
            Ok(3)
        })
        .unwrap();
        assert_eq!(n, 3);

        let result = (slice.push_with)(&mut value, &mut |_| {
            Err(crate::error::DecodeError::VarintTooLong)
        });
        assert!(result.is_err());
        assert_eq!(value, vec![1, 2]);
        assert_eq!((slice.len)(&value), 2);
    }

    #[test]
    fn test_map_insert_overwrites() {
        let Shape::Map(map) = BTreeMap::<u32, String>::shape() else {
            panic!("expected map shape");
        };
        let mut value: BTreeMap<u32, String> = BTreeMap::new();
        for text in ["a", "b"] {
            (map.insert_with)(&mut value, &mut |key, item| {
                *downcast_mut::<u32>(key) = 1;
                *downcast_mut::<String>(item) = text.to_string();
                Ok(0)
            })
            .unwrap();
        }
        assert_eq!(value.len(), 1);
        assert_eq!(value[&1], "b");
    }

    #[test]
    fn test_byte_array_view() {
        let Shape::Array(array) = <[u8; 4]>::shape() else {
            panic!("expected array shape");
        };
        let mut value = [0u8; 4];
        (array.bytes_mut)(&mut value).copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(array.len, 4);
        assert_eq!((array.bytes)(&value), &[1, 2, 3, 4]);
    }
}
