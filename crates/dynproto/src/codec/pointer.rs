//! Codecs for `Option<T>` and `Box<T>`.
//!
//! A pointer has no representation of its own. An absent value encodes to
//! nothing, so the enclosing field disappears. A present value encodes as
//! its pointee with [`Flags::PRESENT`], so a present zero is still sent.

use std::sync::Arc;

use crate::codec::{Codec, Flags};
use crate::reflect::PointerShape;

pub fn codec(type_name: &'static str, shape: PointerShape, elem: Arc<Codec>) -> Codec {
    let PointerShape {
        get, get_or_insert, ..
    } = shape;
    let size = elem.clone();
    let encode = elem.clone();
    let wire = elem.wire();
    Codec::new(
        type_name,
        wire,
        move |value, flags| get(value).map_or(0, |inner| size.size(inner, flags | Flags::PRESENT)),
        move |buf, value, flags| match get(value) {
            Some(inner) => encode.encode(buf, inner, flags | Flags::PRESENT),
            None => Ok(0),
        },
        move |buf, value, flags| elem.decode(buf, get_or_insert(value), flags),
    )
    .with_inlined(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::scalar;
    use crate::reflect::{Reflect, Shape};

    fn option_i32() -> Codec {
        let Shape::Pointer(shape) = Option::<i32>::shape() else {
            panic!("expected pointer shape");
        };
        codec("Option<i32>", shape, Arc::new(scalar::int32("i32")))
    }

    #[test]
    fn test_none_encodes_nothing() {
        let codec = option_i32();
        assert_eq!(codec.size(&None::<i32>, Flags::empty()), 0);
        assert_eq!(codec.encode(&mut [], &None::<i32>, Flags::empty()), Ok(0));
        assert!(codec.is_inlined());
    }

    #[test]
    fn test_present_zero_keeps_presence() {
        let codec = option_i32();
        let value = Some(0i32);
        let mut buf = vec![0u8; codec.size(&value, Flags::empty())];
        codec.encode(&mut buf, &value, Flags::empty()).unwrap();
        assert_eq!(buf, vec![0x00]);

        let mut decoded: Option<i32> = None;
        codec.decode(&buf, &mut decoded, Flags::empty()).unwrap();
        assert_eq!(decoded, Some(0));
    }
}
