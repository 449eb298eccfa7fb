//! Scalar newtypes selecting alternative protobuf encodings.
//!
//! Plain Rust integers encode as protobuf `int32`/`int64`/`uint32`/`uint64`.
//! Wrap a field in one of these to get `sint*` (zigzag varint) or the
//! fixed-width forms instead.

macro_rules! scalar_newtype {
    ($($(#[$meta:meta])* $name:ident($inner:ty);)*) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
            pub struct $name(pub $inner);

            impl From<$inner> for $name {
                fn from(value: $inner) -> Self {
                    Self(value)
                }
            }

            impl From<$name> for $inner {
                fn from(value: $name) -> Self {
                    value.0
                }
            }
        )*
    };
}

scalar_newtype! {
    /// `sint32`: zigzag-encoded varint, compact for negative values.
    Sint32(i32);
    /// `sint64`: zigzag-encoded varint, compact for negative values.
    Sint64(i64);
    /// `fixed32`: four little-endian bytes.
    Fixed32(u32);
    /// `fixed64`: eight little-endian bytes.
    Fixed64(u64);
    /// `sfixed32`: four little-endian bytes, two's complement.
    Sfixed32(i32);
    /// `sfixed64`: eight little-endian bytes, two's complement.
    Sfixed64(i64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        assert_eq!(Sint32::from(-3), Sint32(-3));
        assert_eq!(i64::from(Sfixed64(-9)), -9);
        assert_eq!(Fixed32::default(), Fixed32(0));
    }
}
