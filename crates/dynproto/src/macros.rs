//! Declarative struct descriptions.

/// Declares structs together with their [`Reflect`](crate::Reflect) implementation.
///
/// Each field carries its protobuf field number after `=`. Field order is the
/// encoding order. Numbers must be unique within the struct and lie in
/// `1..=536870911`; violations are reported when the codec is first built.
///
/// ```rust
/// use dynproto::message;
///
/// message! {
///     #[derive(Debug, Default, PartialEq)]
///     pub struct Account {
///         pub id: u64 = 1,
///         pub name: String = 2,
///         pub tags: Vec<String> = 3,
///         pub owner: Option<Box<Account>> = 4,
///     }
/// }
///
/// let account = Account { id: 7, ..Default::default() };
/// assert_eq!(dynproto::marshal(&account).unwrap(), vec![0x08, 0x07]);
/// ```
#[macro_export]
macro_rules! message {
    ($(
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty = $number:literal
            ),* $(,)?
        }
    )*) => {$(
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        impl $crate::Reflect for $name {
            fn shape() -> $crate::reflect::Shape {
                $crate::reflect::Shape::Struct($crate::reflect::StructShape::new(vec![
                    $(
                        $crate::reflect::Field::new::<$name, $ty>(
                            $number,
                            stringify!($field),
                            |value| &value.$field,
                            |value| &mut value.$field,
                        ),
                    )*
                ]))
            }
        }
    )*};
}

#[cfg(test)]
mod tests {
    use crate::reflect::{Reflect, Shape};

    message! {
        #[derive(Debug, Default)]
        struct Empty {}

        #[derive(Debug, Default)]
        pub(crate) struct Pair {
            pub left: i32 = 1,
            right: String = 7,
        }
    }

    #[test]
    fn test_fields_in_declaration_order() {
        let Shape::Struct(shape) = Pair::shape() else {
            panic!("expected struct shape");
        };
        let described: Vec<_> = shape
            .fields
            .iter()
            .map(|field| (field.number, field.name))
            .collect();
        assert_eq!(described, vec![(1, "left"), (7, "right")]);
    }

    #[test]
    fn test_accessors_reach_fields() {
        let Shape::Struct(shape) = Pair::shape() else {
            panic!("expected struct shape");
        };
        let mut pair = Pair {
            left: 3,
            right: String::new(),
        };
        let left = (shape.fields[0].get)(&pair);
        assert_eq!(left.downcast_ref::<i32>(), Some(&3));

        let right = (shape.fields[1].get_mut)(&mut pair);
        *right.downcast_mut::<String>().unwrap() = "x".to_string();
        assert_eq!(pair.right, "x");
    }

    #[test]
    fn test_empty_struct() {
        let Shape::Struct(shape) = Empty::shape() else {
            panic!("expected struct shape");
        };
        assert!(shape.fields.is_empty());
        let _ = Empty::default();
    }
}
