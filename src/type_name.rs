//! Canonical Type Names
//!
//! A type's canonical name is persisted next to its data and checked again
//! on load, so it must be a deterministic function of the type: same type,
//! same name, in every process. Composite types render as
//! `Origin[Arg1, Arg2]` recursively, e.g. `list[User]` or `dict[str, int]`.

use std::collections::{BTreeMap, HashMap};

/// Deterministic canonical name for a storable type.
///
/// Implement this for your own types, or use [`impl_type_name!`]:
///
/// ```
/// use exostore::TypeName;
///
/// struct User;
/// exostore::impl_type_name!(User);
///
/// assert_eq!(User::type_name(), "User");
/// assert_eq!(Vec::<User>::type_name(), "list[User]");
/// ```
///
/// [`impl_type_name!`]: crate::impl_type_name
pub trait TypeName {
    /// The canonical name. Must be stable across processes.
    fn type_name() -> String;
}

/// Implement [`TypeName`] for a type, defaulting to its bare identifier.
///
/// ```
/// struct Order;
/// exostore::impl_type_name!(Order);
///
/// struct LegacyOrder;
/// exostore::impl_type_name!(LegacyOrder, "Order");
/// ```
#[macro_export]
macro_rules! impl_type_name {
    ($ty:ident) => {
        $crate::impl_type_name!($ty, stringify!($ty));
    };
    ($ty:ident, $name:expr) => {
        impl $crate::TypeName for $ty {
            fn type_name() -> String {
                $name.to_string()
            }
        }
    };
}

macro_rules! primitive_type_name {
    ($name:expr => $($ty:ty),+) => {
        $(
            impl TypeName for $ty {
                fn type_name() -> String {
                    $name.to_string()
                }
            }
        )+
    };
}

primitive_type_name!("bool" => bool);
primitive_type_name!("int" => i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);
primitive_type_name!("float" => f32, f64);
primitive_type_name!("str" => String, &str);

impl<T: TypeName> TypeName for Vec<T> {
    fn type_name() -> String {
        format!("list[{}]", T::type_name())
    }
}

impl<T: TypeName> TypeName for Option<T> {
    fn type_name() -> String {
        format!("Optional[{}]", T::type_name())
    }
}

impl<K: TypeName, V: TypeName, S> TypeName for HashMap<K, V, S> {
    fn type_name() -> String {
        format!("dict[{}, {}]", K::type_name(), V::type_name())
    }
}

impl<K: TypeName, V: TypeName> TypeName for BTreeMap<K, V> {
    fn type_name() -> String {
        format!("dict[{}, {}]", K::type_name(), V::type_name())
    }
}

impl<A: TypeName, B: TypeName> TypeName for (A, B) {
    fn type_name() -> String {
        format!("tuple[{}, {}]", A::type_name(), B::type_name())
    }
}

impl<A: TypeName, B: TypeName, C: TypeName> TypeName for (A, B, C) {
    fn type_name() -> String {
        format!(
            "tuple[{}, {}, {}]",
            A::type_name(),
            B::type_name(),
            C::type_name()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct User;
    impl_type_name!(User);

    #[test]
    fn test_primitive_names() {
        assert_eq!(i64::type_name(), "int");
        assert_eq!(u8::type_name(), "int");
        assert_eq!(f64::type_name(), "float");
        assert_eq!(String::type_name(), "str");
        assert_eq!(bool::type_name(), "bool");
    }

    #[test]
    fn test_composite_names_render_recursively() {
        assert_eq!(Vec::<String>::type_name(), "list[str]");
        assert_eq!(Vec::<User>::type_name(), "list[User]");
        assert_eq!(HashMap::<String, i64>::type_name(), "dict[str, int]");
        assert_eq!(
            Vec::<HashMap<String, Vec<f64>>>::type_name(),
            "list[dict[str, list[float]]]"
        );
        assert_eq!(Option::<User>::type_name(), "Optional[User]");
        assert_eq!(<(String, i64)>::type_name(), "tuple[str, int]");
    }

    #[test]
    fn test_deterministic_across_calls() {
        assert_eq!(Vec::<User>::type_name(), Vec::<User>::type_name());
    }

    #[test]
    fn test_distinct_composites_do_not_collide() {
        assert_ne!(Vec::<String>::type_name(), HashMap::<String, i64>::type_name());
        assert_ne!(Vec::<User>::type_name(), User::type_name());
    }

    #[test]
    fn test_renamed_impl() {
        struct LegacyOrder;
        impl_type_name!(LegacyOrder, "Order");
        assert_eq!(LegacyOrder::type_name(), "Order");
    }
}
