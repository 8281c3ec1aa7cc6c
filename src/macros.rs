///
/// Defines a newtype wrapping a single value, with a `new` constructor, `Deref` to the wrapped
/// type, and conversion back into it.
///
/// Attributes (including doc comments and additional derives) are forwarded to the generated
/// struct. An optional `impl { ... }` block adds inherent items.
///
macro_rules! new_type {
    // Convenience pattern without an impl.
    (
        $(#[$attr:meta])*
        $name:ident(
            $(#[$type_attr:meta])*
            $type:ty
        )
    ) => {
        new_type![
            $(#[$attr])*
            $name(
                $(#[$type_attr])*
                $type
            )
            impl {}
        ];
    };
    // Main entry point with an impl.
    (
        $(#[$attr:meta])*
        $name:ident(
            $(#[$type_attr:meta])*
            $type:ty
        )
        impl {
            $($item:tt)*
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Debug, Eq, Hash, Ord, PartialOrd, PartialEq)]
        pub struct $name(
            $(#[$type_attr])*
            $type
        );
        impl $name {
            #[doc = concat!(
                "Create a new `",
                stringify!($name),
                "` to wrap the given `",
                stringify!($type),
                "`."
            )]
            pub fn new(s: $type) -> Self {
                $name(s)
            }

            $($item)*
        }
        impl std::ops::Deref for $name {
            type Target = $type;
            fn deref(&self) -> &$type {
                &self.0
            }
        }
        impl From<$name> for $type {
            fn from(value: $name) -> $type {
                value.0
            }
        }
    };
}
