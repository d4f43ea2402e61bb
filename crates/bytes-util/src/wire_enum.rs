/// Declares an open enum over a wire-format integer.
///
/// Wire formats reserve values that existing files may still carry, so the
/// generated type is a transparent newtype over the raw integer with one
/// associated constant per known value. Conversions via [`From`] are lossless
/// in both directions and never fail; unknown values simply compare unequal
/// to every named constant.
///
/// ```
/// use rill_bytes_util::wire_enum;
///
/// wire_enum! {
///     /// FLV tag types.
///     pub enum TagType(u8) {
///         /// Audio tag.
///         Audio = 8,
///         /// Video tag.
///         Video = 9,
///     }
/// }
///
/// assert_eq!(TagType::from(8), TagType::Audio);
/// assert_eq!(format!("{:?}", TagType::Video), "TagType::Video");
/// assert_eq!(format!("{:?}", TagType(18)), "TagType(18)");
/// ```
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$attr:meta])*
        $vis:vis enum $name:ident($repr:ty) {
            $(
                $(#[$variant_attr:meta])*
                $variant:ident = $value:literal
            ),* $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        $vis struct $name(pub $repr);

        #[allow(non_upper_case_globals)]
        impl $name {
            $(
                $(#[$variant_attr])*
                pub const $variant: Self = Self($value);
            )*
        }

        impl ::core::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                match self.0 {
                    $($value => f.write_str(concat!(stringify!($name), "::", stringify!($variant))),)*
                    _ => f.debug_tuple(stringify!($name)).field(&self.0).finish(),
                }
            }
        }

        impl ::core::convert::From<$repr> for $name {
            fn from(value: $repr) -> Self {
                Self(value)
            }
        }

        impl ::core::convert::From<$name> for $repr {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

#[cfg(test)]
mod tests {
    crate::wire_enum! {
        /// A test enum.
        pub enum TestKind(u8) {
            /// First.
            First = 1,
            /// Tenth.
            Tenth = 10,
        }
    }

    #[test]
    fn conversions() {
        assert_eq!(TestKind::from(1), TestKind::First);
        assert_eq!(TestKind::from(10), TestKind::Tenth);
        assert_eq!(u8::from(TestKind::Tenth), 10);
        assert_eq!(TestKind(3), TestKind::from(3));
        assert_ne!(TestKind(3), TestKind::First);
    }

    #[test]
    fn debug_output() {
        assert_eq!(format!("{:?}", TestKind::First), "TestKind::First");
        assert_eq!(format!("{:?}", TestKind(42)), "TestKind(42)");
    }

    #[test]
    fn pattern_matching() {
        let kind = TestKind::from(10);
        let name = match kind {
            TestKind::First => "first",
            TestKind::Tenth => "tenth",
            _ => "unknown",
        };
        assert_eq!(name, "tenth");
    }
}
