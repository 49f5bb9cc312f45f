//! A tiny dependency-free bitflags-style declaration macro shared by
//! [`crate::srcml::lang`], [`crate::srcml::mode`] and
//! [`crate::srcml::options`].
//!
//! Every mask in this crate is a closed, fixed set of named 64-or-fewer-bit
//! constants (language family, parser mode, translator option), so a thin
//! newtype with `const` associates is enough; there is no need for the
//! `bitflags` crate's attribute macros or iteration support.

/// Declares a newtype bitmask struct with named flag constants and the
/// boolean set operators (`contains`/`intersects`/`union`/`difference`,
/// plus `|`/`|=`).
macro_rules! bitflags_like {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $repr:ty {
            $(
                $(#[$flag_meta:meta])*
                const $flag:ident = $value:expr;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(pub $repr);

        impl $name {
            $(
                $(#[$flag_meta])*
                pub const $flag: Self = Self($value);
            )*

            /// The empty mask.
            pub const NONE: Self = Self(0);

            /// Returns whether `self` contains every bit set in `other`.
            #[must_use]
            pub const fn contains(self, other: Self) -> bool {
                (self.0 & other.0) == other.0
            }

            /// Returns whether `self` shares any bit with `other`.
            #[must_use]
            pub const fn intersects(self, other: Self) -> bool {
                (self.0 & other.0) != 0
            }

            /// Returns the union of `self` and `other`.
            #[must_use]
            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            /// Returns `self` with every bit of `other` cleared.
            #[must_use]
            pub const fn difference(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }

            /// Returns `self` with every bit of `other` set or cleared
            /// according to `enabled`.
            #[must_use]
            pub const fn set(self, other: Self, enabled: bool) -> Self {
                if enabled {
                    self.union(other)
                } else {
                    self.difference(other)
                }
            }

            /// Returns whether no bit is set.
            #[must_use]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }
        }

        impl std::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                self.union(rhs)
            }
        }

        impl std::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                *self = self.union(rhs);
            }
        }

        impl std::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                Self(self.0 & rhs.0)
            }
        }
    };
}

pub(crate) use bitflags_like;
