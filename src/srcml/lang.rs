//! The source language tag and its family predicates.
//!
//! Backed by a bitmask where each concrete language is a distinct bit and
//! the "family" values are bitwise-ORs of the concrete bits they cover.

use super::bits::bitflags_like;

/// The language a [`crate::srcml::parse::parse_unit`] call should parse
/// `source` as. Immutable for the life of a translator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Language {
    /// ISO C.
    C,
    /// ISO C++ (pre-C++11).
    Cxx,
    /// C++11 and later.
    Cxx0x,
    /// Java.
    Java,
    /// AspectJ. Always implies [`Language::Java`]; see [`Language::is_java_family`].
    AspectJ,
    /// C#.
    CSharp,
}

bitflags_like! {
    /// Bitmask representation used internally to test family membership
    /// without a `match` per caller.
    pub struct LanguageMask: u32 {
        const C = 1 << 0;
        const CXX = 1 << 1;
        const CXX0X = 1 << 2;
        const JAVA = 1 << 3;
        const ASPECTJ = 1 << 4;
        const CSHARP = 1 << 5;
    }
}

impl LanguageMask {
    /// `C ∪ CXX ∪ CXX0X`.
    pub const C_FAMILY: Self = Self(Self::C.0 | Self::CXX.0 | Self::CXX0X.0);
    /// `JAVA ∪ ASPECTJ`.
    pub const JAVA_FAMILY: Self = Self(Self::JAVA.0 | Self::ASPECTJ.0);
    /// `C_FAMILY ∪ JAVA_FAMILY`.
    pub const OO_FAMILY: Self = Self(Self::C_FAMILY.0 | Self::JAVA_FAMILY.0);
}

impl Language {
    /// Converts to the internal bitmask, ORing in [`LanguageMask::JAVA`]
    /// for [`Language::AspectJ`] since AspectJ always implies Java.
    #[must_use]
    pub const fn mask(self) -> LanguageMask {
        match self {
            Self::C => LanguageMask::C,
            Self::Cxx => LanguageMask::CXX,
            Self::Cxx0x => LanguageMask::CXX0X,
            Self::Java => LanguageMask::JAVA,
            Self::AspectJ => LanguageMask(LanguageMask::ASPECTJ.0 | LanguageMask::JAVA.0),
            Self::CSharp => LanguageMask::CSHARP,
        }
    }

    /// Returns whether this language is in the C/C++ family.
    #[must_use]
    pub const fn is_c_family(self) -> bool {
        self.mask().intersects(LanguageMask::C_FAMILY)
    }

    /// Returns whether this language is in the Java family (Java or AspectJ).
    #[must_use]
    pub const fn is_java_family(self) -> bool {
        self.mask().intersects(LanguageMask::JAVA_FAMILY)
    }

    /// Returns whether this language is in the object-oriented family
    /// (C/C++ or Java family — i.e. not C#).
    #[must_use]
    pub const fn is_oo_family(self) -> bool {
        self.mask().intersects(LanguageMask::OO_FAMILY)
    }

    /// Returns whether this language supports C++11 features
    /// (raw strings, `nullptr`, …).
    #[must_use]
    pub const fn is_cxx0x(self) -> bool {
        matches!(self, Self::Cxx0x)
    }

    /// The canonical string name used in srcML's `language` attribute.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::C => "C",
            Self::Cxx | Self::Cxx0x => "C++",
            Self::Java | Self::AspectJ => "Java",
            Self::CSharp => "C#",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspectj_implies_java() {
        assert!(Language::AspectJ.is_java_family());
        assert!(Language::AspectJ.mask().contains(LanguageMask::JAVA));
    }

    #[test]
    fn family_predicates() {
        assert!(Language::C.is_c_family());
        assert!(Language::Cxx.is_c_family());
        assert!(Language::Cxx0x.is_c_family());
        assert!(!Language::Java.is_c_family());
        assert!(Language::Java.is_java_family());
        assert!(!Language::CSharp.is_oo_family());
        assert!(Language::C.is_oo_family());
        assert!(Language::Java.is_oo_family());
    }

    #[test]
    fn cxx0x_flag() {
        assert!(Language::Cxx0x.is_cxx0x());
        assert!(!Language::Cxx.is_cxx0x());
    }
}
