//! Translator options: the `Options` bitmask controlling markup shape,
//! namespace declarations, and CLI-level toggles.
//!
//! Bit positions are kept stable and in a fixed relative order even
//! where this crate does not (yet) act on a bit, so the numeric value of
//! an option never shifts across releases.

use super::bits::bitflags_like;

bitflags_like! {
    /// Options controlling how a unit or archive is translated.
    ///
    /// Defaults to [`Options::DEFAULT`].
    pub struct Options: u64 {
        /// Multi-unit archive (as opposed to a single standalone unit).
        const ARCHIVE = 1 << 0;
        /// Emit an `<?xml ... ?>` declaration.
        const XML_DECL = 1 << 1;
        /// Emit `xmlns` namespace declarations on the root element.
        const NAMESPACE_DECL = 1 << 5;
        /// Apply markup to the root-level `#if 0` / `#else` region as a
        /// tree-shape-symmetric `<cpp:else>` block (tree-shape-symmetric;
        /// see `Options::CPP_TEXT_ELSE` for the alternative).
        const CPP_MARKUP_ELSE = 1 << 6;
        /// Emit `#if 0` / `#else` dead branches as raw escaped text inside
        /// a single `<cpp:else>` leaf rather than fully parsed markup.
        const CPP_TEXT_ELSE = 1 << 7;
        /// Apply markup inside root-level `#if 0` (rather than text-only).
        const CPP_MARKUP_IF0 = 1 << 22;
        /// Wrap the root `<unit>` in a fragment (no `<unit>` root wrapper);
        /// used when translating a non-file snippet.
        const FRAGMENT = 1 << 21;
        /// Reject non-strict preprocessor nesting (unterminated `#if`,
        /// stray `#endif`).
        const STRICT_CPP = 1 << 16;
        /// Emit `pos:` line/column attributes on every element.
        const POSITION = 1 << 15;
        /// Emit a `hash:` attribute with the SHA-1 of the unit's raw
        /// source bytes.
        const HASH = 1 << 10;
        /// Emit literal markup (`<literal type="...">`).
        const LITERAL = 1 << 11;
        /// Emit operator markup (`<operator>`).
        const OPERATOR = 1 << 12;
        /// Emit modifier markup (`<modifier>`).
        const MODIFIER = 1 << 23;
        /// Recognise and mark up OpenMP pragmas.
        const OPENMP = 1 << 25;
        /// Interactive mode: flush output after every unit rather than
        /// buffering the whole archive.
        const INTERACTIVE = 1 << 18;
        /// Emit internal debug markup for unrecognized/error regions
        /// instead of silently best-effort parsing them.
        const DEBUG = 1 << 24;
        /// Reserved for XPath result numbering; not acted on by the
        /// translator itself.
        const XPATH_TOTAL = 1 << 13;
        /// Apply gzip compression to archive output.
        const COMPRESSION = 1 << 20;
    }
}

impl Options {
    /// The default option set: namespace declarations, an XML
    /// declaration, and markup (not text) for root-level `#if 0`/`#else`
    /// regions.
    pub const DEFAULT: Self = Self(Self::XML_DECL.0 | Self::NAMESPACE_DECL.0 | Self::CPP_MARKUP_ELSE.0);
}

impl Default for Options {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_namespace_decl_and_markup_else() {
        let opts = Options::default();
        assert!(opts.contains(Options::NAMESPACE_DECL));
        assert!(opts.contains(Options::CPP_MARKUP_ELSE));
        assert!(!opts.contains(Options::CPP_TEXT_ELSE));
        assert!(!opts.contains(Options::ARCHIVE));
    }

    #[test]
    fn cpp_else_modes_are_mutually_intended() {
        let opts = Options::DEFAULT.difference(Options::CPP_MARKUP_ELSE).union(Options::CPP_TEXT_ELSE);
        assert!(opts.contains(Options::CPP_TEXT_ELSE));
        assert!(!opts.contains(Options::CPP_MARKUP_ELSE));
    }

    #[test]
    fn set_toggles_bits() {
        let opts = Options::DEFAULT.set(Options::HASH, true);
        assert!(opts.contains(Options::HASH));
        let opts = opts.set(Options::HASH, false);
        assert!(!opts.contains(Options::HASH));
    }
}
