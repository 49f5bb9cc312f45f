//! Maps a filename extension to the [`Language`] that should parse it.
//!
//! A small fixed set of named mappings consulted in order, with the
//! caller able to extend the table rather than having to fork it.

use super::lang::Language;

const BUILTIN_EXTENSIONS: &[(&str, Language)] = &[
    ("c", Language::C),
    ("h", Language::C),
    ("C", Language::Cxx0x),
    ("cpp", Language::Cxx0x),
    ("cxx", Language::Cxx0x),
    ("cc", Language::Cxx0x),
    ("c++", Language::Cxx0x),
    ("hpp", Language::Cxx0x),
    ("hxx", Language::Cxx0x),
    ("h++", Language::Cxx0x),
    ("tcc", Language::Cxx0x),
    ("ipp", Language::Cxx0x),
    ("java", Language::Java),
    ("aj", Language::AspectJ),
    ("cs", Language::CSharp),
];

/// An ordered registry mapping filename extensions to [`Language`]s.
///
/// Lookups check user-registered extensions first, then the built-in
/// table, so a caller can override a built-in mapping (for example,
/// treating `.h` as C++ instead of C) without losing every other
/// default. Matching is case-sensitive by default — `.C` (capital, the
/// traditional C++ extension) and `.c` resolve to different languages —
/// and only folds case when [`LanguageRegistry::with_case_insensitive`]
/// is explicitly enabled for a Windows-filesystem-style lookup.
#[derive(Debug, Clone, Default)]
pub struct LanguageRegistry {
    overrides: Vec<(String, Language)>,
    case_insensitive: bool,
}

impl LanguageRegistry {
    /// Builds a registry with only the built-in extension table,
    /// case-sensitive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether extension matching folds case, chainable. Off by
    /// default.
    #[must_use]
    pub fn with_case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    /// Sets whether extension matching folds case.
    pub fn set_case_insensitive(&mut self, case_insensitive: bool) {
        self.case_insensitive = case_insensitive;
    }

    /// Registers `extension` (without the leading dot) to `language`,
    /// taking priority over both earlier registrations and the built-in
    /// table.
    pub fn register(&mut self, extension: impl Into<String>, language: Language) {
        self.overrides.push((strip_dot(&extension.into()), language));
    }

    /// Looks up the language for a bare extension (without the leading
    /// dot).
    #[must_use]
    pub fn language_for_extension(&self, extension: &str) -> Option<Language> {
        let needle = strip_dot(extension);
        let matches = |ext: &&str| {
            if self.case_insensitive { ext.eq_ignore_ascii_case(&needle) } else { **ext == *needle }
        };
        self.overrides
            .iter()
            .rev()
            .find(|(ext, _)| matches(&ext.as_str()))
            .map(|(_, lang)| *lang)
            .or_else(|| BUILTIN_EXTENSIONS.iter().find(|(ext, _)| matches(ext)).map(|(_, lang)| *lang))
    }

    /// Looks up the language for a filename by splitting off its last
    /// extension.
    #[must_use]
    pub fn language_for_filename(&self, filename: &str) -> Option<Language> {
        let extension = filename.rsplit('.').next().filter(|ext| *ext != filename)?;
        self.language_for_extension(extension)
    }
}

fn strip_dot(extension: &str) -> String {
    extension.trim_start_matches('.').to_string()
}
