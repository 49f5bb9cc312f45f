//! The archive layer (C7 reader, C8 writer): multi-unit framing, and the
//! reverse path of reading an existing srcML document's units back out.
//!
//! An archive is a named collection of independently translated units that
//! gets built up, then serialized as a whole, with its own configuration
//! surface: a namespace prefix table, registered extensions, per-unit
//! option inheritance, and an open-mode lifecycle.

use thiserror::Error;

use super::detect::LanguageRegistry;
use super::lang::Language;
use super::lex::MacroTable;
use super::options::Options;
use super::output::{self, UnitMetadata};
use super::parse::{self, ParseError};

/// The lifecycle state of an [`Archive`]: created empty, then opened
/// exactly once for read or write, then closed exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Never opened, or closed; no read or write operation is valid.
    Invalid,
    /// Opened for reading an existing srcML document.
    Read,
    /// Opened for writing a new srcML document.
    Write,
    /// Opened for both (incremental transform: read one unit, write one
    /// unit), mirroring `SRCML_ARCHIVE_RW` in the original sources.
    ReadWrite,
}

/// A single translation unit held (or about to be held) by an [`Archive`]:
/// either source text awaiting translation, or already-translated srcML
/// body text, or both (a unit read from an existing archive that is then
/// re-parsed for a round-trip check carries both).
#[derive(Debug, Clone, Default)]
pub struct Unit {
    /// The language this unit is (or will be) parsed as.
    pub language: Option<Language>,
    /// Unit-level metadata: filename, directory, version, timestamp, user
    /// attributes.
    pub metadata: UnitMetadata,
    /// Raw source text to translate, if this unit was added via
    /// [`Archive::add_unit_from_source`].
    pub source_bytes: Option<String>,
    /// Already-produced srcML body (the unit's inner XML, without the
    /// wrapping `<unit>` tag), if this unit was read from an existing
    /// archive or already translated.
    pub srcml_bytes: Option<String>,
    /// Per-unit option overrides; unset bits inherit the archive's
    /// default options.
    pub option_overrides: Option<Options>,
}

impl Unit {
    /// Builds a unit to be translated from `source`.
    #[must_use]
    pub fn from_source(language: Language, source: impl Into<String>) -> Self {
        Self { language: Some(language), source_bytes: Some(source.into()), ..Self::default() }
    }

    /// Builds a unit that is already-translated srcML, to be re-emitted
    /// verbatim (never re-parsed) by [`Archive::add_translated_unit`].
    ///
    /// `body` is the unit's *inner* XML — everything between its original
    /// `<unit ...>` and `</unit>` tags, exactly as
    /// [`super::archive::ArchiveReader`]'s `ReaderEvent::UnitBody` yields
    /// it — not a full `<unit>...</unit>` document.
    #[must_use]
    pub fn from_srcml(language: Language, body: impl Into<String>) -> Self {
        Self { language: Some(language), srcml_bytes: Some(body.into()), ..Self::default() }
    }

    /// Sets the `filename` attribute, chainable.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.metadata.filename = Some(filename.into());
        self
    }

    /// Sets the `dir` attribute, chainable.
    #[must_use]
    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.metadata.directory = Some(directory.into());
        self
    }

    /// Sets the `version` attribute, chainable.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.metadata.version = Some(version.into());
        self
    }

    /// Sets this unit's option overrides, chainable.
    #[must_use]
    pub fn with_options(mut self, options: Options) -> Self {
        self.option_overrides = Some(options);
        self
    }

    fn effective_options(&self, archive_default: Options) -> Options {
        self.option_overrides.unwrap_or(archive_default)
    }
}

/// One unit's content as [`Archive::write_all`] is about to serialize it:
/// either freshly parsed from source, or an already-translated body to
/// re-emit verbatim.
enum UnitBody<'a> {
    /// Events produced by parsing [`Unit::source_bytes`].
    Parsed(Vec<parse::Event<'a>>),
    /// [`Unit::srcml_bytes`], written through unchanged.
    Passthrough(&'a str),
}

/// A multi-unit (or, with `Options::ARCHIVE` unset, single-unit) srcML
/// document under construction.
///
/// Lifecycle: built with [`Archive::new`] (state [`OpenMode::Invalid`]),
/// opened for writing with [`Archive::open_write`], units appended with
/// [`Archive::add_unit_from_source`]/[`Archive::add_translated_unit`], then
/// finished with [`Archive::close`]. Not reusable for another open/close
/// cycle afterwards.
#[derive(Debug, Clone)]
pub struct Archive {
    mode: OpenMode,
    default_language: Option<Language>,
    options: Options,
    tabstop: usize,
    namespaces: Vec<(String, String)>,
    languages: LanguageRegistry,
    macros: MacroTable,
    units: Vec<Unit>,
}

impl Default for Archive {
    fn default() -> Self {
        Self::new()
    }
}

impl Archive {
    /// Builds an empty, unopened archive with the default option set and
    /// tabstop of 8.
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: OpenMode::Invalid,
            default_language: None,
            options: Options::default(),
            tabstop: 8,
            namespaces: Vec::new(),
            languages: LanguageRegistry::new(),
            macros: MacroTable::new(),
            units: Vec::new(),
        }
    }

    /// Opens the archive for writing. Idempotent calls after the first
    /// are rejected with [`ArchiveError::AlreadyOpen`].
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::AlreadyOpen`] if this archive was already
    /// opened (for read or write).
    pub fn open_write(&mut self) -> Result<(), ArchiveError> {
        if self.mode != OpenMode::Invalid {
            return Err(ArchiveError::AlreadyOpen);
        }
        self.mode = OpenMode::Write;
        log::debug!("archive opened for write");
        Ok(())
    }

    /// Sets the default language new units without an explicit language
    /// fall back to.
    pub fn set_default_language(&mut self, language: Language) {
        self.default_language = Some(language);
    }

    /// Sets the archive-wide default option bitmask; units without an
    /// explicit override inherit it.
    pub fn set_options(&mut self, options: Options) {
        self.options = options;
    }

    /// The archive-wide default option bitmask.
    #[must_use]
    pub fn options(&self) -> Options {
        self.options
    }

    /// Sets the tabstop width used for position-attribute columns.
    pub fn set_tabstop(&mut self, tabstop: usize) {
        self.tabstop = tabstop.max(1);
    }

    /// Registers a namespace prefix/URI pair. Last write wins on a
    /// colliding prefix.
    pub fn register_namespace(&mut self, prefix: impl Into<String>, uri: impl Into<String>) {
        let prefix = prefix.into();
        self.namespaces.retain(|(p, _)| *p != prefix);
        self.namespaces.push((prefix, uri.into()));
    }

    /// Registers a filename extension to a language, taking priority over
    /// the built-in table.
    pub fn register_extension(&mut self, extension: impl Into<String>, language: Language) {
        self.languages.register(extension, language);
    }

    /// Registers a macro-like identifier to a token type, steering the
    /// lexer's declaration-vs-call disambiguation for every unit parsed
    /// from source hereafter.
    pub fn register_macro_type(&mut self, name: impl Into<String>, token_type: impl Into<String>) {
        self.macros.register(name, token_type);
    }

    /// The current mode.
    #[must_use]
    pub const fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Appends a unit built from `source`, to be translated when
    /// [`Archive::write_all`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotOpenForWrite`] if the archive is not in
    /// [`OpenMode::Write`] or [`OpenMode::ReadWrite`].
    pub fn add_unit_from_source(&mut self, unit: Unit) -> Result<(), ArchiveError> {
        if !matches!(self.mode, OpenMode::Write | OpenMode::ReadWrite) {
            return Err(ArchiveError::NotOpenForWrite);
        }
        self.units.push(unit);
        Ok(())
    }

    /// Appends a unit built from [`Unit::from_srcml`]: already-translated
    /// srcML re-emitted verbatim by [`Archive::write_all`] rather than
    /// re-parsed from source. This is the C7/C8 pass-through path for
    /// copying a unit read by an [`ArchiveReader`] into a new archive
    /// without re-parsing it.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::NotOpenForWrite`] if the archive is not in
    /// [`OpenMode::Write`] or [`OpenMode::ReadWrite`].
    pub fn add_translated_unit(&mut self, unit: Unit) -> Result<(), ArchiveError> {
        if !matches!(self.mode, OpenMode::Write | OpenMode::ReadWrite) {
            return Err(ArchiveError::NotOpenForWrite);
        }
        self.units.push(unit);
        Ok(())
    }

    /// Translates and serializes every added unit, producing the full
    /// archive document: a root `<unit>` wrapping one child `<unit>` per
    /// added unit when [`Options::ARCHIVE`] is set, or the lone unit as
    /// the document root when it is not and exactly one unit was added.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::EmptyArchive`] if no units were added,
    /// [`ArchiveError::SingleUnitModeWithMultipleUnits`] if more than one
    /// unit was added without [`Options::ARCHIVE`] set,
    /// [`ArchiveError::UnregisteredExtension`] if a unit has no language
    /// and none could be derived, or [`ArchiveError::Parse`]/
    /// [`ArchiveError::Output`] from the underlying pipeline.
    pub fn write_all(&self) -> Result<String, ArchiveError> {
        if self.units.is_empty() {
            return Err(ArchiveError::EmptyArchive);
        }
        let is_archive = self.options.contains(Options::ARCHIVE);
        if !is_archive && self.units.len() > 1 {
            return Err(ArchiveError::SingleUnitModeWithMultipleUnits);
        }

        let mut per_unit = Vec::with_capacity(self.units.len());
        for unit in &self.units {
            let language = unit.language.or(self.default_language).ok_or(ArchiveError::UnregisteredExtension(unit.metadata.filename.clone()))?;
            let opts = unit.effective_options(self.options);
            let body = if let Some(source) = unit.source_bytes.as_deref() {
                UnitBody::Parsed(parse::parse_unit(source, language, &opts)?)
            } else {
                UnitBody::Passthrough(unit.srcml_bytes.as_deref().unwrap_or_default())
            };
            per_unit.push((unit, language, opts, body));
        }

        if !is_archive {
            let (unit, language, opts, body) = &per_unit[0];
            return Ok(match body {
                UnitBody::Parsed(events) => output::write_unit(events, *language, Some(&unit.metadata), opts, self.tabstop)?,
                UnitBody::Passthrough(inner) => output::write_passthrough_unit(inner, *language, Some(&unit.metadata), opts),
            });
        }

        let mut out = String::new();
        if self.options.contains(Options::XML_DECL) {
            out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
        }
        let root_language = self.default_language.or(per_unit.first().map(|(_, l, _, _)| *l)).unwrap_or(Language::C);
        let cpp_referenced = per_unit.iter().any(|(_, _, _, body)| match body {
            UnitBody::Parsed(events) => output::events_reference_cpp(events),
            UnitBody::Passthrough(inner) => inner.contains("<cpp:"),
        });
        let omp_referenced = per_unit.iter().any(|(_, _, _, body)| match body {
            UnitBody::Parsed(events) => output::events_reference_omp(events),
            UnitBody::Passthrough(inner) => inner.contains("<omp:"),
        });
        let decls = output::namespace_decls_for_refs(root_language, cpp_referenced, omp_referenced, &self.options);
        output::write_unit_open_tag(&mut out, root_language, None, &decls, self.options.contains(Options::NAMESPACE_DECL));
        out.push('>');
        for (unit, language, opts, body) in &per_unit {
            match body {
                UnitBody::Parsed(events) => {
                    let inner = output::assemble_inner(events, self.tabstop, opts.contains(Options::POSITION))?;
                    let mut open = String::new();
                    output::write_unit_open_tag(&mut open, *language, Some(&unit.metadata), &[], false);
                    out.push_str(&open);
                    if opts.contains(Options::POSITION) {
                        out.push_str(&format!(" pos:start=\"{}\" pos:end=\"{}\"", inner.start, inner.end));
                    }
                    if opts.contains(Options::HASH) {
                        let hash = super::hash::source_hash(unit.source_bytes.as_deref().unwrap_or_default());
                        out.push_str(&format!(" hash=\"{hash}\""));
                    }
                    if inner.xml.is_empty() {
                        out.push_str("/>");
                    } else {
                        out.push('>');
                        out.push_str(&inner.xml);
                        out.push_str("</unit>");
                    }
                }
                UnitBody::Passthrough(inner) => {
                    let mut open = String::new();
                    output::write_unit_open_tag(&mut open, *language, Some(&unit.metadata), &[], false);
                    out.push_str(&open);
                    if inner.is_empty() {
                        out.push_str("/>");
                    } else {
                        out.push('>');
                        out.push_str(inner);
                        out.push_str("</unit>");
                    }
                }
            }
            if self.options.contains(Options::INTERACTIVE) {
                log::trace!("interactive flush after unit boundary");
            }
        }
        out.push_str("</unit>");
        Ok(out)
    }

    /// Closes the archive. Idempotent after the first call only in the
    /// sense that it always succeeds; further unit additions are rejected
    /// by [`Self::add_unit_from_source`] since [`Self::mode`] becomes
    /// [`OpenMode::Invalid`].
    pub fn close(&mut self) {
        self.mode = OpenMode::Invalid;
        log::debug!("archive closed");
    }
}

/// An error raised by [`Archive`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArchiveError {
    /// [`Archive::open_write`] (or an eventual `open_read`) was called on
    /// an archive already past [`OpenMode::Invalid`].
    #[error("archive already opened")]
    AlreadyOpen,
    /// A write operation was attempted while not open for writing.
    #[error("archive is not open for writing")]
    NotOpenForWrite,
    /// [`Archive::write_all`] was called with no units added.
    #[error("archive has no units to write")]
    EmptyArchive,
    /// More than one unit was added without [`Options::ARCHIVE`] set.
    #[error("single-unit mode (Options::ARCHIVE unset) cannot hold more than one unit")]
    SingleUnitModeWithMultipleUnits,
    /// A unit had no language and none could be derived from its
    /// filename or the archive's default.
    #[error("no language known for unit {0:?}")]
    UnregisteredExtension(Option<String>),
    /// Parsing a unit's source failed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Assembling a unit's output XML failed.
    #[error(transparent)]
    Output(#[from] output::OutputError),
    /// The srcML being read was not well-formed or did not match the
    /// expected tree shape.
    #[error("malformed srcml: {0}")]
    MalformedSrcml(String),
}

/// One event the [`ArchiveReader`] emits while walking an existing srcML
/// document: a start/end callback pair per unit plus a root start/end
/// pair for the document itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    /// The root `<unit>` start tag was read; carries its attributes,
    /// which (in archive mode) are the archive's own metadata, and (in
    /// single-unit mode) are the one unit's metadata.
    RootStart {
        /// `(name, value)` pairs read off the root start tag, in document
        /// order.
        attrs: Vec<(String, String)>,
    },
    /// A nested unit's start tag was read (archive mode only).
    UnitStart {
        /// `(name, value)` pairs read off this unit's start tag.
        attrs: Vec<(String, String)>,
    },
    /// The current unit's body (everything between its start and end
    /// tag) was read, as a zero-copy slice of the original document text.
    UnitBody {
        /// The inner XML text of the unit.
        body: String,
    },
    /// The document (or, in single-unit mode, the one unit) ended.
    End,
}

/// An incremental reader over an existing srcML document (C7): the
/// reverse path of [`Archive::write_all`].
///
/// This is a small hand-written scanner, not a general XML parser: it
/// recognises exactly the tree shape a srcML document has (a root
/// `<unit ...>`, optionally wrapping child `<unit ...>...</unit>`
/// elements) and treats everything else as opaque body text, which is
/// sufficient for this crate's own output and is what the round-trip
/// tests in `tests/` exercise.
#[derive(Debug, Clone)]
pub struct ArchiveReader<'a> {
    source: &'a str,
    pos: usize,
    root_read: bool,
    root_is_single_unit: bool,
    root_attrs: Vec<(String, String)>,
    finished: bool,
    pending_body: Option<String>,
}

impl<'a> ArchiveReader<'a> {
    /// Builds a reader over `source`, which must be a complete srcML
    /// document (single-unit or archive).
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0, root_read: false, root_is_single_unit: false, root_attrs: Vec::new(), finished: false, pending_body: None }
    }

    /// Advances to the next [`ReaderEvent`].
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::MalformedSrcml`] if the document does not
    /// start with a `<unit` tag, or a start tag has no matching `>`.
    pub fn next_event(&mut self) -> Result<Option<ReaderEvent>, ArchiveError> {
        if self.finished {
            return Ok(None);
        }
        if let Some(body) = self.pending_body.take() {
            return Ok(Some(ReaderEvent::UnitBody { body }));
        }
        self.skip_prolog();
        if !self.root_read {
            return self.read_root();
        }
        if self.root_is_single_unit {
            self.finished = true;
            return Ok(Some(ReaderEvent::End));
        }
        self.read_next_child_unit()
    }

    fn skip_prolog(&mut self) {
        let rest = &self.source[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
        if self.source[self.pos..].starts_with("<?xml") {
            if let Some(end) = self.source[self.pos..].find("?>") {
                self.pos += end + 2;
            }
        }
        let rest = &self.source[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
    }

    fn read_root(&mut self) -> Result<Option<ReaderEvent>, ArchiveError> {
        if !self.source[self.pos..].starts_with("<unit") {
            return Err(ArchiveError::MalformedSrcml("document does not start with a <unit> root element".to_string()));
        }
        let tag_end = self.find_tag_end(self.pos)?;
        let self_closing = self.source[..tag_end].ends_with("/>");
        let attrs = parse_attrs(&self.source[self.pos..tag_end]);
        self.pos = tag_end + 1;
        self.root_read = true;
        self.root_attrs.clone_from(&attrs);
        if self_closing {
            self.root_is_single_unit = true;
            self.finished = true;
            return Ok(Some(ReaderEvent::RootStart { attrs }));
        }
        self.root_is_single_unit = !self.source[self.pos..].trim_start().starts_with("<unit");
        Ok(Some(ReaderEvent::RootStart { attrs }))
    }

    fn read_next_child_unit(&mut self) -> Result<Option<ReaderEvent>, ArchiveError> {
        let rest = &self.source[self.pos..];
        let trimmed = rest.trim_start();
        self.pos += rest.len() - trimmed.len();
        if self.source[self.pos..].starts_with("</unit>") {
            self.finished = true;
            return Ok(Some(ReaderEvent::End));
        }
        if !self.source[self.pos..].starts_with("<unit") {
            self.finished = true;
            return Ok(Some(ReaderEvent::End));
        }
        let tag_end = self.find_tag_end(self.pos)?;
        let self_closing = self.source[..tag_end].ends_with("/>");
        let attrs = parse_attrs(&self.source[self.pos..tag_end]);
        self.pos = tag_end + 1;
        if self_closing {
            self.pending_body = Some(String::new());
            return Ok(Some(ReaderEvent::UnitStart { attrs }));
        }
        let close = self.source[self.pos..].find("</unit>").ok_or_else(|| ArchiveError::MalformedSrcml("unterminated <unit> element".to_string()))?;
        let body = self.source[self.pos..self.pos + close].to_string();
        self.pos += close + "</unit>".len();
        self.pending_body = Some(body);
        Ok(Some(ReaderEvent::UnitStart { attrs }))
    }

    fn find_tag_end(&self, from: usize) -> Result<usize, ArchiveError> {
        self.source[from..].find('>').map(|i| from + i).ok_or_else(|| ArchiveError::MalformedSrcml("unterminated start tag".to_string()))
    }

    /// Discards the body of the unit just started by a
    /// [`ReaderEvent::UnitStart`], for a caller that only wants to
    /// enumerate attributes without materializing each unit's text.
    pub fn skip_unit(&mut self) {
        self.pending_body = None;
    }

    /// Advances directly to the `position`-th (1-based) unit, skipping
    /// every earlier unit's body without materializing it, and returns
    /// the event that starts it (reading the root start tag first if
    /// [`Self::next_event`] hasn't been called yet). The equivalent of
    /// calling [`Self::next_event`]/[`Self::skip_unit`] in a loop and
    /// counting `UnitStart`s, exposed directly since that loop is common
    /// enough to want a name.
    ///
    /// In a single-unit document (no archive wrapper) the lone unit IS
    /// the root, so `position == 1` returns the already-read
    /// [`ReaderEvent::RootStart`]; any other position returns `Ok(None)`.
    ///
    /// Returns `Ok(None)` if the document holds fewer than `position`
    /// units.
    ///
    /// # Errors
    ///
    /// As [`Self::next_event`].
    ///
    /// # Panics
    ///
    /// Panics if `position` is `0` (positions are 1-based).
    pub fn read_unit_at(&mut self, position: usize) -> Result<Option<ReaderEvent>, ArchiveError> {
        assert!(position >= 1, "unit position is 1-based");
        if !self.root_read {
            self.next_event()?;
        }
        if self.root_is_single_unit {
            return Ok(if position == 1 { Some(ReaderEvent::RootStart { attrs: self.root_attrs.clone() }) } else { None });
        }
        let mut seen = 0usize;
        loop {
            match self.next_event()? {
                Some(ReaderEvent::UnitStart { attrs }) => {
                    seen += 1;
                    if seen == position {
                        return Ok(Some(ReaderEvent::UnitStart { attrs }));
                    }
                    self.skip_unit();
                }
                Some(ReaderEvent::End) | None => return Ok(None),
                other => return Ok(other),
            }
        }
    }
}

fn parse_attrs(tag: &str) -> Vec<(String, String)> {
    let mut attrs = Vec::new();
    let mut rest = tag;
    while let Some(eq) = rest.find('=') {
        let name = rest[..eq].trim();
        let name = name.rsplit(|c: char| c.is_whitespace() || c == '<').next().unwrap_or(name);
        if name.is_empty() || name.starts_with("xmlns") {
            let Some(after_eq) = rest.get(eq + 1..) else { break };
            let Some(value_start) = after_eq.find('"') else { break };
            let Some(value_end) = after_eq[value_start + 1..].find('"') else { break };
            rest = &after_eq[value_start + 1 + value_end + 1..];
            continue;
        }
        let Some(after_eq) = rest.get(eq + 1..) else { break };
        let Some(value_start) = after_eq.find('"') else { break };
        let Some(value_end) = after_eq[value_start + 1..].find('"') else { break };
        let value = &after_eq[value_start + 1..value_start + 1 + value_end];
        attrs.push((name.to_string(), unescape_attr(value)));
        rest = &after_eq[value_start + 1 + value_end + 1..];
    }
    attrs
}

fn unescape_attr(s: &str) -> String {
    s.replace("&quot;", "\"").replace("&lt;", "<").replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_unit_write_all_has_no_archive_wrapper() {
        let mut archive = Archive::new();
        archive.open_write().unwrap();
        archive.add_unit_from_source(Unit::from_source(Language::C, "int x;")).unwrap();
        let xml = archive.write_all().unwrap();
        assert!(xml.contains("<unit"));
        assert!(!xml.contains("<unit><unit"));
        assert!(xml.contains("<decl_stmt>"));
    }

    #[test]
    fn two_units_require_archive_option() {
        let mut archive = Archive::new();
        archive.open_write().unwrap();
        archive.add_unit_from_source(Unit::from_source(Language::C, "int a;")).unwrap();
        archive.add_unit_from_source(Unit::from_source(Language::C, "int b;")).unwrap();
        let err = archive.write_all().unwrap_err();
        assert_eq!(err, ArchiveError::SingleUnitModeWithMultipleUnits);
    }

    #[test]
    fn archive_mode_wraps_two_units_with_filenames() {
        let mut archive = Archive::new();
        archive.set_options(Options::default().union(Options::ARCHIVE));
        archive.open_write().unwrap();
        archive.add_unit_from_source(Unit::from_source(Language::Cxx0x, "int a;").with_filename("a.cpp")).unwrap();
        archive.add_unit_from_source(Unit::from_source(Language::Cxx0x, "int b;").with_filename("b.cpp")).unwrap();
        let xml = archive.write_all().unwrap();
        assert!(xml.contains("filename=\"a.cpp\""));
        assert!(xml.contains("filename=\"b.cpp\""));
        let first = xml.find("filename=\"a.cpp\"").unwrap();
        let second = xml.find("filename=\"b.cpp\"").unwrap();
        assert!(first < second);
    }

    #[test]
    fn write_all_on_empty_archive_errors() {
        let mut archive = Archive::new();
        archive.open_write().unwrap();
        assert_eq!(archive.write_all().unwrap_err(), ArchiveError::EmptyArchive);
    }

    #[test]
    fn add_unit_before_open_errors() {
        let mut archive = Archive::new();
        let err = archive.add_unit_from_source(Unit::from_source(Language::C, "int x;")).unwrap_err();
        assert_eq!(err, ArchiveError::NotOpenForWrite);
    }

    #[test]
    fn double_open_errors() {
        let mut archive = Archive::new();
        archive.open_write().unwrap();
        assert_eq!(archive.open_write().unwrap_err(), ArchiveError::AlreadyOpen);
    }

    #[test]
    fn reader_reads_single_unit_root_attributes() {
        let xml = r#"<unit language="C" filename="a.c"><decl_stmt><decl><type><name>int</name></type> <name>x</name></decl>;</decl_stmt></unit>"#;
        let mut reader = ArchiveReader::new(xml);
        let root = reader.next_event().unwrap().unwrap();
        match root {
            ReaderEvent::RootStart { attrs } => {
                assert!(attrs.contains(&("language".to_string(), "C".to_string())));
                assert!(attrs.contains(&("filename".to_string(), "a.c".to_string())));
            }
            other => panic!("expected RootStart, got {other:?}"),
        }
        assert!(reader.root_is_single_unit);
    }

    #[test]
    fn reader_enumerates_archive_child_units_in_order() {
        let xml = concat!(
            r#"<unit xmlns="http://www.srcML.org/srcML/src" language="C">"#,
            r#"<unit language="C" filename="a.c"><decl_stmt><decl><type><name>int</name></type> <name>a</name></decl>;</decl_stmt></unit>"#,
            r#"<unit language="C" filename="b.c"><decl_stmt><decl><type><name>int</name></type> <name>b</name></decl>;</decl_stmt></unit>"#,
            "</unit>",
        );
        let mut reader = ArchiveReader::new(xml);
        let root = reader.next_event().unwrap().unwrap();
        assert!(matches!(root, ReaderEvent::RootStart { .. }));
        assert!(!reader.root_is_single_unit);

        let first_start = reader.next_event().unwrap().unwrap();
        let ReaderEvent::UnitStart { attrs } = first_start else { panic!("expected first unit start") };
        assert!(attrs.contains(&("filename".to_string(), "a.c".to_string())));
        let first_body = reader.next_event().unwrap().unwrap();
        let ReaderEvent::UnitBody { body } = first_body else { panic!("expected first unit body") };
        assert!(body.contains(">a<"));

        let second_start = reader.next_event().unwrap().unwrap();
        assert!(matches!(second_start, ReaderEvent::UnitStart { .. }));
        let second_body = reader.next_event().unwrap().unwrap();
        let ReaderEvent::UnitBody { body } = second_body else { panic!("expected second unit body") };
        assert!(body.contains(">b<"));

        let end = reader.next_event().unwrap().unwrap();
        assert_eq!(end, ReaderEvent::End);
    }

    #[test]
    fn reader_rejects_document_without_unit_root() {
        let mut reader = ArchiveReader::new("<notunit></notunit>");
        assert!(reader.next_event().is_err());
    }

    #[test]
    fn option_override_beats_archive_default() {
        let mut archive = Archive::new();
        archive.set_options(Options::default());
        archive.open_write().unwrap();
        let unit = Unit::from_source(Language::C, "int x;").with_options(Options::default().union(Options::HASH));
        archive.add_unit_from_source(unit).unwrap();
        let xml = archive.write_all().unwrap();
        assert!(xml.contains("hash=\""));
    }

    #[test]
    fn translated_unit_standalone_prepends_missing_namespaces() {
        // Body copied out of an archive's nested <unit>, which never carries
        // its own xmlns (those were declared once on the archive root).
        let body = r#"<decl_stmt><decl><type><name>int</name></type> <name>x</name></decl>;</decl_stmt>"#;
        let mut archive = Archive::new();
        archive.open_write().unwrap();
        archive.add_translated_unit(Unit::from_srcml(Language::C, body).with_filename("a.c")).unwrap();
        let xml = archive.write_all().unwrap();
        assert!(xml.contains(r#"<unit xmlns="http://www.srcML.org/srcML/src""#));
        assert!(xml.contains("filename=\"a.c\""));
        assert!(xml.contains(body));
    }

    #[test]
    fn translated_unit_standalone_declares_cpp_namespace_when_referenced() {
        let body = r#"<cpp:include>#include <stdio.h></cpp:include>"#;
        let mut archive = Archive::new();
        archive.open_write().unwrap();
        archive.add_translated_unit(Unit::from_srcml(Language::Java, body)).unwrap();
        let xml = archive.write_all().unwrap();
        assert!(xml.contains("xmlns:cpp="));
    }

    #[test]
    fn translated_unit_in_archive_inherits_root_namespace_without_its_own() {
        let mut archive = Archive::new();
        archive.set_options(Options::default().union(Options::ARCHIVE));
        archive.open_write().unwrap();
        archive.add_unit_from_source(Unit::from_source(Language::C, "int a;").with_filename("a.c")).unwrap();
        archive
            .add_translated_unit(
                Unit::from_srcml(Language::C, r#"<decl_stmt><decl><type><name>int</name></type> <name>b</name></decl>;</decl_stmt>"#)
                    .with_filename("b.c"),
            )
            .unwrap();
        let xml = archive.write_all().unwrap();
        assert_eq!(xml.matches("xmlns=\"http://www.srcML.org/srcML/src\"").count(), 1);
        assert!(xml.contains("filename=\"a.c\""));
        assert!(xml.contains("filename=\"b.c\""));
        assert!(xml.matches("<decl_stmt>").count() >= 2);
    }

    #[test]
    fn read_unit_at_skips_to_requested_unit_without_materializing_earlier_bodies() {
        let xml = concat!(
            r#"<unit xmlns="http://www.srcML.org/srcML/src" language="C">"#,
            r#"<unit language="C" filename="a.c"><decl_stmt><decl><type><name>int</name></type> <name>a</name></decl>;</decl_stmt></unit>"#,
            r#"<unit language="C" filename="b.c"><decl_stmt><decl><type><name>int</name></type> <name>b</name></decl>;</decl_stmt></unit>"#,
            r#"<unit language="C" filename="c.c"><decl_stmt><decl><type><name>int</name></type> <name>c</name></decl>;</decl_stmt></unit>"#,
            "</unit>",
        );
        let mut reader = ArchiveReader::new(xml);
        let second = reader.read_unit_at(2).unwrap().unwrap();
        let ReaderEvent::UnitStart { attrs } = second else { panic!("expected UnitStart") };
        assert!(attrs.contains(&("filename".to_string(), "b.c".to_string())));
        let body = reader.next_event().unwrap().unwrap();
        let ReaderEvent::UnitBody { body } = body else { panic!("expected UnitBody") };
        assert!(body.contains(">b<"));
        assert!(!body.contains(">a<"));
    }

    #[test]
    fn read_unit_at_past_the_end_returns_none() {
        let xml = concat!(
            r#"<unit xmlns="http://www.srcML.org/srcML/src" language="C">"#,
            r#"<unit language="C" filename="a.c"><decl_stmt><decl><type><name>int</name></type> <name>a</name></decl>;</decl_stmt></unit>"#,
            "</unit>",
        );
        let mut reader = ArchiveReader::new(xml);
        assert!(reader.read_unit_at(5).unwrap().is_none());
    }

    #[test]
    fn read_unit_at_one_on_single_unit_document_returns_root() {
        let xml = r#"<unit language="C" filename="a.c"><decl_stmt><decl><type><name>int</name></type> <name>x</name></decl>;</decl_stmt></unit>"#;
        let mut reader = ArchiveReader::new(xml);
        let first = reader.read_unit_at(1).unwrap().unwrap();
        match first {
            ReaderEvent::RootStart { attrs } => assert!(attrs.contains(&("filename".to_string(), "a.c".to_string()))),
            other => panic!("expected RootStart, got {other:?}"),
        }
        assert!(reader.read_unit_at(2).unwrap().is_none());
    }
}
