//! The translator module of the srcML pipeline.
//!
//! This module consists of four coupled phases: the character/token layer,
//! the mode-stack parser, the XML output assembler, and the multi-unit
//! archive layer.
//!
//! `buffer` decodes an input byte stream into a lazily-consumed sequence of
//! UTF-8 code points while tracking byte/line/column position.
//!
//! `lex` turns that code-point stream into primary tokens (identifiers,
//! keywords, literals, comments, preprocessor directives, punctuators),
//! delegating comment and string bodies to micro-lexers.
//!
//! `mode` and `parse` drive a hand-written recursive-descent parser whose
//! only side-band state is a stack of bitmask "mode" records; it produces a
//! flat stream of start/end markup events interleaved with source text.
//!
//! `output` consumes that event stream and writes well-formed, namespace
//! correct XML with positional attributes, a hash attribute, and strict
//! round-trip whitespace fidelity.
//!
//! `archive` frames one or many translated units under a root `<unit>`
//! element and provides the reverse (reader) path over existing srcML.
//!
//! In detail, our policies are:
//!
//! - Do not validate source semantically, expand macros, or resolve
//!   includes.
//! - Do not format or prettify; every original byte not part of markup is
//!   preserved verbatim.
//! - Do not attempt error recovery beyond marking unrecognised regions
//!   with a debug namespace.

pub mod archive;
pub(crate) mod bits;
pub mod buffer;
pub mod detect;
pub mod diagnostics;
pub mod hash;
pub mod lang;
pub mod lex;
pub mod mode;
pub mod options;
pub mod output;
pub mod parse;

use thiserror::Error;

use self::{archive::ArchiveError, buffer::EncodingError, lex::LexWarning, parse::ParseError};
pub use self::{lang::Language, options::Options};

/// An error occurred anywhere in the translator pipeline.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SrcmlError {
    /// An error decoding the input byte stream.
    #[error("encoding error: {0}")]
    Encoding(EncodingError),
    /// An error comes from the lexical analyzer.
    #[error("lex error: {0}")]
    Lex(LexWarning),
    /// An error comes from the mode-stack parser.
    #[error("parse error: {0}")]
    Parse(ParseError),
    /// The document being read is not a well-formed srcML archive.
    #[error("malformed srcml: {0}")]
    MalformedSrcml(String),
    /// The input file's extension is not registered to any language.
    #[error("unregistered extension for {0:?}")]
    UnregisteredExtension(Option<String>),
    /// The host cancelled the translation.
    #[error("translation cancelled")]
    Cancelled,
    /// An error from the archive reader or writer.
    #[error("archive error: {0}")]
    Archive(ArchiveError),
}

impl From<EncodingError> for SrcmlError {
    fn from(e: EncodingError) -> Self {
        Self::Encoding(e)
    }
}
impl From<LexWarning> for SrcmlError {
    fn from(e: LexWarning) -> Self {
        Self::Lex(e)
    }
}
impl From<ParseError> for SrcmlError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}
impl From<ArchiveError> for SrcmlError {
    fn from(e: ArchiveError) -> Self {
        Self::Archive(e)
    }
}

/// A custom result type for srcml-core.
pub type Result<T> = std::result::Result<T, SrcmlError>;

/// Translates one unit of source text into a standalone srcML document
/// (single-unit mode: the `<unit>` element IS the document root).
///
/// This is the simplest entry point; for multi-unit archives see
/// [`archive::Archive`].
pub fn translate_unit(source: &str, language: Language, options: &Options) -> Result<String> {
    let events = parse::parse_unit(source, language, options)?;
    let xml = output::write_standalone_unit(&events, language, None, options)?;
    Ok(xml)
}
