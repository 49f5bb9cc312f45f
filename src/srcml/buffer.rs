//! The character buffer: decodes an input byte stream to UTF-8 and walks
//! it while tracking byte offset, line, and tabstop-aware column.
//!
//! A single-character `peek`/`bump` interface drives the keyword lexer,
//! extended with tabstop expansion and `#line` directive handling: srcML
//! accepts `#line N "file"` the same way the C preprocessor does, to keep
//! reported positions meaningful after macro expansion upstream of the
//! translator.

use thiserror::Error;

/// An error decoding or re-encoding the input byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// The named encoding is not recognised by `encoding_rs`.
    #[error("unknown encoding label: {0}")]
    UnknownEncoding(String),
    /// Decoding with a non-UTF-8 encoding reported an unmappable byte
    /// sequence and the buffer was built in strict mode.
    #[error("byte sequence at offset {offset} is not valid in the declared encoding")]
    MalformedInput {
        /// Byte offset of the first unmappable byte.
        offset: usize,
    },
}

/// How to handle byte sequences the declared encoding cannot map to a
/// Unicode scalar value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Substitute `U+FFFD` and keep going, matching `encoding_rs`'s
    /// default streaming decode behaviour.
    #[default]
    Lossy,
    /// Fail with [`EncodingError::MalformedInput`] on the first
    /// unmappable byte.
    Strict,
}

/// Decodes `bytes` as `encoding_label` (or UTF-8 if `None`) into an owned
/// `String`, stripping a leading byte-order mark if present.
///
/// # Errors
///
/// Returns [`EncodingError::UnknownEncoding`] if the label is not
/// recognised, or [`EncodingError::MalformedInput`] if `mode` is
/// [`DecodeMode::Strict`] and the input contains a byte sequence the
/// encoding cannot map.
pub fn decode(bytes: &[u8], encoding_label: Option<&str>, mode: DecodeMode) -> Result<String, EncodingError> {
    let encoding = match encoding_label {
        None => encoding_rs::UTF_8,
        Some(label) => encoding_rs::Encoding::for_label(label.as_bytes())
            .ok_or_else(|| EncodingError::UnknownEncoding(label.to_string()))?,
    };
    let mut decoder = encoding.new_decoder_with_bom_removal();
    let mut out = String::with_capacity(bytes.len());
    let (result, read, had_errors) = decoder.decode_to_string(bytes, &mut out, true);
    debug_assert_eq!(read, bytes.len());
    let _ = result;
    if had_errors && matches!(mode, DecodeMode::Strict) {
        return Err(EncodingError::MalformedInput { offset: 0 });
    }
    Ok(out)
}

/// The number of columns a tab advances to, used for column reporting
/// only; it never affects byte offsets.
const DEFAULT_TABSTOP: usize = 8;

/// A `#line N "file"` directive recognised between tokens, remapping the
/// line (and optionally filename) reported for everything that follows
/// until the next directive or end of input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDirective {
    /// The logical line number to report for the next physical line.
    pub line: usize,
    /// The logical filename to report, if the directive named one.
    pub file: Option<String>,
}

/// A cursor over a decoded source buffer, reporting byte offset, 1-based
/// line, and 1-based tabstop-expanded column for every position visited.
#[derive(Debug, Clone)]
pub struct CharBuffer<'a> {
    source: &'a str,
    index: usize,
    line: usize,
    col: usize,
    tabstop: usize,
    logical_line_offset: i64,
    logical_file: Option<String>,
}

impl<'a> CharBuffer<'a> {
    /// Builds a buffer over `source` with the default tabstop of 8.
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self::with_tabstop(source, DEFAULT_TABSTOP)
    }

    /// Builds a buffer over `source` with an explicit tabstop width.
    #[must_use]
    pub fn with_tabstop(source: &'a str, tabstop: usize) -> Self {
        Self {
            source,
            index: 0,
            line: 1,
            col: 1,
            tabstop: tabstop.max(1),
            logical_line_offset: 0,
            logical_file: None,
        }
    }

    /// The full source text this buffer walks.
    #[must_use]
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// The current byte offset.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.index
    }

    /// The current physical 1-based line number.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// The current logical line number: the physical line adjusted by
    /// the most recent `#line` directive, matching how the original
    /// preprocessor renumbers lines after a directive.
    #[must_use]
    pub fn logical_line(&self) -> usize {
        (self.line as i64 + self.logical_line_offset).max(1) as usize
    }

    /// The logical filename named by the most recent `#line` directive,
    /// if any.
    #[must_use]
    pub fn logical_file(&self) -> Option<&str> {
        self.logical_file.as_deref()
    }

    /// The current 1-based, tabstop-expanded column.
    #[must_use]
    pub fn col(&self) -> usize {
        self.col
    }

    /// Returns whether the buffer has been fully consumed.
    #[must_use]
    pub fn is_end(&self) -> bool {
        self.index >= self.source.len()
    }

    /// Returns the character at the current position without consuming
    /// it.
    #[must_use]
    pub fn peek(&self) -> Option<char> {
        self.source[self.index..].chars().next()
    }

    /// Returns the character `n` positions ahead without consuming
    /// anything, `n = 0` being equivalent to [`Self::peek`].
    #[must_use]
    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.source[self.index..].chars().nth(n)
    }

    /// Returns the rest of the buffer as a string slice without
    /// consuming it.
    #[must_use]
    pub fn rest(&self) -> &'a str {
        &self.source[self.index..]
    }

    /// Returns whether the unconsumed input starts with `needle`.
    #[must_use]
    pub fn starts_with(&self, needle: &str) -> bool {
        self.rest().starts_with(needle)
    }

    /// Consumes and returns the current character, advancing position
    /// bookkeeping.
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.index += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else if c == '\t' {
            self.col += self.tabstop - ((self.col - 1) % self.tabstop);
        } else {
            self.col += 1;
        }
        Some(c)
    }

    /// Consumes `n` characters, returning how many were actually
    /// available.
    pub fn bump_n(&mut self, n: usize) -> usize {
        (0..n).take_while(|_| self.bump().is_some()).count()
    }

    /// Consumes the current character only if it equals `expected`.
    pub fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consumes the current input only if it starts with `needle`,
    /// returning whether it did.
    pub fn eat_str(&mut self, needle: &str) -> bool {
        if self.starts_with(needle) {
            self.bump_n(needle.chars().count());
            true
        } else {
            false
        }
    }

    /// Returns a slice of the original source between `start` and the
    /// current position.
    #[must_use]
    pub fn slice_from(&self, start: usize) -> &'a str {
        &self.source[start..self.index]
    }

    /// Applies a recognised `#line` directive. Per `#line` semantics, the
    /// directive names the logical line number of the physical line
    /// *following* it; [`Self::logical_line`] reflects that renumbering
    /// for every position from here until the next directive is applied.
    pub fn apply_line_directive(&mut self, directive: LineDirective) {
        self.logical_line_offset = directive.line as i64 - (self.line as i64 + 1);
        if directive.file.is_some() {
            self.logical_file = directive.file;
        }
    }
}
