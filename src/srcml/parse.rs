//! The mode-stack parser (C5): consumes tokens from [`super::lex::Lexer`]
//! and produces a flat, suspend/resume-able stream of [`Event`]s.
//!
//! Dispatch peeks the next token, recognises the start of a construct
//! this parser knows (a comment, a preprocessor directive, a simple
//! declaration), and recursively consumes it; anything unrecognised
//! falls through as a single passthrough token. That fallback is what
//! keeps the round-trip property intact even though the grammar
//! implemented here covers only a representative slice of C/C++/Java/C#
//! syntax rather than the full languages.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use super::lang::Language;
use super::lex::{self, Lexer, LexWarning, MacroTable, Token, TokenKind};
use super::mode::{Mode, ModeStack, RuleId, Span};
use super::options::Options;

/// One markup or text event produced by the parser.
///
/// `StartUnit`/`EndUnit` are not emitted by [`parse_unit`] itself (a
/// single unit's content is just the `StartElement`/`EndElement`/`Text`
/// events between its opening and closing `<unit>` tag, which
/// [`super::output`] writes directly); they exist for
/// [`super::archive`], which streams unit boundaries as events when
/// multiplexing or reading a multi-unit document.
#[derive(Debug, Clone, PartialEq)]
pub enum Event<'a> {
    /// Opens an element with the given qualified name and attributes,
    /// in insertion order.
    StartElement {
        /// The qualified name, e.g. `"decl_stmt"` or `"cpp:if"`.
        name: &'static str,
        /// Attribute name/value pairs, in the order they should be
        /// written.
        attrs: Vec<(String, String)>,
    },
    /// Closes the most recently opened element with this name.
    EndElement {
        /// The qualified name being closed.
        name: &'static str,
    },
    /// A zero-copy run of source text, carried verbatim from the buffer.
    Text(&'a str),
    /// Opens a unit boundary within a streamed archive.
    StartUnit {
        /// Unit-level attributes (language, filename, …).
        attrs: Vec<(String, String)>,
    },
    /// Closes a unit boundary within a streamed archive.
    EndUnit,
}

/// An error raised while parsing a unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The lexer could not tokenize the remaining input.
    #[error(transparent)]
    Lex(#[from] LexWarning),
    /// An internal invariant was violated (mode-stack or call-stack
    /// underflow). Indicates a parser bug, not malformed input.
    #[error("parser invariant violation: {0}")]
    InvariantViolation(String),
    /// The host requested cancellation via [`CancellationToken::cancel`].
    #[error("translation cancelled")]
    Cancelled,
}

/// A cooperative flag a host can set to stop translation at the next
/// event boundary. Cloning shares the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Builds a fresh, not-yet-cancelled token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Takes effect at the parser's next
    /// suspension point.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

const TYPE_KEYWORDS: &[&str] = &[
    "int", "char", "float", "double", "long", "short", "void", "bool", "unsigned", "signed",
    "boolean", "byte", "string", "object", "var", "decimal", "uint", "ulong", "ushort", "sbyte",
];

/// Keywords marked up as `<modifier>` (storage class, access, and method
/// qualifiers) rather than left as plain text, when `Options::MODIFIER`
/// is set.
const MODIFIER_KEYWORDS: &[&str] = &[
    "static", "const", "extern", "inline", "virtual", "volatile", "mutable", "explicit", "friend",
    "public", "private", "protected", "internal", "abstract", "final", "override", "sealed",
    "readonly", "unsafe", "async", "synchronized", "native", "transient", "strictfp", "partial",
];

const BOOLEAN_LITERAL_KEYWORDS: &[&str] = &["true", "false"];
const NULL_LITERAL_KEYWORDS: &[&str] = &["null", "nullptr"];

/// Streams [`Event`]s for a single unit's content, one suspension point
/// (one `next_event` call) at a time.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    language: Language,
    options: Options,
    mode: ModeStack,
    token_buffer: VecDeque<Token<'a>>,
    eof_seen: bool,
    pending_events: VecDeque<Event<'a>>,
    open_elements: Vec<&'static str>,
    cancel: CancellationToken,
    finished: bool,
    was_cancelled: bool,
    cancelled_reported: bool,
}

impl<'a> Parser<'a> {
    /// Builds a parser for `source` with no registered macros and a
    /// fresh (never-cancelled) cancellation token.
    #[must_use]
    pub fn new(source: &'a str, language: Language, options: Options) -> Self {
        Self::with_macros(source, language, options, MacroTable::new(), CancellationToken::new())
    }

    /// Builds a parser with an explicit macro table and cancellation
    /// token, letting a host hold the token to cancel mid-parse.
    #[must_use]
    pub fn with_macros(source: &'a str, language: Language, options: Options, macros: MacroTable, cancel: CancellationToken) -> Self {
        Self {
            lexer: Lexer::with_macros(source, language, macros),
            language,
            options,
            mode: ModeStack::new(Mode::IN_UNIT),
            token_buffer: VecDeque::new(),
            eof_seen: false,
            pending_events: VecDeque::new(),
            open_elements: Vec::new(),
            cancel,
            finished: false,
            was_cancelled: false,
            cancelled_reported: false,
        }
    }

    /// The language this parser was built for.
    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    /// A clone of this parser's cancellation token, for a host to hold
    /// onto and cancel from elsewhere.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Advances the parser until it has an event ready, then returns it.
    /// Returns `Ok(None)` once the unit is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Lex`] if the lexer fails, or
    /// [`ParseError::Cancelled`] once after a cancellation request has
    /// been drained (any already-buffered balancing events are returned
    /// first).
    pub fn next_event(&mut self) -> Result<Option<Event<'a>>, ParseError> {
        loop {
            if let Some(ev) = self.pending_events.pop_front() {
                return Ok(Some(ev));
            }
            if self.finished {
                if self.was_cancelled && !self.cancelled_reported {
                    self.cancelled_reported = true;
                    return Err(ParseError::Cancelled);
                }
                return Ok(None);
            }
            if self.cancel.is_cancelled() {
                self.synthesize_close_all();
                self.finished = true;
                self.was_cancelled = true;
                continue;
            }
            self.advance()?;
        }
    }

    fn fill(&mut self, upto: usize) -> Result<(), ParseError> {
        while self.token_buffer.len() <= upto && !self.eof_seen {
            match self.lexer.next_token()? {
                Some(tok) if tok.kind == TokenKind::Eof => self.eof_seen = true,
                Some(tok) => self.token_buffer.push_back(tok),
                None => self.eof_seen = true,
            }
        }
        Ok(())
    }

    fn peek(&mut self, n: usize) -> Result<Option<&Token<'a>>, ParseError> {
        self.fill(n)?;
        Ok(self.token_buffer.get(n))
    }

    fn bump(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        self.fill(0)?;
        Ok(self.token_buffer.pop_front())
    }

    fn open(&mut self, name: &'static str, attrs: Vec<(String, String)>) {
        self.pending_events.push_back(Event::StartElement { name, attrs });
        self.open_elements.push(name);
    }

    fn close(&mut self, name: &'static str) {
        self.pending_events.push_back(Event::EndElement { name });
        debug_assert_eq!(self.open_elements.pop(), Some(name));
    }

    fn synthesize_close_all(&mut self) {
        while let Some(name) = self.open_elements.pop() {
            self.pending_events.push_back(Event::EndElement { name });
        }
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        let Some(tok) = self.peek(0)?.cloned() else {
            self.synthesize_close_all();
            self.finished = true;
            return Ok(());
        };
        match tok.kind {
            TokenKind::Whitespace | TokenKind::Newline => {
                let t = self.bump()?.expect("peeked above");
                self.pending_events.push_back(Event::Text(t.text));
            }
            TokenKind::LineComment | TokenKind::BlockComment => self.emit_comment()?,
            TokenKind::Preprocessor => self.emit_preprocessor()?,
            TokenKind::Number => self.emit_literal("number")?,
            TokenKind::String | TokenKind::RawString => self.emit_literal("string")?,
            TokenKind::Char => self.emit_literal("char")?,
            TokenKind::Operator => {
                if !self.try_emit_template_args()? {
                    self.emit_operator()?;
                }
            }
            TokenKind::Keyword | TokenKind::Identifier => {
                if !self.try_emit_decl_stmt()? && !self.try_emit_keyword_markup()? {
                    let t = self.bump()?.expect("peeked above");
                    self.pending_events.push_back(Event::Text(t.text));
                }
            }
            _ => {
                let t = self.bump()?.expect("peeked above");
                self.pending_events.push_back(Event::Text(t.text));
            }
        }
        Ok(())
    }

    fn emit_comment(&mut self) -> Result<(), ParseError> {
        let tok = self.bump()?.expect("peeked a comment token");
        let ty = if tok.kind == TokenKind::LineComment { "line" } else { "block" };
        self.open("comment", vec![("type".to_string(), ty.to_string())]);
        self.pending_events.push_back(Event::Text(tok.text));
        self.close("comment");
        Ok(())
    }

    fn emit_preprocessor(&mut self) -> Result<(), ParseError> {
        let tok = self.bump()?.expect("peeked a preprocessor token");
        let keyword = preprocessor_keyword(tok.text);
        let is_omp = keyword == "pragma" && self.options.contains(Options::OPENMP) && is_omp_pragma(tok.text);
        let element = if is_omp { "omp:directive" } else { cpp_element_for(keyword) };
        self.open(element, Vec::new());
        self.pending_events.push_back(Event::Text(tok.text));
        self.close(element);

        if keyword == "if" && is_if_zero(tok.text) && !self.options.contains(Options::CPP_MARKUP_IF0) {
            self.mode.set_mode(Mode::IN_PREPROCESSOR_DEAD_BRANCH);
            self.emit_branch_body_as_text()?;
        } else if keyword == "else" && self.options.contains(Options::CPP_TEXT_ELSE) {
            self.emit_branch_body_as_text()?;
        } else if keyword == "endif" {
            self.mode.clear_mode(Mode::IN_PREPROCESSOR_DEAD_BRANCH);
        }
        Ok(())
    }

    /// Consumes everything up to (not including) the matching
    /// `#else`/`#elif`/`#endif` as a single `Text` event, honouring
    /// nested `#if`/`#ifdef`/`#ifndef` blocks. Used both for `#if 0`
    /// dead-branch bodies (`Options::CPP_MARKUP_IF0` unset) and for
    /// `#else` bodies under `Options::CPP_TEXT_ELSE`.
    fn emit_branch_body_as_text(&mut self) -> Result<(), ParseError> {
        let Some(first) = self.peek(0)?.cloned() else { return Ok(()) };
        let start = first.span.start;
        let mut end = start;
        let mut depth = 0i32;
        loop {
            let Some(tok) = self.peek(0)?.cloned() else { break };
            if tok.kind == TokenKind::Preprocessor {
                match preprocessor_keyword(tok.text) {
                    "if" | "ifdef" | "ifndef" => depth += 1,
                    "endif" => {
                        if depth == 0 {
                            break;
                        }
                        depth -= 1;
                    }
                    "else" | "elif" if depth == 0 => break,
                    _ => {}
                }
            }
            let consumed = self.bump()?.expect("peeked above");
            end = consumed.span.end;
        }
        if end > start {
            let text = self.lexer.slice(Span::new(start, end));
            self.pending_events.push_back(Event::Text(text));
        }
        Ok(())
    }

    /// Recognises `TypeWord+ WS NameIdent ;` and emits it as a
    /// `decl_stmt`/`decl`/`type`/`name` tree; returns `false` (consuming
    /// nothing) if the lookahead doesn't match this shape.
    fn try_emit_decl_stmt(&mut self) -> Result<bool, ParseError> {
        const MAX_LOOKAHEAD: usize = 64;
        let mut significant = Vec::new();
        let mut i = 0usize;
        let terminator_idx;
        loop {
            if i >= MAX_LOOKAHEAD {
                return Ok(false);
            }
            let Some(tok) = self.peek(i)? else { return Ok(false) };
            match tok.kind {
                TokenKind::Whitespace | TokenKind::Newline => {}
                TokenKind::Keyword if TYPE_KEYWORDS.contains(&tok.text) => significant.push(i),
                TokenKind::Identifier => significant.push(i),
                TokenKind::Operator if tok.text == ";" => {
                    terminator_idx = i;
                    break;
                }
                _ => return Ok(false),
            }
            i += 1;
        }
        if significant.len() < 2 {
            return Ok(false);
        }
        let name_idx = *significant.last().expect("checked len >= 2");
        if name_idx + 1 != terminator_idx {
            return Ok(false);
        }
        let second_last = significant[significant.len() - 2];

        self.mode.push(Mode::NONE);
        self.mode.top_mut().push_rule(RuleId::Declaration);

        self.open("decl_stmt", Vec::new());
        self.open("decl", Vec::new());
        self.open("type", Vec::new());
        for _ in 0..=second_last {
            let tok = self.bump()?.expect("validated by lookahead");
            if matches!(tok.kind, TokenKind::Whitespace | TokenKind::Newline) {
                self.pending_events.push_back(Event::Text(tok.text));
            } else {
                self.open("name", Vec::new());
                self.pending_events.push_back(Event::Text(tok.text));
                self.close("name");
            }
        }
        self.close("type");
        for _ in (second_last + 1)..name_idx {
            let tok = self.bump()?.expect("validated by lookahead");
            self.pending_events.push_back(Event::Text(tok.text));
        }
        let name_tok = self.bump()?.expect("validated by lookahead");
        self.open("name", Vec::new());
        self.pending_events.push_back(Event::Text(name_tok.text));
        self.close("name");
        self.close("decl");
        let terminator_tok = self.bump()?.expect("validated by lookahead");
        self.pending_events.push_back(Event::Text(terminator_tok.text));
        self.close("decl_stmt");

        self.mode
            .top_mut()
            .pop_rule()
            .map_err(|_| ParseError::InvariantViolation("declaration rule stack underflow".to_string()))?;
        self.mode
            .pop()
            .map_err(|_| ParseError::InvariantViolation("mode stack underflow after declaration".to_string()))?;

        Ok(true)
    }

    /// Emits a numeric, string, char, or raw-string token as a
    /// `<literal type="...">` leaf when `Options::LITERAL` is set
    /// (numeric literals additionally carry `base`/`suffix` attributes),
    /// or as plain text otherwise.
    fn emit_literal(&mut self, ty: &'static str) -> Result<(), ParseError> {
        let tok = self.bump()?.expect("peeked a literal token");
        if !self.options.contains(Options::LITERAL) {
            self.pending_events.push_back(Event::Text(tok.text));
            return Ok(());
        }
        let mut attrs = vec![("type".to_string(), ty.to_string())];
        if ty == "number" {
            let base = number_base(tok.text);
            attrs.push(("base".to_string(), base.to_string()));
            if let Some(suffix) = number_suffix(tok.text, base) {
                attrs.push(("suffix".to_string(), suffix));
            }
        }
        self.open("literal", attrs);
        self.pending_events.push_back(Event::Text(tok.text));
        self.close("literal");
        Ok(())
    }

    /// Emits an operator/punctuator token as `<operator>` when
    /// `Options::OPERATOR` is set, or as plain text otherwise.
    fn emit_operator(&mut self) -> Result<(), ParseError> {
        let tok = self.bump()?.expect("peeked an operator token");
        if !self.options.contains(Options::OPERATOR) {
            self.pending_events.push_back(Event::Text(tok.text));
            return Ok(());
        }
        self.open("operator", Vec::new());
        self.pending_events.push_back(Event::Text(tok.text));
        self.close("operator");
        Ok(())
    }

    /// Marks up a bare keyword token as `<modifier>` (storage/access
    /// qualifiers, gated on `Options::MODIFIER`) or `<literal>` (the
    /// `true`/`false`/`null`/`nullptr` keywords, gated on
    /// `Options::LITERAL`); returns `false` (consuming nothing) for any
    /// other keyword.
    fn try_emit_keyword_markup(&mut self) -> Result<bool, ParseError> {
        let Some(tok) = self.peek(0)?.cloned() else { return Ok(false) };
        if tok.kind != TokenKind::Keyword {
            return Ok(false);
        }
        if self.options.contains(Options::MODIFIER) && MODIFIER_KEYWORDS.contains(&tok.text) {
            self.bump()?;
            self.open("modifier", Vec::new());
            self.pending_events.push_back(Event::Text(tok.text));
            self.close("modifier");
            return Ok(true);
        }
        if self.options.contains(Options::LITERAL) {
            let literal_type = if BOOLEAN_LITERAL_KEYWORDS.contains(&tok.text) {
                Some("boolean")
            } else if NULL_LITERAL_KEYWORDS.contains(&tok.text) {
                Some("null")
            } else {
                None
            };
            if let Some(ty) = literal_type {
                self.bump()?;
                self.open("literal", vec![("type".to_string(), ty.to_string())]);
                self.pending_events.push_back(Event::Text(tok.text));
                self.close("literal");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Recognises a C++ template/generic argument list opened by `<`,
    /// via bounded look-ahead (`lex::looks_like_template_open`), and
    /// marks it up as an `argument_list` spanning the matching `>`;
    /// returns `false` (consuming nothing) if the look-ahead doesn't
    /// resolve to a template open, including for every non-C++ language.
    fn try_emit_template_args(&mut self) -> Result<bool, ParseError> {
        if !matches!(self.language, Language::Cxx | Language::Cxx0x) {
            return Ok(false);
        }
        let Some(tok) = self.peek(0)?.cloned() else { return Ok(false) };
        if tok.text != "<" {
            return Ok(false);
        }
        let rest = self.lexer.slice(Span::new(tok.span.end, self.lexer.source_len()));
        if !lex::looks_like_template_open(rest) {
            return Ok(false);
        }

        self.mode.push(Mode::IN_TEMPLATE_ARG_LIST);
        self.mode.top_mut().push_rule(RuleId::Template);

        self.open("argument_list", Vec::new());
        let open_tok = self.bump()?.expect("validated by peek above");
        self.pending_events.push_back(Event::Text(open_tok.text));

        let mut depth = 1i32;
        loop {
            let Some(next) = self.peek(0)?.cloned() else { break };
            if next.text == "<" {
                depth += 1;
            } else if next.text == ">" {
                depth -= 1;
                if depth == 0 {
                    let closing = self.bump()?.expect("peeked above");
                    self.pending_events.push_back(Event::Text(closing.text));
                    break;
                }
            }
            let consumed = self.bump()?.expect("peeked above");
            self.pending_events.push_back(Event::Text(consumed.text));
        }
        self.close("argument_list");

        self.mode
            .top_mut()
            .pop_rule()
            .map_err(|_| ParseError::InvariantViolation("template rule stack underflow".to_string()))?;
        self.mode
            .pop()
            .map_err(|_| ParseError::InvariantViolation("mode stack underflow after template argument list".to_string()))?;

        Ok(true)
    }
}

fn preprocessor_keyword(text: &str) -> &'static str {
    let rest = text.trim_start_matches('#').trim_start();
    let word: String = rest.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    match word.as_str() {
        "if" => "if",
        "ifdef" => "ifdef",
        "ifndef" => "ifndef",
        "elif" => "elif",
        "else" => "else",
        "endif" => "endif",
        "define" => "define",
        "undef" => "undef",
        "include" => "include",
        "pragma" => "pragma",
        "error" => "error",
        "line" => "line",
        _ => "unknown",
    }
}

fn cpp_element_for(keyword: &str) -> &'static str {
    match keyword {
        "if" | "elif" => "cpp:if",
        "ifdef" | "ifndef" => "cpp:ifdef",
        "else" => "cpp:else",
        "endif" => "cpp:endif",
        "define" => "cpp:define",
        "include" => "cpp:include",
        "pragma" => "cpp:pragma",
        _ => "cpp:macro",
    }
}

fn is_if_zero(text: &str) -> bool {
    let rest = text.trim_start_matches('#').trim_start();
    let rest = rest.strip_prefix("if").unwrap_or(rest);
    rest.trim() == "0"
}

/// Parses `source` end to end and collects every [`Event`], for callers
/// that don't need the streaming suspend/resume interface directly.
///
/// # Errors
///
/// Propagates any [`ParseError`] from the underlying [`Parser`].
pub fn parse_unit(source: &str, language: Language, options: &Options) -> Result<Vec<Event<'_>>, ParseError> {
    let mut parser = Parser::new(source, language, *options);
    let mut events = Vec::new();
    while let Some(event) = parser.next_event()? {
        events.push(event);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(events: &[Event<'_>]) -> String {
        events
            .iter()
            .filter_map(|e| match e {
                Event::Text(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn simple_declaration_tree() {
        let events = parse_unit("int x;", Language::C, &Options::default()).unwrap();
        let expected = vec![
            Event::StartElement { name: "decl_stmt", attrs: vec![] },
            Event::StartElement { name: "decl", attrs: vec![] },
            Event::StartElement { name: "type", attrs: vec![] },
            Event::StartElement { name: "name", attrs: vec![] },
            Event::Text("int"),
            Event::EndElement { name: "name" },
            Event::EndElement { name: "type" },
            Event::Text(" "),
            Event::StartElement { name: "name", attrs: vec![] },
            Event::Text("x"),
            Event::EndElement { name: "name" },
            Event::EndElement { name: "decl" },
            Event::Text(";"),
            Event::EndElement { name: "decl_stmt" },
        ];
        assert_eq!(events, expected);
    }

    #[test]
    fn line_comment_tree() {
        let events = parse_unit("// hi\n", Language::C, &Options::default()).unwrap();
        let expected = vec![
            Event::StartElement { name: "comment", attrs: vec![("type".to_string(), "line".to_string())] },
            Event::Text("// hi"),
            Event::EndElement { name: "comment" },
            Event::Text("\n"),
        ];
        assert_eq!(events, expected);
    }

    #[test]
    fn if_zero_body_is_single_text_event_by_default() {
        let events = parse_unit("#if 0\nfoo\n#endif\n", Language::C, &Options::default()).unwrap();
        let expected = vec![
            Event::StartElement { name: "cpp:if", attrs: vec![] },
            Event::Text("#if 0"),
            Event::EndElement { name: "cpp:if" },
            Event::Text("\nfoo\n"),
            Event::StartElement { name: "cpp:endif", attrs: vec![] },
            Event::Text("#endif"),
            Event::EndElement { name: "cpp:endif" },
            Event::Text("\n"),
        ];
        assert_eq!(events, expected);
    }

    #[test]
    fn round_trip_identity_holds_for_mixed_source() {
        let source = "int x;\n// hi\n#if 0\nfoo\n#endif\nint y;\n";
        let events = parse_unit(source, Language::C, &Options::default()).unwrap();
        assert_eq!(reconstruct(&events), source);
    }

    #[test]
    fn empty_source_has_no_events() {
        let events = parse_unit("", Language::C, &Options::default()).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn unrecognised_construct_still_round_trips() {
        let source = "foo(1, 2);\n";
        let events = parse_unit(source, Language::C, &Options::default()).unwrap();
        assert_eq!(reconstruct(&events), source);
    }

    #[test]
    fn start_and_end_elements_are_balanced() {
        let source = "int x;\n// hi\nint y;\n";
        let events = parse_unit(source, Language::C, &Options::default()).unwrap();
        let mut depth = 0i32;
        for ev in &events {
            match ev {
                Event::StartElement { .. } => depth += 1,
                Event::EndElement { .. } => depth -= 1,
                _ => {}
            }
            assert!(depth >= 0);
        }
        assert_eq!(depth, 0);
    }

    #[test]
    fn cancellation_surfaces_after_at_least_one_event() {
        let token = CancellationToken::new();
        let mut parser = Parser::with_macros("int x;\nint y;\n", Language::C, Options::default(), MacroTable::new(), token.clone());
        let first = parser.next_event().unwrap();
        assert!(first.is_some());
        token.cancel();
        let mut saw_cancelled_err = false;
        loop {
            match parser.next_event() {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(ParseError::Cancelled) => {
                    saw_cancelled_err = true;
                    break;
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert!(saw_cancelled_err);
    }
}
