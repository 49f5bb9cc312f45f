//! Fancy diagnostics support using `ariadne`, gated behind the
//! `diagnostics` feature.
//!
//! Every byte-range-bearing error this crate's lexer and parser raise can
//! be converted to a labelled `ariadne::Report` anchored at the source
//! range it occurred in.

#[cfg(feature = "diagnostics")]
use ariadne::{Color, Label, Report, ReportKind, Source};

use super::lex::LexWarning;
use super::parse::ParseError;

/// A source file's name and text, bundled for `ariadne` row/column
/// calculation from byte offsets.
pub struct SimpleSource<'a> {
    name: &'a str,
    text: &'a str,
}

impl<'a> SimpleSource<'a> {
    /// Builds a source container from a display name and the full text it
    /// refers to.
    #[must_use]
    pub const fn new(name: &'a str, text: &'a str) -> Self {
        Self { name, text }
    }

    /// The source text.
    #[must_use]
    pub const fn text(&self) -> &'a str {
        self.text
    }

    /// The display name (typically a filename).
    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }
}

/// Converts a translator error into an `ariadne::Report`, anchored at the
/// byte range the error occurred at.
#[cfg(feature = "diagnostics")]
pub trait ToAriadne {
    /// Builds the report. `src` supplies the filename `ariadne` displays
    /// and the text it slices for context lines.
    fn to_report<'a>(&self, src: &SimpleSource<'a>) -> Report<'a, (String, std::ops::Range<usize>)>;
}

/// Builds a single-label `ariadne::Report`, reducing duplication across
/// [`ToAriadne`] implementations.
#[cfg(feature = "diagnostics")]
#[must_use]
pub fn build_report<'a>(
    src: &SimpleSource<'a>,
    kind: ReportKind<'a>,
    range: std::ops::Range<usize>,
    title: &str,
    label_message: impl ToString,
    color: Color,
) -> Report<'a, (String, std::ops::Range<usize>)> {
    let filename = src.name().to_string();
    let range = clamp_range(range, src.text().len());
    Report::build(kind, (filename.clone(), range.clone()))
        .with_message(title)
        .with_label(Label::new((filename, range)).with_message(label_message.to_string()).with_color(color))
        .finish()
}

fn clamp_range(range: std::ops::Range<usize>, len: usize) -> std::ops::Range<usize> {
    let start = range.start.min(len);
    let end = range.end.max(start).min(len);
    start..end
}

#[cfg(feature = "diagnostics")]
impl ToAriadne for LexWarning {
    fn to_report<'a>(&self, src: &SimpleSource<'a>) -> Report<'a, (String, std::ops::Range<usize>)> {
        let (range, message): (std::ops::Range<usize>, String) = match self {
            Self::UnterminatedBlockComment(start) => (*start..start + 2, "unterminated block comment".to_string()),
            Self::UnterminatedLiteral { kind, start } => (*start..start + 1, format!("unterminated {kind} literal")),
            Self::UnterminatedRawString(start) => (*start..start + 1, "unterminated raw string".to_string()),
            Self::MalformedLineDirective(start) => (*start..start + 1, "malformed #line directive".to_string()),
        };
        build_report(src, ReportKind::Warning, range, "Lex warning", message, Color::Yellow)
    }
}

#[cfg(feature = "diagnostics")]
impl ToAriadne for ParseError {
    fn to_report<'a>(&self, src: &SimpleSource<'a>) -> Report<'a, (String, std::ops::Range<usize>)> {
        match self {
            Self::Lex(lex) => lex.to_report(src),
            Self::InvariantViolation(msg) => build_report(src, ReportKind::Error, 0..0, "Parse error", msg, Color::Red),
            Self::Cancelled => build_report(src, ReportKind::Error, 0..0, "Parse error", "translation cancelled", Color::Red),
        }
    }
}

/// Renders every lex warning encountered while tokenizing `source` to
/// stderr, for a host that wants a one-call convenience path rather than
/// handling [`ToAriadne`] itself.
#[cfg(feature = "diagnostics")]
pub fn emit_lex_warnings<'a>(name: &'a str, source: &'a str, warnings: impl IntoIterator<Item = &'a LexWarning>) {
    let simple = SimpleSource::new(name, source);
    let ariadne_source = Source::from(source);
    for w in warnings {
        let report = w.to_report(&simple);
        let _ = report.print((name.to_string(), ariadne_source.clone()));
    }
}

/// As [`emit_lex_warnings`], for parse errors.
#[cfg(feature = "diagnostics")]
pub fn emit_parse_errors<'a>(name: &'a str, source: &'a str, errors: impl IntoIterator<Item = &'a ParseError>) {
    let simple = SimpleSource::new(name, source);
    let ariadne_source = Source::from(source);
    for e in errors {
        let report = e.to_report(&simple);
        let _ = report.print((name.to_string(), ariadne_source.clone()));
    }
}

/// Collects reports without printing, for tests that want to assert
/// diagnostics can be built without producing terminal output.
#[cfg(feature = "diagnostics")]
#[must_use]
pub fn collect_reports<'a, E: ToAriadne>(name: &'a str, source: &'a str, errors: impl IntoIterator<Item = &'a E>) -> Vec<Report<'a, (String, std::ops::Range<usize>)>> {
    let simple = SimpleSource::new(name, source);
    errors.into_iter().map(|e| e.to_report(&simple)).collect()
}
