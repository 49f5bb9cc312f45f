//! The output assembler (C6): consumes an [`Event`] stream and writes
//! well-formed, namespace-correct XML.
//!
//! The flat event stream is first materialized into a small [`XmlNode`]
//! tree so that position attributes (which need an element's *end*
//! position, not yet known when its start tag would otherwise be
//! written) can be computed in one pass, then the tree is serialized
//! recursively.

use std::fmt::Write as _;

use thiserror::Error;

use super::lang::Language;
use super::options::Options;
use super::parse::Event;

/// The default (unprefixed) srcML namespace, holding every core element.
pub const SRC_NS: &str = "http://www.srcML.org/srcML/src";
/// The `cpp:` namespace, holding preprocessor directive markup.
pub const CPP_NS: &str = "http://www.srcML.org/srcML/cpp";
/// The `pos:` namespace, holding `pos:start`/`pos:end` attributes.
pub const POS_NS: &str = "http://www.srcML.org/srcML/position";
/// The `omp:` namespace, holding OpenMP pragma markup.
pub const OMP_NS: &str = "http://www.srcML.org/srcML/openmp";

/// An error raised while assembling output XML.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutputError {
    /// The requested output encoding label is not recognised.
    #[error("unknown output encoding label: {0}")]
    UnknownEncoding(String),
    /// The event stream closed an element that was not the most recently
    /// opened one (a parser bug, not a malformed-input condition).
    #[error("unbalanced element stream: tried to close {attempted:?} but {open:?} was open")]
    UnbalancedElements {
        /// The name the stream tried to close.
        attempted: &'static str,
        /// The name that was actually open.
        open: &'static str,
    },
    /// The event stream ended with elements still open.
    #[error("event stream ended with {0:?} still open")]
    UnclosedElements(Vec<&'static str>),
}

/// Unit-level metadata attributes, written in the stable order: language,
/// filename, directory, version, timestamp, hash, followed by user
/// attributes in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitMetadata {
    /// The `filename` attribute.
    pub filename: Option<String>,
    /// The `dir` attribute.
    pub directory: Option<String>,
    /// The `version` attribute.
    pub version: Option<String>,
    /// The `timestamp` attribute.
    pub timestamp: Option<String>,
    /// User-supplied attributes, in insertion order, written after the
    /// attributes above.
    pub attributes: Vec<(String, String)>,
}

/// A 1-based line/tabstop-expanded-column position, tracked across `Text`
/// events the same way [`super::buffer::CharBuffer`] tracks it across
/// source characters — the output assembler never sees the original
/// buffer, only the text the parser already sliced from it, so position
/// attributes are reconstructed from the `Text` events alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    line: usize,
    col: usize,
}

impl Position {
    const fn start() -> Self {
        Self { line: 1, col: 1 }
    }

    fn advance(&mut self, text: &str, tabstop: usize) {
        for c in text.chars() {
            match c {
                '\n' => {
                    self.line += 1;
                    self.col = 1;
                }
                '\t' => self.col += tabstop - ((self.col - 1) % tabstop),
                _ => self.col += 1,
            }
        }
    }

    fn format(self) -> String {
        format!("{}:{}", self.line, self.col)
    }
}

enum XmlNode<'a> {
    Element {
        name: &'static str,
        attrs: Vec<(String, String)>,
        children: Vec<XmlNode<'a>>,
        start: Position,
        end: Position,
    },
    Text(&'a str),
}

/// Builds the [`XmlNode`] forest for one unit's event stream, tracking
/// position as it goes. Returns an error if elements are unbalanced.
fn build_tree<'a>(events: &[Event<'a>], tabstop: usize) -> Result<Vec<XmlNode<'a>>, OutputError> {
    struct Frame<'a> {
        name: &'static str,
        attrs: Vec<(String, String)>,
        children: Vec<XmlNode<'a>>,
        start: Position,
    }

    let mut pos = Position::start();
    let mut stack: Vec<Frame<'a>> = Vec::new();
    let mut roots: Vec<XmlNode<'a>> = Vec::new();

    for event in events {
        match event {
            Event::StartElement { name, attrs } => {
                stack.push(Frame { name, attrs: attrs.clone(), children: Vec::new(), start: pos });
            }
            Event::EndElement { name } => {
                let frame = stack.pop().ok_or(OutputError::UnbalancedElements { attempted: *name, open: "<none>" })?;
                if frame.name != *name {
                    return Err(OutputError::UnbalancedElements { attempted: *name, open: frame.name });
                }
                let node = XmlNode::Element { name: frame.name, attrs: frame.attrs, children: frame.children, start: frame.start, end: pos };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => roots.push(node),
                }
            }
            Event::Text(text) => {
                pos.advance(text, tabstop);
                let node = XmlNode::Text(text);
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => roots.push(node),
                }
            }
            Event::StartUnit { .. } | Event::EndUnit => {
                // Unit boundaries are framed by the archive layer, not a
                // unit's own content stream; see `super::archive`.
            }
        }
    }

    if let Some(frame) = stack.pop() {
        let mut remaining: Vec<&'static str> = vec![frame.name];
        remaining.extend(stack.iter().map(|f| f.name));
        return Err(OutputError::UnclosedElements(remaining));
    }

    Ok(roots)
}

/// Escapes `&`, `<`, `>` for text content.
fn escape_text(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

/// Escapes `&`, `<`, `"` for attribute values.
fn escape_attr(s: &str, out: &mut String) {
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

fn write_attr(out: &mut String, name: &str, value: &str) {
    let _ = write!(out, " {name}=\"");
    escape_attr(value, out);
    out.push('"');
}

fn write_element(out: &mut String, name: &'static str, attrs: &[(String, String)], children: &[XmlNode<'_>], start: Position, end: Position, position: bool) {
    out.push('<');
    out.push_str(name);
    for (k, v) in attrs {
        write_attr(out, k, v);
    }
    if position {
        write_attr(out, "pos:start", &start.format());
        write_attr(out, "pos:end", &end.format());
    }
    if children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in children {
        write_node(out, child, position);
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn write_node(out: &mut String, node: &XmlNode<'_>, position: bool) {
    match node {
        XmlNode::Element { name, attrs, children, start, end } => write_element(out, name, attrs, children, *start, *end, position),
        XmlNode::Text(text) => escape_text(text, out),
    }
}

/// Returns whether any event in `events` starts an element under the
/// `cpp:` prefix, so the writer only declares the `cpp` namespace when it
/// is actually referenced, unless the language forces it on regardless.
#[must_use]
pub(crate) fn events_reference_cpp(events: &[Event<'_>]) -> bool {
    events.iter().any(|e| matches!(e, Event::StartElement { name, .. } if name.starts_with("cpp:")))
}

/// As [`events_reference_cpp`], for the `omp:` prefix.
#[must_use]
pub(crate) fn events_reference_omp(events: &[Event<'_>]) -> bool {
    events.iter().any(|e| matches!(e, Event::StartElement { name, .. } if name.starts_with("omp:")))
}

/// Builds the ordered list of `xmlns[:prefix]="uri"` declarations the root
/// element should carry: the default (empty-prefix) namespace is
/// always `src`; `cpp` is declared iff the language is in the C family or
/// `cpp_referenced`; `pos` iff the position option is set; `omp` iff the
/// OpenMP option is set and `omp_referenced`.
///
/// Takes plain `bool`s rather than an event slice so a caller re-emitting
/// an already-translated unit verbatim (no parsed [`Event`]s to scan) can
/// still compute the right declarations from its own reference check —
/// see [`namespace_decls_from_refs`].
fn namespace_decls_core(language: Language, cpp_referenced: bool, omp_referenced: bool, options: &Options) -> Vec<(Option<&'static str>, &'static str)> {
    let mut decls = vec![(None, SRC_NS)];
    if !options.contains(Options::NAMESPACE_DECL) {
        return decls;
    }
    if language.is_c_family() || cpp_referenced {
        decls.push((Some("cpp"), CPP_NS));
    }
    if options.contains(Options::POSITION) {
        decls.push((Some("pos"), POS_NS));
    }
    if options.contains(Options::OPENMP) && omp_referenced {
        decls.push((Some("omp"), OMP_NS));
    }
    decls
}

fn namespace_decls(language: Language, events: &[Event<'_>], options: &Options) -> Vec<(Option<&'static str>, &'static str)> {
    namespace_decls_core(language, events_reference_cpp(events), events_reference_omp(events), options)
}

/// As [`namespace_decls`], for a caller ([`super::archive`]'s
/// already-translated-unit pass-through path) that holds a raw srcML
/// body string instead of parsed [`Event`]s. Scans the text for `cpp:`/
/// `omp:` element prefixes rather than walking a tree.
#[must_use]
pub(crate) fn namespace_decls_from_refs(language: Language, body: &str, options: &Options) -> Vec<(Option<&'static str>, &'static str)> {
    namespace_decls_core(language, body.contains("<cpp:"), body.contains("<omp:"), options)
}

/// As [`namespace_decls_from_refs`], for a caller that has already
/// computed whether `cpp:`/`omp:` are referenced across several units
/// (a mix of parsed [`Event`]s and raw pass-through bodies) sharing one
/// archive root, rather than a single body to scan.
#[must_use]
pub(crate) fn namespace_decls_for_refs(language: Language, cpp_referenced: bool, omp_referenced: bool, options: &Options) -> Vec<(Option<&'static str>, &'static str)> {
    namespace_decls_core(language, cpp_referenced, omp_referenced, options)
}

/// The result of assembling one unit's inner XML content (everything
/// between its `<unit>` open and close tags) without the wrapping tag
/// itself, for [`super::archive`] to embed under a shared archive root.
pub(crate) struct InnerXml {
    /// The serialized child elements/text.
    pub xml: String,
    /// The `pos:start` value for the unit element itself.
    pub start: String,
    /// The `pos:end` value for the unit element itself.
    pub end: String,
}

/// Builds `events`' inner XML plus its start/end position strings,
/// without a wrapping `<unit>` tag.
///
/// # Errors
///
/// Returns [`OutputError`] if `events` is not a balanced element stream.
pub(crate) fn assemble_inner(events: &[Event<'_>], tabstop: usize, position: bool) -> Result<InnerXml, OutputError> {
    let tree = build_tree(events, tabstop)?;
    let mut out = String::new();
    for node in &tree {
        write_node(&mut out, node, position);
    }
    let start = Position::start();
    let mut end = start;
    end.advance(&reconstruct_source(events), tabstop);
    Ok(InnerXml { xml: out, start: start.format(), end: end.format() })
}

/// Writes a `<unit ...>` open tag's attributes (not the `<unit`/`>`
/// delimiters themselves), in the stable order: namespace
/// declarations (only when `emit_namespaces`), language, filename,
/// directory, version, timestamp, then user attributes.
pub(crate) fn write_unit_open_tag(
    out: &mut String,
    language: Language,
    meta: Option<&UnitMetadata>,
    decls: &[(Option<&'static str>, &'static str)],
    emit_namespaces: bool,
) {
    out.push_str("<unit");
    if emit_namespaces {
        for (prefix, uri) in decls {
            match prefix {
                None => write_attr(out, "xmlns", uri),
                Some(p) => write_attr(out, &format!("xmlns:{p}"), uri),
            }
        }
    }
    write_attr(out, "language", language.as_str());
    if let Some(meta) = meta {
        if let Some(filename) = &meta.filename {
            write_attr(out, "filename", filename);
        }
        if let Some(dir) = &meta.directory {
            write_attr(out, "dir", dir);
        }
        if let Some(version) = &meta.version {
            write_attr(out, "version", version);
        }
        if let Some(timestamp) = &meta.timestamp {
            write_attr(out, "timestamp", timestamp);
        }
        for (k, v) in &meta.attributes {
            write_attr(out, k, v);
        }
    }
}

/// Concatenates every `Text` event's slice, reconstructing the exact
/// source bytes that produced `events` (the round-trip identity). Used
/// to compute the `hash:` attribute, which is defined over the raw
/// source, not the produced XML.
#[must_use]
pub fn reconstruct_source<'a>(events: &[Event<'a>]) -> String {
    fn walk(events: &[Event<'_>], out: &mut String) {
        for event in events {
            match event {
                Event::Text(t) => out.push_str(t),
                _ => {}
            }
        }
    }
    let mut out = String::new();
    walk(events, &mut out);
    out
}

/// Writes a single unit's `events` as a standalone srcML document: the
/// `<unit>` element IS the document root (no archive wrapper).
///
/// # Errors
///
/// Returns [`OutputError`] if `events` does not represent a well-formed,
/// balanced element stream.
pub fn write_standalone_unit<'a>(events: &[Event<'a>], language: Language, meta: Option<&UnitMetadata>, options: &Options) -> Result<String, OutputError> {
    write_unit(events, language, meta, options, 8)
}

/// As [`write_standalone_unit`], with an explicit tabstop width for
/// position-attribute column computation.
///
/// # Errors
///
/// Returns [`OutputError`] if `events` does not represent a well-formed,
/// balanced element stream.
pub fn write_unit<'a>(events: &[Event<'a>], language: Language, meta: Option<&UnitMetadata>, options: &Options, tabstop: usize) -> Result<String, OutputError> {
    let tree = build_tree(events, tabstop)?;
    let decls = namespace_decls(language, events, options);
    let mut out = String::new();

    if options.contains(Options::XML_DECL) {
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    }

    let fragment = options.contains(Options::FRAGMENT);
    let position = options.contains(Options::POSITION);

    if !fragment {
        write_unit_open_tag(&mut out, language, meta, &decls, options.contains(Options::NAMESPACE_DECL));
        if tree.is_empty() {
            out.push_str("/>");
            return Ok(append_hash_if_needed(out, events, options, language, meta));
        }
        out.push('>');
    }
    for node in &tree {
        write_node(&mut out, node, position);
    }
    if !fragment {
        out.push_str("</unit>");
    }

    Ok(append_hash_if_needed(out, events, options, language, meta))
}

/// Writes an already-translated unit's inner srcML body verbatim as a
/// standalone document, without re-parsing it — the C7/C8 pass-through
/// path for re-emitting a unit copied out of an existing archive.
///
/// `inner` is the unit's inner XML (everything between its original
/// `<unit ...>`/`</unit>` tags, as [`super::archive::ArchiveReader`]
/// yields it), which never carries its own namespace declarations (those
/// were declared once on the archive's root, not on the nested unit).
/// Re-emitting it standalone therefore always prepends fresh `xmlns`
/// declarations on the new root, computed by scanning `inner`'s text for
/// `cpp:`/`omp:` references rather than by walking parsed [`Event`]s.
#[must_use]
pub(crate) fn write_passthrough_unit(inner: &str, language: Language, meta: Option<&UnitMetadata>, options: &Options) -> String {
    let decls = namespace_decls_from_refs(language, inner, options);
    let mut out = String::new();
    if options.contains(Options::XML_DECL) {
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n");
    }
    let fragment = options.contains(Options::FRAGMENT);
    if !fragment {
        write_unit_open_tag(&mut out, language, meta, &decls, options.contains(Options::NAMESPACE_DECL));
        if inner.is_empty() {
            out.push_str("/>");
            return out;
        }
        out.push('>');
    }
    out.push_str(inner);
    if !fragment {
        out.push_str("</unit>");
    }
    out
}

/// The `Options::HASH` obligation computes a hash over the unit's raw
/// source, which the `<unit>` element then carries as a `hash` attribute.
/// Since that attribute must appear on the already-written open tag, we
/// patch it in by re-writing the open tag with the hash included rather
/// than threading a second pass through [`write_unit`] — simpler than
/// computing the hash before any text is known to exist at all.
fn append_hash_if_needed(xml: String, events: &[Event<'_>], options: &Options, language: Language, meta: Option<&UnitMetadata>) -> String {
    if !options.contains(Options::HASH) || options.contains(Options::FRAGMENT) {
        return xml;
    }
    let source = reconstruct_source(events);
    let hash = super::hash::source_hash(&source);
    let marker = format!("language=\"{}\"", language.as_str());
    let Some(idx) = xml.find(&marker) else { return xml };
    let insert_at = idx + marker.len();
    let mut with_hash = String::with_capacity(xml.len() + hash.len() + 16);
    with_hash.push_str(&xml[..insert_at]);
    write_attr(&mut with_hash, "hash", &hash);
    with_hash.push_str(&xml[insert_at..]);
    let _ = meta;
    with_hash
}

/// Converts `xml` (always produced as UTF-8 internally) to the configured
/// output encoding, replacing any character the target encoding cannot
/// represent with a numeric character reference (`&#NNNN;`).
///
/// # Errors
///
/// Returns [`OutputError::UnknownEncoding`] if `encoding_label` is not
/// recognised by the underlying codec registry.
pub fn encode_output(xml: &str, encoding_label: Option<&str>) -> Result<Vec<u8>, OutputError> {
    let Some(label) = encoding_label else {
        return Ok(xml.as_bytes().to_vec());
    };
    let encoding = encoding_rs::Encoding::for_label(label.as_bytes()).ok_or_else(|| OutputError::UnknownEncoding(label.to_string()))?;
    if encoding == encoding_rs::UTF_8 {
        return Ok(xml.as_bytes().to_vec());
    }
    let mut encoder = encoding.new_encoder();
    let mut out = Vec::with_capacity(xml.len());
    let mut rest = xml;
    loop {
        let mut buf = [0u8; 4096];
        let (result, read, written, _) = encoder.encode_from_utf8(rest, &mut buf, true);
        out.extend_from_slice(&buf[..written]);
        rest = &rest[read..];
        match result {
            encoding_rs::CoderResult::InputEmpty => break,
            encoding_rs::CoderResult::OutputFull => continue,
        }
    }
    Ok(numeric_ref_fallback(xml, &out, encoding))
}

/// `encoding_rs` silently substitutes a numeric character reference for
/// unmappable characters only when asked to via `encode_from_utf8` with
/// escaping; the stable API instead substitutes `?` or drops bytes
/// depending on encoding. To guarantee a numeric character reference is
/// emitted regardless of which encoding is picked, we detect
/// characters outside the encoding's round-trip and patch them in a
/// second, character-at-a-time pass only when the bulk encode above
/// reported replacement was necessary.
fn numeric_ref_fallback(xml: &str, bulk_encoded: &[u8], encoding: &'static encoding_rs::Encoding) -> Vec<u8> {
    let (decoded_back, _, had_errors) = encoding.decode(bulk_encoded);
    if !had_errors && decoded_back == xml {
        return bulk_encoded.to_vec();
    }
    let mut out = Vec::with_capacity(xml.len());
    for c in xml.chars() {
        let mut single = [0u8; 4];
        let s = c.encode_utf8(&mut single);
        let mut encoder = encoding.new_encoder();
        let mut buf = [0u8; 8];
        let (result, _, written, had_err) = encoder.encode_from_utf8(s, &mut buf, true);
        debug_assert_eq!(result, encoding_rs::CoderResult::InputEmpty);
        if had_err {
            out.extend_from_slice(format!("&#{};", c as u32).as_bytes());
        } else {
            out.extend_from_slice(&buf[..written]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::srcml::parse::parse_unit;

    fn events_for(source: &str, language: Language) -> Vec<Event<'_>> {
        parse_unit(source, language, &Options::default()).unwrap()
    }

    #[test]
    fn empty_source_is_self_closing_unit() {
        let events = events_for("", Language::C);
        let xml = write_standalone_unit(&events, Language::C, None, &Options::default()).unwrap();
        assert!(xml.contains("<unit"));
        assert!(xml.ends_with("/>"));
        assert!(xml.contains("language=\"C\""));
    }

    #[test]
    fn simple_declaration_round_trips_through_xml_text() {
        let source = "int x;";
        let events = events_for(source, Language::C);
        let xml = write_standalone_unit(&events, Language::C, None, &Options::default()).unwrap();
        assert_eq!(xml, "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<unit xmlns=\"http://www.srcML.org/srcML/src\" xmlns:cpp=\"http://www.srcML.org/srcML/cpp\" language=\"C\"><decl_stmt><decl><type><name>int</name></type> <name>x</name></decl>;</decl_stmt></unit>");
    }

    #[test]
    fn ampersand_and_angle_brackets_are_escaped_in_text() {
        let source = "foo(a<b && c>d);\n";
        let events = events_for(source, Language::C);
        let xml = write_standalone_unit(&events, Language::C, None, &Options::default()).unwrap();
        assert!(xml.contains("a&lt;b &amp;&amp; c&gt;d"));
    }

    #[test]
    fn position_attributes_present_when_option_set() {
        let source = "int x;";
        let events = events_for(source, Language::C);
        let options = Options::default().union(Options::POSITION);
        let xml = write_standalone_unit(&events, Language::C, None, &options).unwrap();
        assert!(xml.contains("pos:start=\"1:1\""));
        assert!(xml.contains("xmlns:pos=\"http://www.srcML.org/srcML/position\""));
    }

    #[test]
    fn hash_attribute_present_when_option_set() {
        let source = "int x;";
        let events = events_for(source, Language::C);
        let options = Options::default().union(Options::HASH);
        let xml = write_standalone_unit(&events, Language::C, None, &options).unwrap();
        assert!(xml.contains(&format!("hash=\"{}\"", super::super::hash::source_hash(source))));
    }

    #[test]
    fn unit_metadata_attributes_are_ordered() {
        let events = events_for("int x;", Language::C);
        let meta = UnitMetadata {
            filename: Some("a.c".to_string()),
            directory: Some("src".to_string()),
            version: Some("1.0".to_string()),
            timestamp: None,
            attributes: vec![("custom".to_string(), "value".to_string())],
        };
        let xml = write_standalone_unit(&events, Language::C, Some(&meta), &Options::default()).unwrap();
        let lang_idx = xml.find("language=").unwrap();
        let file_idx = xml.find("filename=").unwrap();
        let dir_idx = xml.find("dir=").unwrap();
        let version_idx = xml.find("version=").unwrap();
        let custom_idx = xml.find("custom=").unwrap();
        assert!(lang_idx < file_idx);
        assert!(file_idx < dir_idx);
        assert!(dir_idx < version_idx);
        assert!(version_idx < custom_idx);
    }

    #[test]
    fn cpp_namespace_declared_for_c_family_even_without_preprocessor_text() {
        let events = events_for("int x;", Language::C);
        let xml = write_standalone_unit(&events, Language::C, None, &Options::default()).unwrap();
        assert!(xml.contains("xmlns:cpp="));
    }

    #[test]
    fn fragment_option_omits_unit_wrapper() {
        let events = events_for("int x;", Language::C);
        let options = Options::default().union(Options::FRAGMENT);
        let xml = write_standalone_unit(&events, Language::C, None, &options).unwrap();
        assert!(!xml.contains("<unit"));
        assert!(xml.contains("<decl_stmt>"));
    }

    #[test]
    fn encode_output_round_trips_utf8_by_default() {
        let bytes = encode_output("<unit>héllo</unit>", None).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "<unit>héllo</unit>");
    }

    #[test]
    fn encode_output_rejects_unknown_label() {
        let err = encode_output("x", Some("not-a-real-encoding")).unwrap_err();
        assert!(matches!(err, OutputError::UnknownEncoding(_)));
    }

    #[test]
    fn reconstruct_source_yields_original_bytes() {
        let source = "int x;\n// hi\n";
        let events = events_for(source, Language::C);
        assert_eq!(reconstruct_source(&events), source);
    }
}
