//! End-to-end scenarios exercising the public `translate_unit`/`Archive`
//! surface the way a driver would call it.

use srcml_core::srcml::archive::{Archive, ArchiveReader, ReaderEvent, Unit};
use srcml_core::srcml::{Language, Options, translate_unit};

#[test]
fn simple_declaration_translates_to_expected_tree() {
    let xml = translate_unit("int x;", Language::C, &Options::default()).unwrap();
    assert!(xml.ends_with("<unit xmlns=\"http://www.srcML.org/srcML/src\" xmlns:cpp=\"http://www.srcML.org/srcML/cpp\" language=\"C\"><decl_stmt><decl><type><name>int</name></type> <name>x</name></decl>;</decl_stmt></unit>"));
}

#[test]
fn line_comment_translates_to_comment_element() {
    let xml = translate_unit("// hi\n", Language::C, &Options::default()).unwrap();
    assert!(xml.contains("<comment type=\"line\">// hi</comment>\n"));
}

#[test]
fn if_zero_default_is_text_bodied() {
    let xml = translate_unit("#if 0\nfoo\n#endif\n", Language::C, &Options::default()).unwrap();
    assert!(xml.contains("<cpp:if>#if 0</cpp:if>\nfoo\n<cpp:endif>#endif</cpp:endif>\n"));
}

#[test]
fn archive_of_two_files_wraps_each_with_its_filename() {
    let mut archive = Archive::new();
    archive.set_options(Options::default().union(Options::ARCHIVE));
    archive.open_write().unwrap();
    archive.add_unit_from_source(Unit::from_source(Language::Cxx0x, "int a;").with_filename("a.cpp")).unwrap();
    archive.add_unit_from_source(Unit::from_source(Language::Cxx0x, "int b;").with_filename("b.cpp")).unwrap();
    let xml = archive.write_all().unwrap();

    assert!(xml.starts_with("<?xml"));
    let a_idx = xml.find("filename=\"a.cpp\"").expect("a.cpp unit present");
    let b_idx = xml.find("filename=\"b.cpp\"").expect("b.cpp unit present");
    assert!(a_idx < b_idx);
    assert_eq!(xml.matches("<decl_stmt>").count(), 2);
    assert!(xml.trim_end().ends_with("</unit>"));
}

#[test]
fn reading_an_archive_back_enumerates_units_in_write_order_then_ends() {
    let mut archive = Archive::new();
    archive.set_options(Options::default().union(Options::ARCHIVE));
    archive.open_write().unwrap();
    archive.add_unit_from_source(Unit::from_source(Language::Cxx0x, "int a;").with_filename("a.cpp")).unwrap();
    archive.add_unit_from_source(Unit::from_source(Language::Cxx0x, "int b;").with_filename("b.cpp")).unwrap();
    let xml = archive.write_all().unwrap();

    let mut reader = ArchiveReader::new(&xml);
    let root = reader.next_event().unwrap().unwrap();
    assert!(matches!(root, ReaderEvent::RootStart { .. }));

    let first_start = reader.next_event().unwrap().unwrap();
    let ReaderEvent::UnitStart { attrs } = first_start else { panic!("expected unit start") };
    assert!(attrs.iter().any(|(k, v)| k == "filename" && v == "a.cpp"));
    let _ = reader.next_event().unwrap().unwrap(); // body

    let second_start = reader.next_event().unwrap().unwrap();
    let ReaderEvent::UnitStart { attrs } = second_start else { panic!("expected unit start") };
    assert!(attrs.iter().any(|(k, v)| k == "filename" && v == "b.cpp"));
    let _ = reader.next_event().unwrap().unwrap(); // body

    let end = reader.next_event().unwrap().unwrap();
    assert_eq!(end, ReaderEvent::End);
}

#[test]
fn translating_twice_is_idempotent() {
    let first = translate_unit("int x;", Language::C, &Options::default()).unwrap();
    let second = translate_unit("int x;", Language::C, &Options::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn empty_source_is_a_self_closing_unit_with_only_language_attribute() {
    let xml = translate_unit("", Language::C, &Options::default()).unwrap();
    assert!(xml.contains("<unit"));
    assert!(xml.trim_end().ends_with("/>"));
    assert!(!xml.contains("filename"));
}

#[test]
fn angle_brackets_and_ampersands_are_escaped() {
    let xml = translate_unit("foo(a<b && c>d);\n", Language::C, &Options::default()).unwrap();
    assert!(xml.contains("a&lt;b &amp;&amp; c&gt;d"));
    assert!(!xml.contains("a<b"));
}

#[test]
fn round_trip_identity_holds_across_fixture_files() {
    for (name, language) in [
        ("hello.c", Language::C),
        ("sample.cpp", Language::Cxx0x),
        ("Sample.java", Language::Java),
        ("Sample.cs", Language::CSharp),
    ] {
        let path = format!("tests/fixtures/srcml/{name}");
        let source = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("reading {path}: {e}"));
        let events = srcml_core::srcml::parse::parse_unit(&source, language, &Options::default()).unwrap();
        let reconstructed = srcml_core::srcml::output::reconstruct_source(&events);
        assert_eq!(reconstructed, source, "round-trip mismatch for {name}");
    }
}

#[test]
fn position_option_produces_pos_start_at_one_one() {
    let options = Options::default().union(Options::POSITION);
    let xml = translate_unit("int x;", Language::C, &options).unwrap();
    assert!(xml.contains("pos:start=\"1:1\""));
}

#[test]
fn single_unit_mode_rejects_a_second_added_unit() {
    let mut archive = Archive::new();
    archive.open_write().unwrap();
    archive.add_unit_from_source(Unit::from_source(Language::C, "int a;")).unwrap();
    archive.add_unit_from_source(Unit::from_source(Language::C, "int b;")).unwrap();
    assert!(archive.write_all().is_err());
}
