#![cfg(feature = "serde")]
//! Exercises the optional `serde` feature: `Language`/`LanguageMask` round
//! trip through `serde_json`.

use pretty_assertions::assert_eq;
use srcml_core::srcml::Language;
use srcml_core::srcml::lang::LanguageMask;

#[test]
fn language_round_trips_through_json() {
    for language in [Language::C, Language::Cxx0x, Language::Java, Language::AspectJ, Language::CSharp] {
        let json = serde_json::to_string(&language).unwrap();
        let back: Language = serde_json::from_str(&json).unwrap();
        assert_eq!(back, language);
    }
}

#[test]
fn language_mask_round_trips_through_json() {
    let mask = LanguageMask::C.union(LanguageMask::CXX0X);
    let json = serde_json::to_string(&mask).unwrap();
    let back: LanguageMask = serde_json::from_str(&json).unwrap();
    assert_eq!(back, mask);
}
