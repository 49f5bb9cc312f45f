//! srcML: a lossless translator between source code (C, C++, Java, AspectJ,
//! C#) and the srcML XML representation.
//!
//! srcML marks up every syntactic construct of the source while preserving
//! every original character — whitespace, comments, preprocessor directives
//! — verbatim, so that `source -> srcML -> source` is byte-identical.
//!
//! # Usage
//!
//! ```
//! use srcml_core::srcml::{Options, lang::Language, translate_unit};
//!
//! let xml = translate_unit("int x;", Language::C, &Options::default()).unwrap();
//! assert!(xml.starts_with("<unit"));
//! ```
//!
//! This crate implements the translator pipeline only: the streaming
//! lexer/parser engine and the XML output assembler, plus the multi-unit
//! archive framing and reader. The command-line driver, filesystem
//! traversal, compressed-archive I/O and XPath/XSLT/RelaxNG
//! transformations are out of scope; see [`srcml::archive`] for the
//! contract boundary a driver is expected to call through.

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod srcml;

pub use srcml::{SrcmlError, archive, buffer, detect, lex, mode, output, parse};
