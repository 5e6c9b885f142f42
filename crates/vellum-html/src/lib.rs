//! HTML tokenizer, streaming front-end, and tree builder for the Vellum
//! renderer.
//!
//! # Scope
//!
//! This crate implements:
//! - **HTML Tokenizer** ([WHATWG § 13.2.5](https://html.spec.whatwg.org/multipage/parsing.html#tokenization))
//!   - Data, RCDATA, RAWTEXT, tag, comment, and DOCTYPE states
//!   - Character reference decoding (named, decimal, hexadecimal)
//!   - Attribute parsing with duplicate removal
//! - **Incremental front-end**: chunked input buffered to the last
//!   unambiguous tag boundary, with single-pass-equivalent token output
//! - **Tree Builder** ([WHATWG § 13.2.6](https://html.spec.whatwg.org/multipage/parsing.html#tree-construction))
//!   - Insertion modes including the table modes, with foster parenting
//!   - Implicit element insertion and implied end tags
//!
//! # Not Implemented
//!
//! - Script-data escape states (script content is plain raw text here)
//! - The adoption agency algorithm for mis-nested formatting elements
//! - Foreign content (SVG/MathML) namespace handling

/// Chunked input buffering in front of the tokenizer.
pub mod incremental;
/// Tokenizer for converting input into tokens.
pub mod tokenizer;
/// Tree construction from the token stream.
pub mod tree_builder;

pub use incremental::IncrementalParser;
pub use tokenizer::{AttrEntry, Token, Tokenizer};
pub use tree_builder::{InsertionMode, ParseIssue, TreeBuilder};
