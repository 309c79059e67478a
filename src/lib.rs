//! markpull
//!
//! A pull tokenizer for lenient HTML/XML-like markup. One call, one
//! element: the caller drives the parse and decides what to do with each
//! tag, text run, comment, CDATA section, doctype or processing
//! instruction as it arrives, in document order.
//!
//! What this crate deliberately is not: a DOM builder, a validator, or
//! an entity expander. Documents are taken as they come. Unknown tags,
//! stray attribute junk and embedded brackets in quoted values all pass
//! through; only structurally hopeless input (an unclosed tag, a
//! duplicated attribute, an empty `<>`) stops the parse, with the line
//! and column of the offense.
//!
//! Typical use:
//!
//! - [`Tokenizer::new`] over a `&str`, then [`Tokenizer::next_element`]
//!   in a loop (or the `Iterator` impl, which stops at end of input)
//! - [`decode`] first when starting from raw bytes, then
//!   [`Tokenizer::from_decoded`]
//! - [`Tokenizer::next_tag`] when only tags matter
//! - [`parse_elements`] to tokenize a whole document in one call
//!
//! Every element keeps the exact input span it consumed, so the
//! concatenation of all raw spans reproduces the document.

pub mod element;
pub mod encoding;
pub mod error;
pub mod grammar;
pub mod source;
pub mod tokenizer;

pub use element::{Attribute, Attributes, Element, Tag, TagKind};
pub use encoding::{decode, DecodeError, DecodedDocument};
pub use error::{ParseError, Position};
pub use source::Source;
pub use tokenizer::{parse_elements, Tokenizer};
