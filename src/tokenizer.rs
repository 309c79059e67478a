//! Pull Tokenizer
//!
//! A single forward pass over lenient HTML/XML-like markup, one element
//! per step. No DOM, no validation, no entity expansion: tags, text,
//! comments, CDATA, doctypes and processing instructions come out in
//! document order, each carrying the exact span of input it consumed.
//!
//! Brackets inside quoted attribute values do not end a tag, `<script>`
//! and `<style>` bodies are skipped as raw text, and IE conditional
//! comments are split so the markup between the halves is tokenized
//! normally.
//!
//! The first error latches: every later call reports it again.

use crate::element::{Attributes, Element, Tag, TagKind};
use crate::encoding::DecodedDocument;
use crate::error::{ParseError, Position};
use crate::grammar;
use crate::source::Source;

/// Pull-style tokenizer over a decoded document.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    source: Source<'a>,
    /// Raw-text element whose body the next step must skip over.
    skip_until: Option<&'static str>,
    doctype: Option<&'a str>,
    encoding: Option<&'a str>,
    xml_declaration: Option<&'a str>,
    poisoned: Option<ParseError>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(text: &'a str) -> Self {
        Tokenizer {
            source: Source::new(text),
            skip_until: None,
            doctype: None,
            encoding: None,
            xml_declaration: None,
            poisoned: None,
        }
    }

    /// Tokenize a document that came through the byte front-end. The
    /// encoding name and any `<?xml ...?>` declaration found there are
    /// republished by the accessors here.
    pub fn from_decoded(document: &'a DecodedDocument) -> Self {
        let mut tokenizer = Tokenizer::new(document.text());
        tokenizer.encoding = Some(document.encoding());
        tokenizer.xml_declaration = document.xml_declaration();
        tokenizer
    }

    /// Interior of the most recent `<!DOCTYPE ...>` seen; last one wins.
    #[inline]
    pub fn doctype(&self) -> Option<&'a str> {
        self.doctype
    }

    /// Encoding of the decoded input, when the byte front-end was used.
    #[inline]
    pub fn encoding(&self) -> Option<&str> {
        self.encoding
    }

    /// `<?xml ...?>` declaration of the decoded input, when present.
    #[inline]
    pub fn xml_declaration(&self) -> Option<&str> {
        self.xml_declaration
    }

    /// Current cursor offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.source.position()
    }

    /// Re-slice any span of the document, typically one already parsed.
    pub fn input(&self, from: usize, to: usize) -> Result<&'a str, ParseError> {
        self.source.substring(from, to)
    }

    /// Drop the position marker at the current cursor.
    pub fn set_position_marker(&mut self) {
        let result = self.source.set_position_marker(self.source.position());
        debug_assert!(result.is_ok());
    }

    /// Drop the position marker at an arbitrary offset.
    pub fn set_position_marker_at(&mut self, pos: usize) -> Result<(), ParseError> {
        self.source.set_position_marker(pos)
    }

    /// Document text from the marker up to `to`.
    pub fn input_from_position_marker(&self, to: usize) -> Result<&'a str, ParseError> {
        self.source.substring_from_marker(to)
    }

    /// Advance one step and return what was found.
    ///
    /// Past the end of input every call returns [`Element::End`]. After
    /// an error every call returns that same error.
    pub fn next_element(&mut self) -> Result<Element<'a>, ParseError> {
        if let Some(err) = &self.poisoned {
            return Err(err.clone());
        }
        match self.step() {
            Ok(element) => {
                log::trace!(target: "markpull.tokenizer", "emit element: {element:?}");
                Ok(element)
            }
            Err(err) => {
                log::debug!(target: "markpull.tokenizer", "parse failed: {err}");
                self.poisoned = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Step until the next ordinary tag, swallowing everything else.
    /// `Ok(None)` once the input is exhausted.
    pub fn next_tag(&mut self) -> Result<Option<Tag<'a>>, ParseError> {
        loop {
            match self.next_element()? {
                Element::Tag(tag) => return Ok(Some(tag)),
                Element::End => return Ok(None),
                _ => {}
            }
        }
    }

    fn step(&mut self) -> Result<Element<'a>, ParseError> {
        let pos = self.source.position();
        if pos >= self.source.len() {
            return Ok(Element::End);
        }

        if let Some(name) = self.skip_until {
            return self.skip_raw_text(name);
        }

        // text run up to the next tag; the cursor lands exactly on `<`
        let Some(open) = self.source.find_char('<', pos) else {
            let raw = self.source.substring_to_end(pos)?;
            self.source.set_position(self.source.len());
            return Ok(Element::Text { raw });
        };
        if open != pos {
            let raw = self.source.substring(pos, open)?;
            self.source.set_position(open);
            return Ok(Element::Text { raw });
        }

        // close-bracket policy: bang and question constructs may carry
        // apostrophes in prose, so they get a plain scan; ordinary tags
        // get the quote-aware scan so `>` in a value does not end them
        let close = match self.source.byte_at(open + 1) {
            Some(b'!') | Some(b'?') => self.source.find_char('>', open + 1),
            _ => self.source.find_close_bracket(open + 1),
        }
        .ok_or_else(|| ParseError::NoMatchingCloseBracket {
            position: self.position_of(open),
        })?;

        let interior = self.source.substring(open + 1, close)?;
        if interior.is_empty() {
            return Err(ParseError::EmptyTag {
                position: self.position_of(open),
            });
        }

        let first = interior.as_bytes()[0];
        if first == b'!' || first == b'?' {
            return self.special_tag(interior, open, close);
        }
        self.ordinary_tag(interior, open, close)
    }

    fn ordinary_tag(
        &mut self,
        interior: &'a str,
        open: usize,
        close: usize,
    ) -> Result<Element<'a>, ParseError> {
        let mut kind = TagKind::Open;
        let mut text = interior;
        if let Some(stripped) = interior.strip_suffix('/') {
            kind = TagKind::OpenClose;
            text = stripped;
        } else if let Some(stripped) = interior.strip_prefix('/') {
            kind = TagKind::Close;
            text = stripped;
        } else if let Some(name) = raw_text_element(interior) {
            // script and style bodies are not markup; the next step
            // skips to the matching end tag
            self.skip_until = Some(name);
        }

        let (line, column) = self.source.line_and_column_at(open);
        let (name, namespace, attributes) = self.tag_interior(text, open)?;
        let raw = self.source.substring(open, close + 1)?;
        self.source.set_position(close + 1);
        Ok(Element::Tag(Tag {
            name,
            namespace,
            kind,
            attributes,
            raw,
            offset: open,
            length: raw.len(),
            line,
            column,
        }))
    }

    /// Name and attribute list of a tag interior, kind markers already
    /// stripped.
    fn tag_interior(
        &self,
        text: &'a str,
        open: usize,
    ) -> Result<(&'a str, Option<&'a str>, Attributes<'a>), ParseError> {
        let Some(name) = grammar::match_tag_name(text) else {
            return Err(ParseError::MalformedTag {
                position: self.position_of(open),
            });
        };
        let mut attributes = Attributes::new();
        let mut pos = name.end;
        while pos < text.len() {
            let Some(found) = grammar::match_attribute(text, pos) else {
                break;
            };
            let value = grammar::strip_quotes(found.raw_value.unwrap_or("")).trim();
            if !attributes.insert(found.key, value) {
                return Err(ParseError::DuplicateAttribute {
                    key: found.key.to_string(),
                    position: self.position_of(open),
                });
            }
            pos = found.end;
        }
        Ok((name.name, name.namespace, attributes))
    }

    fn special_tag(
        &mut self,
        interior: &'a str,
        open: usize,
        close: usize,
    ) -> Result<Element<'a>, ParseError> {
        // comments close at the first `-->`, whatever bracket came first
        if interior.starts_with("!--") {
            let Some(arrow) = self.source.find_str("-->", open + 1) else {
                return Err(ParseError::UnclosedComment {
                    position: self.position_of(open),
                });
            };
            let end = arrow + 3;
            let full = self.source.substring(open, end)?;
            if interior.starts_with("!--[if ")
                && interior.ends_with(']')
                && full.ends_with("<![endif]-->")
            {
                // opening half of a conditional comment: emit only the
                // bracket span so the enclosed markup is tokenized
                let raw = self.source.substring(open, close + 1)?;
                self.source.set_position(close + 1);
                return Ok(Element::ConditionalComment { raw });
            }
            self.source.set_position(end);
            return Ok(Element::Comment { raw: full });
        }

        if interior == "![endif]--" {
            let raw = self.source.substring(open, close + 1)?;
            self.source.set_position(close + 1);
            return Ok(Element::ConditionalComment { raw });
        }

        let bytes = interior.as_bytes();
        if bytes.len() >= 8 && bytes[..8].eq_ignore_ascii_case(b"![CDATA[") {
            return self.cdata(open);
        }

        let raw = self.source.substring(open, close + 1)?;
        self.source.set_position(close + 1);
        if interior.starts_with('?') {
            return Ok(Element::ProcessingInstruction { raw });
        }
        if interior.starts_with("!DOCTYPE") {
            self.doctype = Some(interior);
            return Ok(Element::Doctype {
                raw,
                content: interior,
            });
        }
        Ok(Element::SpecialTag { raw })
    }

    /// CDATA close search: take the first `>`, and as long as the
    /// interior does not end in `]]`, extend to the next one.
    fn cdata(&mut self, open: usize) -> Result<Element<'a>, ParseError> {
        let mut from = open + 1;
        loop {
            let Some(close) = self.source.find_char('>', from) else {
                return Err(ParseError::NoMatchingCloseBracket {
                    position: self.position_of(open),
                });
            };
            let content = self.source.substring(open + 1, close)?;
            if content.ends_with("]]") {
                let raw = self.source.substring(open, close + 1)?;
                self.source.set_position(close + 1);
                return Ok(Element::Cdata { raw, content });
            }
            from = close + 1;
        }
    }

    /// Skip a script or style body without tokenizing it. The cursor
    /// stops on the `</` of the matching end tag, so the next step
    /// parses it as an ordinary close tag.
    fn skip_raw_text(&mut self, name: &'static str) -> Result<Element<'a>, ParseError> {
        let start = self.source.position();
        let mut pos = start;
        let hit = loop {
            let Some(hit) = self.source.find_str("</", pos) else {
                return Err(self.unclosed_raw_text(name, start));
            };
            if hit + 2 + name.len() >= self.source.len() {
                return Err(self.unclosed_raw_text(name, start));
            }
            if self.source.matches_ignore_case(name, hit + 2) {
                break hit;
            }
            pos = hit + 1;
        };
        // the end tag itself must close before the input runs out
        if self.source.find_char('>', hit + 2 + name.len()).is_none() {
            return Err(self.unclosed_raw_text(name, start));
        }
        let raw = self.source.substring(start, hit)?;
        self.source.set_position(hit);
        self.skip_until = None;
        Ok(Element::Text { raw })
    }

    fn unclosed_raw_text(&self, name: &str, at: usize) -> ParseError {
        ParseError::UnclosedRawTextElement {
            name: name.to_string(),
            position: self.position_of(at),
        }
    }

    fn position_of(&self, offset: usize) -> Position {
        let (line, column) = self.source.line_and_column_at(offset);
        Position {
            offset,
            line,
            column,
        }
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Element<'a>, ParseError>;

    /// `End` becomes `None`; an error is yielded once and fuses the
    /// iterator.
    fn next(&mut self) -> Option<Self::Item> {
        if self.poisoned.is_some() {
            return None;
        }
        match self.next_element() {
            Ok(Element::End) => None,
            Ok(element) => Some(Ok(element)),
            Err(err) => Some(Err(err)),
        }
    }
}

/// Raw-text skip heuristic: more than five bytes of interior, first
/// letter s or S, spelling script or style case-insensitively at the
/// front. `<scriptish>` arms the skip; a bare `<style>` does not.
fn raw_text_element(interior: &str) -> Option<&'static str> {
    let bytes = interior.as_bytes();
    if bytes.len() > 5 && (bytes[0] == b's' || bytes[0] == b'S') {
        if bytes[..6].eq_ignore_ascii_case(b"script") {
            return Some("script");
        }
        if bytes[..5].eq_ignore_ascii_case(b"style") {
            return Some("style");
        }
    }
    None
}

/// Tokenize a whole document into a vector, stopping at the first error.
/// The trailing `End` is not included.
pub fn parse_elements(text: &str) -> Result<Vec<Element<'_>>, ParseError> {
    let mut tokenizer = Tokenizer::new(text);
    let mut elements = Vec::new();
    loop {
        match tokenizer.next_element()? {
            Element::End => return Ok(elements),
            element => elements.push(element),
        }
    }
}
