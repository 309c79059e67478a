//! Source Buffer
//!
//! Fully buffered view of a decoded document with the search and position
//! bookkeeping the tokenizer needs:
//!
//! - Forward-only searches for a character, a substring, or a close
//!   bracket (the latter quote-aware, so `>` inside a quoted attribute
//!   value never ends a tag)
//! - A cursor owned by the buffer, driven by the tokenizer
//! - Checkpointed line/column counting, amortized O(1) when offsets are
//!   visited in increasing order
//! - A position marker for re-slicing already consumed input
//!
//! All offsets are byte offsets into the text. Searches use memchr on the
//! underlying bytes; an ASCII needle can never match inside a multi-byte
//! character, so the byte-level scan is exact.

use std::cell::Cell;

use memchr::memchr;

use crate::error::{ParseError, Position};

/// Line counter checkpoint. `index` always sits on a character boundary.
#[derive(Debug, Clone, Copy)]
struct LineCount {
    index: usize,
    line: u32,
    column: u32,
}

impl Default for LineCount {
    fn default() -> Self {
        LineCount {
            index: 0,
            line: 1,
            column: 1,
        }
    }
}

/// A read-only document buffer with a cursor, forward search, and
/// line/column tracking.
#[derive(Debug, Clone)]
pub struct Source<'a> {
    text: &'a str,
    pos: usize,
    marker: usize,
    line_count: Cell<LineCount>,
}

impl<'a> Source<'a> {
    pub fn new(text: &'a str) -> Self {
        Source {
            text,
            pos: 0,
            marker: 0,
            line_count: Cell::new(LineCount::default()),
        }
    }

    /// Document length in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Current cursor offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the cursor. The tokenizer only ever hands back offsets it got
    /// from this buffer, so `pos` stays within the document.
    #[inline]
    pub fn set_position(&mut self, pos: usize) {
        debug_assert!(pos <= self.text.len());
        self.pos = pos;
    }

    /// Character starting at `offset`, if any.
    #[inline]
    pub fn char_at(&self, offset: usize) -> Option<char> {
        self.text.get(offset..)?.chars().next()
    }

    /// Raw byte at `offset`, if any.
    #[inline]
    pub fn byte_at(&self, offset: usize) -> Option<u8> {
        self.text.as_bytes().get(offset).copied()
    }

    /// Slice `[from, to)` of the document.
    pub fn substring(&self, from: usize, to: usize) -> Result<&'a str, ParseError> {
        self.text
            .get(from..to)
            .ok_or_else(|| self.out_of_range(from, to))
    }

    /// Slice from `from` to the end of the document.
    pub fn substring_to_end(&self, from: usize) -> Result<&'a str, ParseError> {
        self.substring(from, self.text.len())
    }

    /// First occurrence of `ch` at or after `from`.
    pub fn find_char(&self, ch: char, from: usize) -> Option<usize> {
        if from >= self.text.len() {
            return None;
        }
        if ch.is_ascii() {
            memchr(ch as u8, &self.text.as_bytes()[from..]).map(|i| from + i)
        } else {
            self.text
                .get(from..)?
                .char_indices()
                .find(|&(_, c)| c == ch)
                .map(|(i, _)| from + i)
        }
    }

    /// First occurrence of `needle` at or after `from`. The scan jumps
    /// between first-byte hits and confirms each with a prefix check.
    pub fn find_str(&self, needle: &str, from: usize) -> Option<usize> {
        let needle = needle.as_bytes();
        let first = *needle.first()?;
        let bytes = self.text.as_bytes();
        let mut pos = from;
        while pos < bytes.len() {
            let hit = pos + memchr(first, &bytes[pos..])?;
            if bytes[hit..].starts_with(needle) {
                return Some(hit);
            }
            pos = hit + 1;
        }
        None
    }

    /// First `>` at or after `from` that sits outside quoted text. Quote
    /// state starts fresh at `from`; a quote char of one kind inside a
    /// run of the other kind is literal text.
    pub fn find_close_bracket(&self, from: usize) -> Option<usize> {
        let bytes = self.text.as_bytes();
        let mut in_single_quote = false;
        let mut in_double_quote = false;
        let mut pos = from;
        while pos < bytes.len() {
            match bytes[pos] {
                b'"' if !in_single_quote => in_double_quote = !in_double_quote,
                b'\'' if !in_double_quote => in_single_quote = !in_single_quote,
                b'>' if !in_single_quote && !in_double_quote => return Some(pos),
                _ => {}
            }
            pos += 1;
        }
        None
    }

    /// Case-insensitive byte comparison of `needle` against the document
    /// at `at`. False when the document ends first.
    pub fn matches_ignore_case(&self, needle: &str, at: usize) -> bool {
        self.text
            .as_bytes()
            .get(at..at + needle.len())
            .is_some_and(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
    }

    /// 1-based line and column of the character at `offset`.
    ///
    /// A newline advances the line and resets the column; `\r` counts for
    /// neither. The checkpoint makes monotone queries cheap; asking about
    /// an earlier offset recounts from the start of the document.
    pub fn line_and_column_at(&self, offset: usize) -> (u32, u32) {
        let mut count = self.line_count.get();
        if offset < count.index {
            count = LineCount::default();
        }
        let mut index = count.index;
        for ch in self.text[count.index..].chars() {
            if index >= offset {
                break;
            }
            match ch {
                '\n' => {
                    count.line += 1;
                    count.column = 1;
                }
                '\r' => {}
                _ => count.column += 1,
            }
            index += ch.len_utf8();
        }
        count.index = index;
        self.line_count.set(count);
        (count.line, count.column)
    }

    /// Remember `pos` for later re-slicing with [`substring_from_marker`].
    ///
    /// [`substring_from_marker`]: Source::substring_from_marker
    pub fn set_position_marker(&mut self, pos: usize) -> Result<(), ParseError> {
        if pos > self.text.len() {
            return Err(self.out_of_range(pos, pos));
        }
        self.marker = pos;
        Ok(())
    }

    /// Marker offset, 0 until set.
    #[inline]
    pub fn position_marker(&self) -> usize {
        self.marker
    }

    /// Slice from the marker to `to`.
    pub fn substring_from_marker(&self, to: usize) -> Result<&'a str, ParseError> {
        self.substring(self.marker, to)
    }

    /// `position.offset` keeps the offending offset; line and column are
    /// taken at the nearest addressable point.
    fn out_of_range(&self, from: usize, to: usize) -> ParseError {
        let offset = if to > self.text.len() {
            to
        } else if from > to {
            from
        } else if !self.text.is_char_boundary(from) {
            from
        } else {
            to
        };
        let (line, column) = self.line_and_column_at(offset.min(self.text.len()));
        ParseError::OutOfRange {
            position: Position {
                offset,
                line,
                column,
            },
        }
    }
}
