//! Parse Errors
//!
//! Every failure the tokenizer can report, each pinned to the source
//! position where it was detected.

use std::fmt;

use thiserror::Error;

/// A location in the decoded document.
///
/// `offset` is a byte offset; `line` and `column` are 1-based and count
/// characters, with `\r` excluded from column counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub offset: usize,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "offset {} (line {}, column {})",
            self.offset, self.line, self.column
        )
    }
}

/// Errors raised while tokenizing markup.
///
/// The set is closed: callers can match exhaustively. Once a tokenizer
/// returns one of these it is latched and every later call fails the
/// same way.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A slice or marker offset lies outside the document.
    #[error("index out of range at {position}")]
    OutOfRange { position: Position },

    /// A `<` was never answered by a `>` before the end of input.
    #[error("no matching close bracket at {position}")]
    NoMatchingCloseBracket { position: Position },

    /// The input contained the two-character tag `<>`.
    #[error("found empty tag '<>' at {position}")]
    EmptyTag { position: Position },

    /// The tag interior did not start with a well-formed tag name.
    #[error("malformed tag at {position}")]
    MalformedTag { position: Position },

    /// The same attribute key appeared twice within one tag.
    #[error("same attribute found twice: {key} at {position}")]
    DuplicateAttribute { key: String, position: Position },

    /// A `<!--` comment ran to the end of input without `-->`.
    #[error("unclosed comment beginning at {position}")]
    UnclosedComment { position: Position },

    /// A `<script>` or `<style>` body was never closed by a matching
    /// end tag.
    #[error("{name} tag not closed at {position}")]
    UnclosedRawTextElement { name: String, position: Position },
}

impl ParseError {
    /// Position where the error was detected.
    pub fn position(&self) -> Position {
        match self {
            ParseError::OutOfRange { position }
            | ParseError::NoMatchingCloseBracket { position }
            | ParseError::EmptyTag { position }
            | ParseError::MalformedTag { position }
            | ParseError::DuplicateAttribute { position, .. }
            | ParseError::UnclosedComment { position }
            | ParseError::UnclosedRawTextElement { position, .. } => *position,
        }
    }
}
