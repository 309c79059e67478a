//! Tag Grammar
//!
//! Recognizers for the two micro-grammars inside a tag interior: the tag
//! name (with optional namespace prefix) and the attribute list.
//!
//! - `match_tag_name` is anchored: it must succeed at offset zero of the
//!   interior or the tag is malformed.
//! - `match_attribute` has find semantics: it skips anything that cannot
//!   start an attribute key and matches at the first position that can,
//!   so stray junk between attributes is tolerated.
//!
//! Both return byte offsets into the text they were given, never copies.

use memchr::memchr;

/// A recognized tag name at the start of a tag interior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagNameMatch<'a> {
    pub name: &'a str,
    pub namespace: Option<&'a str>,
    /// Offset just past the name, where attribute scanning starts.
    pub end: usize,
}

/// A recognized `key` or `key=value` pair inside a tag interior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeMatch<'a> {
    /// Key as written, namespace prefixes included (`xmlns:wicket`).
    pub key: &'a str,
    /// Raw value text, quotes still attached. `None` for a bare key.
    pub raw_value: Option<&'a str>,
    /// Offset just past the match, trailing whitespace consumed.
    pub end: usize,
}

/// Match a tag name at the start of `text`.
///
/// The name grammar is `[A-Za-z_][A-Za-z0-9_.-]*`, optionally preceded by
/// a namespace `[A-Za-z_][A-Za-z0-9_]*` and a colon. The namespace form
/// only holds when a name can start right after the colon; otherwise the
/// whole prefix is re-read as a plain name, so `a.b:c` yields the name
/// `a.b` and no namespace.
pub fn match_tag_name(text: &str) -> Option<TagNameMatch<'_>> {
    let bytes = text.as_bytes();
    if !bytes.first().copied().is_some_and(is_name_start) {
        return None;
    }
    if let Some(after_colon) = scan_namespace_prefix(bytes, 0) {
        let end = scan_name(bytes, after_colon);
        return Some(TagNameMatch {
            name: &text[after_colon..end],
            namespace: Some(&text[..after_colon - 1]),
            end,
        });
    }
    let end = scan_name(bytes, 0);
    Some(TagNameMatch {
        name: &text[..end],
        namespace: None,
        end,
    })
}

/// Find the next attribute in `text` at or after `from`.
///
/// Keys allow up to two namespace prefixes (`a:b:name`). The value, when
/// present, is `"..."`, `'...'`, or an unquoted run up to the next
/// whitespace. A quoted form needs its closing quote; without one the
/// unquoted form takes over and the opening quote stays in the raw value.
pub fn match_attribute(text: &str, from: usize) -> Option<AttributeMatch<'_>> {
    let bytes = text.as_bytes();
    let mut at = from;
    while at < bytes.len() && !is_name_start(bytes[at]) {
        at += 1;
    }
    if at >= bytes.len() {
        return None;
    }

    let key_end = scan_key(bytes, at);
    let key = &text[at..key_end];

    // optional `= value`, whitespace allowed around the equals sign
    let mut eq = key_end;
    while eq < bytes.len() && is_whitespace(bytes[eq]) {
        eq += 1;
    }
    let (raw_value, mut end) = if bytes.get(eq) == Some(&b'=') {
        let mut v = eq + 1;
        while v < bytes.len() && is_whitespace(bytes[v]) {
            v += 1;
        }
        match scan_value(bytes, v) {
            Some(value_end) => (Some(&text[v..value_end]), value_end),
            // `=` with nothing usable after it: the assignment part fails
            // and the match collapses to the bare key
            None => (None, key_end),
        }
    } else {
        (None, key_end)
    };

    while end < bytes.len() && is_whitespace(bytes[end]) {
        end += 1;
    }
    Some(AttributeMatch {
        key,
        raw_value,
        end,
    })
}

/// Strip the quote pair from a raw attribute value when one is present.
///
/// The first and last characters are dropped when the value starts with
/// `"` or `'` and is at least two characters long. No unescaping beyond
/// that is done.
pub fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') {
        let tail = value.chars().next_back().map_or(0, char::len_utf8);
        &value[1..value.len() - tail]
    } else {
        value
    }
}

/// Key grammar: up to two namespace prefixes, then a name.
fn scan_key(bytes: &[u8], at: usize) -> usize {
    let mut pos = at;
    for _ in 0..2 {
        match scan_namespace_prefix(bytes, pos) {
            Some(after_colon) => pos = after_colon,
            None => break,
        }
    }
    scan_name(bytes, pos)
}

/// `[A-Za-z_][A-Za-z0-9_]*:` followed by a name start. Returns the offset
/// just past the colon, or `None` when the prefix form does not hold.
fn scan_namespace_prefix(bytes: &[u8], at: usize) -> Option<usize> {
    if !bytes.get(at).copied().is_some_and(is_name_start) {
        return None;
    }
    let mut pos = at + 1;
    while pos < bytes.len() && is_namespace_char(bytes[pos]) {
        pos += 1;
    }
    if bytes.get(pos) == Some(&b':') && bytes.get(pos + 1).copied().is_some_and(is_name_start) {
        Some(pos + 1)
    } else {
        None
    }
}

/// `[A-Za-z0-9_.-]*` continuation. The caller guarantees a name start
/// character sits at `at`.
fn scan_name(bytes: &[u8], at: usize) -> usize {
    let mut pos = at + 1;
    while pos < bytes.len() && is_name_char(bytes[pos]) {
        pos += 1;
    }
    pos
}

fn scan_value(bytes: &[u8], at: usize) -> Option<usize> {
    match bytes.get(at)? {
        quote @ (b'"' | b'\'') => {
            if let Some(close) = memchr(*quote, &bytes[at + 1..]) {
                return Some(at + 1 + close + 1);
            }
            scan_word(bytes, at)
        }
        _ => scan_word(bytes, at),
    }
}

fn scan_word(bytes: &[u8], at: usize) -> Option<usize> {
    let mut pos = at;
    while pos < bytes.len() && !is_whitespace(bytes[pos]) {
        pos += 1;
    }
    (pos > at).then_some(pos)
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-')
}

fn is_namespace_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r')
}
