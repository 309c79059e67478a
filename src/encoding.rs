//! Document Decoding
//!
//! Byte-stream front-end: figures out the character encoding of a raw
//! markup document and decodes it to text before tokenizing.
//!
//! Detection order:
//! 1. Byte patterns: UTF-16 BOMs, or the null-byte shape a leading `<`
//!    takes in either UTF-16 flavor. A UTF-8 BOM is stripped.
//! 2. An `<?xml ...?>` declaration within the first 128 bytes, whose
//!    `encoding` pseudo-attribute names the charset.
//! 3. The caller's default encoding, then UTF-8.

use thiserror::Error;

use crate::grammar;

const DECLARATION_SNIFF_LIMIT: usize = 128;

/// Errors from the byte front-end. Distinct from parse errors: nothing
/// has been tokenized yet when these occur.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The declared or requested charset is not one this crate decodes.
    #[error("unsupported encoding: {name}")]
    UnsupportedEncoding { name: String },

    /// The bytes do not form valid text in the chosen encoding.
    #[error("malformed {encoding} input at byte {offset}")]
    MalformedInput {
        encoding: &'static str,
        offset: usize,
    },
}

/// Encoding family read off the first bytes of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl ByteEncoding {
    fn detect(bytes: &[u8]) -> ByteEncoding {
        if bytes.len() < 2 {
            return ByteEncoding::Utf8;
        }
        match (bytes[0], bytes[1]) {
            (0xFF, 0xFE) => ByteEncoding::Utf16Le,
            (0xFE, 0xFF) => ByteEncoding::Utf16Be,
            (b'<', 0x00) => ByteEncoding::Utf16Le,
            (0x00, b'<') => ByteEncoding::Utf16Be,
            _ => ByteEncoding::Utf8,
        }
    }
}

/// A document decoded to text, with what was learned on the way in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedDocument {
    text: String,
    encoding: String,
    declaration: Option<String>,
}

impl DecodedDocument {
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Name of the encoding actually used, as declared or requested.
    #[inline]
    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    /// Interior of the `<?xml ...?>` declaration, if the document opens
    /// with one.
    #[inline]
    pub fn xml_declaration(&self) -> Option<&str> {
        self.declaration.as_deref()
    }
}

/// Decode a raw document.
///
/// `default_encoding` applies only when the bytes carry no BOM or null
/// pattern and no declaration names a charset.
pub fn decode(
    bytes: &[u8],
    default_encoding: Option<&str>,
) -> Result<DecodedDocument, DecodeError> {
    match ByteEncoding::detect(bytes) {
        ByteEncoding::Utf16Le => {
            let text = decode_utf16(bytes, true)?;
            log::debug!(target: "markpull.encoding", "detected UTF-16LE from byte pattern");
            Ok(document(text, "UTF-16LE"))
        }
        ByteEncoding::Utf16Be => {
            let text = decode_utf16(bytes, false)?;
            log::debug!(target: "markpull.encoding", "detected UTF-16BE from byte pattern");
            Ok(document(text, "UTF-16BE"))
        }
        ByteEncoding::Utf8 => {
            let body = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
            let (declaration, declared) = sniff_declaration(body);
            let name = declared
                .or_else(|| default_encoding.map(str::to_string))
                .unwrap_or_else(|| "UTF-8".to_string());
            let text = decode_as(body, &name)?;
            log::debug!(target: "markpull.encoding", "decoding as {name}");
            Ok(DecodedDocument {
                text,
                encoding: name,
                declaration,
            })
        }
    }
}

fn document(text: String, encoding: &str) -> DecodedDocument {
    let (declaration, _) = sniff_declaration(text.as_bytes());
    DecodedDocument {
        text,
        encoding: encoding.to_string(),
        declaration,
    }
}

fn decode_as(bytes: &[u8], name: &str) -> Result<String, DecodeError> {
    if name.eq_ignore_ascii_case("UTF-8")
        || name.eq_ignore_ascii_case("UTF8")
        || name.eq_ignore_ascii_case("US-ASCII")
    {
        return match std::str::from_utf8(bytes) {
            Ok(text) => Ok(text.to_string()),
            Err(err) => Err(DecodeError::MalformedInput {
                encoding: "UTF-8",
                offset: err.valid_up_to(),
            }),
        };
    }
    if name.eq_ignore_ascii_case("ISO-8859-1")
        || name.eq_ignore_ascii_case("LATIN1")
        || name.eq_ignore_ascii_case("LATIN-1")
    {
        return Ok(bytes.iter().map(|&b| b as char).collect());
    }
    if name.eq_ignore_ascii_case("UTF-16LE") {
        return decode_utf16(bytes, true);
    }
    if name.eq_ignore_ascii_case("UTF-16BE") || name.eq_ignore_ascii_case("UTF-16") {
        return decode_utf16(bytes, false);
    }
    Err(DecodeError::UnsupportedEncoding {
        name: name.to_string(),
    })
}

fn decode_utf16(bytes: &[u8], little_endian: bool) -> Result<String, DecodeError> {
    let encoding = if little_endian { "UTF-16LE" } else { "UTF-16BE" };
    let bom: &[u8] = if little_endian {
        b"\xFF\xFE"
    } else {
        b"\xFE\xFF"
    };
    let body = bytes.strip_prefix(bom).unwrap_or(bytes);
    let base = bytes.len() - body.len();
    if body.len() % 2 != 0 {
        return Err(DecodeError::MalformedInput {
            encoding,
            offset: bytes.len() - 1,
        });
    }
    let units: Vec<u16> = body
        .chunks_exact(2)
        .map(|pair| {
            let pair = [pair[0], pair[1]];
            if little_endian {
                u16::from_le_bytes(pair)
            } else {
                u16::from_be_bytes(pair)
            }
        })
        .collect();

    let mut text = String::with_capacity(units.len());
    let mut consumed = 0usize;
    for decoded in char::decode_utf16(units.iter().copied()) {
        match decoded {
            Ok(ch) => {
                consumed += ch.len_utf16();
                text.push(ch);
            }
            Err(_) => {
                return Err(DecodeError::MalformedInput {
                    encoding,
                    offset: base + consumed * 2,
                });
            }
        }
    }
    Ok(text)
}

/// Look for an `<?xml ...?>` declaration at the front of the document.
/// Returns the declaration interior and the charset it names, if any.
fn sniff_declaration(bytes: &[u8]) -> (Option<String>, Option<String>) {
    let head = &bytes[..bytes.len().min(DECLARATION_SNIFF_LIMIT)];
    let mut pos = 0;
    while pos < head.len() && head[pos].is_ascii_whitespace() {
        pos += 1;
    }
    if !head[pos..].starts_with(b"<?xml") {
        return (None, None);
    }
    let Some(close) = head[pos..].windows(2).position(|window| window == b"?>") else {
        return (None, None);
    };
    let Ok(declaration) = std::str::from_utf8(&head[pos + 2..pos + close]) else {
        return (None, None);
    };
    let declaration = declaration.trim();

    let mut encoding = None;
    let mut from = 0;
    while let Some(found) = grammar::match_attribute(declaration, from) {
        if found.key.eq_ignore_ascii_case("encoding") {
            let value = grammar::strip_quotes(found.raw_value.unwrap_or("")).trim();
            if !value.is_empty() {
                encoding = Some(value.to_string());
            }
            break;
        }
        from = found.end;
    }
    (Some(declaration.to_string()), encoding)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_utf8_passthrough() {
        let doc = decode(b"<a>x</a>", None).unwrap();
        assert_eq!(doc.text(), "<a>x</a>");
        assert_eq!(doc.encoding(), "UTF-8");
        assert_eq!(doc.xml_declaration(), None);
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let doc = decode(b"\xEF\xBB\xBF<a/>", None).unwrap();
        assert_eq!(doc.text(), "<a/>");
        assert_eq!(doc.encoding(), "UTF-8");
    }

    #[test]
    fn test_utf16_le_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<a>x</a>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let doc = decode(&bytes, None).unwrap();
        assert_eq!(doc.text(), "<a>x</a>");
        assert_eq!(doc.encoding(), "UTF-16LE");
    }

    #[test]
    fn test_utf16_be_null_pattern() {
        // no BOM: the leading `<` encodes as 00 3C
        let mut bytes = Vec::new();
        for unit in "<a/>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        let doc = decode(&bytes, None).unwrap();
        assert_eq!(doc.text(), "<a/>");
        assert_eq!(doc.encoding(), "UTF-16BE");
    }

    #[test]
    fn test_utf16_le_null_pattern() {
        let mut bytes = Vec::new();
        for unit in "<a/>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let doc = decode(&bytes, None).unwrap();
        assert_eq!(doc.text(), "<a/>");
        assert_eq!(doc.encoding(), "UTF-16LE");
    }

    #[test]
    fn test_declared_encoding_wins_over_default() {
        let bytes = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<p>caf\xE9</p>";
        let doc = decode(bytes, Some("UTF-8")).unwrap();
        assert_eq!(doc.encoding(), "ISO-8859-1");
        assert!(doc.text().contains("caf\u{e9}"));
        assert_eq!(
            doc.xml_declaration(),
            Some("xml version=\"1.0\" encoding=\"ISO-8859-1\"")
        );
    }

    #[test]
    fn test_default_encoding_applies_without_declaration() {
        let doc = decode(b"caf\xE9", Some("latin1")).unwrap();
        assert_eq!(doc.text(), "caf\u{e9}");
        assert_eq!(doc.encoding(), "latin1");
    }

    #[test]
    fn test_declaration_without_encoding_attribute() {
        let doc = decode(b"<?xml version=\"1.0\"?><a/>", None).unwrap();
        assert_eq!(doc.encoding(), "UTF-8");
        assert_eq!(doc.xml_declaration(), Some("xml version=\"1.0\""));
    }

    #[test]
    fn test_declaration_survives_utf16_decode() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<?xml version=\"1.0\"?><a/>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let doc = decode(&bytes, None).unwrap();
        assert_eq!(doc.xml_declaration(), Some("xml version=\"1.0\""));
    }

    #[test]
    fn test_unsupported_encoding() {
        let err = decode(b"<a/>", Some("KOI8-R")).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnsupportedEncoding {
                name: "KOI8-R".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_utf8_reports_offset() {
        let err = decode(b"ab\xFFcd", None).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MalformedInput {
                encoding: "UTF-8",
                offset: 2
            }
        );
    }

    #[test]
    fn test_odd_length_utf16() {
        let err = decode(b"\xFF\xFEa", None).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MalformedInput {
                encoding: "UTF-16LE",
                offset: 2
            }
        );
    }

    #[test]
    fn test_unpaired_surrogate() {
        // 0xD800 with no low surrogate after it
        let err = decode(b"\xFF\xFE\x00\xD8", None).unwrap_err();
        assert_eq!(
            err,
            DecodeError::MalformedInput {
                encoding: "UTF-16LE",
                offset: 2
            }
        );
    }

    #[test]
    fn test_us_ascii_is_validated_as_utf8() {
        let doc = decode(b"<a/>", Some("us-ascii")).unwrap();
        assert_eq!(doc.text(), "<a/>");
        assert_eq!(doc.encoding(), "us-ascii");
    }
}
