//! Markup Elements
//!
//! The values handed out by the tokenizer, one per step. Every variant
//! keeps the exact span of input it consumed, so concatenating the raw
//! spans of a full parse reproduces the document.

/// How a tag opens or closes its element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `<name ...>`
    Open,
    /// `</name>`
    Close,
    /// `<name .../>`
    OpenClose,
}

/// A single parsed attribute. The value has quotes stripped and
/// whitespace trimmed from both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

/// Attribute list of one tag, in document order.
///
/// Keys are unique and case-sensitive. Lookups scan linearly; tags carry
/// few attributes and the list stays cache-friendly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes<'a> {
    items: Vec<Attribute<'a>>,
}

impl<'a> Attributes<'a> {
    pub fn new() -> Self {
        Attributes::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.items
            .iter()
            .find(|attribute| attribute.key == key)
            .map(|attribute| attribute.value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items.iter().any(|attribute| attribute.key == key)
    }

    /// Append an attribute. Returns false and leaves the list unchanged
    /// when the key is already present.
    pub fn insert(&mut self, key: &'a str, value: &'a str) -> bool {
        if self.contains_key(key) {
            return false;
        }
        self.items.push(Attribute { key, value });
        true
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute<'a>> {
        self.items.iter()
    }
}

impl<'a, 'b> IntoIterator for &'b Attributes<'a> {
    type Item = &'b Attribute<'a>;
    type IntoIter = std::slice::Iter<'b, Attribute<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// An ordinary markup tag: name, optional namespace, attributes, and
/// where in the document it sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    pub name: &'a str,
    pub namespace: Option<&'a str>,
    pub kind: TagKind,
    pub attributes: Attributes<'a>,
    /// The full `<...>` span as written.
    pub raw: &'a str,
    /// Byte offset of the opening `<`.
    pub offset: usize,
    /// Byte length of the raw span.
    pub length: usize,
    /// 1-based line of the opening `<`.
    pub line: u32,
    /// 1-based column of the opening `<`.
    pub column: u32,
}

impl<'a> Tag<'a> {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.kind == TagKind::Open
    }

    #[inline]
    pub fn is_close(&self) -> bool {
        self.kind == TagKind::Close
    }

    #[inline]
    pub fn is_open_close(&self) -> bool {
        self.kind == TagKind::OpenClose
    }

    /// Attribute value lookup, exact key match.
    pub fn attribute(&self, key: &str) -> Option<&'a str> {
        self.attributes.get(key)
    }
}

/// One step's worth of markup.
///
/// `Text` covers everything between tags, including raw `<script>` and
/// `<style>` bodies. The bang and question constructs keep their interior
/// where later stages want it (`Cdata`, `Doctype`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element<'a> {
    Text { raw: &'a str },
    Tag(Tag<'a>),
    Comment { raw: &'a str },
    /// One half of an IE conditional comment, `<!--[if ...]>` or
    /// `<![endif]-->`. The enclosed markup is tokenized normally.
    ConditionalComment { raw: &'a str },
    Cdata { raw: &'a str, content: &'a str },
    Doctype { raw: &'a str, content: &'a str },
    ProcessingInstruction { raw: &'a str },
    /// A `<!...>` construct that is none of the above.
    SpecialTag { raw: &'a str },
    /// End of input. Repeated steps keep returning this.
    End,
}

impl<'a> Element<'a> {
    /// The span of input this element consumed. Empty for `End`.
    pub fn raw(&self) -> &'a str {
        match self {
            Element::Text { raw }
            | Element::Comment { raw }
            | Element::ConditionalComment { raw }
            | Element::Cdata { raw, .. }
            | Element::Doctype { raw, .. }
            | Element::ProcessingInstruction { raw }
            | Element::SpecialTag { raw } => raw,
            Element::Tag(tag) => tag.raw,
            Element::End => "",
        }
    }

    #[inline]
    pub fn is_tag(&self) -> bool {
        matches!(self, Element::Tag(_))
    }

    #[inline]
    pub fn is_end(&self) -> bool {
        matches!(self, Element::End)
    }

    pub fn as_tag(&self) -> Option<&Tag<'a>> {
        match self {
            Element::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    /// Character data carried by this element: the text run itself, or
    /// the interior of a CDATA section.
    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            Element::Text { raw } => Some(raw),
            Element::Cdata { content, .. } => Some(content),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_preserve_document_order() {
        let mut attributes = Attributes::new();
        assert!(attributes.insert("b", "2"));
        assert!(attributes.insert("a", "1"));
        let keys: Vec<&str> = attributes.iter().map(|a| a.key).collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn test_attributes_reject_duplicate_keys() {
        let mut attributes = Attributes::new();
        assert!(attributes.insert("id", "first"));
        assert!(!attributes.insert("id", "second"));
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes.get("id"), Some("first"));
    }

    #[test]
    fn test_attributes_keys_are_case_sensitive() {
        let mut attributes = Attributes::new();
        assert!(attributes.insert("Id", "1"));
        assert!(attributes.insert("id", "2"));
        assert_eq!(attributes.get("Id"), Some("1"));
        assert_eq!(attributes.get("ID"), None);
    }

    #[test]
    fn test_element_raw_span() {
        let element = Element::Comment { raw: "<!-- x -->" };
        assert_eq!(element.raw(), "<!-- x -->");
        assert_eq!(Element::End.raw(), "");
        assert!(Element::End.is_end());
    }

    #[test]
    fn test_as_text() {
        let text = Element::Text { raw: "hello" };
        assert_eq!(text.as_text(), Some("hello"));
        let cdata = Element::Cdata {
            raw: "<![CDATA[x]]>",
            content: "![CDATA[x]]",
        };
        assert_eq!(cdata.as_text(), Some("![CDATA[x]]"));
        assert!(!text.is_tag());
    }
}
