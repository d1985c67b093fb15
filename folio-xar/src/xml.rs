//! Encoding-aware XML plumbing shared by the manifest and the entry codec.
//!
//! ```text
//!  bytes ──BOM / <?xml encoding?>──► Charset ──decode──► &str ──► XmlNode tree
//!  XmlWriter ──► UTF-8 text ──encode(Charset)──► bytes
//! ```
//!
//! Parsing builds a small element tree: elements with children ignore their
//! own text (indentation), leaf elements keep their text exactly.

use crate::error::CodecError;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8, WINDOWS_1252};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::fmt;

// ─── Charset ─────────────────────────────────────────────────────────

/// A text encoding together with the label written into the XML prologue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charset {
    label: String,
    encoding: &'static Encoding,
}

impl Charset {
    pub fn utf8() -> Self {
        Self {
            label: "UTF-8".to_string(),
            encoding: UTF_8,
        }
    }

    /// Latin-1, decoded the way browsers do (as windows-1252).
    pub fn iso_8859_1() -> Self {
        Self {
            label: "ISO-8859-1".to_string(),
            encoding: WINDOWS_1252,
        }
    }

    /// Look up a charset by any WHATWG label. Encodings that cannot be
    /// written back byte-for-byte (UTF-16, replacement) are rejected.
    pub fn for_label(label: &str) -> Result<Self, CodecError> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| CodecError::UnsupportedEncoding(label.to_string()))?;
        if encoding.output_encoding() != encoding {
            return Err(CodecError::UnsupportedEncoding(label.to_string()));
        }
        Ok(Self {
            label: label.trim().to_string(),
            encoding,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }
}

impl Default for Charset {
    fn default() -> Self {
        Self::utf8()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

// ─── Decoding ────────────────────────────────────────────────────────

/// Decode XML bytes to text. The byte-order mark wins, then the encoding
/// named in the XML declaration, then `fallback`.
pub(crate) fn decode_text(bytes: &[u8], fallback: &'static Encoding) -> Result<String, CodecError> {
    let (encoding, body) = match Encoding::for_bom(bytes) {
        Some((encoding, bom_len)) => (encoding, &bytes[bom_len..]),
        None => {
            let encoding = match declared_encoding(bytes)? {
                Some(encoding) => encoding,
                None => fallback,
            };
            (encoding, bytes)
        }
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .map(|text| text.into_owned())
        .ok_or_else(|| CodecError::Encoding(encoding.name().to_string()))
}

/// Encoding named by the `<?xml ... encoding="..."?>` prologue, if any.
fn declared_encoding(bytes: &[u8]) -> Result<Option<&'static Encoding>, CodecError> {
    let mut reader = Reader::from_reader(bytes);
    let decl = match reader.read_event() {
        Ok(Event::Decl(decl)) => decl,
        _ => return Ok(None),
    };
    let label = match decl.encoding() {
        Some(Ok(label)) => String::from_utf8_lossy(&label).into_owned(),
        Some(Err(e)) => return Err(CodecError::Malformed(e.to_string())),
        None => return Ok(None),
    };
    let encoding = Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| CodecError::UnsupportedEncoding(label.clone()))?;
    // A UTF-16 label on a prologue we could read as ASCII has no BOM to go by.
    if encoding == UTF_16LE || encoding == UTF_16BE {
        return Err(CodecError::UnsupportedEncoding(label));
    }
    Ok(Some(encoding))
}

/// Encode text produced by [`XmlWriter`]. Characters the charset cannot
/// represent become numeric character references.
pub(crate) fn encode_text(text: &str, charset: &Charset) -> Vec<u8> {
    let (bytes, _, _) = charset.encoding.encode(text);
    bytes.into_owned()
}

// ─── Tree ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, CodecError> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(malformed)?
            .to_string();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(malformed)?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(malformed)?
                .to_string();
            let value = attr.unescape_value().map_err(malformed)?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            ..Self::default()
        })
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of a leaf child; `None` when the child is absent.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }
}

fn malformed(e: impl fmt::Display) -> CodecError {
    CodecError::Malformed(e.to_string())
}

/// Parse a complete document into its root element.
pub(crate) fn parse_tree(text: &str) -> Result<XmlNode, CodecError> {
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(CodecError::Malformed("content after the root element".into()));
                }
                stack.push(XmlNode::from_start(&start)?);
            }
            Event::Empty(start) => {
                let node = XmlNode::from_start(&start)?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| CodecError::Malformed("unbalanced end tag".into()))?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(malformed)?;
                match stack.last_mut() {
                    Some(top) => top.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => {
                        return Err(CodecError::Malformed("text outside the root element".into()))
                    }
                }
            }
            Event::CData(data) => {
                let data = std::str::from_utf8(&data).map_err(malformed)?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(data);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(CodecError::Malformed(format!(
            "unexpected end of document, <{}> is not closed",
            open.name
        )));
    }
    root.ok_or_else(|| CodecError::Malformed("no root element".into()))
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<(), CodecError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(CodecError::Malformed("more than one root element".into())),
    }
    Ok(())
}

// ─── Writer ──────────────────────────────────────────────────────────

/// Indenting writer producing UTF-8 text with a prologue naming `charset`.
pub(crate) struct XmlWriter {
    writer: Writer<Vec<u8>>,
}

impl XmlWriter {
    pub fn new(charset: &Charset) -> Result<Self, CodecError> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some(charset.label()), None)))
            .map_err(malformed)?;
        Ok(Self { writer })
    }

    pub fn open(&mut self, name: &str) -> Result<(), CodecError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(malformed)
    }

    pub fn close(&mut self, name: &str) -> Result<(), CodecError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(malformed)
    }

    /// `<name attrs>text</name>`, written even when `text` is empty.
    pub fn leaf(&mut self, name: &str, attributes: &[(&str, &str)], text: &str) -> Result<(), CodecError> {
        let mut start = BytesStart::new(name);
        for &(key, value) in attributes {
            start.push_attribute((key, value));
        }
        self.writer.write_event(Event::Start(start)).map_err(malformed)?;
        let escaped = escape_text(text);
        self.writer
            .write_event(Event::Text(BytesText::from_escaped(escaped.as_str())))
            .map_err(malformed)?;
        self.close(name)
    }

    pub fn finish(self) -> Result<String, CodecError> {
        String::from_utf8(self.writer.into_inner()).map_err(malformed)
    }
}

/// Markup escaping plus `\r`, which parsers would otherwise fold into `\n`.
fn escape_text(text: &str) -> String {
    quick_xml::escape::escape(text).replace('\r', "&#13;")
}
