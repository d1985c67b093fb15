//! Per-document entry format.
//!
//! One entry holds one document-translation:
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <document>
//!   <space>Test</space>
//!   <name>DocImport</name>
//!   <language>fr</language>
//!   <defaultLanguage>en</defaultLanguage>
//!   <translation>1</translation>
//!   <parent></parent>  <title></title>  <author></author>
//!   <version>1.1</version>  <comment></comment>  <syntax></syntax>
//!   <date>1700000000</date>
//!   <object>
//!     <className>Tags</className>
//!     <number>0</number>
//!     <property name="tags">a|b</property>
//!   </object>
//!   <content>B</content>
//! </document>
//! ```
//!
//! Every entry declares its own encoding in the prologue; decoding honors
//! it, so one package may mix charsets.

use crate::error::CodecError;
use crate::xml::{self, Charset, XmlNode, XmlWriter};
use folio_core::{Document, DocumentKey, DocumentObject, Version};

const ROOT: &str = "document";

/// Serialize a document in `charset`.
pub fn encode_document(doc: &Document, charset: &Charset) -> Result<Vec<u8>, CodecError> {
    let key = &doc.key;
    let mut w = XmlWriter::new(charset)?;
    w.open(ROOT)?;
    w.leaf("space", &[], &key.space)?;
    w.leaf("name", &[], &key.name)?;
    w.leaf("language", &[], &key.language)?;
    w.leaf("defaultLanguage", &[], &doc.default_language)?;
    w.leaf("translation", &[], if key.is_translation() { "1" } else { "0" })?;
    w.leaf("parent", &[], &doc.parent)?;
    w.leaf("title", &[], &doc.title)?;
    w.leaf("author", &[], &doc.author)?;
    w.leaf("version", &[], &doc.version.to_string())?;
    w.leaf("comment", &[], &doc.comment)?;
    w.leaf("syntax", &[], &doc.syntax)?;
    w.leaf("date", &[], &doc.updated_at.to_string())?;
    for object in &doc.objects {
        w.open("object")?;
        w.leaf("className", &[], &object.class_name)?;
        w.leaf("number", &[], &object.number.to_string())?;
        for (name, value) in &object.properties {
            w.leaf("property", &[("name", name)], value)?;
        }
        w.close("object")?;
    }
    w.leaf("content", &[], &doc.content)?;
    w.close(ROOT)?;
    Ok(xml::encode_text(&w.finish()?, charset))
}

/// Parse one entry, honoring the encoding it declares.
///
/// The result is a detached document: it is new and bound to no store.
pub fn decode_document(bytes: &[u8]) -> Result<Document, CodecError> {
    let text = xml::decode_text(bytes, encoding_rs::UTF_8)?;
    let root = xml::parse_tree(&text)?;
    if root.name != ROOT {
        return Err(CodecError::InvalidValue {
            field: "document",
            value: root.name,
        });
    }

    let space = required(&root, "space")?;
    let name = required(&root, "name")?;
    if name.is_empty() {
        return Err(CodecError::InvalidValue {
            field: "name",
            value: String::new(),
        });
    }
    let language = optional(&root, "language");

    let mut doc = Document::new(DocumentKey::new(space, name).with_language(language));
    doc.default_language = optional(&root, "defaultLanguage");
    doc.parent = optional(&root, "parent");
    doc.title = optional(&root, "title");
    doc.author = optional(&root, "author");
    doc.comment = optional(&root, "comment");
    doc.syntax = optional(&root, "syntax");
    doc.content = optional(&root, "content");
    doc.version = match root.child_text("version").map(str::trim) {
        None | Some("") => Version::NONE,
        Some(text) => text.parse().map_err(|_| CodecError::InvalidValue {
            field: "version",
            value: text.to_string(),
        })?,
    };
    doc.updated_at = parse_number(&root, "date")?.unwrap_or(0);
    for node in root.children_named("object") {
        doc.objects.push(decode_object(node)?);
    }
    Ok(doc)
}

fn decode_object(node: &XmlNode) -> Result<DocumentObject, CodecError> {
    let class_name = required(node, "className")?;
    let number = parse_number(node, "number")?.unwrap_or(0);
    let number = u32::try_from(number).map_err(|_| CodecError::InvalidValue {
        field: "number",
        value: number.to_string(),
    })?;
    let mut object = DocumentObject::new(class_name, number);
    for property in node.children_named("property") {
        let name = property
            .attr("name")
            .ok_or(CodecError::MissingField("property name"))?;
        object.properties.insert(name.to_string(), property.text.clone());
    }
    Ok(object)
}

fn required(node: &XmlNode, field: &'static str) -> Result<String, CodecError> {
    node.child_text(field)
        .map(str::to_string)
        .ok_or(CodecError::MissingField(field))
}

fn optional(node: &XmlNode, field: &str) -> String {
    node.child_text(field).unwrap_or_default().to_string()
}

fn parse_number(node: &XmlNode, field: &'static str) -> Result<Option<u64>, CodecError> {
    match node.child_text(field).map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse().map(Some).map_err(|_| CodecError::InvalidValue {
            field,
            value: text.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        let mut doc = Document::new(DocumentKey::new("Test", "DocImport").with_language("fr"));
        doc.default_language = "en".into();
        doc.title = "Titre".into();
        doc.author = "XWiki.Admin".into();
        doc.syntax = "xwiki/2.1".into();
        doc.content = "  <b>café</b> & more\r\n\n".into();
        doc.version = Version::new(2, 3);
        doc.updated_at = 1_700_000_000;
        doc.objects.push(
            DocumentObject::new("Tags", 1)
                .with_property("tags", "a|b")
                .with_property("empty", ""),
        );
        doc
    }

    #[test]
    fn test_document_survives_encoding() {
        let doc = sample();
        let bytes = encode_document(&doc, &Charset::utf8()).unwrap();
        let back = decode_document(&bytes).unwrap();
        assert_eq!(back.key, doc.key);
        assert!(back.same_state(&doc));
        assert_eq!(back.version, doc.version);
        assert_eq!(back.author, doc.author);
        assert_eq!(back.updated_at, doc.updated_at);
        assert!(back.is_new());
    }

    #[test]
    fn test_latin1_entry_declares_its_charset() {
        let doc = sample();
        let bytes = encode_document(&doc, &Charset::iso_8859_1()).unwrap();
        assert!(bytes.starts_with(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>"));
        assert!(bytes.contains(&0xE9));
        assert_eq!(decode_document(&bytes).unwrap().content, doc.content);
    }

    #[test]
    fn test_empty_fields_are_written() {
        let doc = Document::new(DocumentKey::new("Main", "Empty"));
        let text = String::from_utf8(encode_document(&doc, &Charset::utf8()).unwrap()).unwrap();
        for field in ["<language></language>", "<parent></parent>", "<content></content>"] {
            assert!(text.contains(field), "{field} missing from {text}");
        }
    }

    #[test]
    fn test_missing_name_is_reported() {
        let bytes = b"<?xml version=\"1.0\"?><document><space>Main</space></document>";
        assert_eq!(decode_document(bytes).unwrap_err(), CodecError::MissingField("name"));
    }

    #[test]
    fn test_bad_version_is_reported() {
        let bytes = b"<document><space>A</space><name>B</name><version>x.y</version></document>";
        assert!(matches!(
            decode_document(bytes),
            Err(CodecError::InvalidValue { field: "version", .. })
        ));
    }

    #[test]
    fn test_wrong_root_is_rejected() {
        assert!(decode_document(b"<package/>").is_err());
    }
}
