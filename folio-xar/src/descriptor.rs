//! Package manifest (`package.xml`).
//!
//! ```text
//! <package>
//!   <infos>
//!     <name/> <description/> <licence/> <author/> <version/>
//!     <backupPack>false</backupPack>
//!     <preserveVersion>false</preserveVersion>
//!     <extensionId/>
//!   </infos>
//!   <files>
//!     <file defaultAction="0" language="fr">Test.DocImport</file>
//!   </files>
//! </package>
//! ```
//!
//! The manifest is always written in ISO-8859-1 and every field is written
//! even when empty.

use crate::error::{XarError, XarResult};
use crate::xml::{self, Charset, XmlNode, XmlWriter};
use folio_core::DocumentKey;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// What install does with one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultAction {
    /// Replace content and objects of the target.
    #[default]
    Overwrite,
    /// Leave an existing target untouched.
    Skip,
    /// Fold the entry into the existing target.
    Merge,
}

/// Legacy numeric codes carried by the `defaultAction` attribute.
const ACTION_CODES: [(DefaultAction, i32); 3] = [
    (DefaultAction::Overwrite, 0),
    (DefaultAction::Skip, 1),
    (DefaultAction::Merge, 2),
];

/// Code for "no action given"; read as [`DefaultAction::Overwrite`].
pub const ACTION_NOT_DEFINED: i32 = -1;

impl DefaultAction {
    pub fn code(self) -> i32 {
        ACTION_CODES
            .iter()
            .find(|(action, _)| *action == self)
            .map(|(_, code)| *code)
            .unwrap_or(ACTION_NOT_DEFINED)
    }

    pub fn from_code(code: i32) -> Option<Self> {
        if code == ACTION_NOT_DEFINED {
            return Some(Self::Overwrite);
        }
        ACTION_CODES
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(action, _)| *action)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overwrite => "overwrite",
            Self::Skip => "skip",
            Self::Merge => "merge",
        }
    }
}

impl fmt::Display for DefaultAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One manifest line: a document-translation and its action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct XarEntry {
    pub key: DocumentKey,
    /// Archive path of the entry, see [`DocumentKey::entry_name`].
    pub entry_name: String,
    pub default_action: DefaultAction,
}

impl XarEntry {
    pub fn new(key: DocumentKey, default_action: DefaultAction) -> Self {
        Self {
            entry_name: key.entry_name(),
            key,
            default_action,
        }
    }
}

/// Package-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageInfo {
    pub name: String,
    pub description: String,
    pub licence: String,
    pub author: String,
    pub version: String,
    /// Archive authors and dates are kept when installed by a user allowed
    /// to restore backups.
    pub backup_pack: bool,
    /// When false, installed documents restart their history at 1.1.
    pub preserve_version: bool,
    pub extension_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub info: PackageInfo,
    entries: Vec<XarEntry>,
    keys: HashSet<DocumentKey>,
}

impl PackageDescriptor {
    pub fn new(info: PackageInfo) -> Self {
        Self {
            info,
            ..Self::default()
        }
    }

    /// Entries in manifest order.
    pub fn entries(&self) -> &[XarEntry] {
        &self.entries
    }

    pub fn entry(&self, entry_name: &str) -> Option<&XarEntry> {
        self.entries.iter().find(|e| e.entry_name == entry_name)
    }

    pub fn contains(&self, key: &DocumentKey) -> bool {
        self.keys.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry. A document-translation is listed at most once.
    pub fn add_entry(&mut self, entry: XarEntry) -> XarResult<()> {
        if !self.keys.insert(entry.key.clone()) {
            return Err(XarError::DuplicateEntry(entry.entry_name));
        }
        self.entries.push(entry);
        Ok(())
    }

    // ─── Parsing ─────────────────────────────────────────────────────

    /// Parse manifest bytes. Any defect is an [`XarError::ArchiveFormat`].
    pub fn parse(bytes: &[u8]) -> XarResult<Self> {
        let invalid = |what: String| XarError::ArchiveFormat(format!("package.xml: {what}"));

        let text = xml::decode_text(bytes, encoding_rs::WINDOWS_1252).map_err(|e| invalid(e.to_string()))?;
        let root = xml::parse_tree(&text).map_err(|e| invalid(e.to_string()))?;
        if root.name != "package" {
            return Err(invalid(format!("unexpected root element <{}>", root.name)));
        }

        let mut descriptor = Self::new(root.child("infos").map(parse_info).unwrap_or_default());
        if let Some(files) = root.child("files") {
            for file in files.children_named("file") {
                let entry = parse_entry(file).map_err(invalid)?;
                descriptor.add_entry(entry).map_err(|e| invalid(e.to_string()))?;
            }
        }
        Ok(descriptor)
    }

    // ─── Serialization ───────────────────────────────────────────────

    /// Manifest bytes in ISO-8859-1.
    pub fn to_xml(&self) -> XarResult<Vec<u8>> {
        let charset = Charset::iso_8859_1();
        let info = &self.info;
        let mut w = XmlWriter::new(&charset)?;
        w.open("package")?;
        w.open("infos")?;
        w.leaf("name", &[], &info.name)?;
        w.leaf("description", &[], &info.description)?;
        w.leaf("licence", &[], &info.licence)?;
        w.leaf("author", &[], &info.author)?;
        w.leaf("version", &[], &info.version)?;
        w.leaf("backupPack", &[], bool_text(info.backup_pack))?;
        w.leaf("preserveVersion", &[], bool_text(info.preserve_version))?;
        w.leaf("extensionId", &[], info.extension_id.as_deref().unwrap_or(""))?;
        w.close("infos")?;
        w.open("files")?;
        for entry in &self.entries {
            let code = entry.default_action.code().to_string();
            w.leaf(
                "file",
                &[("defaultAction", &code), ("language", &entry.key.language)],
                &entry.key.full_name(),
            )?;
        }
        w.close("files")?;
        w.close("package")?;
        Ok(xml::encode_text(&w.finish()?, &charset))
    }

    /// Metadata and entry list as JSON, for display.
    pub fn summary_json(&self) -> serde_json::Value {
        let files: Vec<serde_json::Value> = self
            .entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "fullName": e.key.full_name(),
                    "language": e.key.language,
                    "entry": e.entry_name,
                    "defaultAction": e.default_action,
                })
            })
            .collect();
        serde_json::json!({
            "name": self.info.name,
            "description": self.info.description,
            "licence": self.info.licence,
            "author": self.info.author,
            "version": self.info.version,
            "backupPack": self.info.backup_pack,
            "preserveVersion": self.info.preserve_version,
            "extensionId": self.info.extension_id,
            "files": files,
        })
    }
}

fn parse_info(infos: &XmlNode) -> PackageInfo {
    let text = |name: &str| infos.child_text(name).unwrap_or_default().to_string();
    let extension_id = text("extensionId");
    PackageInfo {
        name: text("name"),
        description: text("description"),
        licence: text("licence"),
        author: text("author"),
        version: text("version"),
        backup_pack: parse_bool(infos.child_text("backupPack")),
        preserve_version: parse_bool(infos.child_text("preserveVersion")),
        extension_id: (!extension_id.is_empty()).then_some(extension_id),
    }
}

fn parse_entry(file: &XmlNode) -> Result<XarEntry, String> {
    let language = file.attr("language").unwrap_or_default().trim();
    let key = DocumentKey::from_full_name(file.text.trim(), language).map_err(|e| e.to_string())?;
    let default_action = match file.attr("defaultAction").map(str::trim) {
        None | Some("") => DefaultAction::Overwrite,
        Some(code) => code
            .parse()
            .ok()
            .and_then(DefaultAction::from_code)
            .ok_or_else(|| format!("unknown defaultAction {code:?} for {}", file.text.trim()))?,
    };
    Ok(XarEntry::new(key, default_action))
}

fn parse_bool(value: Option<&str>) -> bool {
    value.is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PackageDescriptor {
        let mut d = PackageDescriptor::new(PackageInfo {
            name: "Café pack".into(),
            author: "Admin".into(),
            version: "1.0".into(),
            ..PackageInfo::default()
        });
        d.add_entry(XarEntry::new(DocumentKey::new("Test", "DocImport"), DefaultAction::Overwrite))
            .unwrap();
        d.add_entry(XarEntry::new(
            DocumentKey::new("Test", "DocImport").with_language("fr"),
            DefaultAction::Merge,
        ))
        .unwrap();
        d.add_entry(XarEntry::new(DocumentKey::new("My.Space", "Page"), DefaultAction::Skip))
            .unwrap();
        d
    }

    #[test]
    fn test_manifest_survives_reparse() {
        let d = sample();
        let parsed = PackageDescriptor::parse(&d.to_xml().unwrap()).unwrap();
        assert_eq!(parsed, d);
        assert_eq!(parsed.entries()[2].key.space, "My.Space");
    }

    #[test]
    fn test_info_whitespace_survives_reparse() {
        let mut d = sample();
        d.info.name = "  Padded pack ".into();
        d.info.description = " first line\n  second line  ".into();
        d.info.author = "Admin ".into();
        let parsed = PackageDescriptor::parse(&d.to_xml().unwrap()).unwrap();
        assert_eq!(parsed.info, d.info);
    }

    #[test]
    fn test_flags_and_action_codes_tolerate_padding() {
        let xml = br#"<package><infos><backupPack> true </backupPack></infos>
            <files><file defaultAction=" 1 " language=" fr ">A.B</file></files></package>"#;
        let d = PackageDescriptor::parse(xml).unwrap();
        assert!(d.info.backup_pack);
        assert_eq!(d.entries()[0].default_action, DefaultAction::Skip);
        assert_eq!(d.entries()[0].key.language, "fr");
    }

    #[test]
    fn test_manifest_is_latin1_with_explicit_empty_fields() {
        let bytes = sample().to_xml().unwrap();
        assert!(bytes.starts_with(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>"));
        assert!(bytes.windows(4).any(|w| w == b"Caf\xE9"));
        let text = String::from_utf8_lossy(&bytes);
        for field in ["<description></description>", "<licence></licence>", "<extensionId></extensionId>"] {
            assert!(text.contains(field), "{field} missing");
        }
        assert!(text.contains("<backupPack>false</backupPack>"));
        assert!(text.contains(r#"<file defaultAction="0" language="">Test.DocImport</file>"#));
        assert!(text.contains(r#"<file defaultAction="1" language="">My\.Space.Page</file>"#));
    }

    #[test]
    fn test_missing_attributes_mean_original_and_overwrite() {
        let xml = b"<package><files><file>Main.WebHome</file></files></package>";
        let d = PackageDescriptor::parse(xml).unwrap();
        let entry = &d.entries()[0];
        assert_eq!(entry.key, DocumentKey::new("Main", "WebHome"));
        assert!(!entry.key.is_translation());
        assert_eq!(entry.default_action, DefaultAction::Overwrite);
        assert_eq!(d.info, PackageInfo::default());
    }

    #[test]
    fn test_legacy_action_codes() {
        assert_eq!(DefaultAction::from_code(-1), Some(DefaultAction::Overwrite));
        assert_eq!(DefaultAction::from_code(0), Some(DefaultAction::Overwrite));
        assert_eq!(DefaultAction::from_code(1), Some(DefaultAction::Skip));
        assert_eq!(DefaultAction::from_code(2), Some(DefaultAction::Merge));
        assert_eq!(DefaultAction::from_code(7), None);
        assert_eq!(DefaultAction::Merge.code(), 2);
    }

    #[test]
    fn test_unknown_action_code_is_format_error() {
        let xml = br#"<package><files><file defaultAction="9">A.B</file></files></package>"#;
        assert!(matches!(PackageDescriptor::parse(xml), Err(XarError::ArchiveFormat(_))));
    }

    #[test]
    fn test_truncated_manifest_is_format_error() {
        let bytes = sample().to_xml().unwrap();
        let text = String::from_utf8_lossy(&bytes).replace("</package>", "</packag");
        assert!(matches!(
            PackageDescriptor::parse(text.as_bytes()),
            Err(XarError::ArchiveFormat(_))
        ));
    }

    #[test]
    fn test_duplicate_entries() {
        let mut d = sample();
        let err = d
            .add_entry(XarEntry::new(DocumentKey::new("Test", "DocImport"), DefaultAction::Skip))
            .unwrap_err();
        assert!(matches!(err, XarError::DuplicateEntry(name) if name == "Test/DocImport"));

        let xml = b"<package><files><file>A.B</file><file>A.B</file></files></package>";
        assert!(matches!(PackageDescriptor::parse(xml), Err(XarError::ArchiveFormat(_))));
    }

    #[test]
    fn test_dotted_name_and_translation_are_distinct_entries() {
        let xml = br#"<package><files>
            <file language="">Main.Notes.fr</file>
            <file language="fr">Main.Notes</file>
        </files></package>"#;
        let d = PackageDescriptor::parse(xml).unwrap();
        assert_eq!(d.len(), 2);
        assert!(d.contains(&DocumentKey::new("Main", "Notes.fr")));
        assert!(d.contains(&DocumentKey::new("Main", "Notes").with_language("fr")));
        assert_ne!(d.entries()[0].entry_name, d.entries()[1].entry_name);
        assert_eq!(PackageDescriptor::parse(&d.to_xml().unwrap()).unwrap(), d);
    }

    #[test]
    fn test_summary_json() {
        let mut d = sample();
        d.info.extension_id = Some("org.example:pack".into());
        let json = d.summary_json();
        assert_eq!(json["name"], "Café pack");
        assert_eq!(json["extensionId"], "org.example:pack");
        assert_eq!(json["files"].as_array().map(Vec::len), Some(3));
        assert_eq!(json["files"][1]["language"], "fr");
        assert_eq!(json["files"][1]["defaultAction"], "merge");
    }
}
