//! Archive import: manifest first, then every listed entry.
//!
//! ```text
//!  read_zip / read_dir
//!        │
//!        ├── package.xml ──► PackageDescriptor::parse ──✗──► ArchiveFormat (abort)
//!        │
//!        └── files ──rayon decode──► pair with manifest entries
//!                                     by decoded identity, else by path
//!                                        │
//!                                        └──► staged | decode failure | missing
//! ```
//!
//! Every file is decoded before anything is written, so decode failures
//! are known up front. Files that only a filtered entry points at are not
//! decoded.

use crate::archive::{self, ArchiveEntry, PACKAGE_MANIFEST};
use crate::codec;
use crate::descriptor::{PackageDescriptor, XarEntry};
use crate::error::{CodecError, XarError, XarResult};
use crate::filter::{self, DocumentFilter};
use crate::package::{DecodeFailure, Package, StagedEntry};
use folio_core::{Document, DocumentKey};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

#[derive(Default)]
pub struct Importer {
    filters: Vec<Box<dyn DocumentFilter>>,
}

impl Importer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only entries every filter accepts are decoded.
    pub fn with_filter(mut self, filter: impl DocumentFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    pub fn import_archive(&self, bytes: &[u8]) -> XarResult<Package> {
        self.import_entries(archive::read_zip(bytes)?)
    }

    pub fn import_dir(&self, root: &Path) -> XarResult<Package> {
        self.import_entries(archive::read_dir(root)?)
    }

    pub fn import_entries(&self, entries: Vec<ArchiveEntry>) -> XarResult<Package> {
        let mut manifest = None;
        let mut files: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for entry in entries {
            if entry.name == PACKAGE_MANIFEST {
                manifest = Some(entry.bytes);
            } else {
                files.insert(entry.name, entry.bytes);
            }
        }
        let manifest =
            manifest.ok_or_else(|| XarError::ArchiveFormat(format!("missing {PACKAGE_MANIFEST}")))?;
        let descriptor = PackageDescriptor::parse(&manifest)?;

        let (wanted, filtered): (Vec<&XarEntry>, Vec<&XarEntry>) = descriptor
            .entries()
            .iter()
            .partition(|e| filter::accepted(&self.filters, &e.key));

        let skipped: HashSet<String> = filtered
            .iter()
            .flat_map(|e| candidate_paths(e))
            .filter(|path| files.contains_key(path))
            .collect();
        let candidates: Vec<(&String, &Vec<u8>)> = files
            .iter()
            .filter(|(name, _)| !skipped.contains(name.as_str()))
            .collect();
        let decoded: Vec<(&str, Result<Document, CodecError>)> = candidates
            .par_iter()
            .map(|(name, bytes)| (name.as_str(), codec::decode_document(bytes)))
            .collect();

        let slots = pair_files(&wanted, &filtered, &decoded);
        let mut unlisted: Vec<String> = decoded
            .iter()
            .enumerate()
            .filter(|(i, _)| !slots.claimed.contains(i))
            .map(|(_, (name, _))| name.to_string())
            .collect();
        unlisted.sort();

        let mut results: Vec<Option<Result<Document, CodecError>>> =
            decoded.into_iter().map(|(_, result)| Some(result)).collect();

        let mut staged = Vec::with_capacity(wanted.len());
        let mut decode_failures = Vec::new();
        let mut missing = Vec::new();
        for (entry, slot) in wanted.into_iter().zip(slots.wanted) {
            let entry = entry.clone();
            match slot.and_then(|i| results[i].take()) {
                Some(Ok(document)) if document.key == entry.key => staged.push(StagedEntry {
                    action: entry.default_action,
                    entry,
                    document,
                }),
                Some(result) => {
                    let error = match result {
                        Ok(document) => mismatch(&entry, &document),
                        Err(error) => error,
                    };
                    log::warn!("cannot decode {}: {}", entry.entry_name, error);
                    decode_failures.push(DecodeFailure { entry, error });
                }
                None => {
                    log::warn!("{} is listed in {} but absent", entry.entry_name, PACKAGE_MANIFEST);
                    missing.push(entry);
                }
            }
        }

        log::info!(
            "imported package {:?}: {} staged, {} undecodable, {} missing, {} filtered, {} unlisted",
            descriptor.info.name,
            staged.len(),
            decode_failures.len(),
            missing.len(),
            filtered.len(),
            unlisted.len()
        );

        Ok(Package {
            filtered: filtered.into_iter().cloned().collect(),
            descriptor,
            staged,
            decode_failures,
            missing,
            unlisted,
        })
    }
}

// ─── Pairing ─────────────────────────────────────────────────────────

/// File index backing each wanted entry, and every file some manifest
/// entry accounts for.
struct Slots {
    wanted: Vec<Option<usize>>,
    claimed: HashSet<usize>,
}

/// Pair entries with decoded files. A file holding the listed document wins,
/// preferring the one stored under the entry's own path. Entries left over
/// take the unclaimed file at one of their candidate paths.
fn pair_files(
    wanted: &[&XarEntry],
    filtered: &[&XarEntry],
    decoded: &[(&str, Result<Document, CodecError>)],
) -> Slots {
    let mut by_key: HashMap<&DocumentKey, usize> = HashMap::new();
    for (i, (name, result)) in decoded.iter().enumerate() {
        if let Ok(document) = result {
            let own_path = *name == document.key.entry_name();
            by_key
                .entry(&document.key)
                .and_modify(|slot| {
                    if own_path {
                        *slot = i;
                    }
                })
                .or_insert(i);
        }
    }

    let mut claimed: HashSet<usize> = filtered.iter().filter_map(|e| by_key.get(&e.key).copied()).collect();
    let mut slots: Vec<Option<usize>> = wanted.iter().map(|e| by_key.get(&e.key).copied()).collect();
    claimed.extend(slots.iter().flatten().copied());

    let by_name: HashMap<&str, usize> = decoded.iter().enumerate().map(|(i, (name, _))| (*name, i)).collect();
    for (slot, entry) in slots.iter_mut().zip(wanted) {
        if slot.is_some() {
            continue;
        }
        *slot = candidate_paths(entry)
            .iter()
            .find_map(|path| by_name.get(path.as_str()).copied().filter(|i| !claimed.contains(i)));
        if let Some(i) = *slot {
            claimed.insert(i);
        }
    }

    Slots { wanted: slots, claimed }
}

/// Archive paths that may back `entry`: its entry name, then the unescaped
/// `Space/Name[.lang]` of older packages, each also with a `.xml` suffix.
fn candidate_paths(entry: &XarEntry) -> Vec<String> {
    let key = &entry.key;
    let mut legacy = format!("{}/{}", key.space, key.name);
    if key.is_translation() {
        legacy.push('.');
        legacy.push_str(&key.language);
    }
    let mut paths = vec![entry.entry_name.clone(), format!("{}.xml", entry.entry_name)];
    if legacy != entry.entry_name {
        let suffixed = format!("{legacy}.xml");
        paths.push(legacy);
        paths.push(suffixed);
    }
    paths
}

fn mismatch(entry: &XarEntry, document: &Document) -> CodecError {
    CodecError::InvalidValue {
        field: "document",
        value: format!("{} listed as {}", document.key, entry.key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_document;
    use crate::descriptor::{DefaultAction, PackageInfo};
    use crate::xml::Charset;

    fn entries_for(docs: &[Document]) -> Vec<ArchiveEntry> {
        let mut descriptor = PackageDescriptor::new(PackageInfo::default());
        let mut entries = Vec::new();
        for doc in docs {
            let entry = XarEntry::new(doc.key.clone(), DefaultAction::Overwrite);
            entries.push(ArchiveEntry {
                name: entry.entry_name.clone(),
                bytes: encode_document(doc, &Charset::utf8()).unwrap(),
            });
            descriptor.add_entry(entry).unwrap();
        }
        entries.push(ArchiveEntry {
            name: PACKAGE_MANIFEST.into(),
            bytes: descriptor.to_xml().unwrap(),
        });
        entries
    }

    fn doc(space: &str, name: &str, content: &str) -> Document {
        let mut d = Document::new(DocumentKey::new(space, name));
        d.content = content.into();
        d
    }

    #[test]
    fn test_missing_manifest_aborts() {
        let entries = vec![ArchiveEntry {
            name: "Main/A".into(),
            bytes: Vec::new(),
        }];
        assert!(matches!(
            Importer::new().import_entries(entries),
            Err(XarError::ArchiveFormat(_))
        ));
    }

    #[test]
    fn test_unlisted_and_missing_entries() {
        let mut entries = entries_for(&[doc("Main", "A", "a"), doc("Main", "B", "b")]);
        entries.retain(|e| e.name != "Main/B");
        entries.push(ArchiveEntry {
            name: "Stray/File".into(),
            bytes: b"junk".to_vec(),
        });

        let package = Importer::new().import_entries(entries).unwrap();
        assert_eq!(package.staged().len(), 1);
        assert_eq!(package.missing()[0].entry_name, "Main/B");
        assert_eq!(package.unlisted().to_vec(), vec!["Stray/File".to_string()]);
        assert!(package.decode_failures().is_empty());
    }

    #[test]
    fn test_legacy_xml_suffix_is_found() {
        let mut entries = entries_for(&[doc("Main", "A", "a")]);
        for e in &mut entries {
            if e.name == "Main/A" {
                e.name = "Main/A.xml".into();
            }
        }
        let package = Importer::new().import_entries(entries).unwrap();
        assert_eq!(package.staged().len(), 1);
        assert!(package.unlisted().is_empty());
    }

    #[test]
    fn test_entries_are_paired_by_decoded_identity() {
        let mut entries = entries_for(&[doc("Main", "A", "a"), doc("Main", "B", "b")]);
        for e in &mut entries {
            match e.name.as_str() {
                "Main/A" => e.name = "renamed/first".into(),
                "Main/B" => e.name = "Main/A".into(),
                _ => {}
            }
        }
        let package = Importer::new().import_entries(entries).unwrap();
        assert_eq!(package.staged().len(), 2);
        assert_eq!(package.document(&DocumentKey::new("Main", "A")).unwrap().content, "a");
        assert_eq!(package.document(&DocumentKey::new("Main", "B")).unwrap().content, "b");
        assert!(package.unlisted().is_empty());
        assert!(package.missing().is_empty());
    }

    #[test]
    fn test_dotted_name_and_translation_import_side_by_side() {
        let mut notes_fr = doc("Main", "Notes.fr", "page named Notes.fr");
        notes_fr.title = "original".into();
        let mut translation = Document::new(DocumentKey::new("Main", "Notes").with_language("fr"));
        translation.content = "notes en français".into();
        let entries = entries_for(&[notes_fr, translation]);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Main/Notes%2Efr", "Main/Notes.fr", PACKAGE_MANIFEST]);

        let package = Importer::new().import_entries(entries).unwrap();
        assert_eq!(package.staged().len(), 2);
        let original = package.document(&DocumentKey::new("Main", "Notes.fr")).unwrap();
        assert_eq!(original.title, "original");
        let translated = package
            .document(&DocumentKey::new("Main", "Notes").with_language("fr"))
            .unwrap();
        assert_eq!(translated.content, "notes en français");
    }

    #[test]
    fn test_unescaped_legacy_path_reports_failure_on_its_entry() {
        let mut entries = entries_for(&[doc("My.Space", "Page", "p")]);
        for e in &mut entries {
            if e.name == "My%2ESpace/Page" {
                e.name = "My.Space/Page".into();
                e.bytes = b"<document><space>".to_vec();
            }
        }
        let package = Importer::new().import_entries(entries).unwrap();
        assert!(package.staged().is_empty());
        assert_eq!(package.decode_failures().len(), 1);
        assert_eq!(package.decode_failures()[0].entry.key, DocumentKey::new("My.Space", "Page"));
        assert!(package.missing().is_empty());
        assert!(package.unlisted().is_empty());
    }

    #[test]
    fn test_entry_for_another_document_fails_decode() {
        let mut entries = entries_for(&[doc("Main", "A", "a")]);
        let other = encode_document(&doc("Main", "Other", "x"), &Charset::utf8()).unwrap();
        for e in &mut entries {
            if e.name == "Main/A" {
                e.bytes = other.clone();
            }
        }
        let package = Importer::new().import_entries(entries).unwrap();
        assert!(package.staged().is_empty());
        assert_eq!(package.decode_failures().len(), 1);
    }

    #[test]
    fn test_filters_drop_entries_before_decode() {
        let entries = entries_for(&[doc("Main", "A", "a"), doc("Sandbox", "B", "b")]);
        let package = Importer::new()
            .with_filter(crate::filter::SpaceFilter::include(["Main"]))
            .import_entries(entries)
            .unwrap();
        assert_eq!(package.staged().len(), 1);
        assert_eq!(package.filtered()[0].entry_name, "Sandbox/B");
    }

    #[test]
    fn test_set_action_and_summary() {
        let mut package = Importer::new()
            .import_entries(entries_for(&[doc("Main", "A", "a")]))
            .unwrap();
        assert!(package.set_action("Main/A", DefaultAction::Skip));
        assert!(!package.set_action("Main/Nope", DefaultAction::Skip));
        assert_eq!(package.staged()[0].action, DefaultAction::Skip);

        let summary = package.summary_json();
        assert_eq!(summary["staged"], 1);
        assert_eq!(summary["files"][0]["entry"], "Main/A");
    }
}
