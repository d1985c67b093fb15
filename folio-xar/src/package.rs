//! Runtime state of one imported archive.
//!
//! A [`Package`] is only produced by an [`Importer`](crate::Importer) and
//! is consumed by [`install`](Package::install). Each import builds a new
//! one, so nothing staged for one archive can surface in another.

use crate::descriptor::{DefaultAction, PackageDescriptor, PackageInfo, XarEntry};
use crate::error::{CodecError, XarError};
use folio_core::{Document, DocumentKey};

/// A decoded entry waiting for install.
#[derive(Debug, Clone)]
pub struct StagedEntry {
    pub entry: XarEntry,
    /// Action install applies, initially the manifest's default action.
    pub action: DefaultAction,
    pub document: Document,
}

/// A manifest entry whose bytes could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeFailure {
    pub entry: XarEntry,
    pub error: CodecError,
}

impl DecodeFailure {
    pub fn to_error(&self) -> XarError {
        XarError::EntryDecode {
            entry: self.entry.entry_name.clone(),
            source: self.error.clone(),
        }
    }
}

#[derive(Debug)]
pub struct Package {
    pub(crate) descriptor: PackageDescriptor,
    pub(crate) staged: Vec<StagedEntry>,
    pub(crate) decode_failures: Vec<DecodeFailure>,
    pub(crate) missing: Vec<XarEntry>,
    pub(crate) filtered: Vec<XarEntry>,
    pub(crate) unlisted: Vec<String>,
}

impl Package {
    pub fn descriptor(&self) -> &PackageDescriptor {
        &self.descriptor
    }

    pub fn info(&self) -> &PackageInfo {
        &self.descriptor.info
    }

    /// Decoded entries in manifest order.
    pub fn staged(&self) -> &[StagedEntry] {
        &self.staged
    }

    pub fn decode_failures(&self) -> &[DecodeFailure] {
        &self.decode_failures
    }

    /// Manifest entries with no matching file in the archive.
    pub fn missing(&self) -> &[XarEntry] {
        &self.missing
    }

    /// Manifest entries dropped by the importer's filters.
    pub fn filtered(&self) -> &[XarEntry] {
        &self.filtered
    }

    /// Archive files the manifest does not list. They are never installed.
    pub fn unlisted(&self) -> &[String] {
        &self.unlisted
    }

    pub fn document(&self, key: &DocumentKey) -> Option<&Document> {
        self.staged
            .iter()
            .find(|s| &s.entry.key == key)
            .map(|s| &s.document)
    }

    /// Override the action of one staged entry. Returns false when no entry
    /// has that name.
    pub fn set_action(&mut self, entry_name: &str, action: DefaultAction) -> bool {
        match self.staged.iter_mut().find(|s| s.entry.entry_name == entry_name) {
            Some(staged) => {
                staged.action = action;
                true
            }
            None => false,
        }
    }

    /// Manifest summary plus what the scan found.
    pub fn summary_json(&self) -> serde_json::Value {
        let mut summary = self.descriptor.summary_json();
        let failures: Vec<serde_json::Value> = self
            .decode_failures
            .iter()
            .map(|f| serde_json::json!({ "entry": f.entry.entry_name, "error": f.error.to_string() }))
            .collect();
        let missing: Vec<&str> = self.missing.iter().map(|e| e.entry_name.as_str()).collect();
        summary["staged"] = serde_json::json!(self.staged.len());
        summary["decodeFailures"] = serde_json::json!(failures);
        summary["missing"] = serde_json::json!(missing);
        summary["unlisted"] = serde_json::json!(self.unlisted);
        summary
    }
}
