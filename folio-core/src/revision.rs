//! History snapshots and recycle-bin entries.

use crate::document::Document;
use crate::key::DocumentKey;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable snapshot of one document-translation at one version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Revision {
    pub key: DocumentKey,
    pub version: Version,
    pub author: String,
    pub comment: String,
    /// Seconds since epoch.
    pub date: u64,
    pub document: Document,
}

impl Revision {
    /// Snapshot the document at its current version.
    pub fn of(document: &Document, comment: &str, author: &str, date: u64) -> Self {
        Self {
            key: document.key.clone(),
            version: document.version,
            author: author.to_string(),
            comment: comment.to_string(),
            date,
            document: document.clone(),
        }
    }
}

/// Opaque, store-assigned recycle-bin entry id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub u64);

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Soft-deleted document snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedDocument {
    pub id: EntryId,
    pub key: DocumentKey,
    pub deleter: String,
    /// Seconds since epoch.
    pub deleted_at: u64,
    pub document: Document,
}
