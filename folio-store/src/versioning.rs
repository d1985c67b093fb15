//! Append-only revision history per document-translation.
//!
//! ```text
//!   NoHistory ──first save──► HasHistory(1.1)
//!   HasHistory(v) ──save──► HasHistory(v'), v' > v
//!   HasHistory(*) ──reset_history──► HasHistory(1.1)
//! ```
//!
//! Deleting a document leaves its history in place; only `purge_history`
//! removes it.

use crate::error::{StoreError, StoreResult};
use folio_core::{Document, DocumentKey, Revision, Version};

pub trait VersioningStore: Send + Sync {
    /// Revisions of one document-translation, oldest first.
    fn archive(&self, key: &DocumentKey) -> StoreResult<Vec<Revision>>;

    /// Record the document at its current version. The version must be
    /// strictly greater than the latest archived one.
    fn append_revision(&self, doc: &Document, comment: &str, author: &str) -> StoreResult<()>;

    /// Collapse the history to a single revision at 1.1 holding `doc`.
    fn reset_history(&self, doc: &Document) -> StoreResult<()>;

    fn purge_history(&self, key: &DocumentKey) -> StoreResult<()>;

    fn load_revision(&self, key: &DocumentKey, version: Version) -> StoreResult<Option<Revision>>;

    /// Version of the newest archived revision.
    fn latest_version(&self, key: &DocumentKey) -> StoreResult<Option<Version>> {
        Ok(self.archive(key)?.last().map(|r| r.version))
    }
}

/// Reject an append that would not move the history forward.
pub(crate) fn check_append(latest: Option<Version>, doc: &Document) -> StoreResult<()> {
    match latest {
        Some(latest) if doc.version <= latest => Err(StoreError::VersionRegression {
            key: doc.key.clone(),
            latest,
            attempted: doc.version,
        }),
        _ => Ok(()),
    }
}

/// The single revision left after a history reset.
pub(crate) fn initial_revision(doc: &Document) -> Revision {
    let mut snapshot = doc.clone();
    snapshot.version = Version::INITIAL;
    Revision::of(&snapshot, &doc.comment, &doc.author, doc.updated_at)
}
