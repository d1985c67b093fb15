//! Soft-deleted document snapshots.

use crate::error::StoreResult;
use folio_core::{DeletedDocument, Document, DocumentKey, EntryId};

pub trait RecycleBinStore: Send + Sync {
    /// Snapshot the document's full state with the deleting user and the
    /// current time. History is not touched.
    fn move_to_recycle_bin(&self, doc: &Document, deleter: &str) -> StoreResult<EntryId>;

    /// Detached copy of the snapshot, ready for the caller to save back.
    /// The entry stays in the bin until purged.
    fn restore(&self, id: EntryId) -> StoreResult<Document>;

    fn purge(&self, id: EntryId) -> StoreResult<()>;

    /// Entries of one document-translation, oldest deletion first.
    fn deleted_entries(&self, key: &DocumentKey) -> StoreResult<Vec<DeletedDocument>>;

    /// Every entry, oldest deletion first.
    fn all_entries(&self) -> StoreResult<Vec<DeletedDocument>>;
}

/// Order entries by deletion time, then by id.
pub(crate) fn sort_entries(entries: &mut [DeletedDocument]) {
    entries.sort_by_key(|e| (e.deleted_at, e.id));
}
