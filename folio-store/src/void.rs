//! Backend that stores nothing. Stands in for disabled roles such as
//! attachment versioning when it is switched off.

use crate::attachment::{AttachmentRecycleBinStore, AttachmentStore, AttachmentVersioningStore};
use crate::document::{DocumentStore, SaveOutcome};
use crate::error::{StoreError, StoreResult};
use crate::recycle_bin::RecycleBinStore;
use crate::versioning::VersioningStore;
use folio_core::{
    Attachment, AttachmentRevision, DeletedAttachment, DeletedDocument, Document, DocumentKey,
    EntryId, Revision, Version,
};

#[derive(Debug, Default, Clone, Copy)]
pub struct VoidStore;

impl VoidStore {
    pub const NAME: &'static str = "void";
}

impl DocumentStore for VoidStore {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn load(&self, key: &DocumentKey) -> StoreResult<Document> {
        let mut doc = Document::new(key.clone());
        doc.mark_missing(Self::NAME);
        Ok(doc)
    }

    fn save(&self, doc: &mut Document) -> StoreResult<SaveOutcome> {
        doc.version = Version::INITIAL;
        doc.mark_persisted(Self::NAME);
        Ok(SaveOutcome::Unchanged)
    }

    fn delete(&self, _doc: &Document) -> StoreResult<()> {
        Ok(())
    }

    fn list_translations(&self, _doc: &Document) -> StoreResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn exists(&self, _key: &DocumentKey) -> StoreResult<bool> {
        Ok(false)
    }

    fn list_documents(&self) -> StoreResult<Vec<DocumentKey>> {
        Ok(Vec::new())
    }
}

impl VersioningStore for VoidStore {
    fn archive(&self, _key: &DocumentKey) -> StoreResult<Vec<Revision>> {
        Ok(Vec::new())
    }

    fn append_revision(&self, _doc: &Document, _comment: &str, _author: &str) -> StoreResult<()> {
        Ok(())
    }

    fn reset_history(&self, _doc: &Document) -> StoreResult<()> {
        Ok(())
    }

    fn purge_history(&self, _key: &DocumentKey) -> StoreResult<()> {
        Ok(())
    }

    fn load_revision(&self, _key: &DocumentKey, _version: Version) -> StoreResult<Option<Revision>> {
        Ok(None)
    }
}

impl RecycleBinStore for VoidStore {
    fn move_to_recycle_bin(&self, _doc: &Document, _deleter: &str) -> StoreResult<EntryId> {
        Ok(EntryId(0))
    }

    fn restore(&self, id: EntryId) -> StoreResult<Document> {
        Err(StoreError::EntryNotFound(id))
    }

    fn purge(&self, id: EntryId) -> StoreResult<()> {
        Err(StoreError::EntryNotFound(id))
    }

    fn deleted_entries(&self, _key: &DocumentKey) -> StoreResult<Vec<DeletedDocument>> {
        Ok(Vec::new())
    }

    fn all_entries(&self) -> StoreResult<Vec<DeletedDocument>> {
        Ok(Vec::new())
    }
}

impl AttachmentStore for VoidStore {
    fn save_attachment(&self, _doc: &DocumentKey, _attachment: &mut Attachment) -> StoreResult<SaveOutcome> {
        Ok(SaveOutcome::Unchanged)
    }

    fn load_attachment(&self, _doc: &DocumentKey, _filename: &str) -> StoreResult<Option<Attachment>> {
        Ok(None)
    }

    fn delete_attachment(&self, _doc: &DocumentKey, _filename: &str) -> StoreResult<()> {
        Ok(())
    }

    fn list_attachments(&self, _doc: &DocumentKey) -> StoreResult<Vec<String>> {
        Ok(Vec::new())
    }
}

impl AttachmentVersioningStore for VoidStore {
    fn attachment_archive(&self, _doc: &DocumentKey, _filename: &str) -> StoreResult<Vec<AttachmentRevision>> {
        Ok(Vec::new())
    }

    fn append_attachment_revision(&self, _doc: &DocumentKey, _attachment: &Attachment) -> StoreResult<()> {
        Ok(())
    }

    fn purge_attachment_history(&self, _doc: &DocumentKey, _filename: &str) -> StoreResult<()> {
        Ok(())
    }
}

impl AttachmentRecycleBinStore for VoidStore {
    fn move_attachment_to_recycle_bin(
        &self,
        _doc: &DocumentKey,
        _attachment: &Attachment,
        _deleter: &str,
    ) -> StoreResult<EntryId> {
        Ok(EntryId(0))
    }

    fn restore_attachment(&self, id: EntryId) -> StoreResult<DeletedAttachment> {
        Err(StoreError::EntryNotFound(id))
    }

    fn purge_attachment(&self, id: EntryId) -> StoreResult<()> {
        Err(StoreError::EntryNotFound(id))
    }

    fn deleted_attachments(&self, _doc: &DocumentKey) -> StoreResult<Vec<DeletedAttachment>> {
        Ok(Vec::new())
    }
}
