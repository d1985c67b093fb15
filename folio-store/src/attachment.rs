//! Attachment store roles.
//!
//! Attachments hang off the original document: implementations address them
//! by `(key.original(), filename)` whatever language the caller passes.

use crate::document::SaveOutcome;
use crate::error::StoreResult;
use folio_core::{
    unix_now, Attachment, AttachmentRevision, DeletedAttachment, DocumentKey, EntryId, Version,
};

pub trait AttachmentStore: Send + Sync {
    /// Persist the attachment and assign its next version.
    fn save_attachment(&self, doc: &DocumentKey, attachment: &mut Attachment) -> StoreResult<SaveOutcome>;

    fn load_attachment(&self, doc: &DocumentKey, filename: &str) -> StoreResult<Option<Attachment>>;

    fn delete_attachment(&self, doc: &DocumentKey, filename: &str) -> StoreResult<()>;

    /// File names attached to the document, sorted.
    fn list_attachments(&self, doc: &DocumentKey) -> StoreResult<Vec<String>>;
}

pub trait AttachmentVersioningStore: Send + Sync {
    /// Revisions of one attachment, oldest first.
    fn attachment_archive(&self, doc: &DocumentKey, filename: &str) -> StoreResult<Vec<AttachmentRevision>>;

    fn append_attachment_revision(&self, doc: &DocumentKey, attachment: &Attachment) -> StoreResult<()>;

    fn purge_attachment_history(&self, doc: &DocumentKey, filename: &str) -> StoreResult<()>;
}

pub trait AttachmentRecycleBinStore: Send + Sync {
    fn move_attachment_to_recycle_bin(
        &self,
        doc: &DocumentKey,
        attachment: &Attachment,
        deleter: &str,
    ) -> StoreResult<EntryId>;

    fn restore_attachment(&self, id: EntryId) -> StoreResult<DeletedAttachment>;

    fn purge_attachment(&self, id: EntryId) -> StoreResult<()>;

    fn deleted_attachments(&self, doc: &DocumentKey) -> StoreResult<Vec<DeletedAttachment>>;
}

/// Assign the next attachment version. Unchanged bytes keep the version.
pub(crate) fn prepare_attachment(
    stored: Option<&Attachment>,
    attachment: &mut Attachment,
) -> SaveOutcome {
    match stored {
        Some(current) if current.content == attachment.content => {
            attachment.version = current.version;
            SaveOutcome::Unchanged
        }
        Some(current) => {
            attachment.version = Version::new(current.version.major, current.version.minor + 1);
            attachment.updated_at = unix_now();
            SaveOutcome::Updated
        }
        None if attachment.version.is_none() => {
            attachment.version = Version::INITIAL;
            attachment.updated_at = unix_now();
            SaveOutcome::Created
        }
        None => {
            // Restored attachment: continue after its last version.
            attachment.version =
                Version::new(attachment.version.major, attachment.version.minor + 1);
            attachment.updated_at = unix_now();
            SaveOutcome::Created
        }
    }
}
