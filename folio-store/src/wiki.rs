//! Wiki facade over the resolved stores.
//!
//! Coordinates the main store with the optional versioning and recycle-bin
//! stores:
//!
//! ```text
//!  save_with ──► main.save ──changed──► versioning.append_revision
//!                          └─reset────► versioning.reset_history
//!  delete    ──► main.load ──► recycle_bin.move_to_recycle_bin ──► main.delete
//!  restore   ──► recycle_bin.restore ──► save ──► recycle_bin.purge
//! ```
//!
//! Every operation touching one document-translation runs under that key's
//! lock, so a save and the revision it appends are never interleaved with
//! another save of the same key.

use crate::attachment::AttachmentStore;
use crate::document::{DocumentStore, SaveOutcome};
use crate::error::{StoreError, StoreResult};
use crate::locks::KeyLocks;
use crate::recycle_bin::RecycleBinStore;
use crate::resolver::{ResolvedStores, StoreResolver};
use folio_core::{
    unix_now, Attachment, AttachmentRevision, DeletedDocument, Document, DocumentKey, EntryId,
    Revision, Version,
};
use std::borrow::Cow;
use std::sync::Arc;

/// How a save is recorded.
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Comment stored on the document and its revision.
    pub comment: String,
    /// Author to stamp, `None` keeps the document's author.
    pub author: Option<String>,
    pub major_edit: bool,
    /// Land on 1.1 and collapse the history to that single revision.
    pub reset_history: bool,
    /// Stamp the current time as the update date.
    pub stamp_date: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            comment: String::new(),
            author: None,
            major_edit: false,
            reset_history: false,
            stamp_date: true,
        }
    }
}

impl SaveOptions {
    pub fn comment(comment: impl Into<String>) -> Self {
        Self {
            comment: comment.into(),
            ..Self::default()
        }
    }
}

pub struct Wiki {
    stores: ResolvedStores,
    locks: KeyLocks<DocumentKey>,
}

impl Wiki {
    pub fn new(stores: ResolvedStores) -> Self {
        Self {
            stores,
            locks: KeyLocks::new(),
        }
    }

    pub fn from_resolver(resolver: &StoreResolver) -> StoreResult<Self> {
        Ok(Self::new(resolver.resolve()?))
    }

    /// Wiki with every role on one fresh in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(ResolvedStores::in_memory())
    }

    pub fn stores(&self) -> &ResolvedStores {
        &self.stores
    }

    pub fn versioning_enabled(&self) -> bool {
        self.stores.versioning.is_some()
    }

    pub fn recycle_bin_enabled(&self) -> bool {
        self.stores.recycle_bin.is_some()
    }

    fn main(&self) -> StoreResult<&Arc<dyn DocumentStore>> {
        self.stores
            .main
            .as_ref()
            .ok_or_else(|| StoreError::Failure("no main document store resolved".into()))
    }

    fn recycle_bin(&self) -> StoreResult<&Arc<dyn RecycleBinStore>> {
        self.stores
            .recycle_bin
            .as_ref()
            .ok_or_else(|| StoreError::Failure("recycle bin is disabled".into()))
    }

    fn attachments(&self) -> StoreResult<&Arc<dyn AttachmentStore>> {
        self.stores
            .attachment
            .as_ref()
            .ok_or_else(|| StoreError::Failure("no attachment store resolved".into()))
    }

    // ─── Documents ────────────────────────────────────────────────────

    pub fn load(&self, key: &DocumentKey) -> StoreResult<Document> {
        self.main()?.load(key)
    }

    pub fn exists(&self, key: &DocumentKey) -> StoreResult<bool> {
        self.main()?.exists(key)
    }

    pub fn list_documents(&self) -> StoreResult<Vec<DocumentKey>> {
        self.main()?.list_documents()
    }

    /// Save with a comment and default options.
    pub fn save(&self, doc: &mut Document, comment: &str) -> StoreResult<SaveOutcome> {
        self.save_with(doc, &SaveOptions::comment(comment))
    }

    pub fn save_with(&self, doc: &mut Document, options: &SaveOptions) -> StoreResult<SaveOutcome> {
        let key = doc.key.clone();
        self.locks.with_lock(&key, || self.save_locked(doc, options))
    }

    fn save_locked(&self, doc: &mut Document, options: &SaveOptions) -> StoreResult<SaveOutcome> {
        let main = self.main()?;

        // Stamps land on the caller's copy only once the main store accepted them.
        let mut pending = doc.clone();
        if let Some(author) = &options.author {
            pending.author = author.clone();
        }
        if !options.comment.is_empty() {
            pending.comment = options.comment.clone();
        }
        if options.stamp_date {
            pending.updated_at = unix_now();
        }
        pending.set_major_edit(options.major_edit);
        pending.set_reset_version(options.reset_history);

        if let Some(versioning) = &self.stores.versioning {
            if pending.loaded_version().is_none() && pending.version.is_none() && !options.reset_history {
                if let Some(latest) = versioning.latest_version(&pending.key)? {
                    pending.version = latest;
                }
            }
        }

        let outcome = main.save(&mut pending)?;
        *doc = pending;

        if let Some(versioning) = &self.stores.versioning {
            if options.reset_history {
                versioning.reset_history(doc)?;
            } else if outcome.changed() {
                versioning.append_revision(doc, &doc.comment, &doc.author)?;
            }
        }
        Ok(outcome)
    }

    /// Soft-delete: snapshot the stored row into the recycle bin when
    /// enabled, then remove it. History is kept. Deleting a key with no
    /// stored row does nothing and returns `None`.
    pub fn delete(&self, doc: &Document, deleter: &str) -> StoreResult<Option<EntryId>> {
        self.locks.with_lock(&doc.key, || {
            let main = self.main()?;
            let stored = main.load(&doc.key)?;
            if stored.is_new() {
                log::debug!("delete of {} ignored: nothing stored", doc.key);
                return Ok(None);
            }
            let entry = match &self.stores.recycle_bin {
                Some(bin) => Some(bin.move_to_recycle_bin(&stored, deleter)?),
                None => None,
            };
            main.delete(&stored)?;
            log::debug!("deleted {} (recycle bin entry {:?})", doc.key, entry);
            Ok(entry)
        })
    }

    pub fn translations(&self, doc: &Document) -> StoreResult<Vec<String>> {
        self.main()?.list_translations(&Document::new(doc.key.original()))
    }

    /// The translation of `original` in `language`, or `original` itself
    /// when no such translation is stored.
    pub fn translated_document<'a>(
        &self,
        original: &'a Document,
        language: &str,
    ) -> StoreResult<Cow<'a, Document>> {
        if language.is_empty()
            || language == original.key.language
            || language == original.default_language
        {
            return Ok(Cow::Borrowed(original));
        }
        let translation = self.load(&original.key.with_language(language))?;
        if translation.is_new() {
            Ok(Cow::Borrowed(original))
        } else {
            Ok(Cow::Owned(translation))
        }
    }

    // ─── History ──────────────────────────────────────────────────────

    /// Revisions oldest first; empty when versioning is disabled.
    pub fn history(&self, key: &DocumentKey) -> StoreResult<Vec<Revision>> {
        match &self.stores.versioning {
            Some(versioning) => versioning.archive(key),
            None => Ok(Vec::new()),
        }
    }

    pub fn revision(&self, key: &DocumentKey, version: Version) -> StoreResult<Option<Revision>> {
        match &self.stores.versioning {
            Some(versioning) => versioning.load_revision(key, version),
            None => Ok(None),
        }
    }

    pub fn purge_history(&self, key: &DocumentKey) -> StoreResult<()> {
        match &self.stores.versioning {
            Some(versioning) => versioning.purge_history(key),
            None => Ok(()),
        }
    }

    // ─── Recycle Bin ──────────────────────────────────────────────────

    pub fn deleted_documents(&self, key: &DocumentKey) -> StoreResult<Vec<DeletedDocument>> {
        match &self.stores.recycle_bin {
            Some(bin) => bin.deleted_entries(key),
            None => Ok(Vec::new()),
        }
    }

    /// Put a deleted snapshot back in place and drop it from the bin.
    /// Overwrites whatever row was recreated under the same key since.
    pub fn restore_from_recycle_bin(&self, id: EntryId, restorer: &str) -> StoreResult<Document> {
        let bin = self.recycle_bin()?;
        let snapshot = bin.restore(id)?;
        let key = snapshot.key.clone();

        let restored = self.locks.with_lock(&key, || {
            let mut target = self.main()?.load(&key)?;
            target.overwrite_from(&snapshot);
            let options = SaveOptions {
                comment: format!("Restored from recycle bin by {restorer}"),
                stamp_date: false,
                ..SaveOptions::default()
            };
            self.save_locked(&mut target, &options)?;
            Ok(target)
        })?;

        bin.purge(id)?;
        log::info!("restored {} from recycle bin entry {id}", restored.key);
        Ok(restored)
    }

    // ─── Attachments ──────────────────────────────────────────────────

    pub fn attachment_names(&self, doc: &DocumentKey) -> StoreResult<Vec<String>> {
        self.attachments()?.list_attachments(doc)
    }

    pub fn load_attachment(&self, doc: &DocumentKey, filename: &str) -> StoreResult<Option<Attachment>> {
        self.attachments()?.load_attachment(doc, filename)
    }

    pub fn save_attachment(
        &self,
        doc: &DocumentKey,
        attachment: &mut Attachment,
        author: &str,
    ) -> StoreResult<SaveOutcome> {
        attachment.author = author.to_string();
        let outcome = self.attachments()?.save_attachment(doc, attachment)?;
        if outcome.changed() {
            if let Some(history) = &self.stores.attachment_versioning {
                history.append_attachment_revision(doc, attachment)?;
            }
        }
        Ok(outcome)
    }

    pub fn attachment_history(&self, doc: &DocumentKey, filename: &str) -> StoreResult<Vec<AttachmentRevision>> {
        match &self.stores.attachment_versioning {
            Some(history) => history.attachment_archive(doc, filename),
            None => Ok(Vec::new()),
        }
    }

    /// Remove an attachment, keeping a copy in the attachment recycle bin
    /// when enabled. `None` when there was no such attachment or no bin.
    pub fn delete_attachment(
        &self,
        doc: &DocumentKey,
        filename: &str,
        deleter: &str,
    ) -> StoreResult<Option<EntryId>> {
        let store = self.attachments()?;
        let Some(attachment) = store.load_attachment(doc, filename)? else {
            return Ok(None);
        };
        let entry = match &self.stores.attachment_recycle_bin {
            Some(bin) => Some(bin.move_attachment_to_recycle_bin(doc, &attachment, deleter)?),
            None => None,
        };
        store.delete_attachment(doc, filename)?;
        Ok(entry)
    }

    pub fn restore_attachment(&self, id: EntryId, restorer: &str) -> StoreResult<Attachment> {
        let bin = self
            .stores
            .attachment_recycle_bin
            .as_ref()
            .ok_or_else(|| StoreError::Failure("attachment recycle bin is disabled".into()))?;
        let deleted = bin.restore_attachment(id)?;
        let mut attachment = deleted.attachment;
        self.save_attachment(&deleted.document, &mut attachment, restorer)?;
        bin.purge_attachment(id)?;
        Ok(attachment)
    }
}
