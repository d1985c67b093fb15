//! In-memory backend.
//!
//! Implements every store role over a single `RwLock`, so each operation is
//! atomic with respect to the others. Intended for tests, previews and
//! short-lived tools; nothing survives the process.

use crate::attachment::{
    prepare_attachment, AttachmentRecycleBinStore, AttachmentStore, AttachmentVersioningStore,
};
use crate::document::{prepare_save, translations_of, DocumentStore, SaveOutcome};
use crate::error::{StoreError, StoreResult};
use crate::recycle_bin::{sort_entries, RecycleBinStore};
use crate::versioning::{check_append, initial_revision, VersioningStore};
use folio_core::{
    unix_now, Attachment, AttachmentRevision, DeletedAttachment, DeletedDocument, Document,
    DocumentKey, EntryId, Revision, Version, VersionPolicy,
};
use std::collections::BTreeMap;
use std::sync::RwLock;

type AttachmentKey = (DocumentKey, String);

#[derive(Default)]
struct MemoryState {
    documents: BTreeMap<DocumentKey, Document>,
    revisions: BTreeMap<DocumentKey, Vec<Revision>>,
    recycle_bin: BTreeMap<EntryId, DeletedDocument>,
    attachments: BTreeMap<AttachmentKey, Attachment>,
    attachment_revisions: BTreeMap<AttachmentKey, Vec<Attachment>>,
    attachment_recycle_bin: BTreeMap<EntryId, DeletedAttachment>,
    next_entry: u64,
}

impl MemoryState {
    fn next_entry_id(&mut self) -> EntryId {
        self.next_entry += 1;
        EntryId(self.next_entry)
    }
}

pub struct MemoryStore {
    state: RwLock<MemoryState>,
    policy: VersionPolicy,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub const NAME: &'static str = "memory";

    pub fn new() -> Self {
        Self::with_policy(VersionPolicy::default())
    }

    pub fn with_policy(policy: VersionPolicy) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            policy,
        }
    }

    /// Number of stored document-translations.
    pub fn len(&self) -> usize {
        self.state.read().map(|s| s.documents.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn attachment_key(doc: &DocumentKey, filename: &str) -> AttachmentKey {
    (doc.original(), filename.to_string())
}

impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn load(&self, key: &DocumentKey) -> StoreResult<Document> {
        let state = self.state.read()?;
        match state.documents.get(key) {
            Some(stored) => {
                let mut doc = stored.clone();
                doc.mark_persisted(Self::NAME);
                Ok(doc)
            }
            None => {
                let mut doc = Document::new(key.clone());
                doc.mark_missing(Self::NAME);
                Ok(doc)
            }
        }
    }

    fn save(&self, doc: &mut Document) -> StoreResult<SaveOutcome> {
        let mut state = self.state.write()?;
        let outcome = prepare_save(state.documents.get(&doc.key), doc, &self.policy)?;
        if outcome.changed() {
            state.documents.insert(doc.key.clone(), doc.clone());
        }
        doc.mark_persisted(Self::NAME);
        log::debug!("memory save {} -> {:?} at {}", doc.key, outcome, doc.version);
        Ok(outcome)
    }

    fn delete(&self, doc: &Document) -> StoreResult<()> {
        self.state.write()?.documents.remove(&doc.key);
        Ok(())
    }

    fn list_translations(&self, doc: &Document) -> StoreResult<Vec<String>> {
        let state = self.state.read()?;
        Ok(translations_of(doc, state.documents.keys()))
    }

    fn exists(&self, key: &DocumentKey) -> StoreResult<bool> {
        Ok(self.state.read()?.documents.contains_key(key))
    }

    fn list_documents(&self) -> StoreResult<Vec<DocumentKey>> {
        Ok(self.state.read()?.documents.keys().cloned().collect())
    }
}

impl VersioningStore for MemoryStore {
    fn archive(&self, key: &DocumentKey) -> StoreResult<Vec<Revision>> {
        let state = self.state.read()?;
        Ok(state.revisions.get(key).cloned().unwrap_or_default())
    }

    fn append_revision(&self, doc: &Document, comment: &str, author: &str) -> StoreResult<()> {
        let mut state = self.state.write()?;
        let history = state.revisions.entry(doc.key.clone()).or_default();
        check_append(history.last().map(|r| r.version), doc)?;
        history.push(Revision::of(doc, comment, author, unix_now()));
        Ok(())
    }

    fn reset_history(&self, doc: &Document) -> StoreResult<()> {
        let mut state = self.state.write()?;
        state.revisions.insert(doc.key.clone(), vec![initial_revision(doc)]);
        Ok(())
    }

    fn purge_history(&self, key: &DocumentKey) -> StoreResult<()> {
        self.state.write()?.revisions.remove(key);
        Ok(())
    }

    fn load_revision(&self, key: &DocumentKey, version: Version) -> StoreResult<Option<Revision>> {
        let state = self.state.read()?;
        Ok(state
            .revisions
            .get(key)
            .and_then(|h| h.iter().find(|r| r.version == version))
            .cloned())
    }
}

impl RecycleBinStore for MemoryStore {
    fn move_to_recycle_bin(&self, doc: &Document, deleter: &str) -> StoreResult<EntryId> {
        let mut state = self.state.write()?;
        let id = state.next_entry_id();
        state.recycle_bin.insert(
            id,
            DeletedDocument {
                id,
                key: doc.key.clone(),
                deleter: deleter.to_string(),
                deleted_at: unix_now(),
                document: doc.clone(),
            },
        );
        Ok(id)
    }

    fn restore(&self, id: EntryId) -> StoreResult<Document> {
        let state = self.state.read()?;
        let entry = state.recycle_bin.get(&id).ok_or(StoreError::EntryNotFound(id))?;
        let mut doc = entry.document.clone();
        doc.mark_detached();
        Ok(doc)
    }

    fn purge(&self, id: EntryId) -> StoreResult<()> {
        self.state
            .write()?
            .recycle_bin
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::EntryNotFound(id))
    }

    fn deleted_entries(&self, key: &DocumentKey) -> StoreResult<Vec<DeletedDocument>> {
        let state = self.state.read()?;
        let mut entries: Vec<DeletedDocument> = state
            .recycle_bin
            .values()
            .filter(|e| &e.key == key)
            .cloned()
            .collect();
        sort_entries(&mut entries);
        Ok(entries)
    }

    fn all_entries(&self) -> StoreResult<Vec<DeletedDocument>> {
        let mut entries: Vec<DeletedDocument> =
            self.state.read()?.recycle_bin.values().cloned().collect();
        sort_entries(&mut entries);
        Ok(entries)
    }
}

impl AttachmentStore for MemoryStore {
    fn save_attachment(&self, doc: &DocumentKey, attachment: &mut Attachment) -> StoreResult<SaveOutcome> {
        let mut state = self.state.write()?;
        let key = attachment_key(doc, &attachment.filename);
        let outcome = prepare_attachment(state.attachments.get(&key), attachment);
        if outcome.changed() {
            state.attachments.insert(key, attachment.clone());
        }
        Ok(outcome)
    }

    fn load_attachment(&self, doc: &DocumentKey, filename: &str) -> StoreResult<Option<Attachment>> {
        let state = self.state.read()?;
        Ok(state.attachments.get(&attachment_key(doc, filename)).cloned())
    }

    fn delete_attachment(&self, doc: &DocumentKey, filename: &str) -> StoreResult<()> {
        self.state.write()?.attachments.remove(&attachment_key(doc, filename));
        Ok(())
    }

    fn list_attachments(&self, doc: &DocumentKey) -> StoreResult<Vec<String>> {
        let original = doc.original();
        let state = self.state.read()?;
        Ok(state
            .attachments
            .keys()
            .filter(|(k, _)| *k == original)
            .map(|(_, name)| name.clone())
            .collect())
    }
}

impl AttachmentVersioningStore for MemoryStore {
    fn attachment_archive(&self, doc: &DocumentKey, filename: &str) -> StoreResult<Vec<AttachmentRevision>> {
        let state = self.state.read()?;
        let document = doc.original();
        Ok(state
            .attachment_revisions
            .get(&attachment_key(doc, filename))
            .map(|h| {
                h.iter()
                    .map(|a| AttachmentRevision {
                        document: document.clone(),
                        attachment: a.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn append_attachment_revision(&self, doc: &DocumentKey, attachment: &Attachment) -> StoreResult<()> {
        let mut state = self.state.write()?;
        let history = state
            .attachment_revisions
            .entry(attachment_key(doc, &attachment.filename))
            .or_default();
        match history.last() {
            Some(last) if attachment.version <= last.version => Err(StoreError::VersionRegression {
                key: doc.original(),
                latest: last.version,
                attempted: attachment.version,
            }),
            _ => {
                history.push(attachment.clone());
                Ok(())
            }
        }
    }

    fn purge_attachment_history(&self, doc: &DocumentKey, filename: &str) -> StoreResult<()> {
        self.state
            .write()?
            .attachment_revisions
            .remove(&attachment_key(doc, filename));
        Ok(())
    }
}

impl AttachmentRecycleBinStore for MemoryStore {
    fn move_attachment_to_recycle_bin(
        &self,
        doc: &DocumentKey,
        attachment: &Attachment,
        deleter: &str,
    ) -> StoreResult<EntryId> {
        let mut state = self.state.write()?;
        let id = state.next_entry_id();
        state.attachment_recycle_bin.insert(
            id,
            DeletedAttachment {
                id,
                document: doc.original(),
                deleter: deleter.to_string(),
                deleted_at: unix_now(),
                attachment: attachment.clone(),
            },
        );
        Ok(id)
    }

    fn restore_attachment(&self, id: EntryId) -> StoreResult<DeletedAttachment> {
        let state = self.state.read()?;
        state
            .attachment_recycle_bin
            .get(&id)
            .cloned()
            .ok_or(StoreError::EntryNotFound(id))
    }

    fn purge_attachment(&self, id: EntryId) -> StoreResult<()> {
        self.state
            .write()?
            .attachment_recycle_bin
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::EntryNotFound(id))
    }

    fn deleted_attachments(&self, doc: &DocumentKey) -> StoreResult<Vec<DeletedAttachment>> {
        let original = doc.original();
        let state = self.state.read()?;
        let mut entries: Vec<DeletedAttachment> = state
            .attachment_recycle_bin
            .values()
            .filter(|e| e.document == original)
            .cloned()
            .collect();
        entries.sort_by_key(|e| (e.deleted_at, e.id));
        Ok(entries)
    }
}
