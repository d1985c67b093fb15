//! RocksDB-backed durable store.
//!
//! Column families:
//! - `documents`             : current row per document-translation
//! - `revisions`             : history, keyed by document key + version
//! - `recycle_bin`           : deleted snapshots, keyed by entry id
//! - `attachments`           : current attachment content
//! - `attachment_revisions`  : attachment history
//! - `attachment_recycle_bin`: deleted attachments, keyed by entry id
//!
//! Key layout:
//! ```text
//! document   : space \0 name \0 language \0
//! revision   : <document key> major:u32be minor:u32be
//! attachment : <original key> filename
//! att. rev.  : <original key> filename \0 major:u32be minor:u32be
//! bin entry  : id:u64be
//! ```
//!
//! Values are bincode-encoded and LZ4-compressed (see `codec`). Every
//! read-modify-write runs under a per-key lock so the version check and the
//! write are atomic.

use crate::attachment::{
    prepare_attachment, AttachmentRecycleBinStore, AttachmentStore, AttachmentVersioningStore,
};
use crate::codec;
use crate::document::{prepare_save, DocumentStore, SaveOutcome};
use crate::error::{StoreError, StoreResult};
use crate::locks::KeyLocks;
use crate::recycle_bin::{sort_entries, RecycleBinStore};
use crate::versioning::{check_append, initial_revision, VersioningStore};
use folio_core::{
    unix_now, Attachment, AttachmentRevision, DeletedAttachment, DeletedDocument, Document,
    DocumentKey, EntryId, Revision, Version, VersionPolicy,
};
use rocksdb::{
    BlockBasedOptions, Cache, ColumnFamilyDescriptor, DBCompressionType, DBWithThreadMode,
    Direction, IteratorMode, Options, SingleThreaded, WriteBatch, WriteOptions,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

const CF_DOCUMENTS: &str = "documents";
const CF_REVISIONS: &str = "revisions";
const CF_RECYCLE_BIN: &str = "recycle_bin";
const CF_ATTACHMENTS: &str = "attachments";
const CF_ATTACHMENT_REVISIONS: &str = "attachment_revisions";
const CF_ATTACHMENT_RECYCLE_BIN: &str = "attachment_recycle_bin";

const COLUMN_FAMILIES: &[&str] = &[
    CF_DOCUMENTS,
    CF_REVISIONS,
    CF_RECYCLE_BIN,
    CF_ATTACHMENTS,
    CF_ATTACHMENT_REVISIONS,
    CF_ATTACHMENT_RECYCLE_BIN,
];

/// RocksDB tuning.
#[derive(Debug, Clone)]
pub struct RocksConfig {
    /// Database directory path
    pub path: PathBuf,
    /// Block cache size in bytes (default: 64MB)
    pub block_cache_size: usize,
    /// Bloom filter bits per key (default: 10)
    pub bloom_filter_bits: i32,
    /// Enable fsync on every write (default: false)
    pub sync_writes: bool,
    /// Max open files for RocksDB (default: 512)
    pub max_open_files: i32,
    /// Write buffer size per column family (default: 32MB)
    pub write_buffer_size: usize,
}

impl Default for RocksConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("folio_data"),
            block_cache_size: 64 * 1024 * 1024,
            bloom_filter_bits: 10,
            sync_writes: false,
            max_open_files: 512,
            write_buffer_size: 32 * 1024 * 1024,
        }
    }
}

impl RocksConfig {
    /// Default tuning at the given directory.
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Small caches, caller-provided directory.
    pub fn for_testing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            block_cache_size: 8 * 1024 * 1024,
            bloom_filter_bits: 10,
            sync_writes: false,
            max_open_files: 64,
            write_buffer_size: 4 * 1024 * 1024,
        }
    }
}

pub struct RocksStore {
    db: DBWithThreadMode<SingleThreaded>,
    config: RocksConfig,
    policy: VersionPolicy,
    /// Next recycle-bin entry id, shared by documents and attachments.
    sequence: AtomicU64,
    locks: KeyLocks<Vec<u8>>,
}

impl RocksStore {
    pub const NAME: &'static str = "rocksdb";

    /// Open the store, creating the database and column families if needed.
    pub fn open(config: RocksConfig, policy: VersionPolicy) -> StoreResult<Self> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_open_files(config.max_open_files);
        db_opts.set_keep_log_file_num(5);
        db_opts.increase_parallelism(num_cpus());

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = COLUMN_FAMILIES
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Self::cf_options(name, &config)))
            .collect();

        let db = DBWithThreadMode::<SingleThreaded>::open_cf_descriptors(
            &db_opts,
            &config.path,
            cf_descriptors,
        )?;

        let sequence = Self::recover_sequence(&db, CF_RECYCLE_BIN)
            .max(Self::recover_sequence(&db, CF_ATTACHMENT_RECYCLE_BIN));
        log::info!("opened rocksdb store at {}", config.path.display());

        Ok(Self {
            db,
            config,
            policy,
            sequence: AtomicU64::new(sequence),
            locks: KeyLocks::new(),
        })
    }

    fn cf_options(name: &str, config: &RocksConfig) -> Options {
        let mut opts = Options::default();

        let mut block_opts = BlockBasedOptions::default();
        let cache = Cache::new_lru_cache(config.block_cache_size);
        block_opts.set_block_cache(&cache);
        block_opts.set_bloom_filter(config.bloom_filter_bits as f64, false);
        block_opts.set_block_size(16 * 1024);
        opts.set_block_based_table_factory(&block_opts);

        // Values are already LZ4 framed by the codec.
        opts.set_compression_type(DBCompressionType::None);
        opts.set_write_buffer_size(config.write_buffer_size);

        match name {
            CF_REVISIONS | CF_ATTACHMENT_REVISIONS => {
                // Append-heavy, prefix-scanned per document
                opts.set_max_write_buffer_number(4);
            }
            _ => {
                opts.set_max_write_buffer_number(2);
            }
        }

        opts
    }

    /// Next entry id after the highest id stored in `cf_name`.
    fn recover_sequence(db: &DBWithThreadMode<SingleThreaded>, cf_name: &str) -> u64 {
        let cf = match db.cf_handle(cf_name) {
            Some(cf) => cf,
            None => return 0,
        };

        let mut iter = db.iterator_cf(cf, IteratorMode::End);
        match iter.next() {
            Some(Ok((key, _))) if key.len() >= 8 => {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(&key[..8]);
                u64::from_be_bytes(buf) + 1
            }
            _ => 0,
        }
    }

    /// Force a flush of the memtables.
    pub fn sync(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    // ─── Helpers ──────────────────────────────────────────────────────

    fn cf(&self, name: &str) -> StoreResult<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Failure(format!("column family '{name}' not found")))
    }

    fn write_opts(&self) -> WriteOptions {
        let mut opts = WriteOptions::default();
        opts.set_sync(self.config.sync_writes);
        opts
    }

    fn get<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> StoreResult<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> StoreResult<()> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf_opt(cf, key, codec::encode(value)?, &self.write_opts())?;
        Ok(())
    }

    fn remove(&self, cf_name: &str, key: &[u8]) -> StoreResult<()> {
        let cf = self.cf(cf_name)?;
        self.db.delete_cf_opt(cf, key, &self.write_opts())?;
        Ok(())
    }

    /// Raw keys starting with `prefix`, in key order.
    fn scan_keys(&self, cf_name: &str, prefix: &[u8]) -> StoreResult<Vec<Box<[u8]>>> {
        let cf = self.cf(cf_name)?;
        let mut keys = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward)) {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            keys.push(key);
        }
        Ok(keys)
    }

    /// Decoded values whose keys start with `prefix`, in key order.
    fn scan<T: DeserializeOwned>(&self, cf_name: &str, prefix: &[u8]) -> StoreResult<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward)) {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            values.push(codec::decode(&value)?);
        }
        Ok(values)
    }

    fn next_entry_id(&self) -> EntryId {
        EntryId(self.sequence.fetch_add(1, Ordering::SeqCst))
    }
}

// ─── Key Encoding ─────────────────────────────────────────────────────────

fn document_key(key: &DocumentKey) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.space.len() + key.name.len() + key.language.len() + 3);
    for part in [&key.space, &key.name, &key.language] {
        out.extend_from_slice(part.as_bytes());
        out.push(0);
    }
    out
}

/// Prefix shared by a document and all its translations.
fn full_name_prefix(key: &DocumentKey) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.space.len() + key.name.len() + 2);
    for part in [&key.space, &key.name] {
        out.extend_from_slice(part.as_bytes());
        out.push(0);
    }
    out
}

fn parse_document_key(bytes: &[u8]) -> StoreResult<DocumentKey> {
    let invalid = || StoreError::Failure("malformed document key".into());
    let mut parts = bytes.split(|b| *b == 0);
    let mut next = || -> StoreResult<String> {
        let part = parts.next().ok_or_else(invalid)?;
        String::from_utf8(part.to_vec()).map_err(|_| invalid())
    };
    let space = next()?;
    let name = next()?;
    let language = next()?;
    Ok(DocumentKey {
        space,
        name,
        language,
    })
}

fn versioned_key(prefix: &[u8], version: Version) -> Vec<u8> {
    let mut out = Vec::with_capacity(prefix.len() + 8);
    out.extend_from_slice(prefix);
    out.extend_from_slice(&version.major.to_be_bytes());
    out.extend_from_slice(&version.minor.to_be_bytes());
    out
}

fn attachment_key(doc: &DocumentKey, filename: &str) -> Vec<u8> {
    let mut out = document_key(&doc.original());
    out.extend_from_slice(filename.as_bytes());
    out
}

fn attachment_history_prefix(doc: &DocumentKey, filename: &str) -> Vec<u8> {
    let mut out = attachment_key(doc, filename);
    out.push(0);
    out
}

fn lock_key(tag: u8, key: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.len() + 1);
    out.push(tag);
    out.extend_from_slice(key);
    out
}

/// Get number of CPU cores for RocksDB parallelism.
fn num_cpus() -> i32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as i32)
        .unwrap_or(4)
}

// ─── Documents ────────────────────────────────────────────────────────────

impl DocumentStore for RocksStore {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn load(&self, key: &DocumentKey) -> StoreResult<Document> {
        match self.get::<Document>(CF_DOCUMENTS, &document_key(key))? {
            Some(mut doc) => {
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
        let raw = document_key(&doc.key);
        let outcome = self.locks.with_lock(&lock_key(b'd', &raw), || {
            let stored: Option<Document> = self.get(CF_DOCUMENTS, &raw)?;
            let outcome = prepare_save(stored.as_ref(), doc, &self.policy)?;
            if outcome.changed() {
                self.put(CF_DOCUMENTS, &raw, &*doc)?;
            }
            Ok(outcome)
        })?;
        doc.mark_persisted(Self::NAME);
        log::debug!("rocksdb save {} -> {:?} at {}", doc.key, outcome, doc.version);
        Ok(outcome)
    }

    fn delete(&self, doc: &Document) -> StoreResult<()> {
        let raw = document_key(&doc.key);
        self.locks
            .with_lock(&lock_key(b'd', &raw), || self.remove(CF_DOCUMENTS, &raw))
    }

    fn list_translations(&self, doc: &Document) -> StoreResult<Vec<String>> {
        let mut languages = Vec::new();
        for raw in self.scan_keys(CF_DOCUMENTS, &full_name_prefix(&doc.key))? {
            let key = parse_document_key(&raw)?;
            if key.is_translation() {
                languages.push(key.language);
            }
        }
        Ok(languages)
    }

    fn exists(&self, key: &DocumentKey) -> StoreResult<bool> {
        let cf = self.cf(CF_DOCUMENTS)?;
        Ok(self.db.get_cf(cf, document_key(key))?.is_some())
    }

    fn list_documents(&self) -> StoreResult<Vec<DocumentKey>> {
        self.scan_keys(CF_DOCUMENTS, &[])?
            .iter()
            .map(|raw| parse_document_key(raw))
            .collect()
    }
}

// ─── Revisions ────────────────────────────────────────────────────────────

impl VersioningStore for RocksStore {
    fn archive(&self, key: &DocumentKey) -> StoreResult<Vec<Revision>> {
        self.scan(CF_REVISIONS, &document_key(key))
    }

    fn append_revision(&self, doc: &Document, comment: &str, author: &str) -> StoreResult<()> {
        let prefix = document_key(&doc.key);
        self.locks.with_lock(&lock_key(b'r', &prefix), || {
            let latest = self
                .scan_keys(CF_REVISIONS, &prefix)?
                .last()
                .and_then(|raw| version_suffix(raw));
            check_append(latest, doc)?;
            let revision = Revision::of(doc, comment, author, unix_now());
            self.put(CF_REVISIONS, &versioned_key(&prefix, doc.version), &revision)
        })
    }

    fn reset_history(&self, doc: &Document) -> StoreResult<()> {
        let prefix = document_key(&doc.key);
        self.locks.with_lock(&lock_key(b'r', &prefix), || {
            let cf = self.cf(CF_REVISIONS)?;
            let mut batch = WriteBatch::default();
            for raw in self.scan_keys(CF_REVISIONS, &prefix)? {
                batch.delete_cf(cf, raw);
            }
            let revision = initial_revision(doc);
            batch.put_cf(cf, versioned_key(&prefix, Version::INITIAL), codec::encode(&revision)?);
            self.db.write_opt(batch, &self.write_opts())?;
            Ok(())
        })
    }

    fn purge_history(&self, key: &DocumentKey) -> StoreResult<()> {
        let prefix = document_key(key);
        self.locks.with_lock(&lock_key(b'r', &prefix), || {
            let cf = self.cf(CF_REVISIONS)?;
            let mut batch = WriteBatch::default();
            for raw in self.scan_keys(CF_REVISIONS, &prefix)? {
                batch.delete_cf(cf, raw);
            }
            self.db.write_opt(batch, &self.write_opts())?;
            Ok(())
        })
    }

    fn load_revision(&self, key: &DocumentKey, version: Version) -> StoreResult<Option<Revision>> {
        self.get(CF_REVISIONS, &versioned_key(&document_key(key), version))
    }

    fn latest_version(&self, key: &DocumentKey) -> StoreResult<Option<Version>> {
        Ok(self
            .scan_keys(CF_REVISIONS, &document_key(key))?
            .last()
            .and_then(|raw| version_suffix(raw)))
    }
}

/// Version encoded in the last eight bytes of a history key.
fn version_suffix(raw: &[u8]) -> Option<Version> {
    let tail = raw.len().checked_sub(8).map(|start| &raw[start..])?;
    let major = u32::from_be_bytes(tail[..4].try_into().ok()?);
    let minor = u32::from_be_bytes(tail[4..].try_into().ok()?);
    Some(Version::new(major, minor))
}

// ─── Recycle Bin ──────────────────────────────────────────────────────────

impl RecycleBinStore for RocksStore {
    fn move_to_recycle_bin(&self, doc: &Document, deleter: &str) -> StoreResult<EntryId> {
        let id = self.next_entry_id();
        let entry = DeletedDocument {
            id,
            key: doc.key.clone(),
            deleter: deleter.to_string(),
            deleted_at: unix_now(),
            document: doc.clone(),
        };
        self.put(CF_RECYCLE_BIN, &id.0.to_be_bytes(), &entry)?;
        Ok(id)
    }

    fn restore(&self, id: EntryId) -> StoreResult<Document> {
        let entry: DeletedDocument = self
            .get(CF_RECYCLE_BIN, &id.0.to_be_bytes())?
            .ok_or(StoreError::EntryNotFound(id))?;
        let mut doc = entry.document;
        doc.mark_detached();
        Ok(doc)
    }

    fn purge(&self, id: EntryId) -> StoreResult<()> {
        let raw = id.0.to_be_bytes();
        let cf = self.cf(CF_RECYCLE_BIN)?;
        if self.db.get_cf(cf, raw)?.is_none() {
            return Err(StoreError::EntryNotFound(id));
        }
        self.remove(CF_RECYCLE_BIN, &raw)
    }

    fn deleted_entries(&self, key: &DocumentKey) -> StoreResult<Vec<DeletedDocument>> {
        let mut entries: Vec<DeletedDocument> = self
            .all_entries()?
            .into_iter()
            .filter(|e| &e.key == key)
            .collect();
        sort_entries(&mut entries);
        Ok(entries)
    }

    fn all_entries(&self) -> StoreResult<Vec<DeletedDocument>> {
        let mut entries: Vec<DeletedDocument> = self.scan(CF_RECYCLE_BIN, &[])?;
        sort_entries(&mut entries);
        Ok(entries)
    }
}

// ─── Attachments ──────────────────────────────────────────────────────────

impl AttachmentStore for RocksStore {
    fn save_attachment(&self, doc: &DocumentKey, attachment: &mut Attachment) -> StoreResult<SaveOutcome> {
        let raw = attachment_key(doc, &attachment.filename);
        self.locks.with_lock(&lock_key(b'a', &raw), || {
            let stored: Option<Attachment> = self.get(CF_ATTACHMENTS, &raw)?;
            let outcome = prepare_attachment(stored.as_ref(), attachment);
            if outcome.changed() {
                self.put(CF_ATTACHMENTS, &raw, &*attachment)?;
            }
            Ok(outcome)
        })
    }

    fn load_attachment(&self, doc: &DocumentKey, filename: &str) -> StoreResult<Option<Attachment>> {
        self.get(CF_ATTACHMENTS, &attachment_key(doc, filename))
    }

    fn delete_attachment(&self, doc: &DocumentKey, filename: &str) -> StoreResult<()> {
        self.remove(CF_ATTACHMENTS, &attachment_key(doc, filename))
    }

    fn list_attachments(&self, doc: &DocumentKey) -> StoreResult<Vec<String>> {
        let prefix = document_key(&doc.original());
        self.scan_keys(CF_ATTACHMENTS, &prefix)?
            .iter()
            .map(|raw| {
                String::from_utf8(raw[prefix.len()..].to_vec())
                    .map_err(|_| StoreError::Failure("malformed attachment key".into()))
            })
            .collect()
    }
}

impl AttachmentVersioningStore for RocksStore {
    fn attachment_archive(&self, doc: &DocumentKey, filename: &str) -> StoreResult<Vec<AttachmentRevision>> {
        let document = doc.original();
        Ok(self
            .scan::<Attachment>(CF_ATTACHMENT_REVISIONS, &attachment_history_prefix(doc, filename))?
            .into_iter()
            .map(|attachment| AttachmentRevision {
                document: document.clone(),
                attachment,
            })
            .collect())
    }

    fn append_attachment_revision(&self, doc: &DocumentKey, attachment: &Attachment) -> StoreResult<()> {
        let prefix = attachment_history_prefix(doc, &attachment.filename);
        self.locks.with_lock(&lock_key(b'h', &prefix), || {
            let latest = self
                .scan_keys(CF_ATTACHMENT_REVISIONS, &prefix)?
                .last()
                .and_then(|raw| version_suffix(raw));
            if let Some(latest) = latest {
                if attachment.version <= latest {
                    return Err(StoreError::VersionRegression {
                        key: doc.original(),
                        latest,
                        attempted: attachment.version,
                    });
                }
            }
            self.put(
                CF_ATTACHMENT_REVISIONS,
                &versioned_key(&prefix, attachment.version),
                attachment,
            )
        })
    }

    fn purge_attachment_history(&self, doc: &DocumentKey, filename: &str) -> StoreResult<()> {
        let prefix = attachment_history_prefix(doc, filename);
        let cf = self.cf(CF_ATTACHMENT_REVISIONS)?;
        let mut batch = WriteBatch::default();
        for raw in self.scan_keys(CF_ATTACHMENT_REVISIONS, &prefix)? {
            batch.delete_cf(cf, raw);
        }
        self.db.write_opt(batch, &self.write_opts())?;
        Ok(())
    }
}

impl AttachmentRecycleBinStore for RocksStore {
    fn move_attachment_to_recycle_bin(
        &self,
        doc: &DocumentKey,
        attachment: &Attachment,
        deleter: &str,
    ) -> StoreResult<EntryId> {
        let id = self.next_entry_id();
        let entry = DeletedAttachment {
            id,
            document: doc.original(),
            deleter: deleter.to_string(),
            deleted_at: unix_now(),
            attachment: attachment.clone(),
        };
        self.put(CF_ATTACHMENT_RECYCLE_BIN, &id.0.to_be_bytes(), &entry)?;
        Ok(id)
    }

    fn restore_attachment(&self, id: EntryId) -> StoreResult<DeletedAttachment> {
        self.get(CF_ATTACHMENT_RECYCLE_BIN, &id.0.to_be_bytes())?
            .ok_or(StoreError::EntryNotFound(id))
    }

    fn purge_attachment(&self, id: EntryId) -> StoreResult<()> {
        let raw = id.0.to_be_bytes();
        let cf = self.cf(CF_ATTACHMENT_RECYCLE_BIN)?;
        if self.db.get_cf(cf, raw)?.is_none() {
            return Err(StoreError::EntryNotFound(id));
        }
        self.remove(CF_ATTACHMENT_RECYCLE_BIN, &raw)
    }

    fn deleted_attachments(&self, doc: &DocumentKey) -> StoreResult<Vec<DeletedAttachment>> {
        let original = doc.original();
        let mut entries: Vec<DeletedAttachment> = self
            .scan::<DeletedAttachment>(CF_ATTACHMENT_RECYCLE_BIN, &[])?
            .into_iter()
            .filter(|e| e.document == original)
            .collect();
        entries.sort_by_key(|e| (e.deleted_at, e.id));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open(dir: &Path) -> RocksStore {
        RocksStore::open(RocksConfig::for_testing(dir.join("db")), VersionPolicy::default()).unwrap()
    }

    #[test]
    fn test_document_key_roundtrip() {
        let key = DocumentKey::new("Main", "WebHome").with_language("fr");
        assert_eq!(parse_document_key(&document_key(&key)).unwrap(), key);
        let original = DocumentKey::new("Main", "WebHome");
        assert_eq!(parse_document_key(&document_key(&original)).unwrap(), original);
    }

    #[test]
    fn test_version_suffix() {
        let raw = versioned_key(b"prefix", Version::new(3, 258));
        assert_eq!(version_suffix(&raw), Some(Version::new(3, 258)));
        assert_eq!(version_suffix(b"short"), None);
    }

    #[test]
    fn test_versioned_keys_sort_by_version() {
        let a = versioned_key(b"p", Version::new(1, 9));
        let b = versioned_key(b"p", Version::new(1, 10));
        let c = versioned_key(b"p", Version::new(2, 1));
        assert!(a < b && b < c);
    }

    #[test]
    fn test_save_load() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let key = DocumentKey::new("Main", "WebHome");

        let mut doc = store.load(&key).unwrap();
        assert!(doc.is_new());
        doc.content = "Hello, Folio!".into();
        assert_eq!(store.save(&mut doc).unwrap(), SaveOutcome::Created);

        let loaded = store.load(&key).unwrap();
        assert_eq!(loaded.content, "Hello, Folio!");
        assert_eq!(loaded.store(), Some("rocksdb"));
        assert!(!loaded.is_new());
    }

    #[test]
    fn test_translations_do_not_bleed_across_names() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        for key in [
            DocumentKey::new("Main", "Page"),
            DocumentKey::new("Main", "Page").with_language("fr"),
            DocumentKey::new("Main", "PageTwo").with_language("de"),
        ] {
            let mut d = store.load(&key).unwrap();
            d.content = "x".into();
            store.save(&mut d).unwrap();
        }
        let original = store.load(&DocumentKey::new("Main", "Page")).unwrap();
        assert_eq!(store.list_translations(&original).unwrap(), vec!["fr"]);
        assert_eq!(store.list_documents().unwrap().len(), 3);
    }

    #[test]
    fn test_history_order_and_reset() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let mut doc = Document::new(DocumentKey::new("Main", "Page"));
        for (major, minor) in [(1, 1), (1, 2), (1, 10), (2, 1)] {
            doc.version = Version::new(major, minor);
            store.append_revision(&doc, "", "alice").unwrap();
        }
        let versions: Vec<Version> = store.archive(&doc.key).unwrap().iter().map(|r| r.version).collect();
        assert_eq!(
            versions,
            vec![Version::new(1, 1), Version::new(1, 2), Version::new(1, 10), Version::new(2, 1)]
        );

        doc.version = Version::new(1, 5);
        assert!(matches!(
            store.append_revision(&doc, "", "alice"),
            Err(StoreError::VersionRegression { .. })
        ));

        store.reset_history(&doc).unwrap();
        let archive = store.archive(&doc.key).unwrap();
        assert_eq!(archive.len(), 1);
        assert_eq!(archive[0].version, Version::INITIAL);
    }

    #[test]
    fn test_recycle_bin() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let mut doc = store.load(&DocumentKey::new("Main", "Trash")).unwrap();
        doc.content = "bye".into();
        store.save(&mut doc).unwrap();

        let first = store.move_to_recycle_bin(&doc, "dave").unwrap();
        let second = store.move_to_recycle_bin(&doc, "erin").unwrap();
        assert_ne!(first, second);

        let entries = store.deleted_entries(&doc.key).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].deleter, "dave");

        store.purge(first).unwrap();
        assert_eq!(store.all_entries().unwrap().len(), 1);
        assert_eq!(store.restore(second).unwrap().content, "bye");
    }

    #[test]
    fn test_attachments() {
        let dir = tempdir().unwrap();
        let store = open(dir.path());
        let key = DocumentKey::new("Main", "Files");

        let mut a = Attachment::new("a.txt", b"aaa".to_vec());
        let mut b = Attachment::new("b.txt", b"bbb".to_vec());
        store.save_attachment(&key, &mut a).unwrap();
        store.save_attachment(&key, &mut b).unwrap();
        store.append_attachment_revision(&key, &a).unwrap();

        assert_eq!(store.list_attachments(&key).unwrap(), vec!["a.txt", "b.txt"]);
        assert_eq!(store.attachment_archive(&key, "a.txt").unwrap().len(), 1);
        assert!(store.attachment_archive(&key, "b.txt").unwrap().is_empty());

        let id = store.move_attachment_to_recycle_bin(&key, &a, "frank").unwrap();
        store.delete_attachment(&key, "a.txt").unwrap();
        assert_eq!(store.list_attachments(&key).unwrap(), vec!["b.txt"]);
        assert_eq!(store.restore_attachment(id).unwrap().attachment.content, b"aaa");
    }

    #[test]
    fn test_entry_sequence_recovery() {
        let dir = tempdir().unwrap();
        let doc = Document::new(DocumentKey::new("Main", "Seq"));
        let last = {
            let store = open(dir.path());
            store.move_to_recycle_bin(&doc, "x").unwrap();
            store.move_to_recycle_bin(&doc, "x").unwrap()
        };
        let store = open(dir.path());
        let next = store.move_to_recycle_bin(&doc, "x").unwrap();
        assert!(next > last);
    }
}
