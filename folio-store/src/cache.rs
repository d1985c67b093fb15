//! Store-level document cache.
//!
//! Wraps the main store with a bounded LRU of persisted documents. Misses
//! and saves for one key run under that key's lock so a slow reader can
//! never put an older copy back over a newer one.

use crate::document::{DocumentStore, SaveOutcome};
use crate::error::StoreResult;
use crate::locks::KeyLocks;
use folio_core::{Document, DocumentKey};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

pub struct CachingStore {
    inner: Arc<dyn DocumentStore>,
    cache: Mutex<LruCache<DocumentKey, Document>>,
    locks: KeyLocks<DocumentKey>,
}

impl CachingStore {
    pub fn new(inner: Arc<dyn DocumentStore>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
            locks: KeyLocks::new(),
        }
    }

    /// Number of cached documents.
    pub fn cached(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    fn cached_copy(&self, key: &DocumentKey) -> StoreResult<Option<Document>> {
        Ok(self.cache.lock()?.get(key).cloned())
    }
}

impl DocumentStore for CachingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn load(&self, key: &DocumentKey) -> StoreResult<Document> {
        if let Some(doc) = self.cached_copy(key)? {
            return Ok(doc);
        }
        self.locks.with_lock(key, || {
            if let Some(doc) = self.cached_copy(key)? {
                return Ok(doc);
            }
            let doc = self.inner.load(key)?;
            if !doc.is_new() {
                self.cache.lock()?.put(key.clone(), doc.clone());
            }
            Ok(doc)
        })
    }

    fn save(&self, doc: &mut Document) -> StoreResult<SaveOutcome> {
        let key = doc.key.clone();
        self.locks.with_lock(&key, || match self.inner.save(doc) {
            Ok(outcome) => {
                self.cache.lock()?.put(key.clone(), doc.clone());
                Ok(outcome)
            }
            Err(e) => {
                self.cache.lock()?.pop(&key);
                Err(e)
            }
        })
    }

    fn delete(&self, doc: &Document) -> StoreResult<()> {
        self.locks.with_lock(&doc.key, || {
            self.inner.delete(doc)?;
            self.cache.lock()?.pop(&doc.key);
            Ok(())
        })
    }

    fn list_translations(&self, doc: &Document) -> StoreResult<Vec<String>> {
        self.inner.list_translations(doc)
    }

    fn exists(&self, key: &DocumentKey) -> StoreResult<bool> {
        if self.cache.lock()?.contains(key) {
            return Ok(true);
        }
        self.inner.exists(key)
    }

    fn list_documents(&self) -> StoreResult<Vec<DocumentKey>> {
        self.inner.list_documents()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn test_cache_hit_after_save() {
        let store = CachingStore::new(Arc::new(MemoryStore::new()), 2);
        let key = DocumentKey::new("Main", "Cached");
        let mut doc = store.load(&key).unwrap();
        assert_eq!(store.cached(), 0);
        doc.content = "c".into();
        store.save(&mut doc).unwrap();
        assert_eq!(store.cached(), 1);
        assert_eq!(store.load(&key).unwrap().content, "c");
    }

    #[test]
    fn test_capacity_is_bounded() {
        let store = CachingStore::new(Arc::new(MemoryStore::new()), 2);
        for name in ["A", "B", "C"] {
            let mut doc = store.load(&DocumentKey::new("Main", name)).unwrap();
            doc.content = name.into();
            store.save(&mut doc).unwrap();
        }
        assert_eq!(store.cached(), 2);
        assert_eq!(store.load(&DocumentKey::new("Main", "A")).unwrap().content, "A");
    }

    #[test]
    fn test_delete_evicts() {
        let store = CachingStore::new(Arc::new(MemoryStore::new()), 8);
        let key = DocumentKey::new("Main", "Gone");
        let mut doc = store.load(&key).unwrap();
        doc.content = "x".into();
        store.save(&mut doc).unwrap();
        store.delete(&doc).unwrap();
        assert!(store.load(&key).unwrap().is_new());
        assert!(!store.exists(&key).unwrap());
    }
}
