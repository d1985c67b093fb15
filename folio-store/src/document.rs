//! Main document store contract.
//!
//! Every backend persists one row per document-translation. A save is a
//! version-checked update: the copy being saved must carry the version it
//! was loaded at, otherwise another writer got there first and the save
//! fails with [`StoreError::Conflict`].
//!
//! Saving a copy whose content equals the stored row is a no-op: no version
//! bump, no write, [`SaveOutcome::Unchanged`].

use crate::error::{StoreError, StoreResult};
use folio_core::{unix_now, Document, DocumentKey, Version, VersionPolicy};
use serde::Serialize;

/// What a save did to the stored row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SaveOutcome {
    Created,
    Updated,
    Unchanged,
}

impl SaveOutcome {
    /// Whether a new version was written.
    pub fn changed(&self) -> bool {
        !matches!(self, SaveOutcome::Unchanged)
    }
}

/// Load/save/delete contract implemented by every backend.
pub trait DocumentStore: Send + Sync {
    /// Backend name stamped on the documents it persists.
    fn name(&self) -> &str;

    /// Load a document-translation. A missing row yields a new, empty
    /// document rather than an error.
    fn load(&self, key: &DocumentKey) -> StoreResult<Document>;

    /// Persist the document, assign its next version and stamp it as
    /// owned by this store.
    fn save(&self, doc: &mut Document) -> StoreResult<SaveOutcome>;

    /// Remove the current row. Does not touch history or the recycle bin.
    fn delete(&self, doc: &Document) -> StoreResult<()>;

    /// Non-empty language tags stored under the document's full name.
    fn list_translations(&self, doc: &Document) -> StoreResult<Vec<String>>;

    fn exists(&self, key: &DocumentKey) -> StoreResult<bool>;

    /// Every stored document-translation key, in key order.
    fn list_documents(&self) -> StoreResult<Vec<DocumentKey>>;
}

/// Resolve a save of `doc` over the currently `stored` row.
///
/// Checks the optimistic version, decides the outcome and assigns the new
/// version marker to `doc`. Callers hold the key's write lock and write the
/// row unless the outcome is `Unchanged`.
pub(crate) fn prepare_save(
    stored: Option<&Document>,
    doc: &mut Document,
    policy: &VersionPolicy,
) -> StoreResult<SaveOutcome> {
    let found = stored.map(|s| s.version);
    if doc.loaded_version() != found {
        return Err(StoreError::Conflict {
            key: doc.key.clone(),
            expected: doc.loaded_version(),
            found,
        });
    }

    let outcome = match stored {
        Some(current)
            if current.same_state(doc)
                && (!doc.resets_version() || current.version == Version::INITIAL) =>
        {
            doc.version = current.version;
            return Ok(SaveOutcome::Unchanged);
        }
        Some(current) => {
            doc.version = if doc.resets_version() {
                Version::INITIAL
            } else {
                policy.next(current.version, doc.is_major_edit())
            };
            SaveOutcome::Updated
        }
        None => {
            // A non-zero marker on a new row continues an earlier history.
            doc.version = if doc.resets_version() || doc.version.is_none() {
                Version::INITIAL
            } else {
                policy.next(doc.version, doc.is_major_edit())
            };
            SaveOutcome::Created
        }
    };

    if doc.updated_at == 0 {
        doc.updated_at = unix_now();
    }
    Ok(outcome)
}

/// Language tags of `keys` that translate `doc`'s full name.
pub(crate) fn translations_of<'a>(
    doc: &Document,
    keys: impl IntoIterator<Item = &'a DocumentKey>,
) -> Vec<String> {
    let mut languages: Vec<String> = keys
        .into_iter()
        .filter(|k| k.space == doc.key.space && k.name == doc.key.name && k.is_translation())
        .map(|k| k.language.clone())
        .collect();
    languages.sort();
    languages.dedup();
    languages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(content: &str, version: Version) -> Document {
        let mut d = Document::new(DocumentKey::new("Main", "Page"));
        d.content = content.into();
        d.version = version;
        d.mark_persisted("test");
        d
    }

    #[test]
    fn test_prepare_create() {
        let mut doc = Document::new(DocumentKey::new("Main", "Page"));
        let outcome = prepare_save(None, &mut doc, &VersionPolicy::default()).unwrap();
        assert_eq!(outcome, SaveOutcome::Created);
        assert_eq!(doc.version, Version::INITIAL);
        assert!(doc.updated_at > 0);
    }

    #[test]
    fn test_prepare_create_continues_history() {
        let mut doc = Document::new(DocumentKey::new("Main", "Page"));
        doc.version = Version::new(1, 5);
        prepare_save(None, &mut doc, &VersionPolicy::default()).unwrap();
        assert_eq!(doc.version, Version::new(1, 6));
    }

    #[test]
    fn test_prepare_update_bumps_minor() {
        let current = stored("a", Version::new(1, 1));
        let mut doc = current.clone();
        doc.content = "b".into();
        let outcome = prepare_save(Some(&current), &mut doc, &VersionPolicy::default()).unwrap();
        assert_eq!(outcome, SaveOutcome::Updated);
        assert_eq!(doc.version, Version::new(1, 2));
    }

    #[test]
    fn test_prepare_major_edit() {
        let current = stored("a", Version::new(1, 4));
        let mut doc = current.clone();
        doc.content = "b".into();
        doc.set_major_edit(true);
        prepare_save(Some(&current), &mut doc, &VersionPolicy::default()).unwrap();
        assert_eq!(doc.version, Version::new(2, 1));
    }

    #[test]
    fn test_prepare_unchanged() {
        let current = stored("a", Version::new(1, 3));
        let mut doc = current.clone();
        let outcome = prepare_save(Some(&current), &mut doc, &VersionPolicy::default()).unwrap();
        assert_eq!(outcome, SaveOutcome::Unchanged);
        assert_eq!(doc.version, Version::new(1, 3));
    }

    #[test]
    fn test_prepare_reset_of_same_state() {
        let current = stored("a", Version::new(1, 3));
        let mut doc = current.clone();
        doc.set_reset_version(true);
        let outcome = prepare_save(Some(&current), &mut doc, &VersionPolicy::default()).unwrap();
        assert_eq!(outcome, SaveOutcome::Updated);
        assert_eq!(doc.version, Version::INITIAL);

        let current = stored("a", Version::INITIAL);
        let mut doc = current.clone();
        doc.set_reset_version(true);
        let outcome = prepare_save(Some(&current), &mut doc, &VersionPolicy::default()).unwrap();
        assert_eq!(outcome, SaveOutcome::Unchanged);
    }

    #[test]
    fn test_prepare_conflict() {
        let current = stored("a", Version::new(1, 2));
        let mut doc = stored("b", Version::new(1, 1));
        let err = prepare_save(Some(&current), &mut doc, &VersionPolicy::default()).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));

        let mut blind = Document::new(DocumentKey::new("Main", "Page"));
        let err = prepare_save(Some(&current), &mut blind, &VersionPolicy::default()).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: None, .. }));
    }

    #[test]
    fn test_translations_of() {
        let doc = Document::new(DocumentKey::new("Main", "Page"));
        let keys = vec![
            DocumentKey::new("Main", "Page"),
            DocumentKey::new("Main", "Page").with_language("fr"),
            DocumentKey::new("Main", "Page").with_language("de"),
            DocumentKey::new("Main", "Other").with_language("fr"),
        ];
        assert_eq!(translations_of(&doc, &keys), vec!["de", "fr"]);
    }
}
