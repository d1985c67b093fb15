//! In-memory document.
//!
//! A [`Document`] handed out by a store is a detached copy. It becomes
//! authoritative only once a store accepts it through `save`, which clears
//! the new flag, assigns the next version marker and records which store
//! owns it.
//!
//! ```text
//!   load (missing) ──► new=true, loaded_version=None
//!   load (present) ──► new=false, loaded_version=Some(v)
//!   save           ──► new=false, loaded_version=Some(v'), v' > v
//! ```

use crate::key::DocumentKey;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structured object attached to a document. Opaque to the store: a class
/// name, an instance number within that class and string properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentObject {
    pub class_name: String,
    pub number: u32,
    pub properties: BTreeMap<String, String>,
}

impl DocumentObject {
    pub fn new(class_name: impl Into<String>, number: u32) -> Self {
        Self {
            class_name: class_name.into(),
            number,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    fn same_slot(&self, other: &DocumentObject) -> bool {
        self.class_name == other.class_name && self.number == other.number
    }
}

/// One document-translation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub key: DocumentKey,
    /// Language of the original; only meaningful on originals.
    pub default_language: String,
    pub title: String,
    /// Full name of the parent document, empty for none.
    pub parent: String,
    pub author: String,
    pub syntax: String,
    pub content: String,
    pub objects: Vec<DocumentObject>,
    pub version: Version,
    /// Comment of the edit that produced this version.
    pub comment: String,
    /// Seconds since epoch of the last update.
    pub updated_at: u64,

    #[serde(skip)]
    is_new: bool,
    #[serde(skip)]
    store: Option<String>,
    #[serde(skip)]
    loaded_version: Option<Version>,
    #[serde(skip)]
    major_edit: bool,
    #[serde(skip)]
    reset_version: bool,
}

impl Document {
    /// Fresh, never saved document.
    pub fn new(key: DocumentKey) -> Self {
        Self {
            key,
            default_language: String::new(),
            title: String::new(),
            parent: String::new(),
            author: String::new(),
            syntax: String::new(),
            content: String::new(),
            objects: Vec::new(),
            version: Version::NONE,
            comment: String::new(),
            updated_at: 0,
            is_new: true,
            store: None,
            loaded_version: None,
            major_edit: false,
            reset_version: false,
        }
    }

    /// True until the first successful save.
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Name of the store that last persisted or loaded this copy.
    pub fn store(&self) -> Option<&str> {
        self.store.as_deref()
    }

    /// Version this copy was read at, `None` when the store had no row.
    pub fn loaded_version(&self) -> Option<Version> {
        self.loaded_version
    }

    /// Stamp the copy as the current persisted state of `store`.
    pub fn mark_persisted(&mut self, store: &str) {
        self.is_new = false;
        self.store = Some(store.to_string());
        self.loaded_version = Some(self.version);
        self.major_edit = false;
        self.reset_version = false;
    }

    /// Stamp the copy as absent from `store`.
    pub fn mark_missing(&mut self, store: &str) {
        self.is_new = true;
        self.store = Some(store.to_string());
        self.loaded_version = None;
    }

    /// Forget any store association, e.g. for a recycle-bin snapshot.
    pub fn mark_detached(&mut self) {
        self.is_new = true;
        self.store = None;
        self.loaded_version = None;
        self.major_edit = false;
        self.reset_version = false;
    }

    pub fn is_major_edit(&self) -> bool {
        self.major_edit
    }

    /// Flag the next save as a major edit.
    pub fn set_major_edit(&mut self, major_edit: bool) {
        self.major_edit = major_edit;
    }

    pub fn resets_version(&self) -> bool {
        self.reset_version
    }

    /// Make the next save land on the initial version marker.
    pub fn set_reset_version(&mut self, reset: bool) {
        self.reset_version = reset;
    }

    /// Whether both copies carry the same persisted content. Bookkeeping
    /// fields (version, author, comment, date) are ignored.
    pub fn same_state(&self, other: &Document) -> bool {
        self.default_language == other.default_language
            && self.title == other.title
            && self.parent == other.parent
            && self.syntax == other.syntax
            && self.content == other.content
            && self.objects == other.objects
    }

    /// Replace every content field with `incoming`'s. Identity and
    /// persistence bookkeeping stay untouched.
    pub fn overwrite_from(&mut self, incoming: &Document) {
        self.default_language = incoming.default_language.clone();
        self.title = incoming.title.clone();
        self.parent = incoming.parent.clone();
        self.author = incoming.author.clone();
        self.syntax = incoming.syntax.clone();
        self.content = incoming.content.clone();
        self.objects = incoming.objects.clone();
        self.comment = incoming.comment.clone();
        self.updated_at = incoming.updated_at;
    }

    /// Merge `incoming` into this document.
    ///
    /// A translation only takes the incoming content and title. An original
    /// takes the incoming content, merges objects slot by slot and keeps its
    /// own non-empty metadata. A document that does not exist yet is simply
    /// overwritten.
    pub fn merge_from(&mut self, incoming: &Document) {
        if self.is_new {
            self.overwrite_from(incoming);
            return;
        }

        self.content = incoming.content.clone();
        self.author = incoming.author.clone();
        self.comment = incoming.comment.clone();
        self.updated_at = incoming.updated_at;

        if self.key.is_translation() {
            self.title = incoming.title.clone();
            return;
        }

        fill_if_empty(&mut self.title, &incoming.title);
        fill_if_empty(&mut self.parent, &incoming.parent);
        fill_if_empty(&mut self.syntax, &incoming.syntax);
        fill_if_empty(&mut self.default_language, &incoming.default_language);

        for object in &incoming.objects {
            match self.objects.iter_mut().find(|o| o.same_slot(object)) {
                Some(existing) => *existing = object.clone(),
                None => self.objects.push(object.clone()),
            }
        }
        log::debug!("merged {} objects into {}", incoming.objects.len(), self.key);
    }
}

fn fill_if_empty(target: &mut String, value: &str) {
    if target.is_empty() {
        target.push_str(value);
    }
}
