//! File attachments.

use crate::key::DocumentKey;
use crate::revision::EntryId;
use crate::version::Version;
use serde::{Deserialize, Serialize};

/// A file attached to a document. Attachments belong to the original, so
/// stores address them by the original's key plus the file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub content: Vec<u8>,
    pub author: String,
    pub version: Version,
    pub updated_at: u64,
}

impl Attachment {
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content,
            author: String::new(),
            version: Version::NONE,
            updated_at: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// Attachment snapshot kept by the attachment versioning store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRevision {
    pub document: DocumentKey,
    pub attachment: Attachment,
}

/// Soft-deleted attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedAttachment {
    pub id: EntryId,
    pub document: DocumentKey,
    pub deleter: String,
    pub deleted_at: u64,
    pub attachment: Attachment,
}
