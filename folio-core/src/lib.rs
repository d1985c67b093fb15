//! # folio-core: Document model for the Folio document store
//!
//! Leaf crate shared by the store backends and the package engine.
//!
//! ## Identity
//!
//! ```text
//! ┌──────────────────────────────┐
//! │ DocumentKey                  │
//! │  space ─┐                    │   "Main.WebHome"      full name
//! │  name  ─┴─► full name        │   "Main/WebHome.fr"   archive entry
//! │  language ("" = original)    │
//! └──────────────┬───────────────┘
//!                │ original()
//!                ▼
//!        same space/name, language ""
//! ```
//!
//! ## Modules
//!
//! - [`key`]: Composite `(space, name, language)` identity
//! - [`version`]: `major.minor` version markers and the bump policy
//! - [`document`]: In-memory document, objects, overwrite/merge rules
//! - [`revision`]: Immutable history snapshots and recycle-bin entries
//! - [`attachment`]: File attachments and their history
//! - [`error`]: Model parse errors

pub mod attachment;
pub mod document;
pub mod error;
pub mod key;
pub mod revision;
pub mod version;

pub use attachment::{Attachment, AttachmentRevision, DeletedAttachment};
pub use document::{Document, DocumentObject};
pub use error::ModelError;
pub use key::DocumentKey;
pub use revision::{DeletedDocument, EntryId, Revision};
pub use version::{Version, VersionBump, VersionPolicy};

use std::time::SystemTime;

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
