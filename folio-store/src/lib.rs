//! # folio-store: Versioned document storage
//!
//! Pluggable backends behind one contract per store role, resolved from
//! settings, and a [`Wiki`] facade that keeps the main store, the revision
//! history and the recycle bin consistent.
//!
//! ## Architecture
//!
//! ```text
//!  StoreSettings ──► StoreResolver ──► ResolvedStores ──► Wiki
//!                        │
//!                        │ hint → BackendKind
//!                        ▼
//!        ┌──────────────┬──────────────┬──────────────┐
//!        │ MemoryStore  │ RocksStore   │ VoidStore    │
//!        │ (RwLock)     │ (6 CFs, LZ4) │ (no-op)      │
//!        └──────────────┴──────────────┴──────────────┘
//!  each implements DocumentStore, VersioningStore, RecycleBinStore and
//!  the three attachment roles
//! ```
//!
//! ## Modules
//!
//! - [`document`]: Main store contract and save outcome
//! - [`versioning`]: Revision history contract
//! - [`recycle_bin`]: Soft-delete contract
//! - [`attachment`]: Attachment store roles
//! - [`memory`], [`rocks`], [`void`]: Backends
//! - [`cache`]: LRU wrapper for the main store
//! - [`config`]: Store roles and settings
//! - [`resolver`]: Role → backend resolution with fallback
//! - [`wiki`]: Facade used by callers and the package engine

pub mod attachment;
pub mod cache;
mod codec;
pub mod config;
pub mod document;
pub mod error;
pub mod locks;
pub mod memory;
pub mod recycle_bin;
pub mod resolver;
pub mod rocks;
pub mod versioning;
pub mod void;
pub mod wiki;

pub use attachment::{AttachmentRecycleBinStore, AttachmentStore, AttachmentVersioningStore};
pub use cache::CachingStore;
pub use config::{StoreRole, StoreSettings};
pub use document::{DocumentStore, SaveOutcome};
pub use error::{StoreError, StoreResult};
pub use locks::KeyLocks;
pub use memory::MemoryStore;
pub use recycle_bin::RecycleBinStore;
pub use resolver::{Backend, BackendKind, ResolvedStores, StoreResolver, GENERIC_STORE_HINT};
pub use rocks::{RocksConfig, RocksStore};
pub use versioning::VersioningStore;
pub use void::VoidStore;
pub use wiki::{SaveOptions, Wiki};
