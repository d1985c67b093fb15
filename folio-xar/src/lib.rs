//! # folio-xar: Package import and export
//!
//! Moves collections of documents in and out of a [`Wiki`](folio_store::Wiki)
//! as XAR packages: a ZIP container (or a plain directory) holding a
//! `package.xml` manifest and one XML entry per document-translation.
//!
//! ## Flow
//!
//! ```text
//!  bytes / dir ──► Importer ──► Package ──install──► Wiki ──► InstallReport
//!                    │            │
//!                    │            └─preview──► Vec<PreviewEntry>
//!                    └─ manifest parsed first, entries decoded in parallel
//!
//!  Wiki ──► Exporter ──► ArchiveSink (ZipSink | DirSink)
//! ```
//!
//! ## Modules
//!
//! - [`descriptor`]: Manifest model, parsing and ISO-8859-1 serialization
//! - [`codec`]: Per-document entry format with per-entry charsets
//! - [`archive`]: ZIP and directory readers and sinks
//! - [`import`]: Archive scan into a [`Package`]
//! - [`install`]: Best-effort install, preview and the install report
//! - [`export`]: Documents to archive
//! - [`filter`]: Document filters for import and export

pub mod archive;
pub mod codec;
pub mod descriptor;
pub mod error;
pub mod export;
pub mod filter;
pub mod import;
pub mod install;
pub mod package;
mod xml;

pub use archive::{ArchiveEntry, ArchiveSink, DirSink, ZipSink, MAX_ENTRY_BYTES, PACKAGE_MANIFEST};
pub use codec::{decode_document, encode_document};
pub use descriptor::{DefaultAction, PackageDescriptor, PackageInfo, XarEntry, ACTION_NOT_DEFINED};
pub use error::{CodecError, XarError, XarResult};
pub use export::{ExportOptions, Exporter};
pub use filter::{DocumentFilter, SpaceFilter};
pub use import::Importer;
pub use install::{
    AccessChecker, AllowAll, EntryOutcome, EntryReport, FailureKind, InstallContext, InstallFailure,
    InstallListener, InstallReport, InstallStatus, NoopListener, PlannedAction, PreviewEntry,
};
pub use package::{DecodeFailure, Package, StagedEntry};
pub use tokio_util::sync::CancellationToken;
pub use xml::Charset;
