//! Best-effort install of a staged package.
//!
//! Entries are applied one by one in manifest order. Each entry's save is
//! its own unit: a failing entry is recorded and the loop moves on. The
//! cancellation token is checked before every entry.
//!
//! ```text
//!  for entry:
//!    cancelled? ──► stop
//!    load target ──► SKIP and exists? ──► skipped
//!    can_overwrite? ──✗──► AccessDenied
//!    translation without original ──► save empty original first
//!    overwrite_from / merge_from ──► save_with ──► listener
//! ```

use crate::descriptor::{DefaultAction, PackageInfo};
use crate::package::{Package, StagedEntry};
use folio_core::{unix_now, DocumentKey};
use folio_store::{SaveOptions, SaveOutcome, StoreError, Wiki};
use serde::Serialize;
use std::fmt;
use tokio_util::sync::CancellationToken;

// ─── Collaborators ───────────────────────────────────────────────────

/// Rights checks consulted during install.
pub trait AccessChecker: Send + Sync {
    fn can_overwrite(&self, user: &str, document: &DocumentKey) -> bool;

    /// Whether `user` may keep archive authors and dates of a backup pack.
    fn can_restore_backup(&self, _user: &str) -> bool {
        false
    }
}

/// Grants everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessChecker for AllowAll {
    fn can_overwrite(&self, _user: &str, _document: &DocumentKey) -> bool {
        true
    }

    fn can_restore_backup(&self, _user: &str) -> bool {
        true
    }
}

/// Install notifications, e.g. for cache invalidation elsewhere.
pub trait InstallListener: Send + Sync {
    fn install_started(&self, _info: &PackageInfo, _entries: usize) {}

    fn document_installed(&self, _key: &DocumentKey, _result: &Result<EntryOutcome, InstallFailure>) {}

    fn install_finished(&self, _report: &InstallReport) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl InstallListener for NoopListener {}

/// Who installs, with which collaborators.
pub struct InstallContext<'a> {
    pub user: String,
    pub access: &'a dyn AccessChecker,
    pub listener: &'a dyn InstallListener,
    pub cancel: CancellationToken,
    /// Comment recorded on every saved revision.
    pub comment: String,
}

impl<'a> InstallContext<'a> {
    /// Context granting everything, with no listener and a fresh token.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            access: &AllowAll,
            listener: &NoopListener,
            cancel: CancellationToken::new(),
            comment: "Imported from package".to_string(),
        }
    }

    pub fn with_access(mut self, access: &'a dyn AccessChecker) -> Self {
        self.access = access;
        self
    }

    pub fn with_listener(mut self, listener: &'a dyn InstallListener) -> Self {
        self.listener = listener;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

// ─── Report ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryOutcome {
    Installed(SaveOutcome),
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FailureKind {
    EntryDecode,
    /// Listed in the manifest, absent from the archive.
    MissingEntry,
    Store,
    Conflict,
    AccessDenied,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::EntryDecode => "entry decode",
            Self::MissingEntry => "missing entry",
            Self::Store => "store",
            Self::Conflict => "conflict",
            Self::AccessDenied => "access denied",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl InstallFailure {
    fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<StoreError> for InstallFailure {
    fn from(e: StoreError) -> Self {
        let kind = match e {
            StoreError::Conflict { .. } => FailureKind::Conflict,
            _ => FailureKind::Store,
        };
        Self::new(kind, e.to_string())
    }
}

impl fmt::Display for InstallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub entry_name: String,
    pub key: DocumentKey,
    pub result: Result<EntryOutcome, InstallFailure>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InstallStatus {
    Success,
    /// At least one entry failed; the others were installed.
    PartialFailure,
    /// Stopped before the last entry.
    Cancelled,
}

/// Per-entry results of one install, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub entries: Vec<EntryReport>,
    pub cancelled: bool,
}

impl InstallReport {
    pub fn installed(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries
            .iter()
            .filter(|e| matches!(e.result, Ok(EntryOutcome::Installed(_))))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries
            .iter()
            .filter(|e| matches!(e.result, Ok(EntryOutcome::Skipped)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&EntryReport, &InstallFailure)> {
        self.entries
            .iter()
            .filter_map(|e| e.result.as_ref().err().map(|failure| (e, failure)))
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn failures_of(&self, kind: FailureKind) -> usize {
        self.failures().filter(|(_, f)| f.kind == kind).count()
    }

    pub fn status(&self) -> InstallStatus {
        if self.cancelled {
            InstallStatus::Cancelled
        } else if self.failure_count() > 0 {
            InstallStatus::PartialFailure
        } else {
            InstallStatus::Success
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "status": self.status(),
            "installed": self.installed().count(),
            "skipped": self.skipped().count(),
            "failed": self.failure_count(),
            "entries": self.entries,
        })
    }
}

// ─── Install ─────────────────────────────────────────────────────────

/// What install would do with one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlannedAction {
    Create,
    Overwrite,
    Merge,
    Skip,
    Denied,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewEntry {
    pub entry_name: String,
    pub key: DocumentKey,
    pub action: PlannedAction,
}

impl Package {
    /// Apply every staged entry to `wiki`.
    ///
    /// Decode failures and missing entries are reported first, then each
    /// staged entry in manifest order. Not atomic: entries saved before a
    /// failure or a cancellation stay saved.
    pub fn install(self, wiki: &Wiki, ctx: &InstallContext<'_>) -> InstallReport {
        let info = self.descriptor.info.clone();
        let keep_archive_stamps = info.backup_pack && ctx.access.can_restore_backup(&ctx.user);
        ctx.listener.install_started(&info, self.staged.len());
        log::info!(
            "installing package {:?} as {}: {} entries",
            info.name,
            ctx.user,
            self.staged.len()
        );

        let mut report = InstallReport::default();
        for failure in &self.decode_failures {
            report.entries.push(EntryReport {
                entry_name: failure.entry.entry_name.clone(),
                key: failure.entry.key.clone(),
                result: Err(InstallFailure::new(FailureKind::EntryDecode, failure.to_error().to_string())),
            });
        }
        for entry in &self.missing {
            report.entries.push(EntryReport {
                entry_name: entry.entry_name.clone(),
                key: entry.key.clone(),
                result: Err(InstallFailure::new(FailureKind::MissingEntry, "not in archive")),
            });
        }

        let total = self.staged.len();
        for (index, staged) in self.staged.into_iter().enumerate() {
            if ctx.cancel.is_cancelled() {
                log::info!("install of {:?} cancelled after {index} of {total} entries", info.name);
                report.cancelled = true;
                break;
            }
            let result = install_entry(wiki, &staged, ctx, &info, keep_archive_stamps);
            if let Err(failure) = &result {
                log::warn!("cannot install {}: {}", staged.entry.entry_name, failure);
            }
            ctx.listener.document_installed(&staged.entry.key, &result);
            report.entries.push(EntryReport {
                entry_name: staged.entry.entry_name,
                key: staged.entry.key,
                result,
            });
        }

        log::info!(
            "installed package {:?}: {} installed, {} skipped, {} failed",
            info.name,
            report.installed().count(),
            report.skipped().count(),
            report.failure_count()
        );
        ctx.listener.install_finished(&report);
        report
    }

    /// Dry run of [`install`](Package::install): nothing is written.
    pub fn preview(&self, wiki: &Wiki, ctx: &InstallContext<'_>) -> Result<Vec<PreviewEntry>, StoreError> {
        self.staged
            .iter()
            .map(|staged| {
                let exists = wiki.exists(&staged.entry.key)?;
                let action = match staged.action {
                    DefaultAction::Skip if exists => PlannedAction::Skip,
                    DefaultAction::Overwrite
                        if !ctx.access.can_overwrite(&ctx.user, &staged.entry.key) =>
                    {
                        PlannedAction::Denied
                    }
                    _ if !exists => PlannedAction::Create,
                    DefaultAction::Merge => PlannedAction::Merge,
                    _ => PlannedAction::Overwrite,
                };
                Ok(PreviewEntry {
                    entry_name: staged.entry.entry_name.clone(),
                    key: staged.entry.key.clone(),
                    action,
                })
            })
            .collect()
    }
}

fn install_entry(
    wiki: &Wiki,
    staged: &StagedEntry,
    ctx: &InstallContext<'_>,
    info: &PackageInfo,
    keep_archive_stamps: bool,
) -> Result<EntryOutcome, InstallFailure> {
    let key = &staged.entry.key;
    let mut target = wiki.load(key)?;

    if staged.action == DefaultAction::Skip && !target.is_new() {
        log::debug!("skipping existing {key}");
        return Ok(EntryOutcome::Skipped);
    }
    if staged.action == DefaultAction::Overwrite && !ctx.access.can_overwrite(&ctx.user, key) {
        return Err(InstallFailure::new(
            FailureKind::AccessDenied,
            format!("{} may not overwrite {key}", ctx.user),
        ));
    }

    let options = SaveOptions {
        comment: ctx.comment.clone(),
        author: None,
        major_edit: false,
        reset_history: !info.preserve_version,
        stamp_date: false,
    };

    if key.is_translation() {
        let mut original = wiki.load(&key.original())?;
        if original.is_new() {
            log::debug!("creating original {} for translation {key}", original.key);
            original.author = ctx.user.clone();
            original.updated_at = unix_now();
            wiki.save_with(&mut original, &options)?;
        }
    }

    match staged.action {
        DefaultAction::Merge => target.merge_from(&staged.document),
        _ => target.overwrite_from(&staged.document),
    }
    if !keep_archive_stamps {
        target.author = ctx.user.clone();
        target.updated_at = unix_now();
    }

    let outcome = wiki.save_with(&mut target, &options)?;
    Ok(EntryOutcome::Installed(outcome))
}
