//! Store settings.
//!
//! Read once per resolution from an external source: a flat property map
//! (`store.main.hint = rocksdb`) or JSON. Every field has a default, so an
//! empty source yields a working configuration.

use crate::error::{StoreError, StoreResult};
use folio_core::{VersionBump, VersionPolicy};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Logical persistence responsibility, resolved independently to a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreRole {
    Main,
    Versioning,
    RecycleBin,
    Attachment,
    AttachmentVersioning,
    AttachmentRecycleBin,
}

impl StoreRole {
    pub const ALL: [StoreRole; 6] = [
        StoreRole::Main,
        StoreRole::Versioning,
        StoreRole::RecycleBin,
        StoreRole::Attachment,
        StoreRole::AttachmentVersioning,
        StoreRole::AttachmentRecycleBin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreRole::Main => "main",
            StoreRole::Versioning => "versioning",
            StoreRole::RecycleBin => "recyclebin",
            StoreRole::Attachment => "attachment",
            StoreRole::AttachmentVersioning => "attachment.versioning",
            StoreRole::AttachmentRecycleBin => "attachment.recyclebin",
        }
    }

    /// Property key of this role's hint.
    pub fn hint_key(&self) -> String {
        format!("store.{}.hint", self.as_str())
    }
}

impl fmt::Display for StoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Backend hint for the main document store.
    pub main_hint: String,
    pub versioning_hint: Option<String>,
    pub recycle_bin_hint: Option<String>,
    pub attachment_hint: Option<String>,
    pub attachment_versioning_hint: Option<String>,
    pub attachment_recycle_bin_hint: Option<String>,

    pub versioning: bool,
    pub attachment_versioning: bool,
    pub recycle_bin: bool,
    pub attachment_recycle_bin: bool,
    /// Wrap the main store in an LRU cache.
    pub cache: bool,
    pub cache_capacity: usize,

    /// Directory of the RocksDB backend. Without it that backend is unavailable.
    pub rocksdb_path: Option<PathBuf>,
    pub version_policy: VersionPolicy,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            main_hint: "rocksdb".to_string(),
            versioning_hint: None,
            recycle_bin_hint: None,
            attachment_hint: None,
            attachment_versioning_hint: None,
            attachment_recycle_bin_hint: None,
            versioning: true,
            attachment_versioning: true,
            recycle_bin: true,
            attachment_recycle_bin: true,
            cache: true,
            cache_capacity: 500,
            rocksdb_path: None,
            version_policy: VersionPolicy::default(),
        }
    }
}

impl StoreSettings {
    /// In-memory backends for every role, small cache.
    pub fn for_testing() -> Self {
        Self {
            main_hint: "memory".to_string(),
            cache_capacity: 16,
            ..Self::default()
        }
    }

    /// Configured hint of a role, if any.
    pub fn hint(&self, role: StoreRole) -> Option<&str> {
        match role {
            StoreRole::Main => Some(self.main_hint.as_str()),
            StoreRole::Versioning => self.versioning_hint.as_deref(),
            StoreRole::RecycleBin => self.recycle_bin_hint.as_deref(),
            StoreRole::Attachment => self.attachment_hint.as_deref(),
            StoreRole::AttachmentVersioning => self.attachment_versioning_hint.as_deref(),
            StoreRole::AttachmentRecycleBin => self.attachment_recycle_bin_hint.as_deref(),
        }
        .filter(|h| !h.trim().is_empty())
    }

    /// Whether the role's feature toggle is on. Main and attachment stores
    /// are always on.
    pub fn enabled(&self, role: StoreRole) -> bool {
        match role {
            StoreRole::Main | StoreRole::Attachment => true,
            StoreRole::Versioning => self.versioning,
            StoreRole::RecycleBin => self.recycle_bin,
            StoreRole::AttachmentVersioning => self.attachment_versioning,
            StoreRole::AttachmentRecycleBin => self.attachment_recycle_bin,
        }
    }

    /// Build from flat `store.*` properties. Unknown keys are ignored.
    pub fn from_properties(props: &HashMap<String, String>) -> StoreResult<Self> {
        let mut settings = Self::default();
        let get = |key: &str| props.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        if let Some(hint) = get(&StoreRole::Main.hint_key()) {
            settings.main_hint = hint.to_string();
        }
        let hint = |role: StoreRole| get(&role.hint_key()).map(str::to_string);
        settings.versioning_hint = hint(StoreRole::Versioning);
        settings.recycle_bin_hint = hint(StoreRole::RecycleBin);
        settings.attachment_hint = hint(StoreRole::Attachment);
        settings.attachment_versioning_hint = hint(StoreRole::AttachmentVersioning);
        settings.attachment_recycle_bin_hint = hint(StoreRole::AttachmentRecycleBin);

        let flags: [(&str, &mut bool); 5] = [
            ("store.versioning", &mut settings.versioning),
            ("store.attachment.versioning", &mut settings.attachment_versioning),
            ("store.recyclebin", &mut settings.recycle_bin),
            ("store.attachment.recyclebin", &mut settings.attachment_recycle_bin),
            ("store.cache", &mut settings.cache),
        ];
        for (key, flag) in flags {
            if let Some(value) = get(key) {
                *flag = parse_flag(key, value)?;
            }
        }

        if let Some(value) = get("store.cache.capacity") {
            settings.cache_capacity = value
                .parse()
                .map_err(|_| StoreError::InvalidConfig(format!("store.cache.capacity = {value:?}")))?;
        }
        if let Some(path) = get("store.rocksdb.path") {
            settings.rocksdb_path = Some(PathBuf::from(path));
        }
        if let Some(value) = get("store.versioning.bump") {
            settings.version_policy.ordinary = value.parse::<VersionBump>()?;
        }

        Ok(settings)
    }

    pub fn from_json(json: &str) -> StoreResult<Self> {
        serde_json::from_str(json).map_err(|e| StoreError::InvalidConfig(e.to_string()))
    }
}

fn parse_flag(key: &str, value: &str) -> StoreResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(StoreError::InvalidConfig(format!("{key} = {value:?}"))),
    }
}
