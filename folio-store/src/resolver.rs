//! Role → backend resolution.
//!
//! Each store role is resolved through a fixed precedence, stopping at the
//! first hint that names a registered backend which can actually be opened:
//!
//! ```text
//! 1. hint configured for the role      store.versioning.hint = memory
//! 2. the role's default hint           main hint, or "void" for disabled
//!                                      attachment versioning
//! 3. the generic durable hint          "rocksdb"
//! ```
//!
//! When nothing resolves, the role is left empty and a warning is logged:
//! callers treat a missing store as a disabled feature. Results are cached
//! until [`StoreResolver::reconfigure`]; backend instances are shared by
//! every role resolved to the same kind.

use crate::attachment::{AttachmentRecycleBinStore, AttachmentStore, AttachmentVersioningStore};
use crate::cache::CachingStore;
use crate::config::{StoreRole, StoreSettings};
use crate::document::DocumentStore;
use crate::error::{StoreError, StoreResult};
use crate::memory::MemoryStore;
use crate::recycle_bin::RecycleBinStore;
use crate::rocks::{RocksConfig, RocksStore};
use crate::versioning::VersioningStore;
use crate::void::VoidStore;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex, RwLock};

/// Hint tried last for every role.
pub const GENERIC_STORE_HINT: &str = "rocksdb";

/// Registered backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    Memory,
    RocksDb,
    Void,
}

impl FromStr for BackendKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "rocksdb" | "rocks" => Ok(BackendKind::RocksDb),
            "void" | "none" => Ok(BackendKind::Void),
            _ => Err(StoreError::InvalidConfig(format!("unknown store backend: {s}"))),
        }
    }
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::RocksDb => "rocksdb",
            BackendKind::Void => "void",
        }
    }
}

/// An opened backend. Every kind implements every role.
#[derive(Clone)]
pub enum Backend {
    Memory(Arc<MemoryStore>),
    RocksDb(Arc<RocksStore>),
    Void(Arc<VoidStore>),
}

macro_rules! role_accessor {
    ($name:ident, $trait:ident) => {
        pub fn $name(&self) -> Arc<dyn $trait> {
            match self {
                Backend::Memory(s) => s.clone() as Arc<dyn $trait>,
                Backend::RocksDb(s) => s.clone() as Arc<dyn $trait>,
                Backend::Void(s) => s.clone() as Arc<dyn $trait>,
            }
        }
    };
}

impl Backend {
    pub fn kind(&self) -> BackendKind {
        match self {
            Backend::Memory(_) => BackendKind::Memory,
            Backend::RocksDb(_) => BackendKind::RocksDb,
            Backend::Void(_) => BackendKind::Void,
        }
    }

    role_accessor!(document_store, DocumentStore);
    role_accessor!(versioning_store, VersioningStore);
    role_accessor!(recycle_bin_store, RecycleBinStore);
    role_accessor!(attachment_store, AttachmentStore);
    role_accessor!(attachment_versioning_store, AttachmentVersioningStore);
    role_accessor!(attachment_recycle_bin_store, AttachmentRecycleBinStore);
}

/// Stores resolved for every role. `None` means the feature is disabled.
#[derive(Clone, Default)]
pub struct ResolvedStores {
    pub main: Option<Arc<dyn DocumentStore>>,
    pub versioning: Option<Arc<dyn VersioningStore>>,
    pub recycle_bin: Option<Arc<dyn RecycleBinStore>>,
    pub attachment: Option<Arc<dyn AttachmentStore>>,
    pub attachment_versioning: Option<Arc<dyn AttachmentVersioningStore>>,
    pub attachment_recycle_bin: Option<Arc<dyn AttachmentRecycleBinStore>>,
    kinds: HashMap<StoreRole, BackendKind>,
}

impl ResolvedStores {
    /// Every role on one fresh in-memory backend.
    pub fn in_memory() -> Self {
        Self::single(Backend::Memory(Arc::new(MemoryStore::new())))
    }

    /// Every role on the same backend.
    pub fn single(backend: Backend) -> Self {
        let mut stores = Self::default();
        for role in StoreRole::ALL {
            stores.assign(role, &backend);
        }
        stores
    }

    /// Backend kind a role resolved to.
    pub fn kind(&self, role: StoreRole) -> Option<BackendKind> {
        self.kinds.get(&role).copied()
    }

    fn assign(&mut self, role: StoreRole, backend: &Backend) {
        match role {
            StoreRole::Main => self.main = Some(backend.document_store()),
            StoreRole::Versioning => self.versioning = Some(backend.versioning_store()),
            StoreRole::RecycleBin => self.recycle_bin = Some(backend.recycle_bin_store()),
            StoreRole::Attachment => self.attachment = Some(backend.attachment_store()),
            StoreRole::AttachmentVersioning => {
                self.attachment_versioning = Some(backend.attachment_versioning_store())
            }
            StoreRole::AttachmentRecycleBin => {
                self.attachment_recycle_bin = Some(backend.attachment_recycle_bin_store())
            }
        }
        self.kinds.insert(role, backend.kind());
    }
}

pub struct StoreResolver {
    settings: RwLock<Arc<StoreSettings>>,
    backends: Mutex<HashMap<BackendKind, Backend>>,
    resolved: RwLock<Option<ResolvedStores>>,
}

impl StoreResolver {
    pub fn new(settings: StoreSettings) -> Self {
        Self {
            settings: RwLock::new(Arc::new(settings)),
            backends: Mutex::new(HashMap::new()),
            resolved: RwLock::new(None),
        }
    }

    pub fn settings(&self) -> StoreResult<Arc<StoreSettings>> {
        Ok(Arc::clone(&*self.settings.read()?))
    }

    /// Resolve every role, or return the cached resolution.
    pub fn resolve(&self) -> StoreResult<ResolvedStores> {
        if let Some(stores) = self.resolved.read()?.as_ref() {
            return Ok(stores.clone());
        }

        let mut resolved = self.resolved.write()?;
        if let Some(stores) = resolved.as_ref() {
            return Ok(stores.clone());
        }

        let settings = self.settings()?;
        let mut stores = ResolvedStores::default();
        for role in StoreRole::ALL {
            if let Some(backend) = self.resolve_role(&settings, role)? {
                stores.assign(role, &backend);
            }
        }

        if settings.cache {
            if let Some(main) = stores.main.take() {
                stores.main = Some(Arc::new(CachingStore::new(main, settings.cache_capacity)));
            }
        }

        *resolved = Some(stores.clone());
        Ok(stores)
    }

    /// Swap the settings and drop the cached resolution. Stores already
    /// handed out keep working against their original backends.
    pub fn reconfigure(&self, settings: StoreSettings) -> StoreResult<()> {
        let mut resolved = self.resolved.write()?;
        let mut current = self.settings.write()?;
        if current.rocksdb_path != settings.rocksdb_path
            || current.version_policy != settings.version_policy
        {
            self.backends.lock()?.clear();
        }
        *current = Arc::new(settings);
        *resolved = None;
        log::info!("store settings reconfigured");
        Ok(())
    }

    fn resolve_role(&self, settings: &StoreSettings, role: StoreRole) -> StoreResult<Option<Backend>> {
        for hint in candidates(settings, role) {
            let kind = match hint.parse::<BackendKind>() {
                Ok(kind) => kind,
                Err(_) => {
                    log::debug!("store hint {hint:?} for role {role} is not registered");
                    continue;
                }
            };
            match self.backend(settings, kind)? {
                Some(backend) => {
                    log::info!("store role {role} resolved to {}", kind.as_str());
                    return Ok(Some(backend));
                }
                None => log::debug!("store backend {} unavailable for role {role}", kind.as_str()),
            }
        }
        if settings.enabled(role) {
            log::warn!("no store backend available for role {role}; feature disabled");
        }
        Ok(None)
    }

    /// Shared instance of a backend kind, opened on first use.
    fn backend(&self, settings: &StoreSettings, kind: BackendKind) -> StoreResult<Option<Backend>> {
        let mut backends = self.backends.lock()?;
        if let Some(backend) = backends.get(&kind) {
            return Ok(Some(backend.clone()));
        }

        let backend = match kind {
            BackendKind::Memory => {
                Backend::Memory(Arc::new(MemoryStore::with_policy(settings.version_policy)))
            }
            BackendKind::Void => Backend::Void(Arc::new(VoidStore)),
            BackendKind::RocksDb => {
                let Some(path) = &settings.rocksdb_path else {
                    return Ok(None);
                };
                match RocksStore::open(RocksConfig::for_path(path), settings.version_policy) {
                    Ok(store) => Backend::RocksDb(Arc::new(store)),
                    Err(e) => {
                        log::warn!("failed to open rocksdb store at {}: {e}", path.display());
                        return Ok(None);
                    }
                }
            }
        };
        backends.insert(kind, backend.clone());
        Ok(Some(backend))
    }
}

/// Hints to try for a role, in order, without duplicates. Disabled roles
/// have no candidates, except attachment versioning which falls back to
/// the void backend.
fn candidates(settings: &StoreSettings, role: StoreRole) -> Vec<String> {
    if !settings.enabled(role) {
        return match role {
            StoreRole::AttachmentVersioning => vec![BackendKind::Void.as_str().to_string()],
            _ => Vec::new(),
        };
    }

    let role_default = match role {
        StoreRole::Main => GENERIC_STORE_HINT,
        _ => settings.main_hint.as_str(),
    };

    let mut hints: Vec<String> = Vec::with_capacity(3);
    for hint in settings
        .hint(role)
        .into_iter()
        .chain([role_default, GENERIC_STORE_HINT])
    {
        if !hints.iter().any(|h| h == hint) {
            hints.push(hint.to_string());
        }
    }
    hints
}
