use folio_core::{DocumentKey, EntryId, ModelError, Version};
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Backend I/O, codec or lock failure. Carries the underlying cause.
    #[error("store failure: {0}")]
    Failure(String),
    /// A concurrent save won the race for this document-translation.
    #[error("conflicting save of {key}: expected {}, found {}", show(.expected), show(.found))]
    Conflict {
        key: DocumentKey,
        expected: Option<Version>,
        found: Option<Version>,
    },
    /// A revision was appended at or below the latest archived version.
    #[error("revision {attempted} of {key} does not follow {latest}")]
    VersionRegression {
        key: DocumentKey,
        latest: Version,
        attempted: Version,
    },
    #[error("recycle bin entry not found: {0}")]
    EntryNotFound(EntryId),
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

fn show(version: &Option<Version>) -> String {
    match version {
        Some(v) => v.to_string(),
        None => "no document".to_string(),
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

impl From<rocksdb::Error> for StoreError {
    fn from(e: rocksdb::Error) -> Self {
        StoreError::Failure(format!("rocksdb: {e}"))
    }
}

impl From<ModelError> for StoreError {
    fn from(e: ModelError) -> Self {
        StoreError::InvalidConfig(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        StoreError::Failure(format!("lock poisoned: {e}"))
    }
}
