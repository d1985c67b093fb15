use thiserror::Error;

/// Errors raised while parsing model values from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("invalid version marker: {0:?}")]
    InvalidVersion(String),
    #[error("invalid full name: {0:?}")]
    InvalidFullName(String),
}
