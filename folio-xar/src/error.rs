use folio_core::DocumentKey;
use folio_store::StoreError;
use thiserror::Error;

/// Why one document entry could not be decoded or encoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The bytes are not valid in the declared encoding.
    #[error("entry bytes are not valid {0}")]
    Encoding(String),
    #[error("malformed XML: {0}")]
    Malformed(String),
    #[error("missing element <{0}>")]
    MissingField(&'static str),
    #[error("invalid value for <{field}>: {value:?}")]
    InvalidValue { field: &'static str, value: String },
    #[error("unsupported encoding {0:?}")]
    UnsupportedEncoding(String),
}

/// Package engine errors.
#[derive(Debug, Error)]
pub enum XarError {
    /// Corrupt container, missing or malformed manifest. Aborts the import.
    #[error("invalid package archive: {0}")]
    ArchiveFormat(String),
    #[error("cannot decode entry {entry}: {source}")]
    EntryDecode {
        entry: String,
        #[source]
        source: CodecError,
    },
    /// A document requested for export is not stored.
    #[error("document not found: {0}")]
    DocumentNotFound(DocumentKey),
    #[error("duplicate package entry: {0}")]
    DuplicateEntry(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("archive I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Codec(#[from] CodecError),
}

pub type XarResult<T> = Result<T, XarError>;

impl From<zip::result::ZipError> for XarError {
    fn from(e: zip::result::ZipError) -> Self {
        XarError::ArchiveFormat(e.to_string())
    }
}
