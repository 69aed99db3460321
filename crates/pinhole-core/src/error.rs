use thiserror::Error;

/// Decode-side failures of the code alphabet.
///
/// These stay local to the encoder and its direct callers; generation code
/// discards the offending candidate instead of surfacing them.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("character '{0}' is not in the code alphabet")]
    UnknownSymbol(char),
    #[error("cannot decode an empty string")]
    Empty,
    #[error("decoded value overflows the 128-bit code space")]
    Overflow,
}

/// Rejections raised when constructing a custom [`Alphabet`][crate::Alphabet].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AlphabetError {
    #[error("alphabet needs at least 2 symbols, got {0}")]
    TooFewSymbols(usize),
    #[error("alphabet symbols must be printable ASCII, got {0:?}")]
    NonAscii(char),
    #[error("alphabet contains duplicate symbol '{0}'")]
    DuplicateSymbol(char),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
}

/// Result type for repository operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short code already exists: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage operation failed: {0}")]
    Operation(String),
}

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache serialization failed: {0}")]
    Serialization(String),
    #[error("cache operation failed: {0}")]
    Operation(String),
}
