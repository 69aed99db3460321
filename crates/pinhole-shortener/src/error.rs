use pinhole_core::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortenerError>;

/// Errors surfaced by the resolver and the URL service.
///
/// None of these carry user-facing text; callers translate them into
/// whatever response shape their transport needs.
#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("url exceeds the maximum length of {max} characters")]
    UrlTooLong { max: usize },
    #[error("invalid alias: {0}")]
    InvalidAlias(String),
    #[error("alias already exists: {0}")]
    AliasExists(String),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("short code has expired: {0}")]
    Expired(String),
    #[error("unable to generate a unique short code")]
    ShortCodeGeneration,
    #[error("storage error: {0}")]
    Storage(String),
}

/// Converts a storage failure into the service taxonomy.
///
/// Insert conflicts are handled explicitly at the call sites that can
/// retry; everything that reaches this helper is a backend failure.
pub(crate) fn storage_error(e: StorageError) -> ShortenerError {
    match e {
        StorageError::Conflict(code) => ShortenerError::AliasExists(code),
        other => ShortenerError::Storage(other.to_string()),
    }
}
