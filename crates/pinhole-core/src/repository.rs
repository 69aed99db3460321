use crate::error::StorageResult;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A stored URL record.
///
/// The `code` field is the single keyspace for both generated codes and
/// custom aliases; `is_alias` records which kind was issued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The short code bound to this record.
    pub code: ShortCode,
    /// The normalized target URL.
    pub target_url: String,
    /// When the record was created.
    pub created_at: Timestamp,
    /// When the record expires, if ever.
    pub expires_at: Option<Timestamp>,
    /// Whether the record still resolves; deactivated records keep their code.
    pub is_active: bool,
    /// Number of successful resolutions.
    pub click_count: u64,
    /// When the record was last resolved.
    pub last_accessed_at: Option<Timestamp>,
    /// Free-form note attached at creation time.
    pub description: Option<String>,
    /// Whether the code was a caller-chosen alias.
    pub is_alias: bool,
}

impl UrlRecord {
    /// Creates an active record with no expiry and zero clicks.
    pub fn new(code: ShortCode, target_url: impl Into<String>) -> Self {
        Self {
            code,
            target_url: target_url.into(),
            created_at: Timestamp::now(),
            expires_at: None,
            is_active: true,
            click_count: 0,
            last_accessed_at: None,
            description: None,
            is_alias: false,
        }
    }

    /// Whether the record's expiry timestamp has passed.
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|expires_at| Timestamp::now() >= expires_at)
    }

    /// Whether the record currently resolves.
    pub fn is_resolvable(&self) -> bool {
        self.is_active && !self.is_expired()
    }
}

/// A page request, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

/// One page of records plus the listing totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlListing {
    pub records: Vec<UrlRecord>,
    pub total: usize,
    pub page: usize,
    pub size: usize,
    pub pages: usize,
}

/// The persistence seam consumed by the resolver and the URL service.
///
/// Implementations MUST enforce a uniqueness constraint on `code` at insert
/// time; the in-process used-code set upstream is only a pre-filter and the
/// [`Conflict`][crate::StorageError::Conflict] returned here is the
/// authoritative collision signal.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Inserts a new URL record.
    /// Returns `Err(Conflict)` if the code is already bound.
    async fn insert(&self, record: UrlRecord) -> StorageResult<()>;

    /// Retrieves the record for a short code, expired or not.
    /// Returns `None` if the code was never issued or has been purged.
    async fn get(&self, code: &ShortCode) -> StorageResult<Option<UrlRecord>>;

    /// Whether a code currently holds a claim, i.e. an unexpired record
    /// exists for it. Expired codes read as free and may be reissued.
    async fn exists(&self, code: &ShortCode) -> StorageResult<bool>;

    /// Finds a resolvable record for the given normalized target URL.
    /// Used by the service for idempotent shortening.
    async fn find_by_target(&self, target_url: &str) -> StorageResult<Option<UrlRecord>>;

    /// Lists records newest first, optionally filtered by active flag.
    async fn list(&self, page: Page, is_active: Option<bool>) -> StorageResult<UrlListing>;

    /// Bumps the click counter and last-accessed timestamp.
    /// Returns `false` if the code does not exist.
    async fn increment_clicks(&self, code: &ShortCode) -> StorageResult<bool>;

    /// Marks the record inactive, keeping its code claimed.
    /// Returns `false` if the code does not exist.
    async fn deactivate(&self, code: &ShortCode) -> StorageResult<bool>;

    /// Deletes the record for a short code.
    /// Returns `true` if the record existed and was removed.
    async fn delete(&self, code: &ShortCode) -> StorageResult<bool>;

    /// Removes all expired records, returning how many were purged.
    async fn purge_expired(&self) -> StorageResult<usize>;
}
