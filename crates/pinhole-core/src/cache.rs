use crate::error::CacheResult;
use crate::repository::UrlRecord;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::time::Duration;

/// A cache for URL records, keyed by short code.
///
/// Implementations are best-effort: the service treats every error here as
/// a miss and falls through to the repository.
#[async_trait]
pub trait UrlCache: Send + Sync + 'static {
    /// Get a URL record from the cache.
    ///
    /// Returns `Ok(None)` if the key is not cached.
    async fn get_url(&self, code: &ShortCode) -> CacheResult<Option<UrlRecord>>;

    /// Store a URL record with an optional TTL.
    ///
    /// If `ttl` is `None`, the entry follows the implementation's default
    /// expiration policy.
    async fn set_url(
        &self,
        code: &ShortCode,
        record: &UrlRecord,
        ttl: Option<Duration>,
    ) -> CacheResult<()>;

    /// Remove a URL record from the cache.
    ///
    /// Needed when records are deactivated or deleted. It is not an error
    /// if the key does not exist.
    async fn del(&self, code: &ShortCode) -> CacheResult<()>;
}
