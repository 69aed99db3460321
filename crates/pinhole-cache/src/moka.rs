use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use pinhole_core::error::CacheResult;
use pinhole_core::{ShortCode, UrlCache, UrlRecord};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// A cached record together with the TTL it was stored under.
#[derive(Debug, Clone)]
struct CachedEntry {
    record: UrlRecord,
    ttl: Option<Duration>,
}

/// Applies the TTL each entry was inserted with. Entries stored without a
/// TTL only fall out through capacity eviction.
struct PerEntryTtl;

impl Expiry<String, CachedEntry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &CachedEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        entry.ttl
    }
}

/// An in-memory URL cache backed by Moka.
///
/// Suitable as the only cache of a single-node deployment. Honors the
/// per-entry TTL passed through [`UrlCache::set_url`].
#[derive(Clone)]
pub struct MokaUrlCache {
    cache: Cache<String, CachedEntry>,
}

impl MokaUrlCache {
    /// Creates a cache with the default maximum capacity of 10,000 entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Creates a cache bounded to `max_capacity` entries.
    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }

    /// Number of cached entries. Approximate under concurrent writes.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for MokaUrlCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MokaUrlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaUrlCache")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

#[async_trait]
impl UrlCache for MokaUrlCache {
    async fn get_url(&self, code: &ShortCode) -> CacheResult<Option<UrlRecord>> {
        trace!(code = %code, "fetching record from moka cache");

        match self.cache.get(code.as_str()).await {
            Some(entry) => {
                debug!(code = %code, "cache hit");
                Ok(Some(entry.record))
            }
            None => {
                trace!(code = %code, "cache miss");
                Ok(None)
            }
        }
    }

    async fn set_url(
        &self,
        code: &ShortCode,
        record: &UrlRecord,
        ttl: Option<Duration>,
    ) -> CacheResult<()> {
        trace!(code = %code, ttl = ?ttl, "storing record in moka cache");

        let entry = CachedEntry {
            record: record.clone(),
            ttl,
        };
        self.cache.insert(code.as_str().to_string(), entry).await;
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> CacheResult<()> {
        trace!(code = %code, "removing record from moka cache");

        self.cache.invalidate(code.as_str()).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn test_record(s: &str, url: &str) -> UrlRecord {
        UrlRecord::new(code(s), url)
    }

    #[tokio::test]
    async fn get_and_set() {
        let cache = MokaUrlCache::new();
        let c = code("abc234");
        let record = test_record("abc234", "https://example.com");

        assert!(cache.get_url(&c).await.unwrap().is_none());

        cache.set_url(&c, &record, None).await.unwrap();
        assert_eq!(cache.get_url(&c).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn del_removes_entry() {
        let cache = MokaUrlCache::new();
        let c = code("abc234");
        let record = test_record("abc234", "https://example.com");

        cache.set_url(&c, &record, None).await.unwrap();
        cache.del(&c).await.unwrap();
        assert!(cache.get_url(&c).await.unwrap().is_none());

        // Deleting again is not an error.
        cache.del(&c).await.unwrap();
    }

    #[tokio::test]
    async fn per_entry_ttl_expires_entries() {
        let cache = MokaUrlCache::new();
        let c = code("abc234");
        let record = test_record("abc234", "https://example.com");

        cache
            .set_url(&c, &record, Some(Duration::from_millis(100)))
            .await
            .unwrap();
        assert!(cache.get_url(&c).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(cache.get_url(&c).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn entries_without_ttl_persist() {
        let cache = MokaUrlCache::new();
        let c = code("abc234");
        let record = test_record("abc234", "https://example.com");

        cache.set_url(&c, &record, None).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(cache.get_url(&c).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn set_overwrites_previous_record() {
        let cache = MokaUrlCache::new();
        let c = code("abc234");

        cache
            .set_url(&c, &test_record("abc234", "https://old.com"), None)
            .await
            .unwrap();
        cache
            .set_url(&c, &test_record("abc234", "https://new.com"), None)
            .await
            .unwrap();

        let found = cache.get_url(&c).await.unwrap().unwrap();
        assert_eq!(found.target_url, "https://new.com");
    }
}
