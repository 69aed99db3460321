use async_trait::async_trait;
use pinhole_core::error::CacheResult;
use pinhole_core::{ShortCode, UrlCache, UrlRecord};
use std::time::Duration;

/// A cache that stores nothing.
///
/// Every read is a miss, so the service always falls through to the
/// repository. Useful for tests and for deployments that do not want a
/// cache tier at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UrlCache for NullCache {
    async fn get_url(&self, _code: &ShortCode) -> CacheResult<Option<UrlRecord>> {
        Ok(None)
    }

    async fn set_url(
        &self,
        _code: &ShortCode,
        _record: &UrlRecord,
        _ttl: Option<Duration>,
    ) -> CacheResult<()> {
        Ok(())
    }

    async fn del(&self, _code: &ShortCode) -> CacheResult<()> {
        Ok(())
    }
}
