use crate::error::{storage_error, Result, ShortenerError};
use crate::resolver::UniquenessResolver;
use crate::validate::{UrlValidator, DEFAULT_MAX_URL_LENGTH};
use jiff::{SignedDuration, Timestamp};
use pinhole_core::repository::{Page, UrlListing};
use pinhole_core::{Repository, ShortCode, StorageError, UrlCache, UrlRecord};
use pinhole_generator::CodeGenerator;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use typed_builder::TypedBuilder;

const SECONDS_PER_DAY: i64 = 86_400;

/// Default record lifetime: one year.
const DEFAULT_RECORD_TTL: SignedDuration = SignedDuration::from_secs(365 * 24 * 60 * 60);

/// Configures a [`UrlService`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct UrlServiceSettings {
    /// Bound on the length of accepted target URLs.
    #[builder(default = DEFAULT_MAX_URL_LENGTH)]
    pub max_url_length: usize,
    /// Domains rejected at creation time.
    #[builder(default)]
    pub denylist: Vec<String>,
    /// Lifetime applied when a create request names no expiry.
    /// `None` means records without an explicit expiry never expire.
    #[builder(default = Some(DEFAULT_RECORD_TTL))]
    pub default_ttl: Option<SignedDuration>,
    /// TTL for cache entries written by the service.
    #[builder(default)]
    pub cache_ttl: Option<Duration>,
    /// How many insert conflicts to absorb with a fresh candidate before
    /// giving up on a create.
    #[builder(default = 1)]
    pub insert_retries: usize,
    /// Upper bound on the page size accepted by [`UrlService::list`].
    #[builder(default = 100)]
    pub max_page_size: usize,
}

impl Default for UrlServiceSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Parameters for creating a shortened URL.
#[derive(Debug, Clone, TypedBuilder)]
pub struct CreateParams {
    /// The raw target URL; the service validates and normalizes it.
    #[builder(setter(into))]
    pub target_url: String,
    /// Caller-chosen code instead of a generated one.
    #[builder(default, setter(strip_option, into))]
    pub custom_alias: Option<String>,
    /// Requested lifetime; falls back to the service default.
    #[builder(default, setter(strip_option))]
    pub expires_in: Option<SignedDuration>,
    /// Free-form note stored on the record.
    #[builder(default, setter(strip_option, into))]
    pub description: Option<String>,
}

/// Usage figures derived for one short code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UrlAnalytics {
    pub code: ShortCode,
    pub target_url: String,
    pub created_at: Timestamp,
    pub click_count: u64,
    pub last_accessed_at: Option<Timestamp>,
    pub days_active: u64,
    pub avg_clicks_per_day: f64,
    pub rating: PerformanceRating,
}

/// Coarse click-rate buckets, per day of lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceRating {
    New,
    Excellent,
    Good,
    Average,
    Low,
}

impl PerformanceRating {
    /// Buckets by average clicks per day: 10+ excellent, 5+ good,
    /// 1+ average, below that low.
    pub fn from_usage(click_count: u64, days_active: u64) -> Self {
        if days_active == 0 {
            return Self::New;
        }

        let avg = click_count as f64 / days_active as f64;
        if avg >= 10.0 {
            Self::Excellent
        } else if avg >= 5.0 {
            Self::Good
        } else if avg >= 1.0 {
            Self::Average
        } else {
            Self::Low
        }
    }
}

/// Orchestrates shortening: validation, code resolution, persistence, and
/// the read-through cache.
///
/// Generic over the repository and cache seams; every collaborator is
/// constructed by the caller and passed in, nothing is process-global.
pub struct UrlService<R, C> {
    repository: Arc<R>,
    cache: Arc<C>,
    generator: Arc<CodeGenerator>,
    resolver: UniquenessResolver<R>,
    validator: UrlValidator,
    settings: UrlServiceSettings,
}

impl<R: Repository, C: UrlCache> UrlService<R, C> {
    pub fn new(
        repository: R,
        cache: C,
        generator: CodeGenerator,
        settings: UrlServiceSettings,
    ) -> Self {
        let repository = Arc::new(repository);
        let generator = Arc::new(generator);
        let resolver =
            UniquenessResolver::new(Arc::clone(&repository), Arc::clone(&generator));
        let validator =
            UrlValidator::with_denylist(settings.max_url_length, settings.denylist.clone());

        Self {
            repository,
            cache: Arc::new(cache),
            generator,
            resolver,
            validator,
            settings,
        }
    }

    /// Creates a shortened URL and returns the stored record.
    ///
    /// Shortening is idempotent for generated codes: a target that already
    /// has a resolvable record gets that record back instead of a second
    /// code. An insert conflict on a generated code (a concurrent creator
    /// won the race) is absorbed by re-resolving with a fresh candidate,
    /// bounded by `insert_retries`.
    pub async fn create(&self, params: CreateParams) -> Result<UrlRecord> {
        let target_url = self.validator.validate_and_normalize(&params.target_url)?;

        if params.custom_alias.is_none() {
            if let Some(existing) = self
                .repository
                .find_by_target(&target_url)
                .await
                .map_err(storage_error)?
            {
                debug!(code = %existing.code, "target already shortened, reusing record");
                return Ok(existing);
            }
        }

        let expires_at = self.expires_at(params.expires_in);
        let is_alias = params.custom_alias.is_some();
        let mut conflicts = 0;

        loop {
            let code = self
                .resolver
                .choose_code(&target_url, params.custom_alias.as_deref())
                .await?;

            let mut record = UrlRecord::new(code.clone(), target_url.clone());
            record.expires_at = expires_at;
            record.description = params.description.clone();
            record.is_alias = is_alias;

            match self.repository.insert(record.clone()).await {
                Ok(()) => {
                    self.generator.mark_used(code.as_str());
                    self.fill_cache(&record).await;
                    info!(code = %code, url = %target_url, "created short url");
                    return Ok(record);
                }
                Err(StorageError::Conflict(_)) if is_alias => {
                    return Err(ShortenerError::AliasExists(code.to_string()));
                }
                Err(StorageError::Conflict(_)) => {
                    // Lost the check-then-reserve race to a concurrent
                    // creator. The repository constraint is authoritative;
                    // take a fresh candidate instead of failing outright.
                    self.generator.mark_used(code.as_str());
                    conflicts += 1;
                    if conflicts > self.settings.insert_retries {
                        return Err(ShortenerError::ShortCodeGeneration);
                    }
                    warn!(code = %code, "insert conflict, retrying with a fresh candidate");
                }
                Err(e) => return Err(storage_error(e)),
            }
        }
    }

    /// Resolves a short code to its target URL, counting the click.
    pub async fn resolve(&self, code: &str) -> Result<String> {
        let code = ShortCode::new_unchecked(code);
        let record = self
            .lookup(&code)
            .await?
            .ok_or_else(|| ShortenerError::NotFound(code.to_string()))?;

        if !record.is_active {
            return Err(ShortenerError::NotFound(code.to_string()));
        }
        if record.is_expired() {
            return Err(ShortenerError::Expired(code.to_string()));
        }

        // Click bookkeeping must not break the redirect.
        if let Err(e) = self.repository.increment_clicks(&code).await {
            debug!(code = %code, error = %e, "click count update failed");
        }

        info!(code = %code, url = %record.target_url, "resolved short url");
        Ok(record.target_url)
    }

    /// Returns the stored record for a code, with fresh counters.
    ///
    /// Reads the repository directly: cached rows may carry stale click
    /// counts.
    pub async fn stats(&self, code: &str) -> Result<UrlRecord> {
        let code = ShortCode::new_unchecked(code);
        self.repository
            .get(&code)
            .await
            .map_err(storage_error)?
            .ok_or_else(|| ShortenerError::NotFound(code.to_string()))
    }

    /// Lists records newest first. Page numbers are 1-based; the size is
    /// clamped to the configured maximum.
    pub async fn list(
        &self,
        page: usize,
        size: usize,
        is_active: Option<bool>,
    ) -> Result<UrlListing> {
        let page = Page {
            number: page.max(1),
            size: size.clamp(1, self.settings.max_page_size),
        };
        self.repository
            .list(page, is_active)
            .await
            .map_err(storage_error)
    }

    /// Marks a record inactive. Its code stays claimed.
    pub async fn deactivate(&self, code: &str) -> Result<()> {
        let code = ShortCode::new_unchecked(code);
        if !self
            .repository
            .deactivate(&code)
            .await
            .map_err(storage_error)?
        {
            return Err(ShortenerError::NotFound(code.to_string()));
        }

        self.evict(&code).await;
        info!(code = %code, "deactivated short url");
        Ok(())
    }

    /// Deletes a record and frees its code for reuse.
    pub async fn delete(&self, code: &str) -> Result<()> {
        let code = ShortCode::new_unchecked(code);
        if !self.repository.delete(&code).await.map_err(storage_error)? {
            return Err(ShortenerError::NotFound(code.to_string()));
        }

        self.generator.release_used(code.as_str());
        self.evict(&code).await;
        info!(code = %code, "deleted short url");
        Ok(())
    }

    /// Purges expired records and returns how many were removed.
    ///
    /// Cached rows for purged codes age out through the cache TTL; until
    /// then [`resolve`][Self::resolve] still refuses them via the expiry
    /// check.
    pub async fn cleanup_expired(&self) -> Result<usize> {
        let purged = self
            .repository
            .purge_expired()
            .await
            .map_err(storage_error)?;
        info!(purged, "purged expired short urls");
        Ok(purged)
    }

    /// Derives usage figures for one code.
    pub async fn analytics(&self, code: &str) -> Result<UrlAnalytics> {
        let record = self.stats(code).await?;

        let days_active = days_active_since(record.created_at);
        let avg_clicks_per_day = if days_active > 0 {
            record.click_count as f64 / days_active as f64
        } else {
            0.0
        };

        Ok(UrlAnalytics {
            rating: PerformanceRating::from_usage(record.click_count, days_active),
            code: record.code,
            target_url: record.target_url,
            created_at: record.created_at,
            click_count: record.click_count,
            last_accessed_at: record.last_accessed_at,
            days_active,
            avg_clicks_per_day,
        })
    }

    fn expires_at(&self, requested: Option<SignedDuration>) -> Option<Timestamp> {
        requested
            .or(self.settings.default_ttl)
            .map(|ttl| Timestamp::now() + ttl)
    }

    /// Cache-first read that falls through to the repository and refills
    /// the cache on a hit there. Cache failures degrade to misses.
    async fn lookup(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        match self.cache.get_url(code).await {
            Ok(Some(record)) => return Ok(Some(record)),
            Ok(None) => {}
            Err(e) => debug!(code = %code, error = %e, "cache read failed"),
        }

        let record = self
            .repository
            .get(code)
            .await
            .map_err(storage_error)?;
        if let Some(ref record) = record {
            self.fill_cache(record).await;
        }

        Ok(record)
    }

    async fn fill_cache(&self, record: &UrlRecord) {
        if let Err(e) = self
            .cache
            .set_url(&record.code, record, self.settings.cache_ttl)
            .await
        {
            debug!(code = %record.code, error = %e, "cache fill failed");
        }
    }

    async fn evict(&self, code: &ShortCode) {
        if let Err(e) = self.cache.del(code).await {
            debug!(code = %code, error = %e, "cache eviction failed");
        }
    }
}

/// Whole days since `created_at`, counting the creation day as day one.
fn days_active_since(created_at: Timestamp) -> u64 {
    let elapsed = (Timestamp::now().as_second() - created_at.as_second()).max(0);
    (elapsed / SECONDS_PER_DAY) as u64 + 1
}
