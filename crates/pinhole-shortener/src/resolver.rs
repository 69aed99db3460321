use crate::error::{storage_error, Result, ShortenerError};
use pinhole_core::{Repository, ShortCode};
use pinhole_generator::{CodeGenerator, GeneratorError, Strategy};
use std::sync::Arc;
use tracing::{debug, warn};

/// Picks short codes that are free against persisted state.
///
/// The resolver performs the check half of check-then-reserve: it returns a
/// code that was unclaimed at the moment of the lookup. The reserve half is
/// the repository insert, whose uniqueness constraint stays authoritative;
/// the service retries an insert conflict with a fresh candidate from here.
pub struct UniquenessResolver<R> {
    repository: Arc<R>,
    generator: Arc<CodeGenerator>,
}

impl<R: Repository> UniquenessResolver<R> {
    pub fn new(repository: Arc<R>, generator: Arc<CodeGenerator>) -> Self {
        Self {
            repository,
            generator,
        }
    }

    /// Chooses a code for the given normalized target URL.
    ///
    /// With an alias: validates its format and requires it to be free; a
    /// caller-chosen code gets no collision retry.
    ///
    /// Without an alias: probes the deterministic content-derived candidate
    /// first, so a given URL tends to keep the same code across processes,
    /// then falls back to random candidates for up to the generator's
    /// attempt bound. Candidates the repository reports taken are recorded
    /// in the in-process used set before the next round.
    ///
    /// Repository failures surface as [`ShortenerError::Storage`] and do
    /// not count against the attempt bound.
    pub async fn choose_code(&self, target_url: &str, alias: Option<&str>) -> Result<ShortCode> {
        if let Some(alias) = alias {
            return self.resolve_alias(alias).await;
        }

        let derived = self
            .generator
            .candidate(Strategy::ContentHash, target_url);
        if let Some(code) = self.probe(ShortCode::new_unchecked(derived)).await? {
            return Ok(code);
        }

        for attempt in 0..self.generator.max_attempts() {
            let candidate = self.next_random_candidate()?;
            if let Some(code) = self.probe(candidate.clone()).await? {
                return Ok(code);
            }
            debug!(attempt, code = %candidate, "candidate already claimed, retrying");
        }

        warn!(
            attempts = self.generator.max_attempts(),
            "exhausted candidate attempts against persisted state"
        );
        Err(ShortenerError::ShortCodeGeneration)
    }

    async fn resolve_alias(&self, alias: &str) -> Result<ShortCode> {
        if !self.generator.is_valid_format(alias) {
            return Err(ShortenerError::InvalidAlias(alias.to_string()));
        }

        let code = ShortCode::new_unchecked(alias);
        if self
            .repository
            .exists(&code)
            .await
            .map_err(storage_error)?
        {
            return Err(ShortenerError::AliasExists(alias.to_string()));
        }

        Ok(code)
    }

    /// Checks one candidate against persisted state. The candidate is
    /// recorded in the in-process used set either way: taken codes must
    /// not be proposed again, and a free one is about to be reserved.
    async fn probe(&self, code: ShortCode) -> Result<Option<ShortCode>> {
        if self
            .repository
            .exists(&code)
            .await
            .map_err(storage_error)?
        {
            self.generator.mark_used(code.as_str());
            Ok(None)
        } else {
            self.generator.mark_used(code.as_str());
            Ok(Some(code))
        }
    }

    /// One random candidate from the generator. A single in-process
    /// exhaustion is absorbed and retried before escalating, since the
    /// used set saturates long before the codespace does.
    fn next_random_candidate(&self) -> Result<ShortCode> {
        match self.generator.generate_unique() {
            Ok(code) => Ok(code),
            Err(GeneratorError::Exhausted { .. }) => self
                .generator
                .generate_unique()
                .map_err(|_| ShortenerError::ShortCodeGeneration),
        }
    }
}
