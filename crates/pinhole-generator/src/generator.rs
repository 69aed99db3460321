use crate::error::GeneratorError;
use jiff::Timestamp;
use parking_lot::Mutex;
use pinhole_core::{Alphabet, ShortCode};
use rand::rngs::OsRng;
use rand::Rng;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use typed_builder::TypedBuilder;

/// Default length of generated codes.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Default bound on in-process uniqueness attempts.
pub const DEFAULT_MAX_ATTEMPTS: usize = 100;

/// Candidate generation strategies.
///
/// A single data-driven dispatch point instead of one generator type per
/// strategy; all state lives on the [`CodeGenerator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Independent uniform symbols from a CSPRNG.
    Random,
    /// Deterministic digest of the target URL. Same URL, same candidate.
    ContentHash,
    /// Monotonic per-instance counter. Length grows with the counter, so
    /// this strategy is exempt from the fixed-length contract.
    Sequential,
    /// Millisecond timestamp, padded with random symbols to the fixed length.
    TimeBased,
}

/// Configures a [`CodeGenerator`] instance.
#[derive(Debug, Clone, TypedBuilder)]
pub struct GeneratorSettings {
    /// Symbol set for every strategy.
    #[builder(default = Alphabet::safe())]
    pub alphabet: Alphabet,
    /// Length of random, content-hash, and time-based candidates.
    #[builder(default = DEFAULT_CODE_LENGTH)]
    pub code_length: usize,
    /// Attempt bound for [`CodeGenerator::generate_unique`].
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: usize,
    /// Starting value for the sequential counter. Lets deployments carve
    /// out disjoint counter ranges per instance.
    #[builder(default = 0)]
    pub counter_offset: u64,
}

/// Produces short-code candidates and tracks codes issued in-process.
///
/// The used-code set is a pre-filter, not the source of truth: it avoids
/// re-proposing codes this process already handed out, while the repository
/// uniqueness constraint remains the final gate. The set is never persisted
/// and never pruned.
///
/// Construct one per service and pass it explicitly; generators hold no
/// global state.
#[derive(Debug)]
pub struct CodeGenerator {
    alphabet: Alphabet,
    code_length: usize,
    max_attempts: usize,
    counter: AtomicU64,
    used: Mutex<HashSet<String>>,
}

impl CodeGenerator {
    pub fn new(settings: GeneratorSettings) -> Self {
        Self {
            alphabet: settings.alphabet,
            code_length: settings.code_length,
            max_attempts: settings.max_attempts,
            counter: AtomicU64::new(settings.counter_offset),
            used: Mutex::new(HashSet::new()),
        }
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn code_length(&self) -> usize {
        self.code_length
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Produces one candidate with the given strategy.
    ///
    /// Only [`Strategy::ContentHash`] reads `target_url`. No uniqueness
    /// check is performed here.
    pub fn candidate(&self, strategy: Strategy, target_url: &str) -> String {
        match strategy {
            Strategy::Random => self.random_code(),
            Strategy::ContentHash => self.code_from_url(target_url),
            Strategy::Sequential => self.sequential_code(),
            Strategy::TimeBased => self.timestamped_code(),
        }
    }

    /// Draws `code_length` independent uniform symbols from the OS CSPRNG.
    ///
    /// Codes must not be guessable, so this deliberately does not use a
    /// statistical PRNG.
    pub fn random_code(&self) -> String {
        let symbols = self.alphabet.symbols().as_bytes();
        let mut rng = OsRng;
        (0..self.code_length)
            .map(|_| symbols[rng.gen_range(0..symbols.len())] as char)
            .collect()
    }

    /// Derives the candidate deterministically from the target URL.
    pub fn code_from_url(&self, target_url: &str) -> String {
        self.alphabet
            .hash_to_code(target_url.as_bytes(), self.code_length)
    }

    /// Encodes the next counter value. Natural length, no padding.
    pub fn sequential_code(&self) -> String {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        self.alphabet.encode(count as u128)
    }

    /// Encodes the current time at millisecond resolution, right-padded
    /// with random symbols up to the fixed length, or truncated to it.
    pub fn timestamped_code(&self) -> String {
        let millis = Timestamp::now().as_millisecond();
        let mut code = self.alphabet.encode(millis as u128);

        if code.len() < self.code_length {
            let symbols = self.alphabet.symbols().as_bytes();
            let mut rng = OsRng;
            while code.len() < self.code_length {
                code.push(symbols[rng.gen_range(0..symbols.len())] as char);
            }
            code
        } else {
            code.truncate(self.code_length);
            code
        }
    }

    /// Generates a random code not yet in the in-process used set.
    ///
    /// The winning candidate is added to the set before it is returned, so
    /// one generator never hands out the same code twice in its lifetime.
    /// Fails with [`GeneratorError::Exhausted`] once `max_attempts`
    /// candidates all turned out used.
    pub fn generate_unique(&self) -> Result<ShortCode, GeneratorError> {
        self.generate_unique_with(self.max_attempts)
    }

    /// [`generate_unique`][Self::generate_unique] with an explicit bound.
    pub fn generate_unique_with(&self, max_attempts: usize) -> Result<ShortCode, GeneratorError> {
        for _ in 0..max_attempts {
            let code = self.random_code();
            // Check-and-add under one lock so concurrent callers cannot
            // both claim the same candidate.
            if self.used.lock().insert(code.clone()) {
                return Ok(ShortCode::new_unchecked(code));
            }
        }

        Err(GeneratorError::Exhausted {
            attempts: max_attempts,
        })
    }

    /// Whether `code` is non-empty, at most 50 characters, and entirely
    /// drawn from the alphabet. Used to vet caller-chosen aliases.
    pub fn is_valid_format(&self, code: &str) -> bool {
        ShortCode::new(code, &self.alphabet).is_ok()
    }

    /// Records a code as taken, typically after persisted state revealed a
    /// collision with another writer.
    pub fn mark_used(&self, code: &str) {
        self.used.lock().insert(code.to_string());
    }

    /// Forgets a code, e.g. after its record was deleted. Optional: the
    /// set is only a pre-filter, so releasing is safe but never required.
    pub fn release_used(&self, code: &str) {
        self.used.lock().remove(code);
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(GeneratorSettings::builder().build())
    }
}
