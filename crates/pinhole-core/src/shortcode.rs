use crate::alphabet::Alphabet;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt::Display;

/// Maximum accepted length for any short code, generated or custom.
pub const MAX_CODE_LENGTH: usize = 50;

/// A short code identifying a shortened URL.
///
/// Backed by a [`SmolStr`] since codes are a handful of characters and get
/// cloned on every lookup.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShortCode(SmolStr);

impl ShortCode {
    /// Creates a `ShortCode` after validating it against the alphabet.
    ///
    /// Valid codes are non-empty, at most [`MAX_CODE_LENGTH`] characters,
    /// and drawn entirely from the alphabet's symbol set.
    pub fn new(code: impl Into<SmolStr>, alphabet: &Alphabet) -> Result<Self, CoreError> {
        let code = code.into();
        Self::validate(&code, alphabet)?;
        Ok(Self(code))
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes produced by trusted internal sources, such as
    /// the generator, which only emits alphabet symbols.
    pub fn new_unchecked(code: impl Into<SmolStr>) -> Self {
        Self(code.into())
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self)
    }

    fn validate(code: &str, alphabet: &Alphabet) -> Result<(), CoreError> {
        if code.is_empty() {
            return Err(CoreError::InvalidShortCode(
                "code cannot be empty".to_string(),
            ));
        }

        if code.len() > MAX_CODE_LENGTH {
            return Err(CoreError::InvalidShortCode(format!(
                "length must be at most {}, got {}",
                MAX_CODE_LENGTH,
                code.len()
            )));
        }

        if !alphabet.spans(code) {
            return Err(CoreError::InvalidShortCode(format!(
                "must contain only alphabet symbols: '{}'",
                code
            )));
        }

        Ok(())
    }
}

impl std::fmt::Debug for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ShortCode").field(&self.0).finish()
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
