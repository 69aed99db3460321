//! Short-code candidate generation for the Pinhole URL shortener.
//!
//! Generators are pure candidate factories: they never talk to storage.
//! The uniqueness guarantee against persisted state belongs to the
//! resolver; a generator only guarantees no repeat within its own
//! in-process used-code set.

pub mod error;
pub mod generator;

pub use error::GeneratorError;
pub use generator::{
    CodeGenerator, GeneratorSettings, Strategy, DEFAULT_CODE_LENGTH, DEFAULT_MAX_ATTEMPTS,
};
