//! Core types and traits for the Pinhole URL shortener.
//!
//! This crate provides the code alphabet and its base-N encoder, the
//! validated short-code type, the stored record model, and the traits
//! implemented by the storage and cache crates.

pub mod alphabet;
pub mod cache;
pub mod error;
pub mod repository;
pub mod shortcode;

pub use alphabet::Alphabet;
pub use cache::UrlCache;
pub use error::{AlphabetError, CacheError, CoreError, FormatError, StorageError};
pub use repository::{Page, Repository, UrlListing, UrlRecord};
pub use shortcode::ShortCode;
