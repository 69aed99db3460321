//! URL shortening service for Pinhole.
//!
//! This crate ties the generator and the persistence seam together: the
//! uniqueness resolver picks codes that are free against persisted state,
//! the validator normalizes and vets target URLs, and `UrlService`
//! orchestrates the create/resolve/list/deactivate/delete operations.

pub mod error;
pub mod resolver;
pub mod service;
pub mod validate;

pub use error::ShortenerError;
pub use resolver::UniquenessResolver;
pub use service::{
    CreateParams, PerformanceRating, UrlAnalytics, UrlService, UrlServiceSettings,
};
pub use validate::UrlValidator;
