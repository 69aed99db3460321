//! Cache implementations for the Pinhole URL shortener.
//!
//! Both backends implement the `UrlCache` trait from `pinhole-core`:
//! a Moka-backed in-memory cache for single-node deployments and a no-op
//! cache for wiring the service without caching.

pub mod moka;
pub mod null;

pub use crate::moka::MokaUrlCache;
pub use null::NullCache;
