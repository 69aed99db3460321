//! Storage backends for the Pinhole URL shortener.
//!
//! The in-memory repository is the reference implementation of the
//! persistence seam and the uniqueness constraint it must enforce.

pub mod memory;

pub use memory::MemoryRepository;
