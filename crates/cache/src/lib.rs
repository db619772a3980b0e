//! Generic key/value cache pools for classmap metadata
//!
//! This crate provides the storage seam the metadata factory persists
//! through:
//! - [`CacheItem`]: one entry in transit, with get / set / hit-check
//! - [`CachePool`]: the fetch-and-persist interface pools implement
//! - [`MemoryPool`]: process-local pool for tests and short-lived processes
//! - [`DiskPool`]: durable pool storing JSON envelopes under a sharded
//!   directory tree with atomic writes and self-healing reads
//!
//! # Overview
//!
//! Pools are deliberately dumb: one value per string key, no eviction, no
//! cross-process coordination. A miss is not an error; [`CachePool::item`]
//! returns an empty item carrying the key, callers fill it and hand it back
//! to [`CachePool::save`].

mod error;

pub mod disk;
pub mod memory;
pub mod pool;

// Re-export error types at crate root
pub use error::{Error, Result};

// Re-export main types
pub use disk::{DiskPool, default_root};
pub use memory::MemoryPool;
pub use pool::{CacheItem, CachePool};
