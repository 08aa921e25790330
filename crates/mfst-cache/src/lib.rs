//! In-memory caching layer for mfst storage.
//!
//! [`Cache`] wraps any [`Storage`](mfst_storage::Storage) and implements the
//! same trait, serving repeated reads and complete listings from an index of
//! cached entries:
//!
//! - [`CacheEntry::Full`]: a fully decoded object
//! - [`CacheEntry::Partial`]: metadata only, promoted on the next full read
//!
//! [`Invalidate`] lets change notifiers evict entries whose backing file
//! changed underneath the cache.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mfst_cache::Cache;
//! use mfst_storage::Storage;
//!
//! let cache = Cache::new(Arc::new(storage));
//! let cars = cache.list(&car_type)?; // reads the backing store
//! let cars = cache.list(&car_type)?; // served from the index
//! ```

mod cache;
mod index;

pub use cache::{Cache, Invalidate};
pub use index::CacheEntry;
