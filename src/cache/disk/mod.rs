//! Disk-based image cache
//!
//! Stores one encoded image per cache key, with its freshness metadata
//! encoded in the file name. Filesystem access goes through [`DiskBackend`]
//! so the store can run against tokio::fs or an in-memory mock.

pub use self::backend::DiskBackend;
pub use self::clock::{Clock, ManualClock, SystemClock};
pub use self::error::DiskCacheError;
pub use self::image_cache::{CacheEntry, CacheLookup, CachedImageValue, ImageCache};
pub use self::record::CacheFileRecord;
pub use self::tokio_backend::TokioFsBackend;

// Make backend trait public for benchmarks
pub mod backend;
mod clock;
mod error;
mod image_cache;
mod record;
pub mod tokio_backend;

#[cfg(test)]
mod mock_backend;
