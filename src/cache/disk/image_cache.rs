//! On-disk cache of optimized images
//!
//! Layout: `<root>/<cache_key>/<record file name>`, one file per key. New
//! entries are written under `<root>/.tmp/` and renamed into a freshly
//! created key directory, so a reader sees either the old state or the
//! complete new file. A key directory holding more than one file is treated
//! as corrupt and evicted.
//!
//! The cache is best-effort: no method returns an error to the caller.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use super::backend::DiskBackend;
use super::clock::{Clock, SystemClock};
use super::error::DiskCacheError;
use super::record::CacheFileRecord;
use super::tokio_backend::TokioFsBackend;

/// Directory for in-flight writes, never a valid cache key
const TEMP_DIR_NAME: &str = ".tmp";

/// Cached encoded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImageValue {
    pub bytes: Bytes,
    pub extension: String,
    pub etag: String,
    pub upstream_etag: String,
}

/// Result of a successful read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub value: CachedImageValue,
    /// Unix milliseconds
    pub expire_at: u64,
    /// Seconds
    pub max_age: u64,
    /// `now >= expire_at` at read time; stale entries are still returned
    pub is_stale: bool,
}

/// Outcome of a cache lookup
#[derive(Debug)]
pub enum CacheLookup {
    Hit(CacheEntry),
    Miss,
    /// Entry was unreadable and has been evicted
    Corrupt(DiskCacheError),
}

impl CacheLookup {
    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            CacheLookup::Hit(entry) if entry.is_stale => "stale",
            CacheLookup::Hit(_) => "hit",
            CacheLookup::Miss => "miss",
            CacheLookup::Corrupt(_) => "corrupt",
        }
    }

    pub fn into_entry(self) -> Option<CacheEntry> {
        match self {
            CacheLookup::Hit(entry) => Some(entry),
            _ => None,
        }
    }
}

/// Key-addressed image cache on a local filesystem
#[derive(Clone)]
pub struct ImageCache {
    root: PathBuf,
    backend: Arc<dyn DiskBackend>,
    clock: Arc<dyn Clock>,
}

impl ImageCache {
    /// Cache rooted at `root` on the real filesystem
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_backend(root, Arc::new(TokioFsBackend::new()), Arc::new(SystemClock))
    }

    pub fn with_backend(
        root: impl Into<PathBuf>,
        backend: Arc<dyn DiskBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            root: root.into(),
            backend,
            clock,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_dir(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Look up `key`, distinguishing absence from corruption
    pub async fn lookup(&self, key: &str) -> CacheLookup {
        let dir = self.key_dir(key);

        let files = match self.backend.read_dir(&dir).await {
            Ok(files) => files,
            Err(e) if e.is_not_found() => return CacheLookup::Miss,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Failed to list cache directory");
                return CacheLookup::Miss;
            }
        };

        let path = match files.as_slice() {
            [] => return CacheLookup::Miss,
            [path] => path,
            _ => {
                return self
                    .evict(key, &dir, DiskCacheError::MultipleEntries { count: files.len() })
                    .await
            }
        };

        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        let record = match CacheFileRecord::parse(file_name) {
            Ok(record) => record,
            Err(e) => return self.evict(key, &dir, e).await,
        };

        let bytes = match self.backend.read_file(path).await {
            Ok(bytes) => bytes,
            // Replaced by a concurrent write between listing and reading
            Err(e) if e.is_not_found() => return CacheLookup::Miss,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Failed to read cache file");
                return CacheLookup::Miss;
            }
        };

        let is_stale = record.is_stale(self.clock.now_millis());
        debug!(cache_key = %key, is_stale, "Cache entry found");

        CacheLookup::Hit(CacheEntry {
            value: CachedImageValue {
                bytes,
                extension: record.extension,
                etag: record.etag,
                upstream_etag: record.upstream_etag,
            },
            expire_at: record.expire_at,
            max_age: record.max_age,
            is_stale,
        })
    }

    /// Fetch the entry for `key`; corruption is reported as a miss
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        self.lookup(key).await.into_entry()
    }

    /// Store `value` under `key` for `max_age` seconds
    ///
    /// Failures are logged and swallowed.
    pub async fn set(&self, key: &str, value: CachedImageValue, max_age: u64) {
        if let Err(e) = self.try_set(key, value, max_age).await {
            warn!(cache_key = %key, error = %e, "Failed to write cache entry");
        }
    }

    async fn try_set(
        &self,
        key: &str,
        value: CachedImageValue,
        max_age: u64,
    ) -> Result<(), DiskCacheError> {
        let record = CacheFileRecord {
            max_age,
            expire_at: self
                .clock
                .now_millis()
                .saturating_add(max_age.saturating_mul(1000)),
            etag: value.etag,
            upstream_etag: value.upstream_etag,
            extension: value.extension,
        };

        let temp_path = self
            .root
            .join(TEMP_DIR_NAME)
            .join(uuid::Uuid::new_v4().to_string());
        self.backend.write_file(&temp_path, value.bytes).await?;

        let target = self.key_dir(key).join(record.file_name());
        let result = self.replace_entry(&temp_path, &target).await;

        if result.is_err() {
            let _ = self.backend.delete_file(&temp_path).await;
        } else {
            debug!(cache_key = %key, file = %record, "Cache entry written");
        }
        result
    }

    /// Clear the key directory and move the finished temp file into it
    async fn replace_entry(&self, temp_path: &Path, target: &Path) -> Result<(), DiskCacheError> {
        if let Some(dir) = target.parent() {
            self.backend.remove_dir_all(dir).await?;
            self.backend.create_dir_all(dir).await?;
        }
        self.backend.rename(temp_path, target).await
    }

    /// Delete temp files left behind by writes that never reached the rename
    ///
    /// Run at startup, before any `set`; returns how many files were removed.
    pub async fn remove_temp_files(&self) -> usize {
        let temp_dir = self.root.join(TEMP_DIR_NAME);
        let files = match self.backend.read_dir(&temp_dir).await {
            Ok(files) => files,
            Err(e) if e.is_not_found() => return 0,
            Err(e) => {
                warn!(dir = %temp_dir.display(), error = %e, "Failed to list cache temp directory");
                return 0;
            }
        };

        let mut removed = 0;
        for path in files {
            match self.backend.delete_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to remove cache temp file")
                }
            }
        }
        if removed > 0 {
            debug!(removed, "Removed leftover cache temp files");
        }
        removed
    }

    async fn evict(&self, key: &str, dir: &Path, reason: DiskCacheError) -> CacheLookup {
        warn!(cache_key = %key, error = %reason, "Evicting corrupt cache entry");
        if let Err(e) = self.backend.remove_dir_all(dir).await {
            warn!(cache_key = %key, error = %e, "Failed to evict cache entry");
        }
        CacheLookup::Corrupt(reason)
    }
}
