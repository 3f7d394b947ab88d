//! Backend trait for filesystem operations

use super::error::DiskCacheError;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

/// Abstraction over filesystem operations to support multiple backends
#[async_trait]
pub trait DiskBackend: Send + Sync {
    /// Read entire file contents
    async fn read_file(&self, path: &Path) -> Result<Bytes, DiskCacheError>;

    /// Write file contents, creating parent directories
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<(), DiskCacheError>;

    /// Atomically move a file into place
    async fn rename(&self, from: &Path, to: &Path) -> Result<(), DiskCacheError>;

    /// Delete a file (missing files are not an error)
    async fn delete_file(&self, path: &Path) -> Result<(), DiskCacheError>;

    /// Create directory and all parent directories
    async fn create_dir_all(&self, path: &Path) -> Result<(), DiskCacheError>;

    /// Remove a directory and everything in it (missing directories are not an error)
    async fn remove_dir_all(&self, path: &Path) -> Result<(), DiskCacheError>;

    /// List all files in a directory
    async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, DiskCacheError>;
}
