//! Mock disk backend for testing (in-memory HashMap storage)

use super::backend::DiskBackend;
use super::error::DiskCacheError;
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Mock backend that stores files in memory for testing
#[derive(Clone, Default)]
pub struct MockDiskBackend {
    files: Arc<RwLock<HashMap<PathBuf, Bytes>>>,
    directories: Arc<RwLock<HashSet<PathBuf>>>,
    /// Simulate errors if true
    simulate_permission_denied: Arc<RwLock<bool>>,
}

impl MockDiskBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable permission denied simulation for testing
    pub fn set_permission_denied(&self, enabled: bool) {
        *self.simulate_permission_denied.write() = enabled;
    }

    /// Get number of stored files
    pub fn file_count(&self) -> usize {
        self.files.read().len()
    }

    /// Insert a file directly, bypassing the cache
    pub fn insert_file(&self, path: impl Into<PathBuf>, data: impl Into<Bytes>) {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.directories.write().insert(parent.to_path_buf());
        }
        self.files.write().insert(path, data.into());
    }

    pub fn contains_file(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }

    fn check_permission(&self) -> Result<(), DiskCacheError> {
        if *self.simulate_permission_denied.read() {
            return Err(DiskCacheError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "Simulated permission denied",
            )));
        }
        Ok(())
    }

    fn not_found() -> DiskCacheError {
        DiskCacheError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "File not found",
        ))
    }
}

#[async_trait]
impl DiskBackend for MockDiskBackend {
    async fn read_file(&self, path: &Path) -> Result<Bytes, DiskCacheError> {
        self.check_permission()?;
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(Self::not_found)
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<(), DiskCacheError> {
        self.check_permission()?;
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent).await?;
        }
        self.files.write().insert(path.to_path_buf(), data);
        Ok(())
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<(), DiskCacheError> {
        self.check_permission()?;
        let mut files = self.files.write();
        let data = files.remove(from).ok_or_else(Self::not_found)?;
        files.insert(to.to_path_buf(), data);
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<(), DiskCacheError> {
        self.check_permission()?;
        self.files.write().remove(path);
        Ok(())
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), DiskCacheError> {
        self.check_permission()?;
        self.directories.write().insert(path.to_path_buf());
        Ok(())
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<(), DiskCacheError> {
        self.check_permission()?;
        self.files.write().retain(|p, _| !p.starts_with(path));
        self.directories.write().retain(|p| !p.starts_with(path));
        Ok(())
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>, DiskCacheError> {
        self.check_permission()?;
        if !self.directories.read().contains(path) {
            return Err(Self::not_found());
        }

        let entries = self
            .files
            .read()
            .keys()
            .filter(|p| p.parent() == Some(path))
            .cloned()
            .collect();
        Ok(entries)
    }
}
