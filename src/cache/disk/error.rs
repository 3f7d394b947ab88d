//! Error types for disk cache operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiskCacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid cache file name: {0}")]
    InvalidFileName(String),

    #[error("Cache directory holds {count} entries, expected one")]
    MultipleEntries { count: usize },
}

impl DiskCacheError {
    /// True when the underlying I/O error is "not found"
    pub fn is_not_found(&self) -> bool {
        matches!(self, DiskCacheError::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
