//! Upstream source fetching
//!
//! The optimizer never reads sources directly; it asks an [`Upstream`] for
//! the raw bytes behind a validated `url`.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use super::key::extract_etag;
use super::mime::content_type_for_extension;
use super::security::validate_file_size;
use crate::constants::{DEFAULT_MAX_SOURCE_BYTES, DEFAULT_UPSTREAM_ROOT};

/// Raw source image as supplied by the upstream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamImage {
    pub bytes: Bytes,
    /// Content type claimed by the source; never trusted for decisions
    pub declared_content_type: Option<String>,
    /// Upstream ETag, or a content hash when the source supplied none
    pub etag: String,
}

impl UpstreamImage {
    /// Build from fetched bytes, synthesizing the ETag when `source_etag` is absent
    pub fn new(
        bytes: impl Into<Bytes>,
        declared_content_type: Option<String>,
        source_etag: Option<&str>,
    ) -> Self {
        let bytes = bytes.into();
        let etag = extract_etag(source_etag, &bytes);
        Self {
            bytes,
            declared_content_type,
            etag,
        }
    }
}

/// Errors fetching a source image
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Source image not found")]
    NotFound(String),

    #[error("source image {url} is {size} bytes, limit is {max_size} bytes")]
    TooLarge {
        url: String,
        size: u64,
        max_size: usize,
    },

    #[error("upstream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of original images
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<UpstreamImage, UpstreamError>;
}

/// Reads sources from a local public directory (`<root>/<url>`)
#[derive(Debug, Clone)]
pub struct LocalFsUpstream {
    root: PathBuf,
    max_source_bytes: usize,
}

impl Default for LocalFsUpstream {
    fn default() -> Self {
        Self::new(DEFAULT_UPSTREAM_ROOT, DEFAULT_MAX_SOURCE_BYTES)
    }
}

impl LocalFsUpstream {
    pub fn new(root: impl Into<PathBuf>, max_source_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_source_bytes,
        }
    }

    /// Resolve a request path under the root, refusing anything that escapes it
    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

#[async_trait]
impl Upstream for LocalFsUpstream {
    async fn fetch(&self, url: &str) -> Result<UpstreamImage, UpstreamError> {
        let path = self
            .resolve(url)
            .ok_or_else(|| UpstreamError::NotFound(url.to_string()))?;

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Err(UpstreamError::NotFound(url.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(UpstreamError::NotFound(url.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let size = usize::try_from(metadata.len()).unwrap_or(usize::MAX);
        validate_file_size(size, self.max_source_bytes).map_err(|_| UpstreamError::TooLarge {
            url: url.to_string(),
            size: metadata.len(),
            max_size: self.max_source_bytes,
        })?;

        let data = tokio::fs::read(&path).await?;
        let declared = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| content_type_for_extension(ext).to_string());
        debug!(url = %url, size = data.len(), "Read source image");

        Ok(UpstreamImage::new(data, declared, None))
    }
}
