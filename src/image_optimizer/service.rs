//! Request orchestration
//!
//! [`ImageOptimizer::serve`] is the single entry point the HTTP layer calls:
//! validate → cache lookup → upstream fetch → stale revalidation → pipeline →
//! cache store. Only validation, a missing or unreadable source, and an
//! unrecognisable source fail the request; cache and encoder problems are
//! absorbed along the way.

use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

use super::codec::NativeCodec;
use super::config::{ContentDispositionType, ImageConfig};
use super::format::vary_header;
use super::metrics::OptimizerMetrics;
use super::mime::{content_type_for_extension, ImageMime};
use super::params::{validate_params, ImageQuery, ValidatedParams};
use super::pipeline::{CancelSignal, ImagePipeline};
use super::sniff::detect_signature;
use super::upstream::Upstream;
use crate::cache::{CacheEntry, CachedImageValue, ImageCache};
use crate::config::Config;
use crate::constants::FALLBACK_EXTENSION;
use crate::error::OptimizerError;

/// Where a served response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XCache {
    /// Fresh cache entry
    Hit,
    /// Expired cache entry whose source has not changed
    Stale,
    /// Freshly produced by the pipeline
    Miss,
}

impl XCache {
    pub fn as_str(&self) -> &'static str {
        match self {
            XCache::Hit => "HIT",
            XCache::Stale => "STALE",
            XCache::Miss => "MISS",
        }
    }
}

impl fmt::Display for XCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response body with everything needed to frame it
#[derive(Debug, Clone, PartialEq)]
pub struct ServedImage {
    pub bytes: Bytes,
    pub content_type: String,
    pub etag: String,
    /// Seconds
    pub max_age: u64,
    pub x_cache: XCache,
    /// Download filename for Content-Disposition
    pub file_name: String,
    pub disposition: ContentDispositionType,
}

impl ServedImage {
    /// Response headers in the order they should be written
    pub fn headers(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "Cache-Control",
                format!("public, max-age={}, immutable", self.max_age),
            ),
            ("Vary", vary_header().to_string()),
            ("ETag", format!("\"{}\"", self.etag)),
            ("X-Cache", self.x_cache.to_string()),
            ("Content-Type", self.content_type.clone()),
            ("Content-Length", self.bytes.len().to_string()),
            (
                "Content-Disposition",
                format!(
                    "{}; filename=\"{}\"",
                    self.disposition.as_str(),
                    self.file_name.replace('"', "")
                ),
            ),
            ("X-Content-Type-Options", "nosniff".to_string()),
        ]
    }
}

/// Cache file extension for a served content type
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    ImageMime::from_mime(content_type)
        .map(|mime| mime.extension())
        .unwrap_or(FALLBACK_EXTENSION)
}

/// Download name for `url` with the extension of `content_type`
///
/// The query string is dropped and the last path segment is used (`image`
/// when empty). Its extension is replaced when `content_type` is a known
/// image type; otherwise the segment is returned unchanged.
pub fn file_name_with_extension(url: &str, content_type: &str) -> String {
    let path = url.split('?').next().unwrap_or(url);
    let name = match path.rsplit('/').next() {
        Some(segment) if !segment.is_empty() => segment,
        _ => "image",
    };
    let base = match name.rfind('.') {
        Some(dot) => &name[..dot],
        None => name,
    };

    match ImageMime::from_mime(content_type) {
        Some(mime) => format!("{}.{}", base, mime.extension()),
        None => name.to_string(),
    }
}

/// Image optimizer service
#[derive(Clone)]
pub struct ImageOptimizer {
    config: ImageConfig,
    cache: ImageCache,
    upstream: Arc<dyn Upstream>,
    pipeline: ImagePipeline,
}

impl ImageOptimizer {
    pub fn new(
        config: ImageConfig,
        cache: ImageCache,
        upstream: Arc<dyn Upstream>,
        pipeline: ImagePipeline,
    ) -> Self {
        Self {
            config,
            cache,
            upstream,
            pipeline,
        }
    }

    /// Wire up the production stack: disk cache, local upstream, native codec
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.image.clone(),
            ImageCache::new(&config.cache.dir),
            Arc::new(config.upstream.to_upstream()),
            ImagePipeline::new(Arc::new(NativeCodec), config.encoder.clone()),
        )
    }

    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Serve one optimizer request
    pub async fn serve(
        &self,
        query: &ImageQuery,
        accept: Option<&str>,
        cancel: &CancelSignal,
    ) -> Result<ServedImage, OptimizerError> {
        let params = validate_params(query, accept, &self.config)?;

        if self.config.unoptimized {
            return self.serve_original(&params).await;
        }

        let key = params.cache_key();
        let lookup = self.cache.lookup(&key).await;
        OptimizerMetrics::global().record_cache_lookup(lookup.label());
        let cached = lookup.into_entry();

        if let Some(entry) = cached.as_ref().filter(|entry| !entry.is_stale) {
            debug!(cache_key = %key, url = %params.url, "Serving fresh cache entry");
            return Ok(self.from_cache(&params, entry, entry.max_age, XCache::Hit));
        }

        let upstream = self.upstream.fetch(&params.url).await?;

        if let Some(entry) = cached
            .as_ref()
            .filter(|entry| entry.value.upstream_etag == upstream.etag)
        {
            debug!(cache_key = %key, url = %params.url, "Source unchanged, serving stale entry");
            return Ok(self.from_cache(
                &params,
                entry,
                params.minimum_cache_ttl,
                XCache::Stale,
            ));
        }

        let result = self
            .pipeline
            .process_image(&upstream, &params, cancel)
            .await
            .map_err(OptimizerError::UnsupportedImage)?;

        let content_type = result.content_type.as_str();
        self.cache
            .set(
                &key,
                CachedImageValue {
                    bytes: result.bytes.clone(),
                    extension: extension_for_content_type(content_type).to_string(),
                    etag: result.etag.clone(),
                    upstream_etag: result.upstream_etag.clone(),
                },
                result.max_age,
            )
            .await;

        info!(
            url = %params.url,
            width = params.width,
            quality = params.quality,
            content_type = %content_type,
            size = result.bytes.len(),
            "Optimized image"
        );

        Ok(ServedImage {
            file_name: file_name_with_extension(&params.url, content_type),
            content_type: content_type.to_string(),
            bytes: result.bytes,
            etag: result.etag,
            max_age: result.max_age,
            x_cache: XCache::Miss,
            disposition: self.config.content_disposition_type,
        })
    }

    /// Source bytes as-is, for `unoptimized` deployments
    async fn serve_original(&self, params: &ValidatedParams) -> Result<ServedImage, OptimizerError> {
        let upstream = self.upstream.fetch(&params.url).await?;
        let content_type = detect_signature(&upstream.bytes)
            .map(|mime| mime.as_str().to_string())
            .or(upstream.declared_content_type.clone())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Ok(ServedImage {
            file_name: file_name_with_extension(&params.url, &content_type),
            content_type,
            bytes: upstream.bytes,
            etag: upstream.etag,
            max_age: params.minimum_cache_ttl,
            x_cache: XCache::Miss,
            disposition: self.config.content_disposition_type,
        })
    }

    fn from_cache(
        &self,
        params: &ValidatedParams,
        entry: &CacheEntry,
        max_age: u64,
        x_cache: XCache,
    ) -> ServedImage {
        let content_type = content_type_for_extension(&entry.value.extension);
        ServedImage {
            bytes: entry.value.bytes.clone(),
            content_type: content_type.to_string(),
            etag: entry.value.etag.clone(),
            max_age,
            x_cache,
            file_name: file_name_with_extension(&params.url, content_type),
            disposition: self.config.content_disposition_type,
        }
    }
}
