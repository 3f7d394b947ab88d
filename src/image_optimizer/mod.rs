//! Image optimization module
//!
//! Serves resized, re-encoded images for `?url=...&w=...&q=...` requests:
//! - Parameter validation against configured widths, qualities and path prefixes
//! - Content-type sniffing from magic bytes, with a decode probe fallback
//! - Output format negotiation from the Accept header (server priority order)
//! - Resize and encode (JPEG, PNG, WebP, AVIF, GIF, TIFF) with a timeout
//! - A best-effort on-disk cache keyed by a hash of the request
//!
//! # Pipeline
//!
//! ```text
//! sniff -> bypass? -> animated? -> choose output -> encode
//! ```
//!
//! Bypass types (ICO, ICNS, BMP, JXL, HEIC) and animated sources are served
//! unchanged. An encoder failure or timeout serves the original bytes.

// Core modules
pub mod codec;
pub mod config;
pub mod encoder;
pub mod error;
pub mod format;
pub mod key;
pub mod metrics;
pub mod mime;
pub mod params;
pub mod pipeline;
pub mod processor;
pub mod security;
pub mod service;
pub mod sniff;
pub mod upstream;

// Re-export commonly used types
pub use codec::{EncodeOptions, ImageCodec, ImageMetadata, NativeCodec};
pub use config::{ContentDispositionType, EncoderConfig, ImageConfig};
pub use encoder::{EncodedImage, EncoderFactory, EncoderQuality, ImageEncoder};
pub use error::ImageError;
pub use format::{negotiate, vary_header};
pub use key::{cache_key, extract_etag, image_etag};
pub use metrics::OptimizerMetrics;
pub use mime::{content_type_for_extension, ImageMime};
pub use params::{validate_params, ImageQuery, QueryValue, ValidatedParams, ValidationError};
pub use pipeline::{
    select_output_type, CancelSignal, ImagePipeline, OptimizedImageResult, PassthroughReason,
    PipelineOutcome,
};
pub use processor::{transform_image, ProcessedImage};
pub use security::{validate_dimensions, validate_file_size};
pub use service::{file_name_with_extension, ImageOptimizer, ServedImage, XCache};
pub use sniff::{detect_content_type, detect_signature, is_animated};
pub use upstream::{LocalFsUpstream, Upstream, UpstreamError, UpstreamImage};
