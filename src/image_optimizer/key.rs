//! Cache key and ETag derivation
//!
//! All values are SHA-256 digests encoded as base64url without padding, so
//! they are safe to use as directory names and stable across runs.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use sha2::{Digest, Sha256};

/// Deterministic cache key for a validated request
///
/// The five fields are fed to one hasher in this exact order; numbers are
/// hashed as their decimal text.
pub fn cache_key(version: u32, url: &str, width: u32, quality: u8, mime_type: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(version.to_string().as_bytes());
    hasher.update(url.as_bytes());
    hasher.update(width.to_string().as_bytes());
    hasher.update(quality.to_string().as_bytes());
    hasher.update(mime_type.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}

/// Content hash of an encoded image
pub fn image_etag(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(data))
}

/// ETag identifying the upstream source
///
/// An upstream-supplied ETag is re-encoded (not re-hashed) into the same
/// alphabet; otherwise the bytes are hashed.
pub fn extract_etag(source_etag: Option<&str>, data: &[u8]) -> String {
    match source_etag {
        Some(etag) if !etag.is_empty() => URL_SAFE_NO_PAD.encode(etag.as_bytes()),
        _ => image_etag(data),
    }
}
