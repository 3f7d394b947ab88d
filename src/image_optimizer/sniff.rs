//! Binary content-type detection
//!
//! Fixed byte signatures are checked first; when none matches, the codec is
//! asked to probe the data and its format name is mapped to a MIME type. The
//! declared upstream content type is never trusted.

use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

use super::codec::ImageCodec;
use super::mime::ImageMime;

const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
const GIF87A: &[u8] = b"GIF87a";
const GIF89A: &[u8] = b"GIF89a";
const RIFF: &[u8] = b"RIFF";
const WEBP: &[u8] = b"WEBP";
const FTYP_AVIF: &[u8] = b"ftypavif";
const FTYP_HEIC: &[u8] = b"ftypheic";
const ICO: &[u8] = &[0x00, 0x00, 0x01, 0x00];
const ICNS: &[u8] = b"icns";
const TIFF_LE: &[u8] = &[0x49, 0x49, 0x2A, 0x00];
const TIFF_BE: &[u8] = &[0x4D, 0x4D, 0x00, 0x2A];
const BMP: &[u8] = b"BM";
const JP2: &[u8] = &[
    0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20, 0x0D, 0x0A, 0x87, 0x0A,
];
const JXL_CODESTREAM: &[u8] = &[0xFF, 0x0A];
const JXL_CONTAINER: &[u8] = &[
    0x00, 0x00, 0x00, 0x0C, 0x4A, 0x58, 0x4C, 0x20, 0x0D, 0x0A, 0x87, 0x0A,
];

/// Signature table in match order; every (offset, bytes) part must match
const SIGNATURES: &[(&[(usize, &[u8])], ImageMime)] = &[
    (&[(0, JPEG)], ImageMime::Jpeg),
    (&[(0, PNG)], ImageMime::Png),
    (&[(0, GIF87A)], ImageMime::Gif),
    (&[(0, GIF89A)], ImageMime::Gif),
    (&[(0, RIFF), (8, WEBP)], ImageMime::Webp),
    (&[(4, FTYP_AVIF)], ImageMime::Avif),
    (&[(4, FTYP_HEIC)], ImageMime::Heic),
    (&[(0, ICO)], ImageMime::Ico),
    (&[(0, ICNS)], ImageMime::Icns),
    (&[(0, TIFF_LE)], ImageMime::Tiff),
    (&[(0, TIFF_BE)], ImageMime::Tiff),
    (&[(0, BMP)], ImageMime::Bmp),
    (&[(0, JP2)], ImageMime::Jp2),
    (&[(0, JXL_CODESTREAM)], ImageMime::Jxl),
    (&[(0, JXL_CONTAINER)], ImageMime::Jxl),
];

fn has_signature(data: &[u8], offset: usize, signature: &[u8]) -> bool {
    data.get(offset..offset + signature.len()) == Some(signature)
}

/// Match the fixed byte signatures only
pub fn detect_signature(data: &[u8]) -> Option<ImageMime> {
    if data.is_empty() {
        return None;
    }
    SIGNATURES
        .iter()
        .find(|(parts, _)| {
            parts
                .iter()
                .all(|(offset, signature)| has_signature(data, *offset, signature))
        })
        .map(|(_, mime)| *mime)
}

/// Map a codec-reported format name to a canonical type
///
/// BMP and ICO are intentionally absent; they are only recognised by signature.
pub fn mime_for_format_name(name: &str) -> Option<ImageMime> {
    match name.to_ascii_lowercase().as_str() {
        "jpeg" | "jpg" => Some(ImageMime::Jpeg),
        "png" => Some(ImageMime::Png),
        "webp" => Some(ImageMime::Webp),
        "gif" => Some(ImageMime::Gif),
        "avif" => Some(ImageMime::Avif),
        "tiff" | "tif" => Some(ImageMime::Tiff),
        "heif" | "heic" => Some(ImageMime::Heic),
        "jp2" => Some(ImageMime::Jp2),
        "jxl" => Some(ImageMime::Jxl),
        _ => None,
    }
}

/// Detect the canonical content type of `data`
///
/// Returns `None` for empty input, or when neither a signature nor the codec
/// probe recognises the bytes.
pub async fn detect_content_type(data: &Bytes, codec: Arc<dyn ImageCodec>) -> Option<ImageMime> {
    if data.is_empty() {
        return None;
    }
    if let Some(mime) = detect_signature(data) {
        return Some(mime);
    }

    let probe_data = data.clone();
    let metadata = tokio::task::spawn_blocking(move || codec.probe(&probe_data))
        .await
        .ok()?;

    match metadata {
        Ok(meta) => meta.format.as_deref().and_then(mime_for_format_name),
        Err(e) => {
            debug!(error = %e, "Content type probe failed");
            None
        }
    }
}

/// Whether an animatable image carries more than one frame
///
/// Non-animatable types return false without probing. Probe failures count
/// as "not animated".
pub async fn is_animated(data: &Bytes, content_type: ImageMime, codec: Arc<dyn ImageCodec>) -> bool {
    if !content_type.is_animatable() {
        return false;
    }

    let probe_data = data.clone();
    match tokio::task::spawn_blocking(move || codec.probe(&probe_data)).await {
        Ok(Ok(meta)) => meta.pages > 1,
        Ok(Err(e)) => {
            debug!(error = %e, content_type = %content_type, "Frame probe failed");
            false
        }
        Err(_) => false,
    }
}
