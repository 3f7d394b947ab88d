//! Image codec capability
//!
//! The pipeline talks to pixel work through [`ImageCodec`] so the encoder
//! stack can be swapped out in tests. [`NativeCodec`] is the default
//! implementation on top of the `image` crate and the per-format encoders.

use std::io::Cursor;
use std::time::Duration;

use super::error::ImageError;
use super::mime::ImageMime;
use super::processor::{read_dimensions, transform_image};

/// Metadata reported by a decode probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    /// Short format name, e.g. "png" or "jpg"
    pub format: Option<String>,
    pub dimensions: Option<(u32, u32)>,
    /// Frame count; 1 for still images
    pub pages: u32,
}

/// Per-call encode settings
///
/// Passed by value into every transform so no encoder state is shared
/// between requests.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOptions {
    pub width: u32,
    pub height: Option<u32>,
    pub format: ImageMime,
    /// Requested quality (1-100) before any format-specific adjustment
    pub quality: u8,
    pub effort: Option<u8>,
    /// Encoder worker threads
    pub concurrency: Option<usize>,
    pub limit_input_pixels: Option<u64>,
    pub timeout: Duration,
}

impl EncodeOptions {
    pub fn new(width: u32, format: ImageMime, quality: u8, timeout: Duration) -> Self {
        Self {
            width,
            height: None,
            format,
            quality,
            effort: None,
            concurrency: None,
            limit_input_pixels: None,
            timeout,
        }
    }
}

/// Decode/resize/encode capability
pub trait ImageCodec: Send + Sync {
    /// Read format name, dimensions and frame count
    fn probe(&self, data: &[u8]) -> Result<ImageMetadata, ImageError>;

    /// Resize and re-encode according to `options`
    fn transform(&self, data: &[u8], options: &EncodeOptions) -> Result<Vec<u8>, ImageError>;
}

/// Default codec backed by the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeCodec;

impl ImageCodec for NativeCodec {
    fn probe(&self, data: &[u8]) -> Result<ImageMetadata, ImageError> {
        let format = image::guess_format(data).map_err(|_| ImageError::not_an_image())?;

        let pages = match format {
            image::ImageFormat::Png => png_frame_count(data),
            image::ImageFormat::WebP => webp_frame_count(data),
            image::ImageFormat::Gif => gif_frame_count(data)?,
            _ => 1,
        };

        Ok(ImageMetadata {
            format: format.extensions_str().first().map(|s| s.to_string()),
            dimensions: read_dimensions(data).ok(),
            pages,
        })
    }

    fn transform(&self, data: &[u8], options: &EncodeOptions) -> Result<Vec<u8>, ImageError> {
        transform_image(data, options).map(|processed| processed.data)
    }
}

/// Frame count from the APNG `acTL` chunk; plain PNGs have one frame
fn png_frame_count(data: &[u8]) -> u32 {
    let mut offset = 8;
    while let Some(header) = data.get(offset..offset + 8) {
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        match &header[4..8] {
            b"acTL" => {
                return data
                    .get(offset + 8..offset + 12)
                    .map(|n| u32::from_be_bytes([n[0], n[1], n[2], n[3]]).max(1))
                    .unwrap_or(1)
            }
            // acTL must precede the image data
            b"IDAT" | b"IEND" => return 1,
            _ => {}
        }
        offset = match offset.checked_add(12 + length) {
            Some(next) => next,
            None => return 1,
        };
    }
    1
}

/// Count `ANMF` chunks in a WebP RIFF container
fn webp_frame_count(data: &[u8]) -> u32 {
    let mut frames = 0u32;
    let mut offset = 12;
    while let Some(header) = data.get(offset..offset + 8) {
        if &header[0..4] == b"ANMF" {
            frames += 1;
        }
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;
        // Chunks are padded to an even size
        let padded = size + (size & 1);
        offset = match offset.checked_add(8 + padded) {
            Some(next) => next,
            None => break,
        };
    }
    frames.max(1)
}

/// Decode at most two GIF frames; enough to tell still from animated
fn gif_frame_count(data: &[u8]) -> Result<u32, ImageError> {
    use image::codecs::gif::GifDecoder;
    use image::AnimationDecoder;

    let decoder = GifDecoder::new(Cursor::new(data))
        .map_err(|e| ImageError::decode_failed(e.to_string()))?;
    let frames = decoder
        .into_frames()
        .take(2)
        .take_while(|frame| frame.is_ok())
        .count();
    Ok(frames.max(1) as u32)
}
