//! Image encoder abstraction
//!
//! Provides a trait-based encoder system that allows:
//! - One encoder per output content type
//! - Format-specific quality and effort settings
//! - Per-call thread limits instead of process-wide codec settings

use std::io::Cursor;

use super::error::ImageError;
use super::mime::ImageMime;
use crate::constants::AVIF_QUALITY_OFFSET;

/// oxipng preset used for PNG output (0-6, higher is slower)
const PNG_OPTIMIZATION_PRESET: u8 = 2;

/// Quality settings for image encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderQuality {
    /// Quality value (1-100, where 100 is best quality)
    pub quality: u8,
    /// Effort/speed trade-off (0-9, where 9 is slowest/best compression)
    pub effort: u8,
    /// Worker threads the encoder may use; `None` lets the encoder decide
    pub threads: Option<usize>,
}

impl Default for EncoderQuality {
    fn default() -> Self {
        Self {
            quality: 75,
            effort: 4,
            threads: None,
        }
    }
}

impl EncoderQuality {
    /// Create quality settings with specified quality level
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
            ..Default::default()
        }
    }

    /// Set the encoding effort (speed vs compression trade-off)
    pub fn with_effort(mut self, effort: u8) -> Self {
        self.effort = effort.min(9);
        self
    }

    pub fn with_threads(mut self, threads: Option<usize>) -> Self {
        self.threads = threads.filter(|&t| t > 0);
        self
    }

    /// Settings for encoding `format` at the requested quality
    ///
    /// AVIF is encoded 20 points below the requested quality (never below 1)
    /// at the configured low effort; other formats use the quality as-is.
    pub fn for_format(
        format: ImageMime,
        requested_quality: u8,
        avif_effort: u8,
        threads: Option<usize>,
    ) -> Self {
        let settings = match format {
            ImageMime::Avif => Self::with_quality(
                requested_quality
                    .saturating_sub(AVIF_QUALITY_OFFSET)
                    .max(1),
            )
            .with_effort(avif_effort),
            ImageMime::Png => Self::with_quality(requested_quality).with_effort(PNG_OPTIMIZATION_PRESET),
            _ => Self::with_quality(requested_quality),
        };
        settings.with_threads(threads)
    }
}

/// Result of encoding an image
#[derive(Debug)]
pub struct EncodedImage {
    /// The encoded image data
    pub data: Vec<u8>,
    /// The output format
    pub format: ImageMime,
}

impl EncodedImage {
    pub fn new(data: Vec<u8>, format: ImageMime) -> Self {
        Self { data, format }
    }

    /// Content-Type header value
    pub fn content_type(&self) -> &'static str {
        self.format.as_str()
    }
}

/// Trait for image encoders
///
/// Implementations handle encoding raw image data to specific formats.
/// The trait is object-safe to allow dynamic dispatch when needed.
pub trait ImageEncoder: Send + Sync {
    /// The output format this encoder produces
    fn format(&self) -> ImageMime;

    /// Encode raw RGBA image data to the target format
    ///
    /// # Arguments
    /// * `data` - Raw pixel data in RGBA format (4 bytes per pixel)
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `quality` - Quality settings
    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError>;

    /// Check if this encoder supports transparency
    fn supports_transparency(&self) -> bool;
}

/// Baseline JPEG encoder using the image crate
pub struct JpegEncoder;

impl ImageEncoder for JpegEncoder {
    fn format(&self) -> ImageMime {
        ImageMime::Jpeg
    }

    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
        use image::ImageEncoder as _;

        // JPEG has no alpha channel
        let rgb_data = rgba_to_rgb(data);

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageJpegEncoder::new_with_quality(&mut output, quality.quality);

        encoder
            .write_image(&rgb_data, width, height, image::ColorType::Rgb8)
            .map_err(|e| ImageError::encode_failed("jpeg", e.to_string()))?;

        Ok(EncodedImage::new(output.into_inner(), ImageMime::Jpeg))
    }

    fn supports_transparency(&self) -> bool {
        false
    }
}

/// PNG encoder: image crate output recompressed with oxipng
pub struct PngEncoder;

impl ImageEncoder for PngEncoder {
    fn format(&self) -> ImageMime {
        ImageMime::Png
    }

    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        use image::codecs::png::PngEncoder as ImagePngEncoder;
        use image::ImageEncoder as _;

        let mut output = Cursor::new(Vec::new());
        let encoder = ImagePngEncoder::new(&mut output);

        encoder
            .write_image(data, width, height, image::ColorType::Rgba8)
            .map_err(|e| ImageError::encode_failed("png", e.to_string()))?;

        let options = oxipng::Options::from_preset(quality.effort.min(6));
        let optimized = oxipng::optimize_from_memory(&output.into_inner(), &options)
            .map_err(|e| ImageError::encode_failed("png", e.to_string()))?;

        Ok(EncodedImage::new(optimized, ImageMime::Png))
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// Lossy WebP encoder using libwebp
pub struct WebPEncoder;

impl ImageEncoder for WebPEncoder {
    fn format(&self) -> ImageMime {
        ImageMime::Webp
    }

    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        let encoder = webp::Encoder::from_rgba(data, width, height);
        let memory = encoder
            .encode_simple(false, quality.quality as f32)
            .map_err(|e| ImageError::encode_failed("webp", format!("{:?}", e)))?;

        Ok(EncodedImage::new(memory.to_vec(), ImageMime::Webp))
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// AVIF encoder using ravif (rav1e)
pub struct AvifEncoder;

impl AvifEncoder {
    /// Map effort (0-9, higher is slower) onto ravif speed (1-10, higher is faster)
    fn speed_for_effort(effort: u8) -> u8 {
        10u8.saturating_sub(effort).clamp(1, 10)
    }
}

impl ImageEncoder for AvifEncoder {
    fn format(&self) -> ImageMime {
        ImageMime::Avif
    }

    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        use rgb::FromSlice;

        let pixels = data.as_rgba();
        if pixels.len() != width as usize * height as usize {
            return Err(ImageError::encode_failed(
                "avif",
                "pixel buffer does not match dimensions",
            ));
        }
        let img = imgref::Img::new(pixels, width as usize, height as usize);

        let encoder = ravif::Encoder::new()
            .with_quality(quality.quality as f32)
            .with_alpha_quality(quality.quality as f32)
            .with_speed(Self::speed_for_effort(quality.effort))
            .with_num_threads(quality.threads);

        let encoded = encoder
            .encode_rgba(img)
            .map_err(|e| ImageError::encode_failed("avif", e.to_string()))?;

        Ok(EncodedImage::new(encoded.avif_file, ImageMime::Avif))
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// Single-frame GIF encoder
pub struct GifEncoder;

impl ImageEncoder for GifEncoder {
    fn format(&self) -> ImageMime {
        ImageMime::Gif
    }

    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        _quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        use image::codecs::gif::GifEncoder as ImageGifEncoder;

        let mut output = Vec::new();
        {
            let mut encoder = ImageGifEncoder::new(&mut output);
            encoder
                .encode(data, width, height, image::ColorType::Rgba8)
                .map_err(|e| ImageError::encode_failed("gif", e.to_string()))?;
        }

        Ok(EncodedImage::new(output, ImageMime::Gif))
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// TIFF encoder using the image crate
pub struct TiffEncoder;

impl ImageEncoder for TiffEncoder {
    fn format(&self) -> ImageMime {
        ImageMime::Tiff
    }

    fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        _quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        use image::codecs::tiff::TiffEncoder as ImageTiffEncoder;
        use image::ImageEncoder as _;

        let mut output = Cursor::new(Vec::new());
        ImageTiffEncoder::new(&mut output)
            .write_image(data, width, height, image::ColorType::Rgba8)
            .map_err(|e| ImageError::encode_failed("tiff", e.to_string()))?;

        Ok(EncodedImage::new(output.into_inner(), ImageMime::Tiff))
    }

    fn supports_transparency(&self) -> bool {
        true
    }
}

/// Factory for creating encoders based on output format
pub struct EncoderFactory;

impl EncoderFactory {
    /// Create an encoder for the specified output format
    pub fn create(format: ImageMime) -> Result<Box<dyn ImageEncoder>, ImageError> {
        match format {
            ImageMime::Jpeg => Ok(Box::new(JpegEncoder)),
            ImageMime::Png => Ok(Box::new(PngEncoder)),
            ImageMime::Webp => Ok(Box::new(WebPEncoder)),
            ImageMime::Avif => Ok(Box::new(AvifEncoder)),
            ImageMime::Gif => Ok(Box::new(GifEncoder)),
            ImageMime::Tiff => Ok(Box::new(TiffEncoder)),
            other => Err(ImageError::unsupported_format(other.as_str())),
        }
    }
}

/// Convert RGBA to RGB by discarding alpha channel
fn rgba_to_rgb(rgba: &[u8]) -> Vec<u8> {
    let pixel_count = rgba.len() / 4;
    let mut rgb = Vec::with_capacity(pixel_count * 3);

    for chunk in rgba.chunks_exact(4) {
        rgb.extend_from_slice(&chunk[..3]);
    }

    rgb
}
