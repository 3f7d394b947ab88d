//! Image processing implementation
//!
//! Handles the actual image transformation: decode → auto-orient → resize → encode

use fast_image_resize::{FilterType, Image, PixelType, ResizeAlg, Resizer};
use image::io::Reader as ImageReader;
use image::DynamicImage;
use std::io::Cursor;
use std::num::NonZeroU32;

use super::codec::EncodeOptions;
use super::encoder::{EncoderFactory, EncoderQuality};
use super::error::ImageError;
use super::security::validate_dimensions;
use crate::constants::DEFAULT_AVIF_EFFORT;

/// Result of image processing
#[derive(Debug)]
pub struct ProcessedImage {
    /// The processed image data
    pub data: Vec<u8>,
    /// Original dimensions (width, height)
    pub original_size: (u32, u32),
    /// Output dimensions (width, height)
    pub output_size: (u32, u32),
}

/// Resize and re-encode an image
///
/// The pixel limit is checked from the header before the full decode.
pub fn transform_image(data: &[u8], options: &EncodeOptions) -> Result<ProcessedImage, ImageError> {
    // 1. Guard against oversized images
    if let Some(max_pixels) = options.limit_input_pixels {
        let (width, height) = read_dimensions(data)?;
        validate_dimensions(width, height, max_pixels)?;
    }

    // 2. Decode and apply EXIF orientation
    let img = decode_image(data)?;
    let img = match read_orientation(data) {
        Some(orientation) => apply_orientation(img, orientation),
        None => img,
    };
    let src_width = img.width();
    let src_height = img.height();

    // 3. Resize (cropping first when both dimensions are fixed)
    let (target_width, target_height) =
        calculate_dimensions(src_width, src_height, options.width, options.height);
    let img = match options.height {
        Some(_) => crop_to_aspect(img, target_width, target_height),
        None => img,
    };
    let processed_img = if target_width != img.width() || target_height != img.height() {
        resize_image(&img, target_width, target_height)?
    } else {
        img
    };

    // 4. Encode to target format
    let quality = EncoderQuality::for_format(
        options.format,
        options.quality,
        options.effort.unwrap_or(DEFAULT_AVIF_EFFORT),
        options.concurrency,
    );
    let encoder = EncoderFactory::create(options.format)?;

    let rgba_data = processed_img.to_rgba8().into_raw();
    let encoded = encoder.encode(&rgba_data, target_width, target_height, quality)?;

    Ok(ProcessedImage {
        data: encoded.data,
        original_size: (src_width, src_height),
        output_size: (target_width, target_height),
    })
}

/// Read image dimensions from the header without decoding pixels
pub fn read_dimensions(data: &[u8]) -> Result<(u32, u32), ImageError> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?
        .into_dimensions()
        .map_err(|e| ImageError::decode_failed(e.to_string()))
}

/// Decode image data into a DynamicImage
fn decode_image(data: &[u8]) -> Result<DynamicImage, ImageError> {
    let mut reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| ImageError::decode_failed(e.to_string()))?;
    // Pixel limits are enforced separately
    reader.no_limits();
    reader
        .decode()
        .map_err(|e| ImageError::decode_failed(e.to_string()))
}

/// EXIF orientation tag (1-8), if present
fn read_orientation(data: &[u8]) -> Option<u32> {
    let mut cursor = Cursor::new(data);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
}

/// Rotate/flip so the image displays upright
fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Calculate target dimensions
///
/// Without a height the width is capped at the source width and the aspect
/// ratio is kept. With a height both are used as given.
fn calculate_dimensions(
    src_width: u32,
    src_height: u32,
    width: u32,
    height: Option<u32>,
) -> (u32, u32) {
    match height {
        Some(height) => (width.max(1), height.max(1)),
        None => {
            let target_width = width.min(src_width).max(1);
            let scaled = (src_height as f64 * target_width as f64 / src_width.max(1) as f64).round();
            (target_width, (scaled as u32).max(1))
        }
    }
}

/// Center-crop to the target aspect ratio
fn crop_to_aspect(img: DynamicImage, target_width: u32, target_height: u32) -> DynamicImage {
    let (src_w, src_h) = (img.width() as u64, img.height() as u64);
    let (tw, th) = (target_width as u64, target_height as u64);

    // Compare src_w/src_h with tw/th without floating point
    let (crop_w, crop_h) = if src_w * th > tw * src_h {
        ((src_h * tw / th).max(1), src_h)
    } else {
        (src_w, (src_w * th / tw).max(1))
    };
    if crop_w == src_w && crop_h == src_h {
        return img;
    }

    let x = ((src_w - crop_w) / 2) as u32;
    let y = ((src_h - crop_h) / 2) as u32;
    img.crop_imm(x, y, crop_w as u32, crop_h as u32)
}

/// Resize image using fast-image-resize with Lanczos3 filter
fn resize_image(img: &DynamicImage, target_w: u32, target_h: u32) -> Result<DynamicImage, ImageError> {
    let src_width = NonZeroU32::new(img.width())
        .ok_or_else(|| ImageError::resize_failed("Source width is 0"))?;
    let src_height = NonZeroU32::new(img.height())
        .ok_or_else(|| ImageError::resize_failed("Source height is 0"))?;
    let dst_width =
        NonZeroU32::new(target_w).ok_or_else(|| ImageError::resize_failed("Target width is 0"))?;
    let dst_height =
        NonZeroU32::new(target_h).ok_or_else(|| ImageError::resize_failed("Target height is 0"))?;

    let src_image = Image::from_vec_u8(
        src_width,
        src_height,
        img.to_rgba8().into_raw(),
        PixelType::U8x4,
    )
    .map_err(|e| ImageError::resize_failed(format!("Failed to create source image: {:?}", e)))?;

    let mut dst_image = Image::new(dst_width, dst_height, PixelType::U8x4);

    let mut resizer = Resizer::new(ResizeAlg::Convolution(FilterType::Lanczos3));

    resizer
        .resize(&src_image.view(), &mut dst_image.view_mut())
        .map_err(|e| ImageError::resize_failed(format!("Resize operation failed: {:?}", e)))?;

    let rgba_image = image::RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .ok_or_else(|| ImageError::resize_failed("Failed to create output image buffer"))?;

    Ok(DynamicImage::ImageRgba8(rgba_image))
}
