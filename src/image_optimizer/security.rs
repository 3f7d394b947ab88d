//! Image optimization input guards
//!
//! Provides:
//! - Image bomb protection (decoded pixel limit)
//! - Source file size limit

use super::error::ImageError;

/// Validate image dimensions against the pixel limit
///
/// This should be called BEFORE fully decoding the image to protect
/// against "image bomb" attacks where a small file decompresses to
/// huge dimensions.
pub fn validate_dimensions(width: u32, height: u32, max_pixels: u64) -> Result<(), ImageError> {
    let pixels = width as u64 * height as u64;
    if pixels > max_pixels {
        return Err(ImageError::image_bomb(width, height, max_pixels));
    }
    Ok(())
}

/// Validate source file size
pub fn validate_file_size(size: usize, max_size: usize) -> Result<(), ImageError> {
    if size > max_size {
        return Err(ImageError::FileTooLarge { size, max_size });
    }
    Ok(())
}
