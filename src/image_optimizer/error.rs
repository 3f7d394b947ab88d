//! Image optimization error types
//!
//! Provides structured error handling with HTTP status mapping. Only
//! `UnsupportedImage` ever reaches a caller as a failure; every other variant
//! is an encoder-stage error that the pipeline downgrades to a passthrough.

use std::fmt;

/// Errors that can occur during image optimization operations
#[derive(Debug, Clone, PartialEq)]
pub enum ImageError {
    // === Source Errors ===
    /// Source bytes are not a recognizable image
    UnsupportedImage { message: String },
    /// Image format cannot be encoded or decoded by this build
    UnsupportedFormat { format: String },
    /// Failed to decode image data
    DecodeFailed { message: String },

    // === Processing Errors ===
    /// Resize operation failed
    ResizeFailed { message: String },
    /// Encoding to output format failed
    EncodeFailed { format: String, message: String },
    /// Processing took too long
    ProcessingTimeout { timeout_ms: u64 },
    /// Caller cancelled the request while encoding
    Cancelled,

    // === Input Guards ===
    /// Image dimensions exceed the pixel limit
    ImageBombDetected {
        width: u32,
        height: u32,
        pixels: u64,
        max_pixels: u64,
    },
    /// Input file size exceeds limit
    FileTooLarge { size: usize, max_size: usize },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::UnsupportedImage { message } => write!(f, "{}", message),
            ImageError::UnsupportedFormat { format } => {
                write!(f, "Unsupported image format: {}", format)
            }
            ImageError::DecodeFailed { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            ImageError::ResizeFailed { message } => {
                write!(f, "Resize failed: {}", message)
            }
            ImageError::EncodeFailed { format, message } => {
                write!(f, "Failed to encode to {}: {}", format, message)
            }
            ImageError::ProcessingTimeout { timeout_ms } => {
                write!(f, "Processing timeout after {}ms", timeout_ms)
            }
            ImageError::Cancelled => write!(f, "Processing cancelled"),
            ImageError::ImageBombDetected {
                width,
                height,
                pixels,
                max_pixels,
            } => {
                write!(
                    f,
                    "Image dimensions {}x{} ({} pixels) exceed limit of {} pixels",
                    width, height, pixels, max_pixels
                )
            }
            ImageError::FileTooLarge { size, max_size } => {
                write!(
                    f,
                    "File size {} bytes exceeds maximum {} bytes",
                    size, max_size
                )
            }
        }
    }
}

impl std::error::Error for ImageError {}

impl ImageError {
    /// Maps image errors to HTTP status codes
    ///
    /// Status mapping:
    /// - UnsupportedImage, DecodeFailed, ImageBombDetected → 400 (Bad Request)
    /// - UnsupportedFormat → 415 (Unsupported Media Type)
    /// - ResizeFailed, EncodeFailed, Cancelled → 500 (Internal Server Error)
    /// - ProcessingTimeout → 504 (Gateway Timeout)
    /// - FileTooLarge → 413 (Payload Too Large)
    pub fn to_http_status(&self) -> u16 {
        match self {
            ImageError::UnsupportedImage { .. }
            | ImageError::DecodeFailed { .. }
            | ImageError::ImageBombDetected { .. } => 400,

            ImageError::UnsupportedFormat { .. } => 415,

            ImageError::FileTooLarge { .. } => 413,

            ImageError::ResizeFailed { .. }
            | ImageError::EncodeFailed { .. }
            | ImageError::Cancelled => 500,

            ImageError::ProcessingTimeout { .. } => 504,
        }
    }

    /// The canonical rejection for bytes that do not sniff as an image
    pub fn not_an_image() -> Self {
        ImageError::UnsupportedImage {
            message: "The requested resource isn't a valid image.".to_string(),
        }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        ImageError::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        ImageError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        ImageError::ResizeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        ImageError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn image_bomb(width: u32, height: u32, max_pixels: u64) -> Self {
        ImageError::ImageBombDetected {
            width,
            height,
            pixels: width as u64 * height as u64,
            max_pixels,
        }
    }

    /// Short label used for metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ImageError::UnsupportedImage { .. } => "unsupported_image",
            ImageError::UnsupportedFormat { .. } => "unsupported_format",
            ImageError::DecodeFailed { .. } => "decode_failed",
            ImageError::ResizeFailed { .. } => "resize_failed",
            ImageError::EncodeFailed { .. } => "encode_failed",
            ImageError::ProcessingTimeout { .. } => "timeout",
            ImageError::Cancelled => "cancelled",
            ImageError::ImageBombDetected { .. } => "image_bomb",
            ImageError::FileTooLarge { .. } => "file_too_large",
        }
    }
}
