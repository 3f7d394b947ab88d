//! Canonical image MIME types
//!
//! Every content type the optimizer recognizes, with the mappings to file
//! extensions and the bypass/animatable classifications used by the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::ImageError;

/// Canonical image content type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageMime {
    #[serde(rename = "image/avif")]
    Avif,
    #[serde(rename = "image/webp")]
    Webp,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "image/x-icon")]
    Ico,
    #[serde(rename = "image/x-icns")]
    Icns,
    #[serde(rename = "image/tiff")]
    Tiff,
    #[serde(rename = "image/bmp")]
    Bmp,
    #[serde(rename = "image/jxl")]
    Jxl,
    #[serde(rename = "image/jp2")]
    Jp2,
    #[serde(rename = "image/heic")]
    Heic,
}

/// Types that are never re-encoded
pub const BYPASS_TYPES: [ImageMime; 5] = [
    ImageMime::Ico,
    ImageMime::Icns,
    ImageMime::Bmp,
    ImageMime::Jxl,
    ImageMime::Heic,
];

/// Types that may carry more than one frame
pub const ANIMATABLE_TYPES: [ImageMime; 3] = [ImageMime::Webp, ImageMime::Png, ImageMime::Gif];

impl ImageMime {
    pub const ALL: [ImageMime; 12] = [
        ImageMime::Avif,
        ImageMime::Webp,
        ImageMime::Png,
        ImageMime::Jpeg,
        ImageMime::Gif,
        ImageMime::Ico,
        ImageMime::Icns,
        ImageMime::Tiff,
        ImageMime::Bmp,
        ImageMime::Jxl,
        ImageMime::Jp2,
        ImageMime::Heic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avif => "image/avif",
            Self::Webp => "image/webp",
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Gif => "image/gif",
            Self::Ico => "image/x-icon",
            Self::Icns => "image/x-icns",
            Self::Tiff => "image/tiff",
            Self::Bmp => "image/bmp",
            Self::Jxl => "image/jxl",
            Self::Jp2 => "image/jp2",
            Self::Heic => "image/heic",
        }
    }

    /// File extension written to the cache and used in download filenames
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Avif => "avif",
            Self::Webp => "webp",
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Ico => "ico",
            Self::Icns => "icns",
            Self::Tiff => "tiff",
            Self::Bmp => "bmp",
            Self::Jxl => "jxl",
            Self::Jp2 => "jp2",
            Self::Heic => "heic",
        }
    }

    /// Look up a type by its exact MIME string
    pub fn from_mime(mime: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == mime)
    }

    /// Look up a type by file extension (case-insensitive, leading dot allowed)
    pub fn from_extension(extension: &str) -> Option<Self> {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        match ext.as_str() {
            "avif" => Some(Self::Avif),
            "webp" => Some(Self::Webp),
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "ico" => Some(Self::Ico),
            "icns" => Some(Self::Icns),
            "tif" | "tiff" => Some(Self::Tiff),
            "bmp" => Some(Self::Bmp),
            "jxl" => Some(Self::Jxl),
            "jp2" => Some(Self::Jp2),
            "heic" => Some(Self::Heic),
            _ => None,
        }
    }

    pub fn is_bypass(&self) -> bool {
        BYPASS_TYPES.contains(self)
    }

    pub fn is_animatable(&self) -> bool {
        ANIMATABLE_TYPES.contains(self)
    }
}

impl fmt::Display for ImageMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageMime {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_mime(&s.trim().to_ascii_lowercase())
            .ok_or_else(|| ImageError::unsupported_format(s))
    }
}

/// Content type for a cached file extension, `application/octet-stream` if unknown
pub fn content_type_for_extension(extension: &str) -> &'static str {
    ImageMime::from_extension(extension)
        .map(|m| m.as_str())
        .unwrap_or("application/octet-stream")
}
