use serde::{Deserialize, Serialize};

use super::mime::ImageMime;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ALLOWED_PREFIXES, DEFAULT_AVIF_EFFORT, DEFAULT_DEVICE_SIZES, DEFAULT_ENCODE_TIMEOUT_SECS,
    DEFAULT_IMAGE_SIZES, DEFAULT_LIMIT_INPUT_PIXELS, DEFAULT_MINIMUM_CACHE_TTL_SECS,
    DEFAULT_QUALITIES,
};

/// How browsers should present a served image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentDispositionType {
    #[default]
    Inline,
    Attachment,
}

impl ContentDispositionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inline => "inline",
            Self::Attachment => "attachment",
        }
    }
}

/// Image optimization policy, immutable once the process has started
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Device breakpoint widths
    #[serde(default = "default_device_sizes")]
    pub device_sizes: Vec<u32>,

    /// Fixed image widths
    #[serde(default = "default_image_sizes")]
    pub image_sizes: Vec<u32>,

    /// Minimum cache TTL in seconds
    #[serde(default = "default_minimum_cache_ttl")]
    pub minimum_cache_ttl: u64,

    /// Output formats in priority order (first is most preferred)
    #[serde(default = "default_formats")]
    pub formats: Vec<ImageMime>,

    /// Allowed quality values; empty allows anything in 1-100
    #[serde(default = "default_qualities")]
    pub qualities: Vec<u8>,

    #[serde(default)]
    pub content_disposition_type: ContentDispositionType,

    /// Callers skip the optimizer entirely when set
    #[serde(default)]
    pub unoptimized: bool,

    /// Path prefixes a source `url` must start with
    #[serde(default = "default_allowed_prefixes")]
    pub allowed_prefixes: Vec<String>,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            device_sizes: default_device_sizes(),
            image_sizes: default_image_sizes(),
            minimum_cache_ttl: default_minimum_cache_ttl(),
            formats: default_formats(),
            qualities: default_qualities(),
            content_disposition_type: ContentDispositionType::Inline,
            unoptimized: false,
            allowed_prefixes: default_allowed_prefixes(),
        }
    }
}

impl ImageConfig {
    /// Default policy with an overridden cache TTL
    pub fn with_minimum_cache_ttl(minimum_cache_ttl: u64) -> Self {
        Self {
            minimum_cache_ttl,
            ..Default::default()
        }
    }

    /// Sorted union of device and image sizes, without duplicates
    pub fn allowed_sizes(&self) -> Vec<u32> {
        let mut sizes: Vec<u32> = self
            .device_sizes
            .iter()
            .chain(self.image_sizes.iter())
            .copied()
            .collect();
        sizes.sort_unstable();
        sizes.dedup();
        sizes
    }

    pub fn is_allowed_size(&self, width: u32) -> bool {
        self.device_sizes.contains(&width) || self.image_sizes.contains(&width)
    }

    pub fn is_allowed_quality(&self, quality: u8) -> bool {
        if !(1..=100).contains(&quality) {
            return false;
        }
        self.qualities.is_empty() || self.qualities.contains(&quality)
    }
}

/// Encoder settings applied to every transform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Upper bound for one resize/encode, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Encoder worker threads per request; unset lets the encoder decide
    #[serde(default)]
    pub concurrency: Option<usize>,

    /// Decoded pixel limit (image-bomb protection)
    #[serde(default = "default_limit_input_pixels")]
    pub limit_input_pixels: u64,

    /// AVIF effort (0-9, lower is faster)
    #[serde(default = "default_avif_effort")]
    pub avif_effort: u8,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            concurrency: None,
            limit_input_pixels: default_limit_input_pixels(),
            avif_effort: default_avif_effort(),
        }
    }
}

impl EncoderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout_secs() -> u64 {
    DEFAULT_ENCODE_TIMEOUT_SECS
}

fn default_limit_input_pixels() -> u64 {
    DEFAULT_LIMIT_INPUT_PIXELS
}

fn default_avif_effort() -> u8 {
    DEFAULT_AVIF_EFFORT
}

fn default_device_sizes() -> Vec<u32> {
    DEFAULT_DEVICE_SIZES.to_vec()
}

fn default_image_sizes() -> Vec<u32> {
    DEFAULT_IMAGE_SIZES.to_vec()
}

fn default_minimum_cache_ttl() -> u64 {
    DEFAULT_MINIMUM_CACHE_TTL_SECS
}

fn default_formats() -> Vec<ImageMime> {
    vec![ImageMime::Avif, ImageMime::Webp]
}

fn default_qualities() -> Vec<u8> {
    DEFAULT_QUALITIES.to_vec()
}

fn default_allowed_prefixes() -> Vec<String> {
    DEFAULT_ALLOWED_PREFIXES
        .iter()
        .map(|p| p.to_string())
        .collect()
}
