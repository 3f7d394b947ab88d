// Constants module - centralized default values for configuration
//
// This module defines all default values used throughout the codebase.

// =============================================================================
// Image policy defaults
// =============================================================================

/// Default device breakpoint widths
pub const DEFAULT_DEVICE_SIZES: [u32; 8] = [640, 750, 828, 1080, 1200, 1920, 2048, 3840];

/// Default fixed image widths
pub const DEFAULT_IMAGE_SIZES: [u32; 10] = [32, 48, 64, 96, 128, 256, 384, 512, 640, 750];

/// Default allowed quality values
pub const DEFAULT_QUALITIES: [u8; 1] = [75];

/// Default minimum cache TTL in seconds (1 year)
pub const DEFAULT_MINIMUM_CACHE_TTL_SECS: u64 = 31_536_000;

/// Source path prefixes the optimizer is allowed to read from
pub const DEFAULT_ALLOWED_PREFIXES: [&str; 2] = ["/uploads/", "/votewise/assets/"];

/// Maximum accepted length of the `url` parameter
pub const MAX_URL_LENGTH: usize = 3072;

// =============================================================================
// Cache defaults
// =============================================================================

/// Bump to invalidate every previously cached image
pub const CACHE_VERSION: u32 = 1;

/// Default cache root
pub const DEFAULT_CACHE_DIR: &str = "./public/uploads/bucket";

/// Extension used for cached outputs whose content type has no known extension
pub const FALLBACK_EXTENSION: &str = "bin";

// =============================================================================
// Encoder defaults
// =============================================================================

/// Default encode timeout in seconds
pub const DEFAULT_ENCODE_TIMEOUT_SECS: u64 = 7;

/// Default AVIF encoder effort (0-9, lower is faster)
pub const DEFAULT_AVIF_EFFORT: u8 = 3;

/// Amount subtracted from the requested quality when encoding AVIF
pub const AVIF_QUALITY_OFFSET: u8 = 20;

/// Default decoded pixel limit (16383 x 16383)
pub const DEFAULT_LIMIT_INPUT_PIXELS: u64 = 268_402_689;

// =============================================================================
// Upstream defaults
// =============================================================================

/// Default public directory served by the local upstream
pub const DEFAULT_UPSTREAM_ROOT: &str = "./public";

/// Default maximum source image size (50 MB)
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 50 * 1024 * 1024;
