// Error types module

use std::fmt;

use crate::image_optimizer::error::ImageError;
use crate::image_optimizer::params::ValidationError;
use crate::image_optimizer::upstream::UpstreamError;

/// Failures the optimizer reports to its caller
///
/// Everything else (encoder and cache problems) is absorbed before it gets
/// here.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimizerError {
    /// Malformed, missing or disallowed `url`, `w` or `q`
    Validation(ValidationError),

    /// Upstream bytes are not a recognisable image
    UnsupportedImage(ImageError),

    /// Source image does not exist
    NotFound(String),

    /// Upstream fetch failed for any other reason
    Upstream(String),
}

impl fmt::Display for OptimizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizerError::Validation(e) => write!(f, "Validation error: {}", e),
            OptimizerError::UnsupportedImage(e) => write!(f, "Unsupported image: {}", e),
            OptimizerError::NotFound(url) => write!(f, "Source image not found: {}", url),
            OptimizerError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
        }
    }
}

impl std::error::Error for OptimizerError {}

impl OptimizerError {
    pub fn to_http_status(&self) -> u16 {
        match self {
            OptimizerError::Validation(_) | OptimizerError::UnsupportedImage(_) => 400,
            OptimizerError::NotFound(_) => 404,
            OptimizerError::Upstream(_) => 500,
        }
    }

    /// Message safe to show to clients
    pub fn public_message(&self) -> String {
        match self {
            OptimizerError::Validation(e) => e.to_string(),
            OptimizerError::UnsupportedImage(e) => e.to_string(),
            OptimizerError::NotFound(_) => "Source image not found".to_string(),
            OptimizerError::Upstream(_) => "Failed to optimize image".to_string(),
        }
    }

    /// JSON error body: `{"error":{"message":"..."}}`
    pub fn to_json_body(&self) -> String {
        serde_json::json!({ "error": { "message": self.public_message() } }).to_string()
    }
}

impl From<ValidationError> for OptimizerError {
    fn from(err: ValidationError) -> Self {
        OptimizerError::Validation(err)
    }
}

impl From<UpstreamError> for OptimizerError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::NotFound(url) => OptimizerError::NotFound(url),
            other => OptimizerError::Upstream(other.to_string()),
        }
    }
}
