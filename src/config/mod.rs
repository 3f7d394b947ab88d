// Configuration module

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::cache::CacheConfig;
use crate::image_optimizer::config::{EncoderConfig, ImageConfig};
use crate::image_optimizer::encoder::EncoderFactory;
use crate::logging::LoggingConfig;

pub mod upstream;

pub use upstream::UpstreamConfig;

/// Process configuration, loaded from YAML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub encoder: EncoderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_yaml_with_env(yaml: &str) -> Result<Self, String> {
        // Replace ${VAR_NAME} with environment variable values
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").map_err(|e| e.to_string())?;

        for caps in re.captures_iter(yaml) {
            let var_name = &caps[1];
            std::env::var(var_name).map_err(|_| {
                format!(
                    "Environment variable '{}' is referenced but not set",
                    var_name
                )
            })?;
        }

        let substituted = re.replace_all(yaml, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_default()
        });

        serde_yaml::from_str(&substituted).map_err(|e| e.to_string())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;
        Self::from_yaml_with_env(&yaml)
    }

    pub fn validate(&self) -> Result<(), String> {
        let image = &self.image;

        if image.device_sizes.is_empty() {
            return Err("image.device_sizes cannot be empty".to_string());
        }
        if let Some(size) = image
            .device_sizes
            .iter()
            .chain(image.image_sizes.iter())
            .find(|size| **size == 0)
        {
            return Err(format!("image size {} must be greater than 0", size));
        }

        if let Some(quality) = image.qualities.iter().find(|q| !(1..=100).contains(*q)) {
            return Err(format!(
                "image quality {} must be between 1 and 100",
                quality
            ));
        }

        if image.formats.is_empty() {
            return Err("image.formats cannot be empty".to_string());
        }
        let mut seen_formats = HashSet::new();
        for format in &image.formats {
            if EncoderFactory::create(*format).is_err() {
                return Err(format!("image format '{}' cannot be encoded", format));
            }
            if !seen_formats.insert(format) {
                return Err(format!("Duplicate image format '{}'", format));
            }
        }

        if image.allowed_prefixes.is_empty() {
            return Err("image.allowed_prefixes cannot be empty".to_string());
        }
        for prefix in &image.allowed_prefixes {
            if !prefix.starts_with('/') {
                return Err(format!(
                    "Allowed prefix '{}' does not start with /",
                    prefix
                ));
            }
        }

        self.cache.validate()?;

        if self.upstream.root.trim().is_empty() {
            return Err("upstream.root cannot be empty".to_string());
        }
        if self.upstream.max_source_bytes == 0 {
            return Err("upstream.max_source_bytes must be greater than 0".to_string());
        }

        if self.encoder.timeout_secs == 0 {
            return Err("encoder.timeout_secs must be greater than 0".to_string());
        }
        if self.encoder.avif_effort > 9 {
            return Err(format!(
                "encoder.avif_effort {} must be between 0 and 9",
                self.encoder.avif_effort
            ));
        }
        if self.encoder.concurrency == Some(0) {
            return Err("encoder.concurrency must be greater than 0".to_string());
        }

        Ok(())
    }
}
