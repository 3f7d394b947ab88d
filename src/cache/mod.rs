// Cache module

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_CACHE_DIR;

pub mod disk;

pub use disk::{CacheEntry, CacheLookup, CachedImageValue, ImageCache};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Root directory of the optimized image cache
    #[serde(default = "default_cache_dir")]
    pub dir: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
        }
    }
}

fn default_cache_dir() -> String {
    DEFAULT_CACHE_DIR.to_string()
}

impl CacheConfig {
    /// Validate cache configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.dir.trim().is_empty() {
            return Err("cache.dir cannot be empty".to_string());
        }
        Ok(())
    }
}
