//! Upstream source configuration.
//!
//! Default values are sourced from `crate::constants`.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_SOURCE_BYTES, DEFAULT_UPSTREAM_ROOT};
use crate::image_optimizer::upstream::LocalFsUpstream;

fn default_root() -> String {
    DEFAULT_UPSTREAM_ROOT.to_string()
}

fn default_max_source_bytes() -> usize {
    DEFAULT_MAX_SOURCE_BYTES
}

/// Where source images are read from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Public directory that request URLs are resolved against (default: ./public)
    #[serde(default = "default_root")]
    pub root: String,
    /// Largest source file that will be read, in bytes (default: 50 MB)
    #[serde(default = "default_max_source_bytes")]
    pub max_source_bytes: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            max_source_bytes: default_max_source_bytes(),
        }
    }
}

impl UpstreamConfig {
    pub fn to_upstream(&self) -> LocalFsUpstream {
        LocalFsUpstream::new(&self.root, self.max_source_bytes)
    }
}
