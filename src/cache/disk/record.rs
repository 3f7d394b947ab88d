//! Cache file name codec
//!
//! Entry metadata lives in the file name itself:
//! `{max_age}.{expire_at}.{etag}.{upstream_etag}.{extension}`

use std::fmt;
use std::str::FromStr;

use super::error::DiskCacheError;

/// Metadata encoded in a cache file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheFileRecord {
    /// Seconds
    pub max_age: u64,
    /// Unix milliseconds
    pub expire_at: u64,
    pub etag: String,
    pub upstream_etag: String,
    pub extension: String,
}

impl CacheFileRecord {
    pub fn file_name(&self) -> String {
        self.to_string()
    }

    /// Parse a file name, reading fields from the right
    ///
    /// Anything left of the fifth field from the end is ignored.
    pub fn parse(file_name: &str) -> Result<Self, DiskCacheError> {
        let invalid = || DiskCacheError::InvalidFileName(file_name.to_string());

        let mut parts = file_name.rsplit('.');
        let extension = parts.next().ok_or_else(invalid)?;
        let upstream_etag = parts.next().ok_or_else(invalid)?;
        let etag = parts.next().ok_or_else(invalid)?;
        let expire_at = parts.next().ok_or_else(invalid)?;
        let max_age = parts.next().ok_or_else(invalid)?;

        Ok(Self {
            max_age: max_age.parse().map_err(|_| invalid())?,
            expire_at: expire_at.parse().map_err(|_| invalid())?,
            etag: etag.to_string(),
            upstream_etag: upstream_etag.to_string(),
            extension: extension.to_string(),
        })
    }

    pub fn is_stale(&self, now_millis: u64) -> bool {
        now_millis >= self.expire_at
    }
}

impl fmt::Display for CacheFileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}",
            self.max_age, self.expire_at, self.etag, self.upstream_etag, self.extension
        )
    }
}

impl FromStr for CacheFileRecord {
    type Err = DiskCacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
