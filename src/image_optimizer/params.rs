//! Request parameter validation
//!
//! Turns the raw `url`, `w` and `q` query values plus the Accept header into a
//! [`ValidatedParams`] bundle. Rules are checked in a fixed order and the first
//! violated rule is the one reported.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

use super::config::ImageConfig;
use super::format::negotiate;
use super::key::cache_key;
use super::mime::ImageMime;
use crate::constants::{CACHE_VERSION, MAX_URL_LENGTH};

/// A single query parameter as received from the HTTP layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Single(String),
    /// The parameter appeared more than once
    Repeated(Vec<String>),
}

/// Raw optimizer query (`?url=...&w=...&q=...`)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageQuery {
    pub url: Option<QueryValue>,
    pub w: Option<QueryValue>,
    pub q: Option<QueryValue>,
}

impl ImageQuery {
    /// Build a query from single values
    pub fn new(url: impl Into<String>, w: impl Into<String>, q: impl Into<String>) -> Self {
        Self {
            url: Some(QueryValue::Single(url.into())),
            w: Some(QueryValue::Single(w.into())),
            q: Some(QueryValue::Single(q.into())),
        }
    }

    /// Build a query from decoded key/value pairs, collecting repeated keys
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "url" => &mut query.url,
                "w" => &mut query.w,
                "q" => &mut query.q,
                _ => continue,
            };
            let value = value.into();
            *slot = Some(match slot.take() {
                None => QueryValue::Single(value),
                Some(QueryValue::Single(first)) => QueryValue::Repeated(vec![first, value]),
                Some(QueryValue::Repeated(mut all)) => {
                    all.push(value);
                    QueryValue::Repeated(all)
                }
            });
        }
        query
    }
}

/// Reasons a request is rejected, in validation order
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("\"url\" parameter is required")]
    MissingUrl,
    #[error("\"url\" parameter cannot be an array")]
    RepeatedUrl,
    #[error("\"url\" parameter is too long")]
    UrlTooLong,
    #[error("\"url\" parameter must start with {}", .prefixes.join(" or "))]
    UrlPrefixNotAllowed { prefixes: Vec<String> },
    #[error("\"url\" parameter contains invalid path")]
    UrlInvalidPath,

    #[error("\"w\" parameter (width) is required")]
    MissingWidth,
    #[error("\"w\" parameter (width) cannot be an array")]
    RepeatedWidth,
    #[error("\"w\" parameter (width) must be a positive integer")]
    WidthNotInteger,
    #[error("\"w\" parameter (width) must be greater than 0")]
    WidthNotPositive,
    #[error("\"w\" parameter (width) of {width} is not allowed. Allowed sizes: {}", join_numbers(.allowed))]
    WidthNotAllowed { width: String, allowed: Vec<u32> },

    #[error("\"q\" parameter (quality) is required")]
    MissingQuality,
    #[error("\"q\" parameter (quality) cannot be an array")]
    RepeatedQuality,
    #[error("\"q\" parameter (quality) must be a positive integer")]
    QualityNotInteger,
    #[error("\"q\" parameter (quality) must be between 1 and 100")]
    QualityOutOfRange,
    #[error("\"q\" parameter (quality) of {quality} is not allowed. Allowed qualities: {}", join_numbers(.allowed))]
    QualityNotAllowed { quality: u8, allowed: Vec<u8> },
}

impl ValidationError {
    /// Validation failures are always the caller's fault
    pub fn to_http_status(&self) -> u16 {
        400
    }
}

fn join_numbers<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parameters that passed validation
///
/// `width` and `quality` are members of the configured sets by construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedParams {
    pub url: String,
    pub width: u32,
    pub quality: u8,
    /// `None` means no acceptable configured format; decided later from the source type
    pub negotiated_mime: Option<ImageMime>,
    /// All allowed widths
    pub sizes: Vec<u32>,
    pub minimum_cache_ttl: u64,
}

impl ValidatedParams {
    /// Cache key for these parameters under the current cache version
    pub fn cache_key(&self) -> String {
        cache_key(
            CACHE_VERSION,
            &self.url,
            self.width,
            self.quality,
            self.negotiated_mime.map(|m| m.as_str()).unwrap_or(""),
        )
    }
}

fn digits_only() -> &'static Regex {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    DIGITS.get_or_init(|| Regex::new(r"^[0-9]+$").expect("static regex is valid"))
}

/// Validate and normalize an optimizer request
pub fn validate_params(
    query: &ImageQuery,
    accept: Option<&str>,
    config: &ImageConfig,
) -> Result<ValidatedParams, ValidationError> {
    let url = single_value(
        query.url.as_ref(),
        ValidationError::MissingUrl,
        ValidationError::RepeatedUrl,
    )?;
    if url.len() > MAX_URL_LENGTH {
        return Err(ValidationError::UrlTooLong);
    }
    if !config
        .allowed_prefixes
        .iter()
        .any(|prefix| url.starts_with(prefix.as_str()))
    {
        return Err(ValidationError::UrlPrefixNotAllowed {
            prefixes: config.allowed_prefixes.clone(),
        });
    }
    if url.contains("..") || url.contains("//") {
        return Err(ValidationError::UrlInvalidPath);
    }

    let w = single_value(
        query.w.as_ref(),
        ValidationError::MissingWidth,
        ValidationError::RepeatedWidth,
    )?;
    if !digits_only().is_match(w) {
        return Err(ValidationError::WidthNotInteger);
    }
    let sizes = config.allowed_sizes();
    let width = match w.parse::<u32>() {
        Ok(0) => return Err(ValidationError::WidthNotPositive),
        Ok(width) if config.is_allowed_size(width) => width,
        _ => {
            return Err(ValidationError::WidthNotAllowed {
                width: w.trim_start_matches('0').to_string(),
                allowed: sizes,
            })
        }
    };

    let q = single_value(
        query.q.as_ref(),
        ValidationError::MissingQuality,
        ValidationError::RepeatedQuality,
    )?;
    if !digits_only().is_match(q) {
        return Err(ValidationError::QualityNotInteger);
    }
    let quality = match q.parse::<u32>() {
        Ok(quality @ 1..=100) => quality as u8,
        _ => return Err(ValidationError::QualityOutOfRange),
    };
    if !config.is_allowed_quality(quality) {
        return Err(ValidationError::QualityNotAllowed {
            quality,
            allowed: config.qualities.clone(),
        });
    }

    let negotiated_mime = negotiate(&config.formats, accept);

    Ok(ValidatedParams {
        url: url.to_string(),
        width,
        quality,
        negotiated_mime,
        sizes,
        minimum_cache_ttl: config.minimum_cache_ttl,
    })
}

/// Extract a present, non-empty, non-repeated value
fn single_value(
    value: Option<&QueryValue>,
    missing: ValidationError,
    repeated: ValidationError,
) -> Result<&str, ValidationError> {
    match value {
        None => Err(missing),
        Some(QueryValue::Single(v)) if v.is_empty() => Err(missing),
        Some(QueryValue::Single(v)) => Ok(v.as_str()),
        Some(QueryValue::Repeated(_)) => Err(repeated),
    }
}
