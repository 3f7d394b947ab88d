//! Output format negotiation based on the Accept header
//!
//! The server's configured format order wins: the first configured format the
//! client accepts at all is chosen, whatever q-value the client gave it.

use super::mime::ImageMime;

/// Parsed Accept header entry
#[derive(Debug, Clone, PartialEq)]
struct AcceptedType {
    media_type: String,
    quality: f32,
}

/// Pick the first configured format acceptable to the client
///
/// # Arguments
/// * `formats` - Configured output formats in priority order
/// * `accept` - The Accept header value (e.g., "image/avif,image/webp;q=0.8")
///
/// # Returns
/// The negotiated format, or `None` when the header is empty or nothing matches
pub fn negotiate(formats: &[ImageMime], accept: Option<&str>) -> Option<ImageMime> {
    let accept = accept.filter(|a| !a.is_empty())?;
    let accepted = parse_accept_header(accept);

    formats
        .iter()
        .copied()
        .find(|format| accepted.iter().any(|a| matches_media_range(&a.media_type, format.as_str())))
}

/// Parse Accept header into media ranges sorted by quality (highest first)
fn parse_accept_header(accept: &str) -> Vec<AcceptedType> {
    let mut accepted = Vec::new();

    for part in accept.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        let (media_type, quality) = match part.split_once(';') {
            Some((mt, params)) => (mt.trim(), parse_quality(params)),
            None => (part, 1.0),
        };

        if media_type.is_empty() {
            continue;
        }

        accepted.push(AcceptedType {
            media_type: media_type.to_ascii_lowercase(),
            quality,
        });
    }

    // Stable sort keeps header order for equal q-values
    accepted.sort_by(|a, b| {
        b.quality
            .partial_cmp(&a.quality)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    accepted
}

/// Parse quality value from parameters (e.g., "q=0.8")
fn parse_quality(params: &str) -> f32 {
    for param in params.split(';') {
        if let Some(q) = param.trim().strip_prefix("q=") {
            if let Ok(quality) = q.trim().parse::<f32>() {
                return quality;
            }
        }
    }
    1.0
}

/// Exact match, `*/*`, or a `type/*` wildcard covering the format
fn matches_media_range(range: &str, format: &str) -> bool {
    if range == format || range == "*/*" {
        return true;
    }
    match range.strip_suffix('*') {
        Some(prefix) if prefix.ends_with('/') => format.starts_with(prefix),
        _ => false,
    }
}

/// Get the Vary header value for negotiated responses
pub fn vary_header() -> &'static str {
    "Accept"
}
