//! Image Optimization End-to-End Integration Tests
//!
//! Tests the complete flow:
//!   Query → Validation → Upstream → Sniff → Encode → Cache → Response
//!
//! Sources are real images written to a temporary public directory and
//! encoded with the native codec.

use super::test_harness::*;
use bytes::Bytes;
use optimg::config::Config;
use optimg::image_optimizer::{extract_etag, EncoderQuality, ImageMime, XCache};

const ACCEPT_AVIF: &str = "image/avif,image/webp;q=0.8";

#[tokio::test]
async fn test_png_is_reencoded_to_negotiated_avif() {
    // Scenario A: non-animated PNG, client accepts AVIF and WebP
    let harness = OptimizerTestHarness::new();
    let source = create_test_png(200, 150);
    harness.put_source("/uploads/photo.png", &source);

    let served = harness
        .serve("/uploads/photo.png", "640", "75", Some(ACCEPT_AVIF))
        .await
        .unwrap();

    assert_eq!(served.content_type, "image/avif");
    assert_eq!(served.x_cache, XCache::Miss);
    assert_eq!(&served.bytes[4..12], b"ftypavif");
    assert_ne!(served.etag, extract_etag(None, &source));
    assert_eq!(served.file_name, "photo.avif");
    assert_eq!(served.max_age, 31_536_000);

    // AVIF is encoded 20 points below the requested quality
    let settings = EncoderQuality::for_format(ImageMime::Avif, 75, 3, None);
    assert_eq!(settings.quality, 55);
}

#[tokio::test]
async fn test_ico_is_passed_through() {
    // Scenario B: bypass type, regardless of requested width and quality
    let harness = OptimizerTestHarness::new();
    let source = create_test_ico();
    harness.put_source("/uploads/favicon.ico", &source);

    let served = harness
        .serve("/uploads/favicon.ico", "32", "75", Some(ACCEPT_AVIF))
        .await
        .unwrap();

    assert_eq!(served.content_type, "image/x-icon");
    assert_eq!(served.bytes, Bytes::from(source.clone()));
    assert_eq!(served.etag, extract_etag(None, &source));
    assert_eq!(served.file_name, "favicon.ico");
}

#[tokio::test]
async fn test_animated_gif_is_passed_through() {
    // Scenario C: animated GIF keeps every frame
    let harness = OptimizerTestHarness::new();
    let source = create_test_gif(3);
    harness.put_source("/uploads/spinner.gif", &source);

    let served = harness
        .serve("/uploads/spinner.gif", "64", "75", Some("image/webp"))
        .await
        .unwrap();

    assert_eq!(served.content_type, "image/gif");
    assert_eq!(served.bytes, Bytes::from(source.clone()));
    assert_eq!(served.etag, extract_etag(None, &source));
}

#[tokio::test]
async fn test_single_frame_gif_is_reencoded() {
    let harness = OptimizerTestHarness::new();
    harness.put_source("/uploads/still.gif", &create_test_gif(1));

    let served = harness
        .serve("/uploads/still.gif", "64", "75", Some("image/webp"))
        .await
        .unwrap();

    assert_eq!(served.content_type, "image/webp");
    assert_eq!(dimensions(&served.bytes), (10, 10));
}

#[tokio::test]
async fn test_jpeg_is_downscaled_keeping_aspect_ratio() {
    let harness = OptimizerTestHarness::new();
    harness.put_source("/uploads/wide.jpg", &create_test_jpeg(800, 600));

    // No acceptable configured format: the source type is kept
    let served = harness
        .serve("/uploads/wide.jpg", "640", "75", Some("text/html"))
        .await
        .unwrap();

    assert_eq!(served.content_type, "image/jpeg");
    assert_eq!(served.file_name, "wide.jpeg");
    assert_eq!(dimensions(&served.bytes), (640, 480));
}

#[tokio::test]
async fn test_small_source_is_not_upscaled() {
    let harness = OptimizerTestHarness::new();
    harness.put_source("/uploads/small.png", &create_test_png(40, 30));

    let served = harness
        .serve("/uploads/small.png", "640", "75", Some("image/webp"))
        .await
        .unwrap();

    assert_eq!(served.content_type, "image/webp");
    assert_eq!(dimensions(&served.bytes), (40, 30));
}

#[tokio::test]
async fn test_webp_without_negotiation_becomes_jpeg() {
    let harness = OptimizerTestHarness::new();
    harness.put_source("/votewise/assets/hero.webp", &create_test_webp(300, 200));

    let served = harness
        .serve("/votewise/assets/hero.webp", "256", "75", None)
        .await
        .unwrap();

    assert_eq!(served.content_type, "image/jpeg");
    assert_eq!(dimensions(&served.bytes), (256, 171));
}

#[tokio::test]
async fn test_image_bomb_falls_back_to_original() {
    let mut config = test_config();
    config.encoder.limit_input_pixels = 100;
    let harness = OptimizerTestHarness::with_config(config);
    let source = create_test_png(20, 20);
    harness.put_source("/uploads/bomb.png", &source);

    let served = harness
        .serve("/uploads/bomb.png", "640", "75", Some("image/webp"))
        .await
        .unwrap();

    assert_eq!(served.content_type, "image/png");
    assert_eq!(served.bytes, Bytes::from(source.clone()));
    assert_eq!(served.etag, extract_etag(None, &source));
}

#[tokio::test]
async fn test_unoptimized_serves_source_unchanged() {
    let mut config: Config = test_config();
    config.image.unoptimized = true;
    let harness = OptimizerTestHarness::with_config(config);
    let source = create_test_png(50, 50);
    harness.put_source("/uploads/raw.png", &source);

    let served = harness
        .serve("/uploads/raw.png", "640", "75", Some(ACCEPT_AVIF))
        .await
        .unwrap();

    assert_eq!(served.content_type, "image/png");
    assert_eq!(served.bytes, Bytes::from(source));
    assert!(harness.cached_files().is_empty());
}

#[tokio::test]
async fn test_response_headers() {
    let harness = OptimizerTestHarness::new();
    harness.put_source("/uploads/photo.png", &create_test_png(64, 64));

    let served = harness
        .serve("/uploads/photo.png", "64", "75", Some("image/webp"))
        .await
        .unwrap();
    let headers = served.headers();
    let header = |name: &str| {
        headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.clone())
            .unwrap()
    };

    assert_eq!(header("Cache-Control"), "public, max-age=31536000, immutable");
    assert_eq!(header("Vary"), "Accept");
    assert_eq!(header("ETag"), format!("\"{}\"", served.etag));
    assert_eq!(header("X-Cache"), "MISS");
    assert_eq!(header("Content-Type"), "image/webp");
    assert_eq!(header("Content-Length"), served.bytes.len().to_string());
    assert_eq!(header("Content-Disposition"), "inline; filename=\"photo.webp\"");
    assert_eq!(header("X-Content-Type-Options"), "nosniff");
}
