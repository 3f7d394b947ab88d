//! Error Scenario Integration Tests
//!
//! Only bad requests, missing sources and non-image sources fail a request.
//! Cache and encoder problems degrade to a successful response.

use super::test_harness::*;
use bytes::Bytes;
use optimg::error::OptimizerError;
use optimg::image_optimizer::{CancelSignal, ImageQuery, ValidationError, XCache};

#[tokio::test]
async fn test_missing_source_is_404() {
    let harness = OptimizerTestHarness::new();
    let err = harness
        .serve("/uploads/missing.png", "640", "75", None)
        .await
        .unwrap_err();

    assert_eq!(err.to_http_status(), 404);
    assert_eq!(
        err.to_json_body(),
        r#"{"error":{"message":"Source image not found"}}"#
    );
}

#[tokio::test]
async fn test_url_error_wins_over_width_error() {
    let harness = OptimizerTestHarness::new();
    let err = harness
        .serve("/private/photo.png", "abc", "75", None)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OptimizerError::Validation(ValidationError::UrlPrefixNotAllowed { .. })
    ));
    assert_eq!(err.to_http_status(), 400);
}

#[tokio::test]
async fn test_non_image_source_is_400() {
    let harness = OptimizerTestHarness::new();
    harness.put_source("/uploads/notes.png", b"just some text pretending to be a png");

    let err = harness
        .serve("/uploads/notes.png", "640", "75", None)
        .await
        .unwrap_err();

    assert!(matches!(err, OptimizerError::UnsupportedImage(_)));
    assert_eq!(err.to_http_status(), 400);
    assert!(harness.cached_files().is_empty());
}

#[tokio::test]
async fn test_oversized_source_is_refused() {
    let mut config = test_config();
    config.upstream.max_source_bytes = 16;
    let harness = OptimizerTestHarness::with_config(config);
    harness.put_source("/uploads/photo.png", &create_test_png(32, 32));

    let err = harness
        .serve("/uploads/photo.png", "32", "75", None)
        .await
        .unwrap_err();
    assert_eq!(err.to_http_status(), 500);
    assert!(err.to_json_body().contains("Failed to optimize image"));
}

#[tokio::test]
async fn test_broken_cache_still_serves() {
    let harness = OptimizerTestHarness::with_broken_cache();
    harness.put_source("/uploads/photo.png", &create_test_png(32, 32));

    for _ in 0..2 {
        let served = harness
            .serve("/uploads/photo.png", "32", "75", Some("image/webp"))
            .await
            .unwrap();
        assert_eq!(served.x_cache, XCache::Miss);
        assert_eq!(served.content_type, "image/webp");
    }
}

#[tokio::test]
async fn test_cancelled_request_serves_original() {
    let harness = OptimizerTestHarness::new();
    let source = create_test_png(32, 32);
    harness.put_source("/uploads/photo.png", &source);

    let (cancel_tx, cancel) = CancelSignal::new();
    cancel_tx.send(true).unwrap();

    let served = harness
        .optimizer
        .serve(
            &ImageQuery::new("/uploads/photo.png", "32", "75"),
            Some("image/avif"),
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(served.content_type, "image/png");
    assert_eq!(served.bytes, Bytes::from(source));
}

#[tokio::test]
async fn test_encode_timeout_serves_original() {
    let mut config = test_config();
    config.encoder.timeout_secs = 0;
    let harness = OptimizerTestHarness::with_config(config);
    let source = create_test_png(256, 256);
    harness.put_source("/uploads/photo.png", &source);

    let served = harness
        .serve("/uploads/photo.png", "256", "75", Some("image/avif"))
        .await
        .unwrap();

    assert_eq!(served.content_type, "image/png");
    assert_eq!(served.bytes, Bytes::from(source));
}
