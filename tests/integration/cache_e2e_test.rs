//! Cache End-to-End Integration Tests
//!
//! Hit, stale revalidation and miss behavior of the optimizer against the
//! on-disk cache, with a manual clock driving expiry.

use super::test_harness::*;
use optimg::image_optimizer::XCache;
use std::time::Duration;

fn short_ttl_harness() -> OptimizerTestHarness {
    let mut config = test_config();
    config.image.minimum_cache_ttl = 60;
    OptimizerTestHarness::with_config(config)
}

#[tokio::test]
async fn test_second_request_is_a_hit() {
    let harness = OptimizerTestHarness::new();
    harness.put_source("/uploads/photo.png", &create_test_png(64, 48));

    let first = harness
        .serve("/uploads/photo.png", "64", "75", Some("image/webp"))
        .await
        .unwrap();
    let second = harness
        .serve("/uploads/photo.png", "64", "75", Some("image/webp"))
        .await
        .unwrap();

    assert_eq!(first.x_cache, XCache::Miss);
    assert_eq!(second.x_cache, XCache::Hit);
    assert_eq!(second.bytes, first.bytes);
    assert_eq!(second.etag, first.etag);
    assert_eq!(second.content_type, "image/webp");
    assert_eq!(second.file_name, "photo.webp");
}

#[tokio::test]
async fn test_hit_survives_source_removal() {
    let harness = OptimizerTestHarness::new();
    harness.put_source("/uploads/photo.png", &create_test_png(64, 48));
    harness
        .serve("/uploads/photo.png", "64", "75", Some("image/webp"))
        .await
        .unwrap();

    std::fs::remove_file(harness.public_dir.path().join("uploads/photo.png")).unwrap();

    let served = harness
        .serve("/uploads/photo.png", "64", "75", Some("image/webp"))
        .await
        .unwrap();
    assert_eq!(served.x_cache, XCache::Hit);
}

#[tokio::test]
async fn test_cache_file_layout() {
    let harness = short_ttl_harness();
    harness.put_source("/uploads/photo.png", &create_test_png(64, 48));

    let served = harness
        .serve("/uploads/photo.png", "64", "75", Some("image/webp"))
        .await
        .unwrap();

    let files = harness.cached_files();
    assert_eq!(files.len(), 1);
    let expected_suffix = format!("/60.{}.{}.", START_MILLIS + 60_000, served.etag);
    assert!(files[0].contains(&expected_suffix), "{}", files[0]);
    assert!(files[0].ends_with(".webp"));
}

#[tokio::test]
async fn test_each_variant_is_cached_separately() {
    let harness = OptimizerTestHarness::new();
    harness.put_source("/uploads/photo.png", &create_test_png(200, 100));

    let webp = harness
        .serve("/uploads/photo.png", "128", "75", Some("image/webp"))
        .await
        .unwrap();
    let png = harness
        .serve("/uploads/photo.png", "128", "75", None)
        .await
        .unwrap();
    let wider = harness
        .serve("/uploads/photo.png", "256", "75", Some("image/webp"))
        .await
        .unwrap();

    assert_eq!(webp.content_type, "image/webp");
    assert_eq!(png.content_type, "image/png");
    assert_eq!(wider.x_cache, XCache::Miss);
    assert_eq!(harness.cached_files().len(), 3);
}

#[tokio::test]
async fn test_stale_entry_with_unchanged_source() {
    let harness = short_ttl_harness();
    harness.put_source("/uploads/photo.png", &create_test_png(64, 48));

    let first = harness
        .serve("/uploads/photo.png", "64", "75", Some("image/webp"))
        .await
        .unwrap();
    harness.clock.advance(Duration::from_secs(60));

    let stale = harness
        .serve("/uploads/photo.png", "64", "75", Some("image/webp"))
        .await
        .unwrap();
    assert_eq!(stale.x_cache, XCache::Stale);
    assert_eq!(stale.etag, first.etag);
    assert_eq!(stale.max_age, 60);
}

#[tokio::test]
async fn test_stale_entry_with_changed_source_is_replaced() {
    let harness = short_ttl_harness();
    harness.put_source("/uploads/photo.png", &create_test_png(64, 48));

    let first = harness
        .serve("/uploads/photo.png", "64", "75", Some("image/webp"))
        .await
        .unwrap();
    harness.clock.advance(Duration::from_secs(120));
    harness.put_source("/uploads/photo.png", &create_test_png(48, 64));

    let refreshed = harness
        .serve("/uploads/photo.png", "64", "75", Some("image/webp"))
        .await
        .unwrap();
    assert_eq!(refreshed.x_cache, XCache::Miss);
    assert_ne!(refreshed.etag, first.etag);
    assert_eq!(dimensions(&refreshed.bytes), (48, 64));
    assert_eq!(harness.cached_files().len(), 1);

    let hit = harness
        .serve("/uploads/photo.png", "64", "75", Some("image/webp"))
        .await
        .unwrap();
    assert_eq!(hit.x_cache, XCache::Hit);
    assert_eq!(hit.etag, refreshed.etag);
}

#[tokio::test]
async fn test_corrupt_cache_directory_is_rebuilt() {
    let harness = OptimizerTestHarness::new();
    harness.put_source("/uploads/photo.png", &create_test_png(64, 48));
    harness
        .serve("/uploads/photo.png", "64", "75", Some("image/webp"))
        .await
        .unwrap();

    // A second file in the key directory makes the entry ambiguous
    let file = harness.cached_files().remove(0);
    let key_dir = file.split('/').next().unwrap().to_string();
    std::fs::write(
        harness.cache_dir.path().join(&key_dir).join("1.2.a.b.png"),
        b"stray",
    )
    .unwrap();

    let served = harness
        .serve("/uploads/photo.png", "64", "75", Some("image/webp"))
        .await
        .unwrap();
    assert_eq!(served.x_cache, XCache::Miss);
    assert_eq!(harness.cached_files().len(), 1);
}
