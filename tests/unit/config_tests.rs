// Configuration tests: YAML loading, defaults and validation

use optimg::config::Config;
use optimg::image_optimizer::{ContentDispositionType, ImageMime};
use optimg::logging::LogFormat;

#[test]
fn test_full_config_round_trips_through_yaml() {
    let mut config = Config::default();
    config.image.formats = vec![ImageMime::Webp, ImageMime::Avif];
    config.image.content_disposition_type = ContentDispositionType::Attachment;
    config.encoder.concurrency = Some(4);
    config.logging.format = LogFormat::Text;

    let yaml = serde_yaml::to_string(&config).unwrap();
    let parsed = Config::from_yaml_with_env(&yaml).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_defaults_match_documented_policy() {
    let config = Config::default();
    assert_eq!(
        config.image.device_sizes,
        vec![640, 750, 828, 1080, 1200, 1920, 2048, 3840]
    );
    assert_eq!(
        config.image.image_sizes,
        vec![32, 48, 64, 96, 128, 256, 384, 512, 640, 750]
    );
    assert_eq!(config.image.minimum_cache_ttl, 31_536_000);
    assert_eq!(config.image.formats, vec![ImageMime::Avif, ImageMime::Webp]);
    assert_eq!(config.image.qualities, vec![75]);
    assert_eq!(
        config.image.content_disposition_type,
        ContentDispositionType::Inline
    );
    assert!(!config.image.unoptimized);
    assert_eq!(config.cache.dir, "./public/uploads/bucket");
    assert_eq!(config.encoder.timeout_secs, 7);
    assert_eq!(config.encoder.limit_input_pixels, 16383 * 16383);
    assert_eq!(config.encoder.avif_effort, 3);
    assert_eq!(config.encoder.concurrency, None);
}

#[test]
fn test_partial_sections_keep_other_defaults() {
    let config = Config::from_yaml_with_env(
        r#"
image:
  qualities: [60, 75, 90]
encoder:
  avif_effort: 6
"#,
    )
    .unwrap();
    assert_eq!(config.image.qualities, vec![60, 75, 90]);
    assert_eq!(config.image.minimum_cache_ttl, 31_536_000);
    assert_eq!(config.encoder.avif_effort, 6);
    assert_eq!(config.encoder.timeout_secs, 7);
    assert!(config.validate().is_ok());
}

#[test]
fn test_invalid_effort_is_rejected() {
    let config = Config::from_yaml_with_env("encoder:\n  avif_effort: 10\n").unwrap();
    assert!(config.validate().unwrap_err().contains("avif_effort"));
}

#[test]
fn test_zero_concurrency_is_rejected() {
    let config = Config::from_yaml_with_env("encoder:\n  concurrency: 0\n").unwrap();
    assert!(config.validate().unwrap_err().contains("concurrency"));
}

#[test]
fn test_malformed_yaml_is_an_error() {
    assert!(Config::from_yaml_with_env("image: [unclosed").is_err());
}
