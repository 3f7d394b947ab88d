// Error handling tests: status codes and client-facing messages

use optimg::error::OptimizerError;
use optimg::image_optimizer::{ImageError, UpstreamError, ValidationError};

#[test]
fn test_only_request_and_source_problems_are_client_errors() {
    let cases = [
        (OptimizerError::Validation(ValidationError::MissingWidth), 400),
        (OptimizerError::UnsupportedImage(ImageError::not_an_image()), 400),
        (OptimizerError::NotFound("/uploads/a.png".into()), 404),
        (OptimizerError::Upstream("permission denied".into()), 500),
    ];
    for (err, status) in cases {
        assert_eq!(err.to_http_status(), status, "{}", err);
    }
}

#[test]
fn test_validation_message_reaches_client() {
    let err: OptimizerError = ValidationError::QualityOutOfRange.into();
    let body: serde_json::Value = serde_json::from_str(&err.to_json_body()).unwrap();
    assert_eq!(
        body["error"]["message"],
        "\"q\" parameter (quality) must be between 1 and 100"
    );
}

#[test]
fn test_unsupported_image_message() {
    let err = OptimizerError::UnsupportedImage(ImageError::not_an_image());
    let body: serde_json::Value = serde_json::from_str(&err.to_json_body()).unwrap();
    assert_eq!(
        body["error"]["message"],
        "The requested resource isn't a valid image."
    );
}

#[test]
fn test_upstream_details_are_not_leaked() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "/srv/secret");
    let err: OptimizerError = UpstreamError::Io(io).into();
    assert_eq!(err.to_http_status(), 500);
    assert!(err.to_string().contains("/srv/secret"));
    assert!(!err.to_json_body().contains("/srv/secret"));
}

#[test]
fn test_oversized_source_is_server_error() {
    let err: OptimizerError = UpstreamError::TooLarge {
        url: "/uploads/huge.png".into(),
        size: 100,
        max_size: 10,
    }
    .into();
    assert_eq!(err.to_http_status(), 500);
}

#[test]
fn test_soft_errors_have_distinct_statuses() {
    assert_eq!(ImageError::ProcessingTimeout { timeout_ms: 7000 }.to_http_status(), 504);
    assert_eq!(ImageError::Cancelled.to_http_status(), 500);
    assert_eq!(ImageError::image_bomb(20000, 20000, 1000).to_http_status(), 400);
}
