//! Transcoding pipeline
//!
//! One request runs through sniff → bypass check → animation check → output
//! selection → encode. Each terminal state is a [`PipelineOutcome`] variant.
//! Only an unrecognisable source is a failure; every encoder problem falls
//! back to the original bytes.

use bytes::Bytes;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::codec::{EncodeOptions, ImageCodec};
use super::config::EncoderConfig;
use super::error::ImageError;
use super::key::image_etag;
use super::metrics::OptimizerMetrics;
use super::mime::ImageMime;
use super::params::ValidatedParams;
use super::sniff::{detect_content_type, is_animated};
use super::upstream::UpstreamImage;

/// Caller-side cancellation, observed while encoding
///
/// Cancelled once the paired sender publishes `true`. A dropped sender never
/// cancels.
#[derive(Debug, Clone)]
pub struct CancelSignal {
    receiver: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Create a signal and the sender that triggers it
    pub fn new() -> (watch::Sender<bool>, Self) {
        let (sender, receiver) = watch::channel(false);
        (sender, Self { receiver })
    }

    /// A signal that is never cancelled
    pub fn never() -> Self {
        Self::new().1
    }

    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once cancellation is requested
    pub async fn cancelled(&mut self) {
        loop {
            if *self.receiver.borrow_and_update() {
                return;
            }
            if self.receiver.changed().await.is_err() {
                // Sender gone without cancelling
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}

/// Why a source was passed through untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    /// Multi-frame GIF/WebP/PNG
    Animated,
}

/// Terminal state of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Source type is never re-encoded
    Bypass { content_type: ImageMime },
    Passthrough {
        content_type: ImageMime,
        reason: PassthroughReason,
    },
    Encoded { bytes: Bytes, content_type: ImageMime },
    /// Encoding failed, timed out or was cancelled; the source is served instead
    Fallback {
        content_type: ImageMime,
        error: ImageError,
    },
    /// Source is not a recognisable image
    Rejected(ImageError),
}

impl PipelineOutcome {
    /// Metric label
    pub fn label(&self) -> &'static str {
        match self {
            PipelineOutcome::Bypass { .. } => "bypass",
            PipelineOutcome::Passthrough { .. } => "passthrough",
            PipelineOutcome::Encoded { .. } => "encoded",
            PipelineOutcome::Fallback { .. } => "fallback",
            PipelineOutcome::Rejected(_) => "rejected",
        }
    }

    /// Turn the outcome into the result handed to callers
    pub fn into_result(
        self,
        upstream: &UpstreamImage,
        max_age: u64,
    ) -> Result<OptimizedImageResult, ImageError> {
        let original = |content_type: ImageMime, error: Option<ImageError>| OptimizedImageResult {
            bytes: upstream.bytes.clone(),
            content_type,
            max_age,
            etag: upstream.etag.clone(),
            upstream_etag: upstream.etag.clone(),
            error,
        };

        match self {
            PipelineOutcome::Bypass { content_type }
            | PipelineOutcome::Passthrough { content_type, .. } => Ok(original(content_type, None)),
            PipelineOutcome::Fallback {
                content_type,
                error,
            } => Ok(original(content_type, Some(error))),
            PipelineOutcome::Encoded {
                bytes,
                content_type,
            } => Ok(OptimizedImageResult {
                etag: image_etag(&bytes),
                bytes,
                content_type,
                max_age,
                upstream_etag: upstream.etag.clone(),
                error: None,
            }),
            PipelineOutcome::Rejected(error) => Err(error),
        }
    }
}

/// Pipeline output, ready to be cached and served
///
/// `error` is set only for a fallback; `bytes` and `content_type` are always
/// usable.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizedImageResult {
    pub bytes: Bytes,
    pub content_type: ImageMime,
    pub max_age: u64,
    pub etag: String,
    pub upstream_etag: String,
    pub error: Option<ImageError>,
}

/// Choose the encode target
///
/// The negotiated type wins. Otherwise the source type is kept unless it is
/// WebP or AVIF, which are re-encoded as JPEG.
pub fn select_output_type(negotiated: Option<ImageMime>, detected: ImageMime) -> ImageMime {
    match negotiated {
        Some(mime) => mime,
        None if !matches!(detected, ImageMime::Webp | ImageMime::Avif) => detected,
        None => ImageMime::Jpeg,
    }
}

/// Runs the transcoding state machine against a codec
#[derive(Clone)]
pub struct ImagePipeline {
    codec: Arc<dyn ImageCodec>,
    encoder: EncoderConfig,
}

impl ImagePipeline {
    pub fn new(codec: Arc<dyn ImageCodec>, encoder: EncoderConfig) -> Self {
        Self { codec, encoder }
    }

    /// Run every stage and report the terminal outcome
    pub async fn run(
        &self,
        upstream: &UpstreamImage,
        params: &ValidatedParams,
        cancel: &CancelSignal,
    ) -> PipelineOutcome {
        // 1. Sniff
        let detected = match detect_content_type(&upstream.bytes, self.codec.clone()).await {
            Some(mime) => mime,
            None => return PipelineOutcome::Rejected(ImageError::not_an_image()),
        };

        // 2. Bypass
        if detected.is_bypass() {
            return PipelineOutcome::Bypass {
                content_type: detected,
            };
        }

        // 3. Animation
        if is_animated(&upstream.bytes, detected, self.codec.clone()).await {
            return PipelineOutcome::Passthrough {
                content_type: detected,
                reason: PassthroughReason::Animated,
            };
        }

        // 4. Output selection
        let output = select_output_type(params.negotiated_mime, detected);

        // 5. Encode
        let options = EncodeOptions {
            width: params.width,
            height: None,
            format: output,
            quality: params.quality,
            effort: Some(self.encoder.avif_effort),
            concurrency: self.encoder.concurrency,
            limit_input_pixels: Some(self.encoder.limit_input_pixels),
            timeout: self.encoder.timeout(),
        };
        match self.encode(upstream.bytes.clone(), options, cancel).await {
            Ok(bytes) => PipelineOutcome::Encoded {
                bytes,
                content_type: output,
            },
            Err(error) => PipelineOutcome::Fallback {
                content_type: detected,
                error,
            },
        }
    }

    /// Run the pipeline and convert its outcome into a result
    pub async fn process_image(
        &self,
        upstream: &UpstreamImage,
        params: &ValidatedParams,
        cancel: &CancelSignal,
    ) -> Result<OptimizedImageResult, ImageError> {
        let outcome = self.run(upstream, params, cancel).await;
        OptimizerMetrics::global().record_outcome(outcome.label());

        match &outcome {
            PipelineOutcome::Fallback { content_type, error } => warn!(
                url = %params.url,
                content_type = %content_type,
                error = %error,
                "Image encoding failed, serving original"
            ),
            PipelineOutcome::Rejected(error) => {
                debug!(url = %params.url, error = %error, "Source rejected")
            }
            other => debug!(url = %params.url, outcome = other.label(), "Pipeline finished"),
        }

        outcome.into_result(upstream, params.minimum_cache_ttl)
    }

    /// Encode on the blocking pool, bounded by the timeout and the cancel signal
    ///
    /// A timed-out or cancelled encode keeps running on its blocking thread
    /// until the codec returns; its output is discarded.
    async fn encode(
        &self,
        data: Bytes,
        options: EncodeOptions,
        cancel: &CancelSignal,
    ) -> Result<Bytes, ImageError> {
        if cancel.is_cancelled() {
            return Err(ImageError::Cancelled);
        }

        let codec = self.codec.clone();
        let format = options.format;
        let timeout = options.timeout;
        let started = Instant::now();
        let task = tokio::task::spawn_blocking(move || codec.transform(&data, &options));

        let mut cancel = cancel.clone();
        let result = tokio::select! {
            joined = tokio::time::timeout(timeout, task) => match joined {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => Err(ImageError::encode_failed(format.extension(), e.to_string())),
                Err(_) => Err(ImageError::ProcessingTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                }),
            },
            _ = cancel.cancelled() => Err(ImageError::Cancelled),
        };

        OptimizerMetrics::global().observe_encode(format.as_str(), started.elapsed());
        result.map(Bytes::from)
    }
}
