// Image optimizer Prometheus metrics
//
// Provides:
// - Pipeline outcome counters (encoded, bypass, passthrough, fallback, rejected)
// - Cache lookup counters (hit, stale, miss, corrupt)
// - Encode latency histogram per output format

use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};
use std::sync::OnceLock;
use std::time::Duration;

/// Global metrics registry for the image optimizer
pub struct OptimizerMetrics {
    /// Terminal pipeline outcomes by variant
    pub pipeline_outcomes: IntCounterVec,

    /// Cache lookups by result
    pub cache_lookups: IntCounterVec,

    /// Encode duration histogram (in seconds)
    pub encode_duration: HistogramVec,
}

static METRICS: OnceLock<OptimizerMetrics> = OnceLock::new();

impl OptimizerMetrics {
    /// Initialize and return the global metrics instance
    ///
    /// Subsequent calls return the same instance.
    pub fn global() -> &'static Self {
        METRICS.get_or_init(|| {
            let pipeline_outcomes = register_int_counter_vec!(
                "optimg_pipeline_outcomes_total",
                "Total number of image pipeline outcomes by type",
                &["outcome"] // encoded, bypass, passthrough, fallback, rejected
            )
            .expect("Failed to register pipeline_outcomes_total metric");

            let cache_lookups = register_int_counter_vec!(
                "optimg_cache_lookups_total",
                "Total number of image cache lookups by result",
                &["result"] // hit, stale, miss, corrupt
            )
            .expect("Failed to register cache_lookups_total metric");

            let encode_duration = register_histogram_vec!(
                "optimg_encode_duration_seconds",
                "Duration of image resize/encode in seconds",
                &["format"],
                vec![0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 7.5] // 5ms to past the timeout
            )
            .expect("Failed to register encode_duration_seconds metric");

            OptimizerMetrics {
                pipeline_outcomes,
                cache_lookups,
                encode_duration,
            }
        })
    }

    pub fn record_outcome(&self, outcome: &str) {
        self.pipeline_outcomes.with_label_values(&[outcome]).inc();
    }

    pub fn record_cache_lookup(&self, result: &str) {
        self.cache_lookups.with_label_values(&[result]).inc();
    }

    pub fn observe_encode(&self, format: &str, elapsed: Duration) {
        self.encode_duration
            .with_label_values(&[format])
            .observe(elapsed.as_secs_f64());
    }
}
