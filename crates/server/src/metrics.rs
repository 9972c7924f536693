//! Prometheus metrics for observability.
//!
//! Search request counts and latency, plus result volume, labelled by
//! search type.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Search requests total, by search type.
pub static SEARCH_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("dragnet_search_requests_total", "Total search requests"),
        &["type"],
    )
    .unwrap()
});

/// Search duration in seconds, by search type.
pub static SEARCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "dragnet_search_duration_seconds",
            "Search duration in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["type"],
    )
    .unwrap()
});

/// Releases returned per search.
pub static SEARCH_RELEASES_RETURNED: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "dragnet_search_releases_returned",
            "Releases returned per search",
        )
        .buckets(vec![0.0, 1.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0]),
    )
    .unwrap()
});

/// Rejected search requests, by reason.
pub static SEARCH_REJECTED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "dragnet_search_rejected_total",
            "Search requests rejected before dispatch",
        ),
        &["reason"],
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(SEARCH_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(SEARCH_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(SEARCH_RELEASES_RETURNED.clone()))
        .unwrap();
    registry
        .register(Box::new(SEARCH_REJECTED_TOTAL.clone()))
        .unwrap();
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}
