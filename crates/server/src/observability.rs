use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, Encoder, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static UPLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "arb_relay_uploads_total",
        "Upload requests by tier and outcome",
        &["tier", "outcome"]
    )
    .expect("register uploads_total")
});

pub static FETCHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "arb_relay_fetches_total",
        "Snapshot reads by tier and outcome",
        &["tier", "outcome"]
    )
    .expect("register fetches_total")
});

/// `tier` is `"unknown"` when the request was rejected before its body was parsed.
pub fn record_upload(tier: &str, outcome: &str) {
    UPLOADS_TOTAL.with_label_values(&[tier, outcome]).inc();
}

pub fn record_fetch(tier: &str, outcome: &str) {
    FETCHES_TOTAL.with_label_values(&[tier, outcome]).inc();
}

pub fn encode_metrics() -> (axum::http::StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        axum::http::StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}
