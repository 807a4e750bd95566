// src/metrics.rs
use once_cell::sync::Lazy;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};

pub static FETCH_PAGES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dash_fetch_pages_total", "History pages fetched", &["source"] // hyperliquid:ETH|bitfinex:...
    ).unwrap()
});

pub static FETCH_ABORTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "dash_fetch_aborts_total", "Paginated fetches cut short by a failed page", &["source"]
    ).unwrap()
});

pub static PIPELINE_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dash_pipeline_latency_seconds",
        "Fetch-to-derive latency per view",
        &["view"], // arb|compare
        vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    ).unwrap()
});

/// Text exposition of the default registry.
pub fn render() -> prometheus::Result<String> {
    prometheus::TextEncoder::new().encode_to_string(&prometheus::gather())
}
