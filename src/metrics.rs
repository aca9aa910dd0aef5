// Metrics and observability module
// This file handles collection of route cache hit/miss counters,
// summarization latency and per-exchange usage of served routes
//
// Numan Thabit 2025 Nov

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_histogram, CounterVec, Histogram};

pub static ROUTE_CACHE_REQUESTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "route_cache_requests_total",
        "route cache lookups by result and reason",
        &["result", "reason"]
    )
    .unwrap()
});

pub static ROUTE_SUMMARIZE_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "route_summarize_seconds",
        "latency of replaying a route against pool state"
    )
    .unwrap()
});

pub static ROUTE_DEX_HITS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "route_dex_hits_total",
        "swaps served per exchange",
        &["exchange"]
    )
    .unwrap()
});

pub fn record_cache_hit() {
    ROUTE_CACHE_REQUESTS.with_label_values(&["hit", ""]).inc();
}

pub fn record_cache_miss(reason: &str) {
    ROUTE_CACHE_REQUESTS.with_label_values(&["miss", reason]).inc();
}

pub fn record_dex_hits<'a>(exchanges: impl IntoIterator<Item = &'a str>) {
    for exchange in exchanges {
        ROUTE_DEX_HITS.with_label_values(&[exchange]).inc();
    }
}
