//! Prometheus metrics for VSuite HQ.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// HTTP request counter by method and status.
pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "hq_http_requests_total",
        "Total number of HTTP requests",
        &["method", "path", "status"]
    )
    .expect("Failed to register http_requests_total")
});

/// Proposal counter by status transition.
pub static PROPOSALS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "hq_proposals_total",
        "Total number of proposal transitions by status",
        &["status"] // draft, sent, viewed, accepted, rejected, revision_requested
    )
    .expect("Failed to register proposals_total")
});

/// Invoice counter by status transition.
pub static INVOICES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "hq_invoices_total",
        "Total number of invoice transitions by status",
        &["status"] // draft, sent, paid, overdue
    )
    .expect("Failed to register invoices_total")
});

/// Contract counter by status transition.
pub static CONTRACTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "hq_contracts_total",
        "Total number of contract transitions by status",
        &["status"]
    )
    .expect("Failed to register contracts_total")
});

/// Notification counter by channel and outcome.
pub static NOTIFICATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "hq_notifications_total",
        "Total number of notification attempts by channel and outcome",
        &["channel", "outcome"] // sent, skipped, failed
    )
    .expect("Failed to register notifications_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "hq_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&PROPOSALS_TOTAL);
    Lazy::force(&INVOICES_TOTAL);
    Lazy::force(&CONTRACTS_TOTAL);
    Lazy::force(&NOTIFICATIONS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
