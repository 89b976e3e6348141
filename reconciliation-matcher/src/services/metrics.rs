//! Prometheus metrics for reconciliation-matcher.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// Histogram for database query duration by operation.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "reconciliation_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Counter for statement lines by match classification.
pub static MATCH_CLASSIFICATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "reconciliation_match_classifications_total",
        "Statement lines classified per matching pass",
        &["classification"]
    )
    .expect("Failed to register MATCH_CLASSIFICATIONS")
});

/// Counter for settlement attempts by origin and outcome.
pub static SETTLEMENTS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "reconciliation_settlements_total",
        "Settlement attempts",
        &["origin", "outcome"]
    )
    .expect("Failed to register SETTLEMENTS")
});

/// Counter for approval operations.
pub static APPROVAL_OPERATIONS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "reconciliation_approval_operations_total",
        "Approval request operations",
        &["operation", "status"]
    )
    .expect("Failed to register APPROVAL_OPERATIONS")
});

/// Counter for errors.
pub static ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "reconciliation_errors_total",
        "Total number of errors",
        &["error_type"]
    )
    .expect("Failed to register ERRORS")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&MATCH_CLASSIFICATIONS);
    Lazy::force(&SETTLEMENTS);
    Lazy::force(&APPROVAL_OPERATIONS);
    Lazy::force(&ERRORS);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_classification(classification: &str, count: usize) {
    MATCH_CLASSIFICATIONS
        .with_label_values(&[classification])
        .inc_by(count as f64);
}

pub fn record_settlement(origin: &str, outcome: &str) {
    SETTLEMENTS.with_label_values(&[origin, outcome]).inc();
}

pub fn record_approval_operation(operation: &str, status: &str) {
    APPROVAL_OPERATIONS
        .with_label_values(&[operation, status])
        .inc();
}

pub fn record_error(error_type: &str) {
    ERRORS.with_label_values(&[error_type]).inc();
}
