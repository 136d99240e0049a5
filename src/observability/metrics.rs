//! Metrics collection.
//!
//! # Metrics
//! - `gateway_invocations_total` (counter): invocations by mode, method, outcome
//! - `gateway_invocation_duration_seconds` (histogram): end-to-end latency
//! - `gateway_failures_total` (counter): raised errors by category
//! - `gateway_client_cache_lookups_total` (counter): cache lookups by result
//! - `gateway_client_cache_size` (gauge): number of cached clients
//! - `gateway_client_cache_evictions_total` (counter): LRU evictions
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels stay low-cardinality: no URIs or header values

use std::time::Duration;

/// Record a completed invocation.
pub fn record_invocation(mode: &'static str, method: &str, status: Option<u16>, duration: Duration) {
    let outcome = match status {
        Some(code) if (200..300).contains(&code) => "success",
        Some(_) => "failure",
        None => "error",
    };
    metrics::counter!(
        "gateway_invocations_total",
        "mode" => mode,
        "method" => method.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("gateway_invocation_duration_seconds", "mode" => mode)
        .record(duration.as_secs_f64());
}

/// Record a raised error by category.
pub fn record_failure(category: &'static str) {
    metrics::counter!("gateway_failures_total", "category" => category).increment(1);
}

/// Record a client cache lookup ("hit", "miss" or "failed").
pub fn record_cache_lookup(result: &'static str) {
    metrics::counter!("gateway_client_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_size(size: usize) {
    metrics::gauge!("gateway_client_cache_size").set(size as f64);
}

pub fn record_cache_eviction() {
    metrics::counter!("gateway_client_cache_evictions_total").increment(1);
}
