//! Metrics collection.
//!
//! # Responsibilities
//! - Define transport metrics (requests, latency, connection attempts, buffers)
//! - Record through the `metrics` facade; the host application installs the recorder
//!
//! # Metrics
//! - `transport_requests_total` (counter): completed sends by response code
//! - `transport_request_duration_seconds` (histogram): send latency by method and
//!   normalized URL
//! - `transport_connection_attempts_total` (counter): attempts by outcome
//! - `transport_buffer_pool_outstanding` (gauge): pooled buffers checked out
//!
//! # Design Decisions
//! - Recording without an installed recorder is a no-op
//! - Labels stay low-cardinality: identifiers in URL paths become placeholders

use std::time::Duration;

use crate::model::url_ext::normalize_url;
use crate::model::{Request, ResponseCode};

/// Record a finished send.
pub fn record_request(request: &Request, code: ResponseCode, elapsed: Duration) {
    metrics::counter!("transport_requests_total", "code" => code.as_u16().to_string())
        .increment(1);
    metrics::histogram!(
        "transport_request_duration_seconds",
        "method" => request.method().to_string(),
        "url" => normalize_url(request.url())
    )
    .record(elapsed.as_secs_f64());
}

/// Record the outcome of one connection attempt.
pub fn record_connection_attempt(outcome: &'static str) {
    metrics::counter!("transport_connection_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_buffers_outstanding(count: usize) {
    metrics::gauge!("transport_buffer_pool_outstanding").set(count as f64);
}
