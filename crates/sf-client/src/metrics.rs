//! Request metrics
//!
//! - `sf_requests_total` (counter): labels `status`, `method`
//! - `sf_request_duration_seconds` (histogram): label `status`
//! - `sf_request_errors_total` (counter): label `kind`
//! - `sf_token_refresh_total` (counter): label `outcome`
//!
//! All calls are no-ops until the host process installs a recorder.

/// Record a request that received a response.
pub fn record_request(status: u16, method: &str, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!("sf_requests_total", "status" => status_str.clone(), "method" => method.to_string())
        .increment(1);
    metrics::histogram!("sf_request_duration_seconds", "status" => status_str)
        .record(duration_secs);
}

/// Record a failed request by error kind.
pub fn record_error(kind: &'static str) {
    metrics::counter!("sf_request_errors_total", "kind" => kind).increment(1);
}

/// Record a token refresh attempt (`success` or `failure`).
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("sf_token_refresh_total", "outcome" => outcome).increment(1);
}
