//! Metrics definitions for connector authentication.
//!
//! All metrics follow Prometheus naming conventions:
//! - `connector_auth_` prefix
//! - `_total` suffix for counters
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `status`: `success` or `error`
//! - `outcome`: `success` or one of the bounded `AuthError::kind` values

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder and return its render handle.
///
/// # Errors
///
/// Fails if a global recorder is already installed.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

/// Record a signing key refresh attempt.
///
/// Metric: `connector_auth_key_refresh_total`
/// Labels: `status`
pub fn record_key_refresh(status: &'static str) {
    counter!("connector_auth_key_refresh_total", "status" => status).increment(1);
}

/// Record the outcome of authenticating one request.
///
/// Metric: `connector_auth_requests_total`
/// Labels: `outcome`
pub fn record_authentication(outcome: &'static str) {
    counter!("connector_auth_requests_total", "outcome" => outcome).increment(1);
}
