//! Metrics definitions for the auth service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `auth_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded by code:
//! - `token_use`: 2 values (access, refresh)
//! - `status`: 2 values (success, error)
//! - `outcome`: one value per operation error variant plus `success`
//! - `error_category`: bounded by `ErrorCategory` and validation failure kinds

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder and return its render handle.
///
/// Fails if a recorder is already installed in this process.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Coarse buckets: bcrypt timing must not be resolvable from metrics
        .set_buckets_for_metric(
            Matcher::Full("auth_bcrypt_duration_seconds".to_string()),
            &[0.050, 0.100, 0.250, 0.500, 1.000, 2.500],
        )
        .map_err(|e| format!("Failed to set bcrypt buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("auth_operation".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.350, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set operation buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Token Metrics
// ============================================================================

/// Record token issuance
///
/// Metric: `auth_token_issuance_total`
/// Labels: `token_use`, `status`
pub fn record_token_issuance(token_use: &str, status: &str) {
    counter!("auth_token_issuance_total", "token_use" => token_use.to_string(), "status" => status.to_string())
        .increment(1);
}

/// Record token validation result
///
/// Metric: `auth_token_validations_total`
/// Labels: `status`, `error_category`
pub fn record_token_validation(status: &str, error_category: Option<&str>) {
    let category = error_category.unwrap_or("none");
    counter!("auth_token_validations_total", "status" => status.to_string(), "error_category" => category.to_string())
        .increment(1);
}

// ============================================================================
// Session Metrics
// ============================================================================

/// Record a refresh token rotation attempt
///
/// Metric: `auth_refresh_rotations_total`
/// Labels: `outcome` (success, invalid, expired, revoked, not_found, internal)
pub fn record_refresh_rotation(outcome: &str) {
    counter!("auth_refresh_rotations_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a detected reuse of a consumed refresh token
///
/// Metric: `auth_refresh_reuse_detected_total`
pub fn record_refresh_reuse_detected() {
    counter!("auth_refresh_reuse_detected_total").increment(1);
}

/// Record sessions revoked
///
/// Metric: `auth_sessions_revoked_total`
/// Labels: `reason` (logout, revoke_all, reuse_detected)
pub fn record_sessions_revoked(reason: &str, count: u64) {
    counter!("auth_sessions_revoked_total", "reason" => reason.to_string()).increment(count);
}

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record a login attempt outcome
///
/// Metric: `auth_login_attempts_total`
/// Labels: `status`
pub fn record_login_attempt(status: &str) {
    counter!("auth_login_attempts_total", "status" => status.to_string()).increment(1);
}

/// Record orchestrator operation duration and outcome
///
/// Metric: `auth_operation_duration_seconds`, `auth_operations_total`
/// Labels: `operation`, `status`
pub fn record_operation(operation: &str, status: &str, duration: Duration) {
    histogram!("auth_operation_duration_seconds", "operation" => operation.to_string())
        .record(duration.as_secs_f64());

    counter!("auth_operations_total", "operation" => operation.to_string(), "status" => status.to_string())
        .increment(1);
}

/// Record audit log write failure
///
/// Metric: `auth_audit_log_failures_total`
/// Labels: `event_type`, `reason`
pub fn record_audit_log_failure(event_type: &str, reason: &str) {
    counter!("auth_audit_log_failures_total", "event_type" => event_type.to_string(), "reason" => reason.to_string())
        .increment(1);
}

// ============================================================================
// Crypto Metrics
// ============================================================================

/// Record bcrypt operation duration
///
/// Metric: `auth_bcrypt_duration_seconds`
/// Labels: `operation` (hash, verify)
pub fn record_bcrypt_duration(operation: &str, duration: Duration) {
    histogram!("auth_bcrypt_duration_seconds", "operation" => operation.to_string())
        .record(duration.as_secs_f64());
}
