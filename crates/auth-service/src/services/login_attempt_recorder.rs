//! Best-effort audit sink for authentication attempts.
//!
//! Recording never fails the surrounding operation. Write failures are logged
//! and counted, then dropped.

use crate::models::NewLoginAttempt;
use crate::observability::hash_for_correlation;
use crate::observability::metrics::{record_audit_log_failure, record_login_attempt};
use crate::repositories::LoginAttemptStore;
use crate::services::validation::{is_valid_email, normalize_ip};
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[derive(Clone)]
pub struct LoginAttemptRecorder {
    store: Arc<dyn LoginAttemptStore>,
}

impl LoginAttemptRecorder {
    pub fn new(store: Arc<dyn LoginAttemptStore>) -> Self {
        Self { store }
    }

    /// Append one attempt. Returns whether the row was persisted.
    pub async fn record(
        &self,
        email: &str,
        success: bool,
        ip_address: Option<&str>,
        attempted_at: DateTime<Utc>,
    ) -> bool {
        record_login_attempt(if success { "success" } else { "failure" });

        if !is_valid_email(email) {
            tracing::debug!(
                target: "auth.audit",
                "Skipping login attempt audit row: malformed email"
            );
            return false;
        }

        let ip_address = ip_address.and_then(normalize_ip);

        let attempt = NewLoginAttempt {
            email: email.to_string(),
            success,
            ip_address,
            attempted_at,
        };

        match self.store.record(attempt).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(
                    target: "auth.audit",
                    email_hash = %hash_for_correlation(email),
                    error = %e,
                    "Failed to record login attempt"
                );
                record_audit_log_failure("login_attempt", "db_write_failed");
                false
            }
        }
    }
}
