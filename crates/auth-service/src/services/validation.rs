//! Precondition checks run at the orchestrator boundary, before any
//! persistence call.

/// bcrypt ignores input past this many bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Trimmed, lower-cased form used for every lookup and write.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Basic `local@domain.tld` shape check.
pub fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };

    if local.is_empty() || local.chars().any(char::is_whitespace) {
        return false;
    }

    // Domain needs at least one dot and no empty labels
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|l| !l.is_empty())
}

/// Reason the password is unacceptable, if any.
pub fn password_violation(password: &str) -> Option<&'static str> {
    if password.is_empty() {
        return Some("Password must not be empty");
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Some("Password must be at most 72 bytes");
    }
    None
}

/// Canonical textual IP address, or `None` if `raw` is not one.
pub fn normalize_ip(raw: &str) -> Option<String> {
    raw.trim()
        .parse::<std::net::IpAddr>()
        .ok()
        .map(|ip| ip.to_string())
}
