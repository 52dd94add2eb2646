use tracing::warn;

use crate::logging::pii::Redacted;

/// Log a security-relevant login failure event.
pub fn login_failed(reason: &str, email: Option<&str>) {
    warn!(
        event = "SECURITY_LOGIN_FAILED",
        email = %email.map(Redacted).unwrap_or(Redacted("")),
        reason,
        "Authentication failure"
    );
}

/// Log that the backend revoked the current session with a 401.
pub fn session_revoked() {
    warn!(
        event = "SECURITY_SESSION_REVOKED",
        "Session ended by server"
    );
}

/// Log that persisted session data could not be parsed and was discarded.
pub fn storage_corruption(detail: &str) {
    warn!(
        event = "SECURITY_STORAGE_CORRUPTION",
        detail = %Redacted(detail),
        "Discarding corrupted session storage"
    );
}
