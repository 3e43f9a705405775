// Security event logging

use axum::http::HeaderMap;
use tracing::{info, warn};

/// Security-relevant account events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    LoginSuccess,
    LoginFailure { reason: String },
    SignupSuccess,
    SignupFailure { reason: String },
    Logout,
    PermissionDenied { permission: String },
    DatabaseAccessDenied { database: String },
}

/// Audit logger for security events
///
/// Events go to the structured log with client address and user agent.
#[derive(Debug, Default)]
pub struct AuditLogger;

/// Client details pulled from request headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Checks `X-Forwarded-For` first (for proxied requests), then `X-Real-IP`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };
        Self {
            ip_address: header("X-Forwarded-For").or_else(|| header("X-Real-IP")),
            user_agent: header("User-Agent"),
        }
    }
}

impl AuditLogger {
    pub fn new() -> Self {
        Self
    }

    /// Log an account event for `subject` (email or username)
    pub fn log_auth_event(&self, event: AuthEvent, subject: &str, client: &ClientInfo) {
        let ip = client.ip_address.as_deref();
        let ua = client.user_agent.as_deref();

        match event {
            AuthEvent::LoginSuccess => {
                info!(subject = %subject, ip_address = ?ip, user_agent = ?ua, "Login successful");
            }
            AuthEvent::LoginFailure { reason } => {
                warn!(subject = %subject, ip_address = ?ip, user_agent = ?ua, reason = %reason, "Login failed");
            }
            AuthEvent::SignupSuccess => {
                info!(subject = %subject, ip_address = ?ip, "Account created");
            }
            AuthEvent::SignupFailure { reason } => {
                warn!(subject = %subject, ip_address = ?ip, reason = %reason, "Signup rejected");
            }
            AuthEvent::Logout => {
                info!(subject = %subject, "Logged out");
            }
            AuthEvent::PermissionDenied { permission } => {
                warn!(subject = %subject, permission = %permission, ip_address = ?ip, "Permission denied");
            }
            AuthEvent::DatabaseAccessDenied { database } => {
                warn!(subject = %subject, database = %database, ip_address = ?ip, "Database access denied");
            }
        }
    }
}
