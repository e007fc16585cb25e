//! Security audit logging
//!
//! Credential and authorization events are written at INFO on the `audit`
//! target so they can be filtered and shipped separately from application logs.
//! Events carry account IDs, emails and client metadata; never secrets, hashes
//! or raw reset tokens.

use axum::http::HeaderMap;
use exploria_core::Role;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Client metadata captured from request headers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    SignupSuccess {
        account_id: String,
        email: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    SignupFailure {
        email: String,
        reason: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    LoginSuccess {
        account_id: String,
        email: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    /// Reason is recorded here even though the client only sees a generic message
    LoginFailure {
        email: String,
        reason: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    PasswordChanged {
        account_id: String,
        /// `update` or `reset`
        method: String,
    },

    ResetRequested {
        account_id: String,
        email: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    ResetDeliveryFailed {
        account_id: String,
        reason: String,
    },

    AccountDeactivated {
        account_id: String,
    },

    AccessDenied {
        account_id: String,
        role: Role,
        required_roles: Vec<Role>,
        path: String,
    },

    InvalidToken {
        reason: String,
        #[serde(flatten)]
        client: ClientInfo,
    },
}

impl AuditEvent {
    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::SignupSuccess { .. } => "Signup successful",
            AuditEvent::SignupFailure { .. } => "Signup failed",
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::PasswordChanged { .. } => "Password changed",
            AuditEvent::ResetRequested { .. } => "Password reset requested",
            AuditEvent::ResetDeliveryFailed { .. } => "Password reset email failed",
            AuditEvent::AccountDeactivated { .. } => "Account deactivated",
            AuditEvent::AccessDenied { .. } => "Access denied",
            AuditEvent::InvalidToken { .. } => "Invalid session token",
        }
    }
}

/// Log a security audit event as structured JSON on the `audit` target
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    info!(
        target: "audit",
        timestamp = %chrono::Utc::now(),
        event = %event_json,
        "{}",
        event.summary()
    );
}

/// First hop of `X-Forwarded-For`, else `X-Real-IP`
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(first_ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return Some(first_ip.trim().to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}
