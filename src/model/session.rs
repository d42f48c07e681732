//! Session model definitions.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Namespace tag for sessions issued by the end-user authentication plane.
pub const NAMESPACE_AUTH: &str = "auth";
/// Namespace tag for sessions issued by the operator/admin plane.
pub const NAMESPACE_ADMIN: &str = "admin";

/// Server-side authenticated state.
///
/// The identifier is an opaque random token; validity requires both the
/// absolute expiry and the idle window to hold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub user_id: String,
    pub ip_address: String,
    pub user_agent: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub namespace: String,
}

impl Session {
    /// Whether the absolute lifetime has elapsed at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the session has sat idle longer than `idle_timeout` at `now`.
    pub fn is_idle(&self, idle_timeout: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_seen_at > idle_timeout
    }
}
