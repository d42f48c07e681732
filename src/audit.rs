//! Audit event model and dual-sink logger.
//!
//! # Purpose
//! Every security-relevant operation emits an audit event. Events always
//! reach the structured log (with sensitive metadata redacted) and are
//! best-effort persisted through the audit repository: a persistence failure
//! is logged and swallowed so it can never fail the originating operation.
//!
//! # Key invariants
//! - The event-type taxonomy is closed.
//! - Persisted events are append-only; nothing in the kernel updates or
//!   deletes them.
//! - Metadata values under sensitive keys never reach the structured log
//!   verbatim.
use crate::id;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Closed taxonomy of auditable actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    LoginSuccess,
    LoginFailed,
    UserLocked,
    UserUnlocked,
    UserCreated,
    UserUpdated,
    PasswordChanged,
    Logout,
    PlatformAdminBootstrap,
    TenantCreated,
    TenantUpdated,
    TenantDeleted,
    ClientCreated,
    ClientUpdated,
    ClientDeleted,
    RoleAssigned,
    RoleRevoked,
    SecretRotated,
    TokenIssued,
    TokenRevoked,
    #[serde(rename = "audit.read")]
    AuditRead,
    #[serde(rename = "audit.read.cross_tenant")]
    AuditReadCrossTenant,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::LoginSuccess => "login_success",
            EventType::LoginFailed => "login_failed",
            EventType::UserLocked => "user_locked",
            EventType::UserUnlocked => "user_unlocked",
            EventType::UserCreated => "user_created",
            EventType::UserUpdated => "user_updated",
            EventType::PasswordChanged => "password_changed",
            EventType::Logout => "logout",
            EventType::PlatformAdminBootstrap => "platform_admin_bootstrap",
            EventType::TenantCreated => "tenant_created",
            EventType::TenantUpdated => "tenant_updated",
            EventType::TenantDeleted => "tenant_deleted",
            EventType::ClientCreated => "client_created",
            EventType::ClientUpdated => "client_updated",
            EventType::ClientDeleted => "client_deleted",
            EventType::RoleAssigned => "role_assigned",
            EventType::RoleRevoked => "role_revoked",
            EventType::SecretRotated => "secret_rotated",
            EventType::TokenIssued => "token_issued",
            EventType::TokenRevoked => "token_revoked",
            EventType::AuditRead => "audit.read",
            EventType::AuditReadCrossTenant => "audit.read.cross_tenant",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Common resource tags.
pub const RESOURCE_PLATFORM: &str = "platform";
pub const RESOURCE_TENANT: &str = "tenant";
pub const RESOURCE_USER: &str = "user";
pub const RESOURCE_ROLE: &str = "role";
pub const RESOURCE_CLIENT: &str = "client";
pub const RESOURCE_SESSION: &str = "session";
pub const RESOURCE_TOKEN: &str = "token";

/// An immutable record of a single auditable action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    pub actor_name: String,
    pub resource: String,
    pub target_name: String,
    pub target_id: String,
    pub metadata: Map<String, Value>,
    #[serde(rename = "created_at")]
    pub timestamp: DateTime<Utc>,
    pub ip_address: String,
    pub user_agent: String,
}

impl Event {
    /// Start an event of the given type with a fresh id and timestamp; the
    /// caller fills in whatever context it has via struct update syntax.
    pub fn new(event_type: EventType) -> Self {
        Self {
            id: id::new_id(),
            event_type,
            tenant_id: None,
            actor_id: None,
            actor_name: String::new(),
            resource: String::new(),
            target_name: String::new(),
            target_id: String::new(),
            metadata: Map::new(),
            timestamp: Utc::now(),
            ip_address: String::new(),
            user_agent: String::new(),
        }
    }
}

/// Criteria for listing persisted audit events. A `limit` of zero means no
/// limit.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub tenant_id: Option<String>,
    pub actor_id: Option<String>,
    pub event_type: Option<EventType>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: usize,
    pub offset: usize,
}

/// Sink for audit events. Implementations must never surface failures to the
/// caller.
#[async_trait]
pub trait AuditLogger: Send + Sync {
    async fn log(&self, event: Event);
}

/// Persistence contract for the durable audit trail.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Append an event to durable storage.
    async fn log(&self, event: Event) -> crate::Result<()>;
    /// List events matching `filter` along with the total match count.
    /// `actor_name` is resolved against the identity aggregate, coalescing
    /// full name, then plain email, then the raw actor id.
    async fn list(&self, filter: &Filter) -> crate::Result<(Vec<Event>, usize)>;
}

// Metadata keys containing any of these substrings (case-insensitive) are
// redacted before the event reaches the structured log.
const SENSITIVE_KEY_FRAGMENTS: &[&str] = &[
    "password",
    "secret",
    "token",
    "key",
    "authorization",
    "hash",
    "credential",
    "private",
    "api_key",
];

fn is_sensitive_key(key: &str) -> bool {
    let lowered = key.to_lowercase();
    SENSITIVE_KEY_FRAGMENTS
        .iter()
        .any(|fragment| lowered.contains(fragment))
}

/// Copy of `metadata` with the values of sensitive keys replaced.
pub fn redact_metadata(metadata: &Map<String, Value>) -> Map<String, Value> {
    metadata
        .iter()
        .map(|(key, value)| {
            if is_sensitive_key(key) {
                (key.clone(), Value::String("[REDACTED]".to_string()))
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}

/// Structured-log sink. Always emits; redacts sensitive metadata first.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }

    fn emit(&self, event: &Event) {
        let metadata = redact_metadata(&event.metadata);
        let metadata_json =
            serde_json::to_string(&metadata).unwrap_or_else(|_| "{}".to_string());
        tracing::info!(
            target: "audit",
            audit_type = %event.event_type,
            tenant_id = event.tenant_id.as_deref().unwrap_or(""),
            actor_id = event.actor_id.as_deref().unwrap_or(""),
            actor_name = %event.actor_name,
            resource = %event.resource,
            target_name = %event.target_name,
            target_id = %event.target_id,
            ip_address = %event.ip_address,
            user_agent = %event.user_agent,
            timestamp = %event.timestamp.to_rfc3339(),
            metadata = %metadata_json,
            "audit event"
        );
    }
}

#[async_trait]
impl AuditLogger for TracingLogger {
    async fn log(&self, event: Event) {
        self.emit(&event);
    }
}

/// Dual sink: structured log plus durable persistence.
///
/// The persisted copy keeps the unredacted metadata; redaction applies only
/// to the log line. Persistence errors are logged and swallowed.
pub struct RecordingLogger {
    repo: Arc<dyn AuditRepository>,
    log_sink: TracingLogger,
}

impl RecordingLogger {
    pub fn new(repo: Arc<dyn AuditRepository>) -> Self {
        Self {
            repo,
            log_sink: TracingLogger::new(),
        }
    }
}

#[async_trait]
impl AuditLogger for RecordingLogger {
    async fn log(&self, event: Event) {
        self.log_sink.emit(&event);
        if let Err(err) = self.repo.log(event).await {
            tracing::error!(error = ?err, "failed to persist audit event");
        }
    }
}
