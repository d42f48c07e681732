//! Identity model definitions.
//!
//! # Purpose
//! A global actor, looked up by its opaque identity key. Identities carry no
//! tenant reference; tenancy is expressed through memberships and role
//! assignments.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user identity.
///
/// The primary lookup key is `email_hash`, the HMAC-SHA256 of the normalized
/// email. `email_plain` is unindexed PII and may be absent entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email_hash: String,
    pub email_plain: Option<String>,
    pub email_verified: bool,
    pub profile: Profile,
    pub failed_login_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Identity {
    /// Whether the identity is inside its lockout window at `now`.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

/// Profile metadata associated with an identity. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// Password credential for an identity. At most one per identity; the hash
/// encodes its own Argon2id parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub user_id: String,
    pub password_hash: String,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn identity() -> Identity {
        let now = Utc::now();
        Identity {
            id: "u-1".into(),
            email_hash: "00".repeat(32),
            email_plain: None,
            email_verified: false,
            profile: Profile::default(),
            failed_login_attempts: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn unlocked_without_timestamp() {
        assert!(!identity().is_locked(Utc::now()));
    }

    #[test]
    fn locked_until_future_timestamp() {
        let now = Utc::now();
        let mut user = identity();
        user.locked_until = Some(now + Duration::minutes(15));
        assert!(user.is_locked(now));
        // The window lapses implicitly; no unlock write is required.
        assert!(!user.is_locked(now + Duration::minutes(16)));
    }
}
