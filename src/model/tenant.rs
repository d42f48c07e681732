//! Tenant model definitions.
//!
//! # Purpose
//! Tenants are the isolation boundary. Memberships link global identities to
//! a tenant; the legacy per-tenant role rows carry denormalized profile
//! fields for listing.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Inactive,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for TenantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An isolated customer environment.
///
/// Every non-deleted tenant has exactly one identity holding the
/// `tenant_owner` role in its scope; the orchestrator maintains that
/// invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub status: TenantStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Link between a global identity and a tenant. At most one per
/// (tenant, user) pair; removed physically when the tenant is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

/// A user's role inside a tenant (legacy mapping), joined with profile
/// fields for listing tenant users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantUserRole {
    pub id: String,
    pub tenant_id: String,
    pub user_id: String,
    pub role: String,
    pub email_plain: Option<String>,
    pub full_name: Option<String>,
    pub nickname: Option<String>,
    pub picture: Option<String>,
    pub granted_at: DateTime<Utc>,
    pub granted_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TenantStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!(TenantStatus::Inactive.to_string(), "inactive");
    }
}
