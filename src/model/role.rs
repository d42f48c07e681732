//! Scoped roles, assignments, and the seeded defaults.
//!
//! # Purpose
//! A role is a named permission set bound to one of the three scope levels.
//! An assignment grants a role to a user in a concrete scope context. The
//! well-known roles ship as seed data with stable identifiers so that the
//! tenant orchestrator and the relational migrations agree on ids.
use crate::permission;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The level at which a role applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Platform,
    Tenant,
    Client,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Platform => "platform",
            Scope::Tenant => "tenant",
            Scope::Client => "client",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named permission set scoped to platform, tenant, or client level.
/// (name, scope) is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub scope: Scope,
    pub description: String,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Whether this role grants `permission`, directly or via the wildcard.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p == permission::WILDCARD || p == permission)
    }
}

/// A role granted to a user in a scope context.
///
/// `scope_context_id` is `None` exactly when `scope` is platform; tenant and
/// client assignments always name the tenant or client they apply to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub user_id: String,
    pub role_id: String,
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_context_id: Option<String>,
    pub granted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granted_by: Option<String>,
}

// Well-known role names.
pub const ROLE_PLATFORM_ADMIN: &str = "platform_admin";
pub const ROLE_TENANT_OWNER: &str = "tenant_owner";
pub const ROLE_TENANT_ADMIN: &str = "tenant_admin";
pub const ROLE_TENANT_MEMBER: &str = "tenant_member";

// Stable seeded role ids, shared with the relational migrations.
pub const ROLE_ID_PLATFORM_ADMIN: &str = "00000000-0000-0000-0000-000000000001";
pub const ROLE_ID_TENANT_OWNER: &str = "00000000-0000-0000-0000-000000000002";
pub const ROLE_ID_TENANT_ADMIN: &str = "00000000-0000-0000-0000-000000000003";
pub const ROLE_ID_TENANT_MEMBER: &str = "00000000-0000-0000-0000-000000000004";

/// One seeded default role: stable id, name, scope, permission set.
#[derive(Debug, Clone)]
pub struct SeededRole {
    pub id: &'static str,
    pub name: &'static str,
    pub scope: Scope,
    pub description: &'static str,
    pub permissions: &'static [&'static str],
}

/// The default roles every deployment starts with.
pub fn seed_roles() -> Vec<SeededRole> {
    vec![
        SeededRole {
            id: ROLE_ID_PLATFORM_ADMIN,
            name: ROLE_PLATFORM_ADMIN,
            scope: Scope::Platform,
            description: "Platform-wide administrator",
            permissions: &[permission::WILDCARD],
        },
        SeededRole {
            id: ROLE_ID_TENANT_OWNER,
            name: ROLE_TENANT_OWNER,
            scope: Scope::Tenant,
            description: "Tenant owner with full tenant control",
            permissions: &[
                permission::TENANT_MANAGE_USERS,
                permission::TENANT_MANAGE_CLIENTS,
                permission::TENANT_MANAGE_SETTINGS,
                permission::TENANT_VIEW_USERS,
                permission::TENANT_VIEW,
                permission::TENANT_VIEW_AUDIT,
                permission::USER_READ_PROFILE,
                permission::USER_WRITE_PROFILE,
                permission::USER_CHANGE_PASSWORD,
                permission::USER_MANAGE_SESSIONS,
            ],
        },
        SeededRole {
            id: ROLE_ID_TENANT_ADMIN,
            name: ROLE_TENANT_ADMIN,
            scope: Scope::Tenant,
            description: "Tenant administrator",
            permissions: &[
                permission::TENANT_MANAGE_USERS,
                permission::TENANT_MANAGE_CLIENTS,
                permission::TENANT_VIEW_USERS,
                permission::TENANT_VIEW,
                permission::TENANT_VIEW_AUDIT,
                permission::USER_READ_PROFILE,
                permission::USER_WRITE_PROFILE,
                permission::USER_CHANGE_PASSWORD,
                permission::USER_MANAGE_SESSIONS,
            ],
        },
        SeededRole {
            id: ROLE_ID_TENANT_MEMBER,
            name: ROLE_TENANT_MEMBER,
            scope: Scope::Tenant,
            description: "Basic tenant membership",
            permissions: &[
                permission::TENANT_VIEW,
                permission::USER_READ_PROFILE,
                permission::USER_WRITE_PROFILE,
                permission::USER_CHANGE_PASSWORD,
            ],
        },
    ]
}

/// Map a well-known tenant role name to its seeded id.
pub fn seeded_role_id(role_name: &str) -> Option<&'static str> {
    match role_name {
        ROLE_PLATFORM_ADMIN => Some(ROLE_ID_PLATFORM_ADMIN),
        ROLE_TENANT_OWNER => Some(ROLE_ID_TENANT_OWNER),
        ROLE_TENANT_ADMIN => Some(ROLE_ID_TENANT_ADMIN),
        ROLE_TENANT_MEMBER => Some(ROLE_ID_TENANT_MEMBER),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(permissions: &[&str]) -> Role {
        let now = Utc::now();
        Role {
            id: "r-1".into(),
            name: "editor".into(),
            scope: Scope::Tenant,
            description: String::new(),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn exact_permission_match() {
        let r = role(&["edit:stuff"]);
        assert!(r.has_permission("edit:stuff"));
        assert!(!r.has_permission("delete:stuff"));
    }

    #[test]
    fn wildcard_matches_everything() {
        let r = role(&["*"]);
        assert!(r.has_permission("edit:stuff"));
        assert!(r.has_permission("anything:at_all"));
    }

    #[test]
    fn empty_role_matches_nothing() {
        let r = role(&[]);
        assert!(!r.has_permission("edit:stuff"));
    }

    #[test]
    fn seeded_roles_have_unique_names_and_ids() {
        let seeds = seed_roles();
        let mut names = std::collections::HashSet::new();
        let mut ids = std::collections::HashSet::new();
        for seed in &seeds {
            assert!(names.insert((seed.name, seed.scope)));
            assert!(ids.insert(seed.id));
        }
    }

    #[test]
    fn seeded_permissions_are_in_the_catalog() {
        for seed in seed_roles() {
            for p in seed.permissions {
                assert!(crate::permission::is_known(p), "unknown permission {p}");
            }
        }
    }

    #[test]
    fn role_name_to_id_mapping() {
        assert_eq!(seeded_role_id(ROLE_TENANT_OWNER), Some(ROLE_ID_TENANT_OWNER));
        assert_eq!(seeded_role_id("made_up_role"), None);
    }

    #[test]
    fn scope_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Scope::Platform).unwrap(), "\"platform\"");
        assert_eq!(Scope::Client.to_string(), "client");
    }
}
