//! Closed permission catalog.
//!
//! # Purpose
//! Canonical permission strings checked by the authorization engine and used
//! when seeding roles. The set is closed at design level; unknown strings are
//! never an error, they simply cannot be satisfied without a wildcard grant.

/// Matches any permission when present in a role's permission list.
pub const WILDCARD: &str = "*";

// Platform permissions.
pub const PLATFORM_MANAGE_TENANTS: &str = "platform:manage_tenants";
pub const PLATFORM_MANAGE_ADMINS: &str = "platform:manage_admins";
pub const PLATFORM_VIEW_AUDIT: &str = "platform:view_audit";
pub const PLATFORM_BOOTSTRAP: &str = "platform:bootstrap";
pub const CONTROL_PLANE_LOGIN: &str = "control_plane:login";

// Tenant permissions.
pub const TENANT_MANAGE_USERS: &str = "tenant:manage_users";
pub const TENANT_MANAGE_CLIENTS: &str = "tenant:manage_clients";
pub const TENANT_MANAGE_SETTINGS: &str = "tenant:manage_settings";
pub const TENANT_VIEW_USERS: &str = "tenant:view_users";
pub const TENANT_VIEW: &str = "tenant:view";
pub const TENANT_VIEW_AUDIT: &str = "tenant:view_audit";

// User self-service permissions.
pub const USER_READ_PROFILE: &str = "user:read_profile";
pub const USER_WRITE_PROFILE: &str = "user:write_profile";
pub const USER_CHANGE_PASSWORD: &str = "user:change_password";
pub const USER_MANAGE_SESSIONS: &str = "user:manage_sessions";

// OAuth2 client permissions.
pub const CLIENT_TOKEN_INTROSPECT: &str = "client:token_introspect";
pub const CLIENT_TOKEN_REVOKE: &str = "client:token_revoke";

/// Every defined permission, used for validation and seeding.
pub const ALL: &[&str] = &[
    PLATFORM_MANAGE_TENANTS,
    PLATFORM_MANAGE_ADMINS,
    PLATFORM_VIEW_AUDIT,
    PLATFORM_BOOTSTRAP,
    CONTROL_PLANE_LOGIN,
    TENANT_MANAGE_USERS,
    TENANT_MANAGE_CLIENTS,
    TENANT_MANAGE_SETTINGS,
    TENANT_VIEW_USERS,
    TENANT_VIEW,
    TENANT_VIEW_AUDIT,
    USER_READ_PROFILE,
    USER_WRITE_PROFILE,
    USER_CHANGE_PASSWORD,
    USER_MANAGE_SESSIONS,
    CLIENT_TOKEN_INTROSPECT,
    CLIENT_TOKEN_REVOKE,
];

/// Whether a permission string is part of the catalog (the wildcard counts).
pub fn is_known(permission: &str) -> bool {
    permission == WILDCARD || ALL.contains(&permission)
}
