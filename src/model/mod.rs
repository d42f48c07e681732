//! Domain model definitions.
//!
//! # Purpose
//! Canonical entities shared by the services and the repository contracts.
pub mod client;
pub mod identity;
pub mod project;
pub mod role;
pub mod session;
pub mod tenant;

pub use client::{
    AccessToken, AuthorizationCode, Client, OIDC_SCOPES, RefreshToken, validate_oidc_scopes,
};
pub use identity::{Credentials, Identity, Profile};
pub use project::Project;
pub use role::{Assignment, Role, Scope, SeededRole, seed_roles, seeded_role_id};
pub use session::Session;
pub use tenant::{Membership, Tenant, TenantStatus, TenantUserRole};
