//! Repository contracts for every aggregate.
//!
//! # Purpose
//! The kernel is polymorphic over its persistence capability set: services
//! hold `Arc<dyn …Repository>` handles and never see a concrete backend.
//! The in-memory implementation in [`memory`] backs tests and local
//! development; a relational implementation lives with the consumer.
//!
//! The audit trail contract ([`crate::audit::AuditRepository`]) lives next to
//! the audit event model.
//!
//! # Contract-wide rules
//! - Lookups exclude soft-deleted rows.
//! - `create` fails with the aggregate's `already_exists` error on a
//!   uniqueness violation.
//! - Implementations enforce the same uniqueness constraints the relational
//!   schema declares (identity email hash, tenant name, membership pair,
//!   assignment tuple, client id, token hash).
use crate::Result;
use crate::model::{
    AccessToken, Assignment, AuthorizationCode, Client, Credentials, Identity, Membership,
    Project, RefreshToken, Role, Scope, Session, Tenant, TenantUserRole,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod memory;

#[async_trait]
pub trait IdentityRepository: Send + Sync {
    async fn create(&self, user: &Identity) -> Result<()>;
    async fn add_credentials(&self, credentials: &Credentials) -> Result<()>;
    async fn get_by_id(&self, id: &str) -> Result<Identity>;
    /// Look up an identity by its global email hash.
    async fn get_by_hash(&self, hash: &str) -> Result<Identity>;
    async fn update(&self, user: &Identity) -> Result<()>;
    /// Overwrite the lockout counter and window in one write.
    async fn update_lockout(
        &self,
        user_id: &str,
        failed_attempts: u32,
        locked_until: Option<DateTime<Utc>>,
    ) -> Result<()>;
    /// Soft-delete an identity.
    async fn delete(&self, id: &str) -> Result<()>;
    async fn get_credentials(&self, user_id: &str) -> Result<Credentials>;
    async fn update_password(&self, user_id: &str, password_hash: &str) -> Result<()>;
}

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn create(&self, tenant: &Tenant) -> Result<()>;
    async fn get_by_id(&self, id: &str) -> Result<Tenant>;
    /// Look up a tenant by name among non-deleted tenants.
    async fn get_by_name(&self, name: &str) -> Result<Tenant>;
    async fn update(&self, tenant: &Tenant) -> Result<()>;
    /// Soft-delete a tenant. Deleting an absent or already-deleted tenant is
    /// a no-op so the deletion cascade stays re-runnable.
    async fn delete(&self, id: &str) -> Result<()>;
    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Tenant>>;
}

#[async_trait]
pub trait MembershipRepository: Send + Sync {
    async fn add_member(&self, membership: &Membership) -> Result<()>;
    async fn remove_member(&self, tenant_id: &str, user_id: &str) -> Result<()>;
    async fn list_members(&self, tenant_id: &str) -> Result<Vec<Membership>>;
    async fn check_membership(&self, tenant_id: &str, user_id: &str) -> Result<bool>;
    /// Physically remove every membership of a tenant.
    async fn delete_by_tenant_id(&self, tenant_id: &str) -> Result<()>;
}

/// Legacy per-tenant role mapping. The orchestrator dual-writes here and to
/// the generic assignment store.
#[async_trait]
pub trait TenantRoleRepository: Send + Sync {
    /// Record a role for a user in a tenant; granting the same role twice is
    /// a no-op.
    async fn assign_role(
        &self,
        tenant_id: &str,
        user_id: &str,
        role_name: &str,
        granted_by: &str,
    ) -> Result<()>;
    async fn revoke_role(&self, tenant_id: &str, user_id: &str, role_name: &str) -> Result<()>;
    async fn get_user_roles(&self, tenant_id: &str, user_id: &str)
    -> Result<Vec<TenantUserRole>>;
    async fn get_tenant_users(&self, tenant_id: &str) -> Result<Vec<TenantUserRole>>;
    async fn delete_by_tenant_id(&self, tenant_id: &str) -> Result<()>;
}

#[async_trait]
pub trait RoleRepository: Send + Sync {
    async fn create(&self, role: &Role) -> Result<()>;
    async fn get_by_id(&self, id: &str) -> Result<Role>;
    async fn get_by_name(&self, name: &str, scope: Scope) -> Result<Role>;
    async fn list(&self, scope: Option<Scope>) -> Result<Vec<Role>>;
    async fn update(&self, role: &Role) -> Result<()>;
    async fn delete(&self, id: &str) -> Result<()>;
}

#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Grant a role assignment. The (user, role, scope, context) tuple is
    /// unique; a duplicate grant fails with `AssignmentAlreadyExists`.
    async fn grant(&self, assignment: &Assignment) -> Result<()>;
    async fn revoke(
        &self,
        user_id: &str,
        role_id: &str,
        scope: Scope,
        scope_context_id: Option<&str>,
    ) -> Result<()>;
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Assignment>>;
    /// User ids holding `role_id` at the given scope and context.
    async fn list_by_role(
        &self,
        role_id: &str,
        scope: Scope,
        scope_context_id: Option<&str>,
    ) -> Result<Vec<String>>;
    async fn check_exists(
        &self,
        role_id: &str,
        scope: Scope,
        scope_context_id: Option<&str>,
    ) -> Result<bool>;
    /// Physically remove every assignment bound to one scope context.
    async fn delete_by_context_id(&self, scope: Scope, context_id: &str) -> Result<()>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn create(&self, project: &Project) -> Result<()>;
    async fn get_by_id(&self, id: &str) -> Result<Project>;
    async fn get_by_name(&self, name: &str) -> Result<Project>;
    async fn update(&self, project: &Project) -> Result<()>;
    /// Soft-delete a project.
    async fn delete(&self, id: &str) -> Result<()>;
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Project>>;
    /// Projects the user has access to.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Project>>;
}

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn create(&self, client: &Client) -> Result<()>;
    async fn get_by_client_id(&self, tenant_id: &str, client_id: &str) -> Result<Client>;
    async fn get_by_id(&self, tenant_id: &str, id: &str) -> Result<Client>;
    async fn update(&self, client: &Client) -> Result<()>;
    /// Soft-delete a client.
    async fn delete(&self, tenant_id: &str, id: &str) -> Result<()>;
    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Client>>;
    async fn list_by_tenant(&self, tenant_id: &str) -> Result<Vec<Client>>;
    /// Soft-delete every client of a tenant.
    async fn delete_by_tenant_id(&self, tenant_id: &str) -> Result<()>;
}

#[async_trait]
pub trait AuthorizationCodeRepository: Send + Sync {
    async fn create(&self, code: &AuthorizationCode) -> Result<()>;
    async fn get_by_code(&self, code: &str) -> Result<AuthorizationCode>;
    /// Atomically flip `is_used`; a second redemption fails with
    /// `CodeAlreadyUsed` so concurrent redemptions observe at most one
    /// success.
    async fn mark_as_used(&self, code: &str) -> Result<()>;
    async fn delete(&self, code: &str) -> Result<()>;
    async fn delete_expired(&self) -> Result<()>;
}

#[async_trait]
pub trait AccessTokenRepository: Send + Sync {
    async fn create(&self, token: &AccessToken) -> Result<()>;
    async fn get_by_token_hash(&self, token_hash: &str) -> Result<AccessToken>;
    /// Revocation is monotone; revoking twice is a no-op.
    async fn revoke(&self, token_hash: &str) -> Result<()>;
    async fn delete_expired(&self) -> Result<()>;
}

#[async_trait]
pub trait RefreshTokenRepository: Send + Sync {
    async fn create(&self, token: &RefreshToken) -> Result<()>;
    async fn get_by_token_hash(&self, token_hash: &str) -> Result<RefreshToken>;
    /// Revocation is monotone; revoking twice is a no-op.
    async fn revoke(&self, token_hash: &str) -> Result<()>;
    async fn delete_expired(&self) -> Result<()>;
}

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<()>;
    async fn get(&self, session_id: &str) -> Result<Session>;
    async fn update(&self, session: &Session) -> Result<()>;
    async fn delete(&self, session_id: &str) -> Result<()>;
    async fn delete_by_user_id(&self, user_id: &str) -> Result<()>;
    /// Remove sessions past their absolute expiry. Idle-timeout enforcement
    /// stays in the session service.
    async fn delete_expired(&self) -> Result<()>;
}
