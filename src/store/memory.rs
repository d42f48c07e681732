//! In-memory implementation of the repository contracts.
//!
//! # Purpose
//! Implements every repository trait over `HashMap`s guarded by
//! `tokio::sync::RwLock`. It exists for:
//! - tests and local development (no external dependencies)
//! - documenting, in executable form, the invariants a durable backend must
//!   enforce (uniqueness constraints, soft-delete visibility, monotone
//!   redemption/revocation flags)
//!
//! # Durability and consistency
//! - **Not durable**: all state is lost on process restart.
//! - **Single-process consistency**: mutations take write locks, reads take
//!   read locks; there is no multi-node coordination.
//!
//! # Seeding
//! `MemoryStore::new` pre-populates the four default roles with their stable
//! ids, the same rows the relational migrations seed.
use crate::audit::{AuditRepository, Event, Filter};
use crate::error::{Error, Result};
use crate::model::{
    AccessToken, Assignment, AuthorizationCode, Client, Credentials, Identity, Membership,
    Project, RefreshToken, Role, Scope, Session, Tenant, TenantUserRole, seed_roles,
};
use crate::store::{
    AccessTokenRepository, AssignmentRepository, AuthorizationCodeRepository, ClientRepository,
    IdentityRepository, MembershipRepository, ProjectRepository, RefreshTokenRepository,
    RoleRepository, SessionRepository, TenantRepository, TenantRoleRepository,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

// Raw legacy role row; profile fields are joined in at read time, the way the
// relational backend joins against the identities table.
#[derive(Debug, Clone)]
struct TenantRoleRow {
    id: String,
    tenant_id: String,
    user_id: String,
    role: String,
    granted_at: DateTime<Utc>,
    granted_by: Option<String>,
}

/// In-memory store backing every repository contract.
#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<String, Identity>>,
    credentials: RwLock<HashMap<String, Credentials>>,
    tenants: RwLock<HashMap<String, Tenant>>,
    memberships: RwLock<Vec<Membership>>,
    tenant_roles: RwLock<Vec<TenantRoleRow>>,
    roles: RwLock<HashMap<String, Role>>,
    assignments: RwLock<Vec<Assignment>>,
    projects: RwLock<HashMap<String, Project>>,
    clients: RwLock<HashMap<String, Client>>,
    codes: RwLock<HashMap<String, AuthorizationCode>>,
    access_tokens: RwLock<HashMap<String, AccessToken>>,
    refresh_tokens: RwLock<HashMap<String, RefreshToken>>,
    sessions: RwLock<HashMap<String, Session>>,
    audit_events: RwLock<Vec<Event>>,
}

impl MemoryStore {
    /// Create a store with the default roles seeded.
    pub fn new() -> Self {
        let store = Self::default();
        let now = Utc::now();
        let mut roles = HashMap::new();
        for seed in seed_roles() {
            roles.insert(
                seed.id.to_string(),
                Role {
                    id: seed.id.to_string(),
                    name: seed.name.to_string(),
                    scope: seed.scope,
                    description: seed.description.to_string(),
                    permissions: seed.permissions.iter().map(|p| p.to_string()).collect(),
                    created_at: now,
                    updated_at: now,
                },
            );
        }
        *store.roles.try_write().expect("fresh store is uncontended") = roles;
        store
    }
}

#[async_trait]
impl IdentityRepository for MemoryStore {
    async fn create(&self, user: &Identity) -> Result<()> {
        let mut users = self.users.write().await;
        let duplicate = users
            .values()
            .any(|u| u.deleted_at.is_none() && (u.id == user.id || u.email_hash == user.email_hash));
        if duplicate {
            return Err(Error::UserAlreadyExists);
        }
        users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn add_credentials(&self, credentials: &Credentials) -> Result<()> {
        let mut all = self.credentials.write().await;
        if all.contains_key(&credentials.user_id) {
            return Err(Error::UserAlreadyExists);
        }
        all.insert(credentials.user_id.clone(), credentials.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Identity> {
        self.users
            .read()
            .await
            .get(id)
            .filter(|u| u.deleted_at.is_none())
            .cloned()
            .ok_or(Error::UserNotFound)
    }

    async fn get_by_hash(&self, hash: &str) -> Result<Identity> {
        self.users
            .read()
            .await
            .values()
            .find(|u| u.deleted_at.is_none() && u.email_hash == hash)
            .cloned()
            .ok_or(Error::UserNotFound)
    }

    async fn update(&self, user: &Identity) -> Result<()> {
        let mut users = self.users.write().await;
        match users.get(&user.id) {
            Some(existing) if existing.deleted_at.is_none() => {
                users.insert(user.id.clone(), user.clone());
                Ok(())
            }
            _ => Err(Error::UserNotFound),
        }
    }

    async fn update_lockout(
        &self,
        user_id: &str,
        failed_attempts: u32,
        locked_until: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(user_id)
            .filter(|u| u.deleted_at.is_none())
            .ok_or(Error::UserNotFound)?;
        user.failed_login_attempts = failed_attempts;
        user.locked_until = locked_until;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(id)
            .filter(|u| u.deleted_at.is_none())
            .ok_or(Error::UserNotFound)?;
        user.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn get_credentials(&self, user_id: &str) -> Result<Credentials> {
        self.credentials
            .read()
            .await
            .get(user_id)
            .cloned()
            .ok_or(Error::UserNotFound)
    }

    async fn update_password(&self, user_id: &str, password_hash: &str) -> Result<()> {
        let mut all = self.credentials.write().await;
        let credentials = all.get_mut(user_id).ok_or(Error::UserNotFound)?;
        credentials.password_hash = password_hash.to_string();
        credentials.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl TenantRepository for MemoryStore {
    async fn create(&self, tenant: &Tenant) -> Result<()> {
        let mut tenants = self.tenants.write().await;
        let duplicate = tenants
            .values()
            .any(|t| t.deleted_at.is_none() && (t.id == tenant.id || t.name == tenant.name));
        if duplicate {
            return Err(Error::TenantAlreadyExists);
        }
        tenants.insert(tenant.id.clone(), tenant.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Tenant> {
        self.tenants
            .read()
            .await
            .get(id)
            .filter(|t| t.deleted_at.is_none())
            .cloned()
            .ok_or(Error::TenantNotFound)
    }

    async fn get_by_name(&self, name: &str) -> Result<Tenant> {
        self.tenants
            .read()
            .await
            .values()
            .find(|t| t.deleted_at.is_none() && t.name == name)
            .cloned()
            .ok_or(Error::TenantNotFound)
    }

    async fn update(&self, tenant: &Tenant) -> Result<()> {
        let mut tenants = self.tenants.write().await;
        match tenants.get(&tenant.id) {
            Some(existing) if existing.deleted_at.is_none() => {
                tenants.insert(tenant.id.clone(), tenant.clone());
                Ok(())
            }
            _ => Err(Error::TenantNotFound),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        // Mirrors the relational backend's UPDATE: a missing or already
        // deleted tenant is a no-op, which keeps the deletion cascade
        // re-runnable.
        let mut tenants = self.tenants.write().await;
        if let Some(tenant) = tenants.get_mut(id).filter(|t| t.deleted_at.is_none()) {
            tenant.deleted_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn list(&self, limit: usize, offset: usize) -> Result<Vec<Tenant>> {
        // UUIDv7 ids sort by creation time, so id order is creation order.
        let mut tenants: Vec<Tenant> = self
            .tenants
            .read()
            .await
            .values()
            .filter(|t| t.deleted_at.is_none())
            .cloned()
            .collect();
        tenants.sort_by(|a, b| a.id.cmp(&b.id));
        let limit = if limit == 0 { usize::MAX } else { limit };
        Ok(tenants.into_iter().skip(offset).take(limit).collect())
    }
}

#[async_trait]
impl MembershipRepository for MemoryStore {
    async fn add_member(&self, membership: &Membership) -> Result<()> {
        let mut memberships = self.memberships.write().await;
        let duplicate = memberships
            .iter()
            .any(|m| m.tenant_id == membership.tenant_id && m.user_id == membership.user_id);
        if duplicate {
            return Err(Error::MembershipAlreadyExists);
        }
        memberships.push(membership.clone());
        Ok(())
    }

    async fn remove_member(&self, tenant_id: &str, user_id: &str) -> Result<()> {
        self.memberships
            .write()
            .await
            .retain(|m| !(m.tenant_id == tenant_id && m.user_id == user_id));
        Ok(())
    }

    async fn list_members(&self, tenant_id: &str) -> Result<Vec<Membership>> {
        Ok(self
            .memberships
            .read()
            .await
            .iter()
            .filter(|m| m.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn check_membership(&self, tenant_id: &str, user_id: &str) -> Result<bool> {
        Ok(self
            .memberships
            .read()
            .await
            .iter()
            .any(|m| m.tenant_id == tenant_id && m.user_id == user_id))
    }

    async fn delete_by_tenant_id(&self, tenant_id: &str) -> Result<()> {
        self.memberships
            .write()
            .await
            .retain(|m| m.tenant_id != tenant_id);
        Ok(())
    }
}

impl MemoryStore {
    // Join a legacy role row with identity profile fields, mirroring the SQL
    // join the relational backend performs.
    fn join_tenant_role(row: &TenantRoleRow, users: &HashMap<String, Identity>) -> TenantUserRole {
        let user = users.get(&row.user_id).filter(|u| u.deleted_at.is_none());
        TenantUserRole {
            id: row.id.clone(),
            tenant_id: row.tenant_id.clone(),
            user_id: row.user_id.clone(),
            role: row.role.clone(),
            email_plain: user.and_then(|u| u.email_plain.clone()),
            full_name: user.and_then(|u| u.profile.full_name.clone()),
            nickname: user.and_then(|u| u.profile.nickname.clone()),
            picture: user.and_then(|u| u.profile.picture.clone()),
            granted_at: row.granted_at,
            granted_by: row.granted_by.clone(),
        }
    }
}

#[async_trait]
impl TenantRoleRepository for MemoryStore {
    async fn assign_role(
        &self,
        tenant_id: &str,
        user_id: &str,
        role_name: &str,
        granted_by: &str,
    ) -> Result<()> {
        let mut rows = self.tenant_roles.write().await;
        let exists = rows
            .iter()
            .any(|r| r.tenant_id == tenant_id && r.user_id == user_id && r.role == role_name);
        if exists {
            return Ok(());
        }
        rows.push(TenantRoleRow {
            id: crate::id::new_id(),
            tenant_id: tenant_id.to_string(),
            user_id: user_id.to_string(),
            role: role_name.to_string(),
            granted_at: Utc::now(),
            granted_by: (!granted_by.is_empty()).then(|| granted_by.to_string()),
        });
        Ok(())
    }

    async fn revoke_role(&self, tenant_id: &str, user_id: &str, role_name: &str) -> Result<()> {
        self.tenant_roles
            .write()
            .await
            .retain(|r| !(r.tenant_id == tenant_id && r.user_id == user_id && r.role == role_name));
        Ok(())
    }

    async fn get_user_roles(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<TenantUserRole>> {
        let rows = self.tenant_roles.read().await;
        let users = self.users.read().await;
        Ok(rows
            .iter()
            .filter(|r| r.tenant_id == tenant_id && r.user_id == user_id)
            .map(|r| Self::join_tenant_role(r, &users))
            .collect())
    }

    async fn get_tenant_users(&self, tenant_id: &str) -> Result<Vec<TenantUserRole>> {
        let rows = self.tenant_roles.read().await;
        let users = self.users.read().await;
        Ok(rows
            .iter()
            .filter(|r| r.tenant_id == tenant_id)
            .map(|r| Self::join_tenant_role(r, &users))
            .collect())
    }

    async fn delete_by_tenant_id(&self, tenant_id: &str) -> Result<()> {
        self.tenant_roles
            .write()
            .await
            .retain(|r| r.tenant_id != tenant_id);
        Ok(())
    }
}

#[async_trait]
impl RoleRepository for MemoryStore {
    async fn create(&self, role: &Role) -> Result<()> {
        let mut roles = self.roles.write().await;
        let duplicate = roles
            .values()
            .any(|r| r.id == role.id || (r.name == role.name && r.scope == role.scope));
        if duplicate {
            return Err(Error::RoleAlreadyExists);
        }
        roles.insert(role.id.clone(), role.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Role> {
        self.roles
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or(Error::RoleNotFound)
    }

    async fn get_by_name(&self, name: &str, scope: Scope) -> Result<Role> {
        self.roles
            .read()
            .await
            .values()
            .find(|r| r.name == name && r.scope == scope)
            .cloned()
            .ok_or(Error::RoleNotFound)
    }

    async fn list(&self, scope: Option<Scope>) -> Result<Vec<Role>> {
        let mut roles: Vec<Role> = self
            .roles
            .read()
            .await
            .values()
            .filter(|r| scope.is_none_or(|s| r.scope == s))
            .cloned()
            .collect();
        roles.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(roles)
    }

    async fn update(&self, role: &Role) -> Result<()> {
        let mut roles = self.roles.write().await;
        if !roles.contains_key(&role.id) {
            return Err(Error::RoleNotFound);
        }
        roles.insert(role.id.clone(), role.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.roles
            .write()
            .await
            .remove(id)
            .map(|_| ())
            .ok_or(Error::RoleNotFound)
    }
}

#[async_trait]
impl AssignmentRepository for MemoryStore {
    async fn grant(&self, assignment: &Assignment) -> Result<()> {
        let mut assignments = self.assignments.write().await;
        let duplicate = assignments.iter().any(|a| {
            a.user_id == assignment.user_id
                && a.role_id == assignment.role_id
                && a.scope == assignment.scope
                && a.scope_context_id == assignment.scope_context_id
        });
        if duplicate {
            return Err(Error::AssignmentAlreadyExists);
        }
        assignments.push(assignment.clone());
        Ok(())
    }

    async fn revoke(
        &self,
        user_id: &str,
        role_id: &str,
        scope: Scope,
        scope_context_id: Option<&str>,
    ) -> Result<()> {
        self.assignments.write().await.retain(|a| {
            !(a.user_id == user_id
                && a.role_id == role_id
                && a.scope == scope
                && a.scope_context_id.as_deref() == scope_context_id)
        });
        Ok(())
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Assignment>> {
        Ok(self
            .assignments
            .read()
            .await
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_by_role(
        &self,
        role_id: &str,
        scope: Scope,
        scope_context_id: Option<&str>,
    ) -> Result<Vec<String>> {
        Ok(self
            .assignments
            .read()
            .await
            .iter()
            .filter(|a| {
                a.role_id == role_id
                    && a.scope == scope
                    && a.scope_context_id.as_deref() == scope_context_id
            })
            .map(|a| a.user_id.clone())
            .collect())
    }

    async fn check_exists(
        &self,
        role_id: &str,
        scope: Scope,
        scope_context_id: Option<&str>,
    ) -> Result<bool> {
        Ok(self.assignments.read().await.iter().any(|a| {
            a.role_id == role_id
                && a.scope == scope
                && a.scope_context_id.as_deref() == scope_context_id
        }))
    }

    async fn delete_by_context_id(&self, scope: Scope, context_id: &str) -> Result<()> {
        self.assignments
            .write()
            .await
            .retain(|a| !(a.scope == scope && a.scope_context_id.as_deref() == Some(context_id)));
        Ok(())
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn create(&self, project: &Project) -> Result<()> {
        let mut projects = self.projects.write().await;
        let duplicate = projects
            .values()
            .any(|p| p.deleted_at.is_none() && (p.id == project.id || p.name == project.name));
        if duplicate {
            return Err(Error::ProjectAlreadyExists);
        }
        projects.insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Project> {
        self.projects
            .read()
            .await
            .get(id)
            .filter(|p| p.deleted_at.is_none())
            .cloned()
            .ok_or(Error::ProjectNotFound)
    }

    async fn get_by_name(&self, name: &str) -> Result<Project> {
        self.projects
            .read()
            .await
            .values()
            .find(|p| p.deleted_at.is_none() && p.name == name)
            .cloned()
            .ok_or(Error::ProjectNotFound)
    }

    async fn update(&self, project: &Project) -> Result<()> {
        let mut projects = self.projects.write().await;
        match projects.get(&project.id) {
            Some(existing) if existing.deleted_at.is_none() => {
                projects.insert(project.id.clone(), project.clone());
                Ok(())
            }
            _ => Err(Error::ProjectNotFound),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut projects = self.projects.write().await;
        let project = projects
            .get_mut(id)
            .filter(|p| p.deleted_at.is_none())
            .ok_or(Error::ProjectNotFound)?;
        project.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .projects
            .read()
            .await
            .values()
            .filter(|p| p.deleted_at.is_none() && p.owner_id == owner_id)
            .cloned()
            .collect();
        projects.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(projects)
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Project>> {
        // Access in this backend is ownership; a durable backend may widen
        // this through project grants.
        ProjectRepository::list_by_owner(self, user_id).await
    }
}

#[async_trait]
impl ClientRepository for MemoryStore {
    async fn create(&self, client: &Client) -> Result<()> {
        let mut clients = self.clients.write().await;
        let duplicate = clients
            .values()
            .any(|c| c.deleted_at.is_none() && (c.id == client.id || c.client_id == client.client_id));
        if duplicate {
            return Err(Error::ClientAlreadyExists);
        }
        clients.insert(client.id.clone(), client.clone());
        Ok(())
    }

    async fn get_by_client_id(&self, tenant_id: &str, client_id: &str) -> Result<Client> {
        self.clients
            .read()
            .await
            .values()
            .find(|c| {
                c.deleted_at.is_none() && c.tenant_id == tenant_id && c.client_id == client_id
            })
            .cloned()
            .ok_or(Error::ClientNotFound)
    }

    async fn get_by_id(&self, tenant_id: &str, id: &str) -> Result<Client> {
        self.clients
            .read()
            .await
            .get(id)
            .filter(|c| c.deleted_at.is_none() && c.tenant_id == tenant_id)
            .cloned()
            .ok_or(Error::ClientNotFound)
    }

    async fn update(&self, client: &Client) -> Result<()> {
        let mut clients = self.clients.write().await;
        match clients.get(&client.id) {
            Some(existing) if existing.deleted_at.is_none() => {
                clients.insert(client.id.clone(), client.clone());
                Ok(())
            }
            _ => Err(Error::ClientNotFound),
        }
    }

    async fn delete(&self, tenant_id: &str, id: &str) -> Result<()> {
        let mut clients = self.clients.write().await;
        let client = clients
            .get_mut(id)
            .filter(|c| c.deleted_at.is_none() && c.tenant_id == tenant_id)
            .ok_or(Error::ClientNotFound)?;
        client.deleted_at = Some(Utc::now());
        Ok(())
    }

    async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Client>> {
        Ok(self
            .clients
            .read()
            .await
            .values()
            .filter(|c| c.deleted_at.is_none() && c.owner_id.as_deref() == Some(owner_id))
            .cloned()
            .collect())
    }

    async fn list_by_tenant(&self, tenant_id: &str) -> Result<Vec<Client>> {
        Ok(self
            .clients
            .read()
            .await
            .values()
            .filter(|c| c.deleted_at.is_none() && c.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn delete_by_tenant_id(&self, tenant_id: &str) -> Result<()> {
        let now = Utc::now();
        let mut clients = self.clients.write().await;
        for client in clients.values_mut() {
            if client.tenant_id == tenant_id && client.deleted_at.is_none() {
                client.deleted_at = Some(now);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AuthorizationCodeRepository for MemoryStore {
    async fn create(&self, code: &AuthorizationCode) -> Result<()> {
        let mut codes = self.codes.write().await;
        if codes.contains_key(&code.code) {
            return Err(Error::Storage(anyhow::anyhow!(
                "authorization code already exists"
            )));
        }
        codes.insert(code.code.clone(), code.clone());
        Ok(())
    }

    async fn get_by_code(&self, code: &str) -> Result<AuthorizationCode> {
        self.codes
            .read()
            .await
            .get(code)
            .cloned()
            .ok_or(Error::CodeNotFound)
    }

    async fn mark_as_used(&self, code: &str) -> Result<()> {
        // Check-and-set under the write lock: exactly one concurrent
        // redemption can observe the unused state.
        let mut codes = self.codes.write().await;
        let record = codes.get_mut(code).ok_or(Error::CodeNotFound)?;
        if record.is_used {
            return Err(Error::CodeAlreadyUsed);
        }
        record.is_used = true;
        record.used_at = Some(Utc::now());
        Ok(())
    }

    async fn delete(&self, code: &str) -> Result<()> {
        self.codes.write().await.remove(code);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<()> {
        let now = Utc::now();
        self.codes.write().await.retain(|_, c| !c.is_expired(now));
        Ok(())
    }
}

#[async_trait]
impl AccessTokenRepository for MemoryStore {
    async fn create(&self, token: &AccessToken) -> Result<()> {
        let mut tokens = self.access_tokens.write().await;
        if tokens.contains_key(&token.token_hash) {
            return Err(Error::Storage(anyhow::anyhow!("token hash already exists")));
        }
        tokens.insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> Result<AccessToken> {
        self.access_tokens
            .read()
            .await
            .get(token_hash)
            .cloned()
            .ok_or(Error::TokenNotFound)
    }

    async fn revoke(&self, token_hash: &str) -> Result<()> {
        let mut tokens = self.access_tokens.write().await;
        let token = tokens.get_mut(token_hash).ok_or(Error::TokenNotFound)?;
        if !token.is_revoked {
            token.is_revoked = true;
            token.revoked_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete_expired(&self) -> Result<()> {
        let now = Utc::now();
        self.access_tokens
            .write()
            .await
            .retain(|_, t| !t.is_expired(now));
        Ok(())
    }
}

#[async_trait]
impl RefreshTokenRepository for MemoryStore {
    async fn create(&self, token: &RefreshToken) -> Result<()> {
        let mut tokens = self.refresh_tokens.write().await;
        if tokens.contains_key(&token.token_hash) {
            return Err(Error::Storage(anyhow::anyhow!("token hash already exists")));
        }
        tokens.insert(token.token_hash.clone(), token.clone());
        Ok(())
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> Result<RefreshToken> {
        self.refresh_tokens
            .read()
            .await
            .get(token_hash)
            .cloned()
            .ok_or(Error::TokenNotFound)
    }

    async fn revoke(&self, token_hash: &str) -> Result<()> {
        let mut tokens = self.refresh_tokens.write().await;
        let token = tokens.get_mut(token_hash).ok_or(Error::TokenNotFound)?;
        if !token.is_revoked {
            token.is_revoked = true;
            token.revoked_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn delete_expired(&self) -> Result<()> {
        let now = Utc::now();
        self.refresh_tokens
            .write()
            .await
            .retain(|_, t| !t.is_expired(now));
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for MemoryStore {
    async fn create(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(Error::Storage(anyhow::anyhow!("session id already exists")));
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, session_id: &str) -> Result<Session> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or(Error::SessionNotFound)
    }

    async fn update(&self, session: &Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if !sessions.contains_key(&session.id) {
            return Err(Error::SessionNotFound);
        }
        sessions.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn delete_by_user_id(&self, user_id: &str) -> Result<()> {
        self.sessions
            .write()
            .await
            .retain(|_, s| s.user_id != user_id);
        Ok(())
    }

    async fn delete_expired(&self) -> Result<()> {
        let now = Utc::now();
        self.sessions.write().await.retain(|_, s| !s.is_expired(now));
        Ok(())
    }
}

#[async_trait]
impl AuditRepository for MemoryStore {
    async fn log(&self, event: Event) -> Result<()> {
        self.audit_events.write().await.push(event);
        Ok(())
    }

    async fn list(&self, filter: &Filter) -> Result<(Vec<Event>, usize)> {
        let events = self.audit_events.read().await;
        let users = self.users.read().await;

        let mut matches: Vec<Event> = events
            .iter()
            .filter(|e| {
                filter
                    .tenant_id
                    .as_ref()
                    .is_none_or(|t| e.tenant_id.as_ref() == Some(t))
                    && filter
                        .actor_id
                        .as_ref()
                        .is_none_or(|a| e.actor_id.as_ref() == Some(a))
                    && filter.event_type.is_none_or(|t| e.event_type == t)
                    && filter.start_date.is_none_or(|start| e.timestamp >= start)
                    && filter.end_date.is_none_or(|end| e.timestamp <= end)
            })
            .cloned()
            .collect();

        let total = matches.len();
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));

        let mut page: Vec<Event> = matches
            .into_iter()
            .skip(filter.offset)
            .take(if filter.limit == 0 {
                usize::MAX
            } else {
                filter.limit
            })
            .collect();

        // Resolve actor names: full name, then plain email, then the raw id.
        for event in &mut page {
            if let Some(actor_id) = &event.actor_id {
                event.actor_name = users
                    .get(actor_id)
                    .and_then(|u| u.profile.full_name.clone().or_else(|| u.email_plain.clone()))
                    .unwrap_or_else(|| actor_id.clone());
            }
        }

        Ok((page, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::EventType;
    use crate::id::new_id;
    use crate::model::Profile;
    use chrono::Duration;

    fn identity(email_hash: &str) -> Identity {
        let now = Utc::now();
        Identity {
            id: new_id(),
            email_hash: email_hash.to_string(),
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

    fn assignment(user_id: &str, context: Option<&str>) -> Assignment {
        Assignment {
            id: new_id(),
            user_id: user_id.to_string(),
            role_id: crate::model::role::ROLE_ID_TENANT_OWNER.to_string(),
            scope: Scope::Tenant,
            scope_context_id: context.map(|c| c.to_string()),
            granted_at: Utc::now(),
            granted_by: None,
        }
    }

    #[tokio::test]
    async fn duplicate_email_hash_is_rejected() {
        let store = MemoryStore::new();
        let first = identity("hash-1");
        IdentityRepository::create(&store, &first).await.expect("create");
        let second = identity("hash-1");
        assert!(matches!(
            IdentityRepository::create(&store, &second).await,
            Err(Error::UserAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn soft_deleted_identities_are_invisible() {
        let store = MemoryStore::new();
        let user = identity("hash-2");
        IdentityRepository::create(&store, &user).await.expect("create");
        IdentityRepository::delete(&store, &user.id).await.expect("delete");
        assert!(matches!(
            IdentityRepository::get_by_id(&store, &user.id).await,
            Err(Error::UserNotFound)
        ));
        assert!(matches!(
            IdentityRepository::get_by_hash(&store, "hash-2").await,
            Err(Error::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn seeded_roles_are_present() {
        let store = MemoryStore::new();
        let role = RoleRepository::get_by_id(&store, crate::model::role::ROLE_ID_PLATFORM_ADMIN)
            .await
            .expect("seeded role");
        assert_eq!(role.name, "platform_admin");
        assert!(role.has_permission("anything"));
        let tenant_roles = RoleRepository::list(&store, Some(Scope::Tenant))
            .await
            .expect("list");
        assert_eq!(tenant_roles.len(), 3);
    }

    #[tokio::test]
    async fn assignment_tuple_is_unique() {
        let store = MemoryStore::new();
        let a = assignment("u-1", Some("t-1"));
        AssignmentRepository::grant(&store, &a).await.expect("grant");
        let duplicate = assignment("u-1", Some("t-1"));
        assert!(matches!(
            AssignmentRepository::grant(&store, &duplicate).await,
            Err(Error::AssignmentAlreadyExists)
        ));
        // A different context is a different assignment.
        let other = assignment("u-1", Some("t-2"));
        AssignmentRepository::grant(&store, &other).await.expect("grant");
        assert_eq!(
            AssignmentRepository::list_for_user(&store, "u-1")
                .await
                .expect("list")
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn delete_by_context_removes_only_that_context() {
        let store = MemoryStore::new();
        AssignmentRepository::grant(&store, &assignment("u-1", Some("t-1")))
            .await
            .expect("grant");
        AssignmentRepository::grant(&store, &assignment("u-2", Some("t-1")))
            .await
            .expect("grant");
        AssignmentRepository::grant(&store, &assignment("u-1", Some("t-2")))
            .await
            .expect("grant");
        AssignmentRepository::delete_by_context_id(&store, Scope::Tenant, "t-1")
            .await
            .expect("delete");
        let remaining = AssignmentRepository::list_for_user(&store, "u-1")
            .await
            .expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].scope_context_id.as_deref(), Some("t-2"));
    }

    #[tokio::test]
    async fn membership_pair_is_unique() {
        let store = MemoryStore::new();
        let membership = Membership {
            id: new_id(),
            tenant_id: "t-1".into(),
            user_id: "u-1".into(),
            created_at: Utc::now(),
        };
        MembershipRepository::add_member(&store, &membership)
            .await
            .expect("add");
        let again = Membership {
            id: new_id(),
            ..membership.clone()
        };
        assert!(matches!(
            MembershipRepository::add_member(&store, &again).await,
            Err(Error::MembershipAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn tenant_name_unique_until_soft_deleted() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let tenant = Tenant {
            id: new_id(),
            name: "Acme".into(),
            status: crate::model::TenantStatus::Active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        TenantRepository::create(&store, &tenant).await.expect("create");

        let clash = Tenant {
            id: new_id(),
            ..tenant.clone()
        };
        assert!(matches!(
            TenantRepository::create(&store, &clash).await,
            Err(Error::TenantAlreadyExists)
        ));

        // After soft deletion the name becomes reusable.
        TenantRepository::delete(&store, &tenant.id).await.expect("delete");
        TenantRepository::create(&store, &clash).await.expect("recreate");
    }

    #[tokio::test]
    async fn authorization_code_single_use() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let code = AuthorizationCode {
            id: new_id(),
            code: "code-1".into(),
            client_id: "c-1".into(),
            user_id: "u-1".into(),
            redirect_uri: String::new(),
            scope: "openid".into(),
            state: String::new(),
            nonce: String::new(),
            code_challenge: String::new(),
            code_challenge_method: String::new(),
            expires_at: now + Duration::minutes(10),
            used_at: None,
            is_used: false,
            created_at: now,
        };
        AuthorizationCodeRepository::create(&store, &code)
            .await
            .expect("create");
        AuthorizationCodeRepository::mark_as_used(&store, "code-1")
            .await
            .expect("first redemption");
        assert!(matches!(
            AuthorizationCodeRepository::mark_as_used(&store, "code-1").await,
            Err(Error::CodeAlreadyUsed)
        ));
        let stored = AuthorizationCodeRepository::get_by_code(&store, "code-1")
            .await
            .expect("get");
        assert!(stored.is_used);
        assert!(stored.used_at.is_some());
    }

    #[tokio::test]
    async fn token_revocation_is_monotone() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let token = AccessToken {
            id: new_id(),
            tenant_id: "t-1".into(),
            token_hash: "th-1".into(),
            client_id: "c-1".into(),
            user_id: "u-1".into(),
            scope: "openid".into(),
            token_type: "Bearer".into(),
            expires_at: now + Duration::hours(1),
            revoked_at: None,
            is_revoked: false,
            created_at: now,
        };
        AccessTokenRepository::create(&store, &token).await.expect("create");
        AccessTokenRepository::revoke(&store, "th-1").await.expect("revoke");
        let first = AccessTokenRepository::get_by_token_hash(&store, "th-1")
            .await
            .expect("get");
        // Revoking again keeps the original revocation timestamp.
        AccessTokenRepository::revoke(&store, "th-1").await.expect("revoke");
        let second = AccessTokenRepository::get_by_token_hash(&store, "th-1")
            .await
            .expect("get");
        assert_eq!(first.revoked_at, second.revoked_at);
        assert!(second.is_revoked);
    }

    #[tokio::test]
    async fn session_delete_expired_prunes_only_expired() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let live = Session {
            id: "live".into(),
            tenant_id: None,
            user_id: "u-1".into(),
            ip_address: String::new(),
            user_agent: String::new(),
            expires_at: now + Duration::hours(1),
            created_at: now,
            last_seen_at: now,
            namespace: "auth".into(),
        };
        let dead = Session {
            id: "dead".into(),
            expires_at: now - Duration::seconds(1),
            ..live.clone()
        };
        SessionRepository::create(&store, &live).await.expect("create");
        SessionRepository::create(&store, &dead).await.expect("create");
        SessionRepository::delete_expired(&store).await.expect("cleanup");
        assert!(SessionRepository::get(&store, "live").await.is_ok());
        assert!(matches!(
            SessionRepository::get(&store, "dead").await,
            Err(Error::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn audit_list_filters_and_counts() {
        let store = MemoryStore::new();
        for i in 0..5 {
            let mut event = Event::new(EventType::LoginFailed);
            event.tenant_id = Some(if i % 2 == 0 { "t-1" } else { "t-2" }.to_string());
            AuditRepository::log(&store, event).await.expect("log");
        }
        let mut event = Event::new(EventType::TenantCreated);
        event.tenant_id = Some("t-1".to_string());
        AuditRepository::log(&store, event).await.expect("log");

        let (events, total) = AuditRepository::list(
            &store,
            &Filter {
                tenant_id: Some("t-1".to_string()),
                ..Filter::default()
            },
        )
        .await
        .expect("list");
        assert_eq!(total, 4);
        assert_eq!(events.len(), 4);

        let (events, total) = AuditRepository::list(
            &store,
            &Filter {
                tenant_id: Some("t-1".to_string()),
                event_type: Some(EventType::TenantCreated),
                ..Filter::default()
            },
        )
        .await
        .expect("list");
        assert_eq!(total, 1);
        assert_eq!(events[0].event_type, EventType::TenantCreated);

        // Pagination: total counts all matches, the page is bounded.
        let (page, total) = AuditRepository::list(
            &store,
            &Filter {
                limit: 2,
                offset: 1,
                ..Filter::default()
            },
        )
        .await
        .expect("list");
        assert_eq!(total, 6);
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn audit_actor_name_coalesces_profile_fields() {
        let store = MemoryStore::new();
        let mut named = identity("hash-named");
        named.profile.full_name = Some("Ada Lovelace".to_string());
        named.email_plain = Some("ada@example.com".to_string());
        IdentityRepository::create(&store, &named).await.expect("create");

        let mut email_only = identity("hash-email");
        email_only.email_plain = Some("grace@example.com".to_string());
        IdentityRepository::create(&store, &email_only).await.expect("create");

        for actor in [&named.id, &email_only.id, &"ghost-actor".to_string()] {
            let mut event = Event::new(EventType::LoginSuccess);
            event.actor_id = Some(actor.clone());
            AuditRepository::log(&store, event).await.expect("log");
        }

        let (events, _) = AuditRepository::list(&store, &Filter::default())
            .await
            .expect("list");
        let name_for = |actor: &str| {
            events
                .iter()
                .find(|e| e.actor_id.as_deref() == Some(actor))
                .map(|e| e.actor_name.clone())
                .expect("event")
        };
        assert_eq!(name_for(&named.id), "Ada Lovelace");
        assert_eq!(name_for(&email_only.id), "grace@example.com");
        assert_eq!(name_for("ghost-actor"), "ghost-actor");
    }
}
