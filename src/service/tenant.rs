//! Tenant orchestrator: lifecycle, role assignment, cascaded deletion.
//!
//! # Purpose
//! Tenant CRUD with owner provisioning, the legacy/generic role dual-write,
//! and the ordered soft-deletion cascade.
//!
//! # Key invariants
//! - Tenant names are unique among non-deleted tenants.
//! - An owner cannot revoke their own `tenant_owner` role; every non-deleted
//!   tenant keeps exactly one reachable owner.
//! - Deletion records intent first (status flips to `inactive`), then runs
//!   the cascade in a fixed order. Every step is idempotent, so a partially
//!   failed deletion converges when re-run.
use crate::audit::{AuditLogger, Event, EventType, RESOURCE_TENANT, RESOURCE_USER};
use crate::error::{Error, Result};
use crate::id;
use crate::model::role::{
    ROLE_TENANT_ADMIN, ROLE_TENANT_MEMBER, ROLE_TENANT_OWNER, seeded_role_id,
};
use crate::model::{
    Assignment, Membership, Profile, Scope, Tenant, TenantStatus, TenantUserRole,
};
use crate::service::IdentityService;
use crate::store::{
    AssignmentRepository, ClientRepository, MembershipRepository, TenantRepository,
    TenantRoleRepository,
};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

const MIN_TENANT_NAME_LEN: usize = 3;
const MAX_TENANT_NAME_LEN: usize = 100;

pub struct TenantService {
    repo: Arc<dyn TenantRepository>,
    tenant_role_repo: Arc<dyn TenantRoleRepository>,
    assignment_repo: Arc<dyn AssignmentRepository>,
    identity_service: Arc<IdentityService>,
    client_repo: Arc<dyn ClientRepository>,
    membership_repo: Arc<dyn MembershipRepository>,
    audit_logger: Arc<dyn AuditLogger>,
}

impl TenantService {
    pub fn new(
        repo: Arc<dyn TenantRepository>,
        tenant_role_repo: Arc<dyn TenantRoleRepository>,
        assignment_repo: Arc<dyn AssignmentRepository>,
        identity_service: Arc<IdentityService>,
        client_repo: Arc<dyn ClientRepository>,
        membership_repo: Arc<dyn MembershipRepository>,
        audit_logger: Arc<dyn AuditLogger>,
    ) -> Self {
        Self {
            repo,
            tenant_role_repo,
            assignment_repo,
            identity_service,
            client_repo,
            membership_repo,
            audit_logger,
        }
    }

    /// Create a tenant and, when an owner email is given, provision its
    /// initial `tenant_owner`.
    pub async fn create_tenant(
        &self,
        name: &str,
        owner_email: Option<&str>,
        owner_password: Option<&str>,
        creator_user_id: &str,
    ) -> Result<Tenant> {
        let name = name.trim();
        if name.len() < MIN_TENANT_NAME_LEN || name.len() > MAX_TENANT_NAME_LEN {
            return Err(Error::invalid_input("invalid tenant name"));
        }

        match self.repo.get_by_name(name).await {
            Ok(_) => return Err(Error::TenantAlreadyExists),
            Err(Error::TenantNotFound) => {}
            Err(err) => return Err(err),
        }

        let owner = match owner_email {
            Some(email) => {
                let owner = match self.identity_service.get_by_email(email).await {
                    Ok(existing) => existing,
                    Err(Error::UserNotFound) => {
                        self.identity_service
                            .provision(
                                email,
                                Profile {
                                    given_name: Some("Tenant".to_string()),
                                    family_name: Some("Owner".to_string()),
                                    ..Profile::default()
                                },
                            )
                            .await?
                    }
                    Err(err) => return Err(err),
                };
                // Bootstrap flow always applies a provided password, for new
                // and pre-existing identities alike.
                if let Some(password) = owner_password {
                    self.identity_service.set_password(&owner.id, password).await?;
                }
                Some(owner)
            }
            None => None,
        };

        let now = Utc::now();
        let tenant = Tenant {
            id: id::new_id(),
            name: name.to_string(),
            status: TenantStatus::Active,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.repo.create(&tenant).await?;

        if let Some(owner) = &owner {
            self.assign_role(&tenant.id, &owner.id, ROLE_TENANT_OWNER, creator_user_id)
                .await?;
        }

        let mut event = Event::new(EventType::TenantCreated);
        event.actor_id = Some(creator_user_id.to_string());
        event.resource = RESOURCE_TENANT.to_string();
        event.target_name = tenant.name.clone();
        event.target_id = tenant.id.clone();
        event.metadata.insert("tenant_id".into(), json!(tenant.id));
        event
            .metadata
            .insert("tenant_name".into(), json!(tenant.name));
        if let Some(owner) = &owner {
            event.metadata.insert("owner_id".into(), json!(owner.id));
        }
        self.audit_logger.log(event).await;

        Ok(tenant)
    }

    pub async fn get_tenant(&self, tenant_id: &str) -> Result<Tenant> {
        self.repo.get_by_id(tenant_id).await
    }

    pub async fn get_tenant_by_name(&self, name: &str) -> Result<Tenant> {
        self.repo.get_by_name(name).await
    }

    pub async fn list_tenants(&self, limit: usize, offset: usize) -> Result<Vec<Tenant>> {
        self.repo.list(limit, offset).await
    }

    /// Rename a tenant. Status transitions go through dedicated operations.
    pub async fn update_tenant(
        &self,
        tenant_id: &str,
        name: Option<&str>,
        actor_id: &str,
    ) -> Result<Tenant> {
        let mut tenant = self.repo.get_by_id(tenant_id).await?;

        let old_name = tenant.name.clone();
        if let Some(name) = name {
            let name = name.trim();
            if name.len() < MIN_TENANT_NAME_LEN || name.len() > MAX_TENANT_NAME_LEN {
                return Err(Error::invalid_input("invalid tenant name"));
            }
            tenant.name = name.to_string();
        }
        tenant.updated_at = Utc::now();
        self.repo.update(&tenant).await?;

        let mut event = Event::new(EventType::TenantUpdated);
        event.actor_id = Some(actor_id.to_string());
        event.resource = RESOURCE_TENANT.to_string();
        event.target_name = tenant.name.clone();
        event.target_id = tenant.id.clone();
        event.metadata.insert("tenant_id".into(), json!(tenant.id));
        event
            .metadata
            .insert("tenant_name".into(), json!(tenant.name));
        if old_name != tenant.name {
            event.metadata.insert(
                "changes".into(),
                json!({ "name_from": old_name, "name_to": tenant.name }),
            );
        }
        self.audit_logger.log(event).await;

        Ok(tenant)
    }

    /// Delete a tenant and cascade over everything it owns.
    ///
    /// Order is fixed: memberships, clients, legacy tenant roles, generic
    /// assignments, the tenant row, audit. A failing step aborts the rest;
    /// the inactive status written up front marks the deletion as pending so
    /// a re-run can finish the job.
    pub async fn delete_tenant(&self, tenant_id: &str, actor_id: &str) -> Result<()> {
        let tenant = self.repo.get_by_id(tenant_id).await.ok();
        let tenant_name = tenant
            .as_ref()
            .map(|t| t.name.clone())
            .unwrap_or_else(|| "Unknown".to_string());

        if let Some(mut tenant) = tenant {
            if tenant.status != TenantStatus::Inactive {
                tenant.status = TenantStatus::Inactive;
                tenant.updated_at = Utc::now();
                self.repo.update(&tenant).await?;
            }
        }

        self.membership_repo.delete_by_tenant_id(tenant_id).await?;
        self.client_repo.delete_by_tenant_id(tenant_id).await?;
        self.tenant_role_repo.delete_by_tenant_id(tenant_id).await?;
        self.assignment_repo
            .delete_by_context_id(Scope::Tenant, tenant_id)
            .await?;
        self.repo.delete(tenant_id).await?;

        let mut event = Event::new(EventType::TenantDeleted);
        event.actor_id = Some(actor_id.to_string());
        event.resource = RESOURCE_TENANT.to_string();
        event.target_name = tenant_name.clone();
        event.target_id = tenant_id.to_string();
        event.metadata.insert("tenant_id".into(), json!(tenant_id));
        event
            .metadata
            .insert("tenant_name".into(), json!(tenant_name));
        self.audit_logger.log(event).await;

        Ok(())
    }

    /// Grant one of the well-known tenant roles to a user.
    ///
    /// Dual write: the legacy per-tenant mapping and the generic assignment
    /// store (under the seeded role id) are both updated; duplicate grants
    /// and memberships are ignored so the operation is idempotent.
    pub async fn assign_role(
        &self,
        tenant_id: &str,
        user_id: &str,
        role_name: &str,
        granted_by: &str,
    ) -> Result<()> {
        if !matches!(
            role_name,
            ROLE_TENANT_OWNER | ROLE_TENANT_ADMIN | ROLE_TENANT_MEMBER
        ) {
            return Err(Error::invalid_input(format!("invalid role: {role_name}")));
        }

        self.tenant_role_repo
            .assign_role(tenant_id, user_id, role_name, granted_by)
            .await?;

        let membership = Membership {
            id: id::new_id(),
            tenant_id: tenant_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        };
        match self.membership_repo.add_member(&membership).await {
            Ok(()) | Err(Error::MembershipAlreadyExists) => {}
            Err(err) => return Err(err),
        }

        if let Some(role_id) = seeded_role_id(role_name) {
            let assignment = Assignment {
                id: id::new_id(),
                user_id: user_id.to_string(),
                role_id: role_id.to_string(),
                scope: Scope::Tenant,
                scope_context_id: Some(tenant_id.to_string()),
                granted_at: Utc::now(),
                granted_by: (!granted_by.is_empty()).then(|| granted_by.to_string()),
            };
            match self.assignment_repo.grant(&assignment).await {
                Ok(()) | Err(Error::AssignmentAlreadyExists) => {}
                Err(err) => return Err(err),
            }
        }

        let target_name = self.resolve_target_name(user_id).await;
        let mut event = Event::new(EventType::RoleAssigned);
        event.tenant_id = Some(tenant_id.to_string());
        event.actor_id = Some(granted_by.to_string());
        event.resource = role_name.to_string();
        event.target_name = target_name;
        event.target_id = user_id.to_string();
        event.metadata.insert("user_id".into(), json!(user_id));
        event.metadata.insert("role".into(), json!(role_name));
        self.audit_logger.log(event).await;

        Ok(())
    }

    /// Revoke one of the well-known tenant roles from a user.
    pub async fn revoke_role(
        &self,
        tenant_id: &str,
        user_id: &str,
        role_name: &str,
        actor_id: &str,
    ) -> Result<()> {
        // Owners cannot strip their own ownership; that would orphan the
        // tenant.
        if user_id == actor_id && role_name == ROLE_TENANT_OWNER {
            return Err(Error::SecurityViolation(
                "tenant owners cannot revoke their own owner role".to_string(),
            ));
        }

        self.tenant_role_repo
            .revoke_role(tenant_id, user_id, role_name)
            .await?;

        let target_name = self.resolve_target_name(user_id).await;
        let mut event = Event::new(EventType::RoleRevoked);
        event.tenant_id = Some(tenant_id.to_string());
        event.actor_id = Some(actor_id.to_string());
        event.resource = role_name.to_string();
        event.target_name = target_name;
        event.target_id = user_id.to_string();
        event.metadata.insert("user_id".into(), json!(user_id));
        event.metadata.insert("role".into(), json!(role_name));
        self.audit_logger.log(event).await;

        Ok(())
    }

    pub async fn get_user_roles(
        &self,
        tenant_id: &str,
        user_id: &str,
    ) -> Result<Vec<TenantUserRole>> {
        self.tenant_role_repo.get_user_roles(tenant_id, user_id).await
    }

    pub async fn get_tenant_users(&self, tenant_id: &str) -> Result<Vec<TenantUserRole>> {
        self.tenant_role_repo.get_tenant_users(tenant_id).await
    }

    /// Update a member's profile through the identity service, with a
    /// tenant-scoped audit record.
    pub async fn update_user(
        &self,
        tenant_id: &str,
        user_id: &str,
        profile: Profile,
        actor_id: &str,
    ) -> Result<()> {
        let nickname = profile.nickname.clone();
        self.identity_service.update_profile(user_id, profile).await?;

        let target_name = self.resolve_target_name(user_id).await;
        let mut event = Event::new(EventType::UserUpdated);
        event.tenant_id = Some(tenant_id.to_string());
        event.actor_id = Some(actor_id.to_string());
        event.resource = RESOURCE_USER.to_string();
        event.target_name = target_name;
        event.target_id = user_id.to_string();
        event.metadata.insert("user_id".into(), json!(user_id));
        if let Some(nickname) = nickname {
            event.metadata.insert("nickname".into(), json!(nickname));
        }
        self.audit_logger.log(event).await;

        Ok(())
    }

    // Best-effort display name for audit targets: "nickname (email)" when
    // both are known, falling back to the raw user id.
    async fn resolve_target_name(&self, user_id: &str) -> String {
        match self.identity_service.get(user_id).await {
            Ok(user) => {
                let base = user
                    .email_plain
                    .clone()
                    .unwrap_or_else(|| user_id.to_string());
                match &user.profile.nickname {
                    Some(nickname) => format!("{nickname} ({base})"),
                    None => base,
                }
            }
            Err(_) => user_id.to_string(),
        }
    }
}
