//! One-time platform administrator bootstrap.
//!
//! # Purpose
//! Seeds the very first platform administrator: provisions (or reuses) an
//! identity, sets its password, and grants the seeded `platform_admin` role
//! at platform scope. Refuses to run once any platform-admin assignment
//! exists, so the flow cannot be replayed to mint extra admins.
use crate::audit::{AuditLogger, Event, EventType, RESOURCE_PLATFORM};
use crate::error::{Error, Result};
use crate::id;
use crate::model::role::ROLE_ID_PLATFORM_ADMIN;
use crate::model::{Assignment, Identity, Profile, Scope};
use crate::service::IdentityService;
use crate::store::AssignmentRepository;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

pub struct BootstrapService {
    identity_service: Arc<IdentityService>,
    assignment_repo: Arc<dyn AssignmentRepository>,
    audit_logger: Arc<dyn AuditLogger>,
}

impl BootstrapService {
    pub fn new(
        identity_service: Arc<IdentityService>,
        assignment_repo: Arc<dyn AssignmentRepository>,
        audit_logger: Arc<dyn AuditLogger>,
    ) -> Self {
        Self {
            identity_service,
            assignment_repo,
            audit_logger,
        }
    }

    /// Create the first platform administrator.
    pub async fn bootstrap_platform_admin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Identity> {
        let existing = self
            .assignment_repo
            .list_by_role(ROLE_ID_PLATFORM_ADMIN, Scope::Platform, None)
            .await?;
        if !existing.is_empty() {
            return Err(Error::AssignmentAlreadyExists);
        }

        let admin = match self.identity_service.get_by_email(email).await {
            Ok(existing) => existing,
            Err(Error::UserNotFound) => {
                self.identity_service
                    .provision(
                        email,
                        Profile {
                            given_name: Some("Platform".to_string()),
                            family_name: Some("Administrator".to_string()),
                            ..Profile::default()
                        },
                    )
                    .await?
            }
            Err(err) => return Err(err),
        };
        self.identity_service.set_password(&admin.id, password).await?;

        self.assignment_repo
            .grant(&Assignment {
                id: id::new_id(),
                user_id: admin.id.clone(),
                role_id: ROLE_ID_PLATFORM_ADMIN.to_string(),
                scope: Scope::Platform,
                scope_context_id: None,
                granted_at: Utc::now(),
                granted_by: None,
            })
            .await?;

        let mut event = Event::new(EventType::PlatformAdminBootstrap);
        event.resource = RESOURCE_PLATFORM.to_string();
        event.target_id = admin.id.clone();
        event.metadata.insert("user_id".into(), json!(admin.id));
        self.audit_logger.log(event).await;

        Ok(admin)
    }
}
