//! Authorization service: scoped permission resolution.
//!
//! # Purpose
//! Resolves whether a user holds a permission at a required scope and
//! context, and aggregates role/project claims for the user-info surface.
//!
//! # Key invariants
//! - A platform-scoped assignment matches any required scope (platform
//!   administrators have global authority).
//! - Tenant and client assignments match only on an exact (scope, context)
//!   pair; a null context outside platform scope is malformed and never
//!   matches.
//! - A dangling role id on an assignment is skipped, not an error.
use crate::error::Result;
use crate::model::{Project, Scope};
use crate::store::{AssignmentRepository, ProjectRepository, RoleRepository};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Flattened view of one of a user's role assignments.
#[derive(Debug, Clone, Serialize)]
pub struct UserRoleAssignment {
    pub role_id: String,
    pub role_name: String,
    pub scope: Scope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// Simplified project information for external systems.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectInfo {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

/// Claim set for the user-info surface.
#[derive(Debug, Clone, Serialize)]
pub struct UserInfoClaims {
    pub roles: Vec<String>,
    pub projects: Vec<ProjectInfo>,
}

pub struct AuthzService {
    project_repo: Arc<dyn ProjectRepository>,
    role_repo: Arc<dyn RoleRepository>,
    assignment_repo: Arc<dyn AssignmentRepository>,
}

impl AuthzService {
    pub fn new(
        project_repo: Arc<dyn ProjectRepository>,
        role_repo: Arc<dyn RoleRepository>,
        assignment_repo: Arc<dyn AssignmentRepository>,
    ) -> Self {
        Self {
            project_repo,
            role_repo,
            assignment_repo,
        }
    }

    /// Check whether `user_id` holds `permission` at the required scope and
    /// context.
    pub async fn has_permission(
        &self,
        user_id: &str,
        scope: Scope,
        scope_context_id: Option<&str>,
        permission: &str,
    ) -> Result<bool> {
        let assignments = self.assignment_repo.list_for_user(user_id).await?;

        for assignment in &assignments {
            let matches_scope = if assignment.scope == Scope::Platform {
                // Platform administrators have global authority across all scopes.
                true
            } else if assignment.scope == scope {
                // Context-specific scopes require both context ids, equal.
                matches!(
                    (assignment.scope_context_id.as_deref(), scope_context_id),
                    (Some(held), Some(required)) if held == required
                )
            } else {
                false
            };

            if !matches_scope {
                continue;
            }

            let role = match self.role_repo.get_by_id(&assignment.role_id).await {
                Ok(role) => role,
                Err(err) => {
                    tracing::warn!(
                        role_id = %assignment.role_id,
                        error = ?err,
                        "has_permission: assignment references missing role"
                    );
                    continue;
                }
            };

            if role.has_permission(permission) {
                return Ok(true);
            }
        }

        tracing::warn!(
            user_id = %user_id,
            scope = %scope,
            scope_context_id = scope_context_id.unwrap_or(""),
            permission = %permission,
            assignment_count = assignments.len(),
            "has_permission: denied"
        );
        Ok(false)
    }

    /// Check whether the user holds `permission` in any of their assigned
    /// scopes, ignoring context.
    pub async fn has_permission_any(&self, user_id: &str, permission: &str) -> Result<bool> {
        let assignments = self.assignment_repo.list_for_user(user_id).await?;
        for assignment in &assignments {
            let Ok(role) = self.role_repo.get_by_id(&assignment.role_id).await else {
                continue;
            };
            if role.has_permission(permission) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// All unique role names a user holds across scopes.
    pub async fn get_user_roles(&self, user_id: &str) -> Result<Vec<String>> {
        let assignments = self.assignment_repo.list_for_user(user_id).await?;
        let mut names = HashSet::new();
        for assignment in &assignments {
            if let Ok(role) = self.role_repo.get_by_id(&assignment.role_id).await {
                names.insert(role.name);
            }
        }
        let mut roles: Vec<String> = names.into_iter().collect();
        roles.sort();
        Ok(roles)
    }

    /// All of a user's assignments with role names resolved. A dangling role
    /// id surfaces as `"unknown"` rather than failing the listing.
    pub async fn get_user_role_assignments(
        &self,
        user_id: &str,
    ) -> Result<Vec<UserRoleAssignment>> {
        let assignments = self.assignment_repo.list_for_user(user_id).await?;
        let mut result = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            let role_name = match self.role_repo.get_by_id(&assignment.role_id).await {
                Ok(role) => role.name,
                Err(_) => "unknown".to_string(),
            };
            result.push(UserRoleAssignment {
                role_id: assignment.role_id,
                role_name,
                scope: assignment.scope,
                context: assignment.scope_context_id,
            });
        }
        Ok(result)
    }

    /// Projects the user has access to.
    pub async fn get_user_projects(&self, user_id: &str) -> Result<Vec<Project>> {
        self.project_repo.list_by_user(user_id).await
    }

    /// Build the `{roles, projects}` claim set for the user-info surface.
    pub async fn build_user_info_claims(&self, user_id: &str) -> Result<UserInfoClaims> {
        let roles = self.get_user_roles(user_id).await?;
        let projects = self.get_user_projects(user_id).await?;
        let projects = projects
            .into_iter()
            .map(|p| ProjectInfo {
                id: p.id,
                name: p.name,
                description: p.description,
            })
            .collect();
        Ok(UserInfoClaims { roles, projects })
    }
}
