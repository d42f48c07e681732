mod common;

use common::kernel;
use std::sync::Arc;
use warden_core::id::new_id;
use warden_core::model::{Assignment, Role, Scope};
use warden_core::store::memory::MemoryStore;
use warden_core::store::{AssignmentRepository, RoleRepository};

async fn create_role(
    store: &Arc<MemoryStore>,
    name: &str,
    scope: Scope,
    permissions: &[&str],
) -> Role {
    let now = chrono::Utc::now();
    let role = Role {
        id: new_id(),
        name: name.to_string(),
        scope,
        description: String::new(),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        created_at: now,
        updated_at: now,
    };
    RoleRepository::create(store.as_ref(), &role)
        .await
        .expect("create role");
    role
}

async fn grant(
    store: &Arc<MemoryStore>,
    user_id: &str,
    role: &Role,
    scope: Scope,
    context: Option<&str>,
) {
    AssignmentRepository::grant(
        store.as_ref(),
        &Assignment {
            id: new_id(),
            user_id: user_id.to_string(),
            role_id: role.id.clone(),
            scope,
            scope_context_id: context.map(|c| c.to_string()),
            granted_at: chrono::Utc::now(),
            granted_by: None,
        },
    )
    .await
    .expect("grant");
}

// A wildcard platform role matches every permission at every scope.
#[tokio::test]
async fn platform_admin_override() {
    let k = kernel();
    let admin = create_role(&k.store, "admin", Scope::Platform, &["*"]).await;
    grant(&k.store, "ua", &admin, Scope::Platform, None).await;

    assert!(
        k.authz
            .has_permission("ua", Scope::Tenant, Some("t1"), "tenant:manage_users")
            .await
            .expect("check")
    );
    assert!(
        k.authz
            .has_permission("ua", Scope::Platform, None, "arbitrary:action")
            .await
            .expect("check")
    );
}

// A tenant-scoped role is confined to its context and its permission list.
#[tokio::test]
async fn tenant_editor_is_scoped() {
    let k = kernel();
    let editor = create_role(&k.store, "editor", Scope::Tenant, &["edit:stuff"]).await;
    grant(&k.store, "ub", &editor, Scope::Tenant, Some("t1")).await;

    assert!(
        k.authz
            .has_permission("ub", Scope::Tenant, Some("t1"), "edit:stuff")
            .await
            .expect("check")
    );
    assert!(
        !k.authz
            .has_permission("ub", Scope::Tenant, Some("t2"), "edit:stuff")
            .await
            .expect("check")
    );
    assert!(
        !k.authz
            .has_permission("ub", Scope::Tenant, Some("t1"), "delete:stuff")
            .await
            .expect("check")
    );
}

#[tokio::test]
async fn wildcard_role_covers_unknown_permission_strings() {
    let k = kernel();
    let powerful = create_role(&k.store, "powerful", Scope::Tenant, &["*"]).await;
    grant(&k.store, "uc", &powerful, Scope::Tenant, Some("t1")).await;

    // Unknown permissions are not an error; the wildcard still covers them.
    assert!(
        k.authz
            .has_permission("uc", Scope::Tenant, Some("t1"), "no_such:permission")
            .await
            .expect("check")
    );
    assert!(
        !k.authz
            .has_permission("uc", Scope::Tenant, Some("t2"), "no_such:permission")
            .await
            .expect("check")
    );
}

#[tokio::test]
async fn repeated_grant_is_idempotent() {
    let k = kernel();
    let editor = create_role(&k.store, "editor", Scope::Tenant, &["edit:stuff"]).await;
    grant(&k.store, "ud", &editor, Scope::Tenant, Some("t1")).await;

    let duplicate = Assignment {
        id: new_id(),
        user_id: "ud".to_string(),
        role_id: editor.id.clone(),
        scope: Scope::Tenant,
        scope_context_id: Some("t1".to_string()),
        granted_at: chrono::Utc::now(),
        granted_by: None,
    };
    assert!(matches!(
        AssignmentRepository::grant(k.store.as_ref(), &duplicate).await,
        Err(warden_core::Error::AssignmentAlreadyExists)
    ));
    assert_eq!(
        AssignmentRepository::list_for_user(k.store.as_ref(), "ud")
            .await
            .expect("list")
            .len(),
        1
    );
}

// The bootstrap path and the resolution engine agree end to end.
#[tokio::test]
async fn bootstrapped_admin_passes_every_check() {
    let k = kernel();
    let admin = k
        .bootstrap
        .bootstrap_platform_admin("root@platform.test", "super-secret-pw")
        .await
        .expect("bootstrap");

    for (scope, context, permission) in [
        (Scope::Platform, None, "platform:manage_tenants"),
        (Scope::Tenant, Some("t1"), "tenant:manage_users"),
        (Scope::Client, Some("c1"), "client:token_revoke"),
    ] {
        assert!(
            k.authz
                .has_permission(&admin.id, scope, context, permission)
                .await
                .expect("check"),
            "expected {permission} at {scope}"
        );
    }

    let roles = k.authz.get_user_roles(&admin.id).await.expect("roles");
    assert_eq!(roles, vec!["platform_admin".to_string()]);
}
