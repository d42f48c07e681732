#![allow(dead_code)]
use chrono::Duration;
use std::sync::Arc;
use warden_core::audit::{
    AuditLogger, AuditRepository, Event, EventType, Filter, RecordingLogger,
};
use warden_core::crypto::PasswordHasher;
use warden_core::service::{
    AuthzService, BootstrapService, ClientService, IdentityService, SessionService, TenantService,
};
use warden_core::store::memory::MemoryStore;

/// The full service bundle wired over one in-memory store, the way a
/// transport plane would assemble the kernel.
pub struct Kernel {
    pub store: Arc<MemoryStore>,
    pub identity: Arc<IdentityService>,
    pub sessions: SessionService,
    pub authz: AuthzService,
    pub clients: ClientService,
    pub tenants: TenantService,
    pub bootstrap: BootstrapService,
}

pub const TEST_HMAC_KEY: &str = "test-key";

pub fn kernel() -> Kernel {
    kernel_with(3, Duration::minutes(15))
}

pub fn kernel_with(max_attempts: u32, lockout: Duration) -> Kernel {
    let store = Arc::new(MemoryStore::new());
    let audit: Arc<dyn AuditLogger> = Arc::new(RecordingLogger::new(store.clone()));
    // Small Argon2 costs keep the suite fast.
    let identity = Arc::new(IdentityService::new(
        store.clone(),
        PasswordHasher::new(32, 1, 1, 16, 32),
        audit.clone(),
        max_attempts,
        lockout,
        TEST_HMAC_KEY,
    ));
    Kernel {
        identity: identity.clone(),
        sessions: SessionService::new(store.clone(), Duration::hours(24), Duration::minutes(30)),
        authz: AuthzService::new(store.clone(), store.clone(), store.clone()),
        clients: ClientService::new(store.clone(), audit.clone()),
        tenants: TenantService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            identity.clone(),
            store.clone(),
            store.clone(),
            audit.clone(),
        ),
        bootstrap: BootstrapService::new(identity, store.clone(), audit),
        store,
    }
}

/// Persisted audit events of one type, oldest first.
pub async fn events_of(store: &Arc<MemoryStore>, event_type: EventType) -> Vec<Event> {
    let (mut events, _) = store
        .list(&Filter {
            event_type: Some(event_type),
            ..Filter::default()
        })
        .await
        .expect("list audit events");
    events.reverse();
    events
}
