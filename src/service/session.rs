//! Session service: creation, validation, expiry, revocation.
//!
//! # Purpose
//! Server-side session lifecycle. Expiry and idle checks live here rather
//! than in the store; a session that fails either check is deleted on read.
use crate::crypto;
use crate::error::{Error, Result};
use crate::model::Session;
use crate::store::SessionRepository;
use chrono::{Duration, Utc};
use std::sync::Arc;

pub struct SessionService {
    repo: Arc<dyn SessionRepository>,
    lifetime: Duration,
    idle_timeout: Duration,
}

impl SessionService {
    pub fn new(repo: Arc<dyn SessionRepository>, lifetime: Duration, idle_timeout: Duration) -> Self {
        Self {
            repo,
            lifetime,
            idle_timeout,
        }
    }

    /// Create a session after successful authentication. The identifier is a
    /// fresh 32-byte random token.
    pub async fn create(
        &self,
        tenant_id: Option<String>,
        user_id: &str,
        ip_address: &str,
        user_agent: &str,
        namespace: &str,
    ) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            id: crypto::generate_token(),
            tenant_id,
            user_id: user_id.to_string(),
            ip_address: ip_address.to_string(),
            user_agent: user_agent.to_string(),
            expires_at: now + self.lifetime,
            created_at: now,
            last_seen_at: now,
            namespace: namespace.to_string(),
        };

        self.repo.create(&session).await?;
        Ok(session)
    }

    /// Retrieve and validate a session. An expired or idle session is
    /// removed and reported as expired.
    pub async fn get(&self, session_id: &str) -> Result<Session> {
        let session = self
            .repo
            .get(session_id)
            .await
            .map_err(|_| Error::SessionNotFound)?;

        let now = Utc::now();
        if session.is_expired(now) || session.is_idle(self.idle_timeout, now) {
            let _ = self.repo.delete(session_id).await;
            return Err(Error::SessionExpired);
        }

        Ok(session)
    }

    /// Bump a session's activity timestamp. Last writer wins under races.
    pub async fn refresh(&self, session_id: &str) -> Result<()> {
        let mut session = self.get(session_id).await?;
        session.last_seen_at = Utc::now();
        self.repo.update(&session).await
    }

    pub async fn destroy(&self, session_id: &str) -> Result<()> {
        self.repo.delete(session_id).await
    }

    pub async fn destroy_all_for_user(&self, user_id: &str) -> Result<()> {
        self.repo.delete_by_user_id(user_id).await
    }

    pub async fn cleanup_expired(&self) -> Result<()> {
        self.repo.delete_expired().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::session::NAMESPACE_AUTH;
    use crate::store::memory::MemoryStore;

    fn service(store: &Arc<MemoryStore>, lifetime: Duration, idle: Duration) -> SessionService {
        SessionService::new(store.clone(), lifetime, idle)
    }

    #[tokio::test]
    async fn create_and_get() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, Duration::hours(24), Duration::minutes(30));

        let session = svc
            .create(None, "u-1", "203.0.113.7", "test-agent", NAMESPACE_AUTH)
            .await
            .expect("create");
        assert_eq!(session.id.len(), 43);
        assert_eq!(session.created_at, session.last_seen_at);

        let fetched = svc.get(&session.id).await.expect("get");
        assert_eq!(fetched.user_id, "u-1");
        assert_eq!(fetched.namespace, NAMESPACE_AUTH);
    }

    #[tokio::test]
    async fn expired_session_is_deleted_on_read() {
        let store = Arc::new(MemoryStore::new());
        // Zero lifetime: the session is born expired.
        let svc = service(&store, Duration::seconds(-1), Duration::minutes(30));

        let session = svc
            .create(None, "u-1", "", "", NAMESPACE_AUTH)
            .await
            .expect("create");
        assert!(matches!(
            svc.get(&session.id).await,
            Err(Error::SessionExpired)
        ));
        // The expired session was removed, not just rejected.
        assert!(matches!(
            crate::store::SessionRepository::get(store.as_ref(), &session.id).await,
            Err(Error::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn idle_session_is_deleted_on_read() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, Duration::hours(24), Duration::seconds(-1));

        let session = svc
            .create(None, "u-1", "", "", NAMESPACE_AUTH)
            .await
            .expect("create");
        assert!(matches!(
            svc.get(&session.id).await,
            Err(Error::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn refresh_updates_last_seen() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, Duration::hours(24), Duration::minutes(30));

        let session = svc
            .create(None, "u-1", "", "", NAMESPACE_AUTH)
            .await
            .expect("create");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        svc.refresh(&session.id).await.expect("refresh");

        let fetched = svc.get(&session.id).await.expect("get");
        assert!(fetched.last_seen_at > session.last_seen_at);
    }

    #[tokio::test]
    async fn missing_session_reports_not_found() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, Duration::hours(24), Duration::minutes(30));
        assert!(matches!(
            svc.get("no-such-session").await,
            Err(Error::SessionNotFound)
        ));
        assert!(matches!(
            svc.refresh("no-such-session").await,
            Err(Error::SessionNotFound)
        ));
    }

    #[tokio::test]
    async fn destroy_all_for_user_leaves_other_users() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store, Duration::hours(24), Duration::minutes(30));

        let mine_a = svc.create(None, "u-1", "", "", NAMESPACE_AUTH).await.expect("create");
        let mine_b = svc.create(None, "u-1", "", "", NAMESPACE_AUTH).await.expect("create");
        let theirs = svc.create(None, "u-2", "", "", NAMESPACE_AUTH).await.expect("create");

        svc.destroy_all_for_user("u-1").await.expect("destroy all");
        assert!(svc.get(&mine_a.id).await.is_err());
        assert!(svc.get(&mine_b.id).await.is_err());
        assert!(svc.get(&theirs.id).await.is_ok());
    }
}
