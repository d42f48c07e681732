//! Identity service: provisioning, authentication, password lifecycle.
//!
//! # Purpose
//! Owns the privacy-preserving identity layer. Identities are addressed by
//! the HMAC-derived email hash; authentication enforces the lockout state
//! machine and never discloses whether an address is registered.
//!
//! # Security considerations
//! - Audit events on the authentication path carry the identity hash or id,
//!   never the plaintext email.
//! - Unknown user and wrong password produce the same error.
//! - Argon2id work runs on the blocking pool so password traffic cannot
//!   stall the async scheduler.
use crate::audit::{AuditLogger, Event, EventType};
use crate::crypto::{self, PasswordHasher};
use crate::error::{Error, Result};
use crate::id;
use crate::model::{Credentials, Identity, Profile};
use crate::store::IdentityRepository;
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;

const MIN_EMAIL_LEN: usize = 3;
const MAX_EMAIL_LEN: usize = 254;
const MIN_PASSWORD_LEN: usize = 8;

pub struct IdentityService {
    repo: Arc<dyn IdentityRepository>,
    hasher: PasswordHasher,
    audit_logger: Arc<dyn AuditLogger>,
    lockout_max_attempts: u32,
    lockout_duration: Duration,
    hmac_key: String,
}

impl IdentityService {
    pub fn new(
        repo: Arc<dyn IdentityRepository>,
        hasher: PasswordHasher,
        audit_logger: Arc<dyn AuditLogger>,
        lockout_max_attempts: u32,
        lockout_duration: Duration,
        hmac_key: impl Into<String>,
    ) -> Self {
        Self {
            repo,
            hasher,
            audit_logger,
            lockout_max_attempts,
            lockout_duration,
            hmac_key: hmac_key.into(),
        }
    }

    /// Create a new identity without credentials.
    ///
    /// The email is normalized before hashing and before deriving the
    /// defaulted nickname and avatar placeholder, so provisioning and lookup
    /// always agree.
    pub async fn provision(&self, email_plain: &str, mut profile: Profile) -> Result<Identity> {
        let email = crypto::normalize_email(email_plain);
        if email.len() < MIN_EMAIL_LEN || email.len() > MAX_EMAIL_LEN {
            return Err(Error::invalid_input("invalid email address"));
        }

        let email_hash = crypto::email_hash(&self.hmac_key, &email);
        match self.repo.get_by_hash(&email_hash).await {
            Ok(_) => return Err(Error::UserAlreadyExists),
            Err(Error::UserNotFound) => {}
            Err(err) => return Err(err),
        }

        if profile.picture.is_none() {
            profile.picture = Some(crypto::placeholder_avatar(&email));
        }
        if profile.nickname.is_none() {
            // Local part of the normalized address.
            let local = email.split('@').next().unwrap_or(&email);
            profile.nickname = Some(local.to_string());
        }

        let now = Utc::now();
        let user = Identity {
            id: id::new_id(),
            email_hash,
            email_plain: Some(email),
            email_verified: false,
            profile,
            failed_login_attempts: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        self.repo.create(&user).await?;
        Ok(user)
    }

    /// Add a password credential to an identity that has none.
    pub async fn add_password(&self, user_id: &str, password: &str) -> Result<()> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(Error::invalid_input(
                "password does not meet security requirements",
            ));
        }

        let password_hash = self.hash_password(password).await?;
        self.repo
            .add_credentials(&Credentials {
                user_id: user_id.to_string(),
                password_hash,
                updated_at: Utc::now(),
            })
            .await
    }

    /// Set or replace a password without the old one (administrative flow).
    /// Creates the credential if absent, updates it otherwise.
    pub async fn set_password(&self, user_id: &str, password: &str) -> Result<()> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(Error::invalid_input(
                "password does not meet security requirements",
            ));
        }

        let password_hash = self.hash_password(password).await?;
        match self.repo.get_credentials(user_id).await {
            Ok(_) => self.repo.update_password(user_id, &password_hash).await,
            Err(Error::UserNotFound) => {
                self.repo
                    .add_credentials(&Credentials {
                        user_id: user_id.to_string(),
                        password_hash,
                        updated_at: Utc::now(),
                    })
                    .await
            }
            Err(err) => Err(err),
        }
    }

    /// Change a password after verifying the current one.
    pub async fn change_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let credentials = self
            .repo
            .get_credentials(user_id)
            .await
            .map_err(|_| Error::UserNotFound)?;

        let valid = self
            .verify_password(old_password, &credentials.password_hash)
            .await
            .unwrap_or(false);
        if !valid {
            return Err(Error::InvalidCredentials);
        }

        if new_password.len() < MIN_PASSWORD_LEN {
            return Err(Error::invalid_input(
                "password does not meet security requirements",
            ));
        }

        let new_hash = self.hash_password(new_password).await?;
        self.repo.update_password(user_id, &new_hash).await
    }

    /// Authenticate with email and password.
    ///
    /// Lockout state machine: each verify failure increments the counter;
    /// reaching the configured maximum sets `locked_until` and the failing
    /// call itself reports the lock. A verify success resets counter and
    /// window. An elapsed window unlocks implicitly on the next attempt.
    pub async fn authenticate(&self, email_plain: &str, password: &str) -> Result<Identity> {
        let email_hash = crypto::email_hash(&self.hmac_key, email_plain);

        let user = match self.repo.get_by_hash(&email_hash).await {
            Ok(user) => user,
            Err(_) => {
                // Unknown address: audit the hash, never the plaintext.
                let mut event = Event::new(EventType::LoginFailed);
                event.resource = "login_attempt".to_string();
                event.metadata.insert("reason".into(), json!("user_not_found"));
                event.metadata.insert("target_hash".into(), json!(email_hash));
                self.audit_logger.log(event).await;
                return Err(Error::InvalidCredentials);
            }
        };

        let now = Utc::now();
        if user.is_locked(now) {
            let mut event = Event::new(EventType::LoginFailed);
            event.actor_id = Some(user.id.clone());
            event.resource = "login".to_string();
            event.metadata.insert("reason".into(), json!("locked_out"));
            self.audit_logger.log(event).await;
            return Err(Error::AccountLocked);
        }

        let credentials = match self.repo.get_credentials(&user.id).await {
            Ok(credentials) => credentials,
            Err(_) => return Err(Error::InvalidCredentials),
        };

        let valid = self
            .verify_password(password, &credentials.password_hash)
            .await
            .unwrap_or(false);

        if !valid {
            let new_attempts = user.failed_login_attempts + 1;
            let locked = new_attempts >= self.lockout_max_attempts;
            let locked_until = locked.then(|| now + self.lockout_duration);

            if locked {
                let mut event = Event::new(EventType::UserLocked);
                event.actor_id = Some(user.id.clone());
                event.resource = "login".to_string();
                event.metadata.insert("attempts".into(), json!(new_attempts));
                self.audit_logger.log(event).await;
            }

            // Last-writer-wins; a racing failure may collapse two increments
            // into one, which only delays the lock by one attempt.
            if let Err(err) = self
                .repo
                .update_lockout(&user.id, new_attempts, locked_until)
                .await
            {
                tracing::error!(error = ?err, user_id = %user.id, "failed to update lockout state");
            }

            let mut event = Event::new(EventType::LoginFailed);
            event.actor_id = Some(user.id.clone());
            event.resource = "login".to_string();
            event.metadata.insert("reason".into(), json!("invalid_password"));
            event.metadata.insert("attempts".into(), json!(new_attempts));
            self.audit_logger.log(event).await;

            return Err(if locked {
                Error::AccountLocked
            } else {
                Error::InvalidCredentials
            });
        }

        if user.failed_login_attempts > 0 || user.locked_until.is_some() {
            self.repo.update_lockout(&user.id, 0, None).await?;
        }

        let mut event = Event::new(EventType::LoginSuccess);
        event.actor_id = Some(user.id.clone());
        event.resource = "login".to_string();
        event.target_id = user.id.clone();
        self.audit_logger.log(event).await;

        Ok(user)
    }

    /// Look up an identity by email (hash lookup under the hood).
    pub async fn get_by_email(&self, email_plain: &str) -> Result<Identity> {
        let hash = crypto::email_hash(&self.hmac_key, email_plain);
        self.repo.get_by_hash(&hash).await
    }

    pub async fn get(&self, user_id: &str) -> Result<Identity> {
        self.repo.get_by_id(user_id).await
    }

    pub async fn update_profile(&self, user_id: &str, profile: Profile) -> Result<()> {
        let mut user = self.repo.get_by_id(user_id).await?;
        user.profile = profile;
        user.updated_at = Utc::now();
        self.repo.update(&user).await
    }

    /// Soft-delete an identity.
    pub async fn delete(&self, user_id: &str) -> Result<()> {
        self.repo.delete(user_id).await
    }

    async fn hash_password(&self, password: &str) -> Result<String> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|err| Error::Storage(anyhow::anyhow!(err)))?
    }

    async fn verify_password(&self, password: &str, encoded: &str) -> Result<bool> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        let encoded = encoded.to_string();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &encoded))
            .await
            .map_err(|err| Error::Storage(anyhow::anyhow!(err)))?
    }
}
