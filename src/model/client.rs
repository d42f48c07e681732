//! OAuth2 client, authorization code, and token models.
//!
//! # Purpose
//! Registered relying parties and the bearer credentials issued for them.
//! Scope validation lives on the client; the closed OIDC scope gate is a free
//! function because it does not depend on any client's configuration.
use crate::crypto;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// The closed set of OIDC standard scopes. Scopes control claim release, not
// authorization.
pub const SCOPE_OPENID: &str = "openid";
pub const SCOPE_PROFILE: &str = "profile";
pub const SCOPE_EMAIL: &str = "email";
pub const SCOPE_ADDRESS: &str = "address";
pub const SCOPE_PHONE: &str = "phone";
pub const SCOPE_OFFLINE_ACCESS: &str = "offline_access";

pub const OIDC_SCOPES: &[&str] = &[
    SCOPE_OPENID,
    SCOPE_PROFILE,
    SCOPE_EMAIL,
    SCOPE_ADDRESS,
    SCOPE_PHONE,
    SCOPE_OFFLINE_ACCESS,
];

/// Validate that a scope list is OIDC-compliant: non-empty, `openid`
/// present, and every scope drawn from the closed set.
pub fn validate_oidc_scopes(scopes: &[String]) -> Result<()> {
    if scopes.is_empty() {
        return Err(Error::invalid_input(
            "invalid scope: scope list cannot be empty",
        ));
    }

    let mut has_openid = false;
    for scope in scopes {
        if scope == SCOPE_OPENID {
            has_openid = true;
        }
        if !OIDC_SCOPES.contains(&scope.as_str()) {
            return Err(Error::invalid_input(format!(
                "invalid scope: unknown scope '{scope}'"
            )));
        }
    }

    if !has_openid {
        return Err(Error::invalid_input(
            "invalid scope: 'openid' scope is required",
        ));
    }

    Ok(())
}

/// A registered OAuth2 client application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub client_id: String,
    pub tenant_id: String,
    #[serde(skip_serializing, default)]
    pub client_secret_hash: String,
    pub client_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_uri: Option<String>,
    pub redirect_uris: Vec<String>,
    pub allowed_scopes: Vec<String>,
    pub grant_types: Vec<String>,
    pub response_types: Vec<String>,
    pub token_endpoint_auth_method: String,
    pub access_token_lifetime: i64,
    pub refresh_token_lifetime: i64,
    pub id_token_lifetime: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub is_trusted: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Client {
    /// Whether `redirect_uri` is registered for this client (exact match).
    pub fn redirect_uri_allowed(&self, redirect_uri: &str) -> bool {
        self.redirect_uris.iter().any(|uri| uri == redirect_uri)
    }

    /// Whether every token in the whitespace-separated `requested_scope` is
    /// allowed for this client. An empty request is always valid; a `*` in
    /// `allowed_scopes` admits anything.
    pub fn validate_scope(&self, requested_scope: &str) -> bool {
        requested_scope.split_whitespace().all(|requested| {
            self.allowed_scopes
                .iter()
                .any(|allowed| allowed == requested || allowed == "*")
        })
    }

    /// Constant-time check of a presented client secret against the stored
    /// hash.
    pub fn verify_secret(&self, secret: &str) -> bool {
        crypto::verify_secret(secret, &self.client_secret_hash)
    }
}

/// A single-use code from the OAuth2 authorization code flow. `is_used` only
/// ever transitions false to true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizationCode {
    pub id: String,
    pub code: String,
    pub client_id: String,
    pub user_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub state: String,
    pub nonce: String,
    pub code_challenge: String,
    pub code_challenge_method: String,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

impl AuthorizationCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Usable iff unexpired and never redeemed.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && !self.is_expired(now)
    }
}

/// An OAuth2 access token, stored by hash only. Revocation is monotone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub id: String,
    pub tenant_id: String,
    pub token_hash: String,
    pub client_id: String,
    pub user_id: String,
    pub scope: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// An OAuth2 refresh token, stored by hash only. Revocation is monotone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: String,
    pub tenant_id: String,
    pub token_hash: String,
    pub access_token_id: String,
    pub client_id: String,
    pub user_id: String,
    pub scope: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub is_revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
