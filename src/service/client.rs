//! OAuth2 client management service.
//!
//! # Purpose
//! Registration, validation, and lifecycle of relying parties. Secrets never
//! leave this layer in cleartext once stored: callers generate one with
//! [`crate::crypto::generate_token`], hand over the hash, and show the
//! cleartext to the operator exactly once.
use crate::audit::{AuditLogger, Event, EventType, RESOURCE_CLIENT};
use crate::error::{Error, Result};
use crate::id;
use crate::model::Client;
use crate::store::ClientRepository;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;

pub struct ClientService {
    client_repo: Arc<dyn ClientRepository>,
    audit_logger: Arc<dyn AuditLogger>,
}

impl ClientService {
    pub fn new(client_repo: Arc<dyn ClientRepository>, audit_logger: Arc<dyn AuditLogger>) -> Self {
        Self {
            client_repo,
            audit_logger,
        }
    }

    /// Validate and persist a new OAuth2 client registration.
    pub async fn register_client(
        &self,
        tenant_id: &str,
        user_id: &str,
        mut client: Client,
    ) -> Result<Client> {
        validate_client(&client)?;

        if client.id.is_empty() {
            client.id = id::new_id();
        }
        if client.client_id.is_empty() {
            client.client_id = id::new_id();
        }
        let now = Utc::now();
        client.created_at = now;
        client.updated_at = now;

        self.client_repo.create(&client).await?;

        let mut event = Event::new(EventType::ClientCreated);
        event.tenant_id = Some(tenant_id.to_string());
        event.actor_id = Some(user_id.to_string());
        event.resource = RESOURCE_CLIENT.to_string();
        event.target_name = client.client_name.clone();
        event.target_id = client.client_id.clone();
        event
            .metadata
            .insert("client_id".into(), json!(client.client_id));
        event
            .metadata
            .insert("client_name".into(), json!(client.client_name));
        self.audit_logger.log(event).await;

        Ok(client)
    }

    pub async fn list_clients(&self, tenant_id: &str) -> Result<Vec<Client>> {
        self.client_repo.list_by_tenant(tenant_id).await
    }

    pub async fn list_clients_by_owner(&self, owner_id: &str) -> Result<Vec<Client>> {
        self.client_repo.list_by_owner(owner_id).await
    }

    pub async fn get_client(&self, tenant_id: &str, id: &str) -> Result<Client> {
        self.client_repo.get_by_id(tenant_id, id).await
    }

    pub async fn get_client_by_client_id(
        &self,
        tenant_id: &str,
        client_id: &str,
    ) -> Result<Client> {
        self.client_repo.get_by_client_id(tenant_id, client_id).await
    }

    /// Update a registered client after re-validating its URIs.
    pub async fn update_client(&self, mut client: Client, actor_id: &str) -> Result<Client> {
        validate_client(&client)?;
        client.updated_at = Utc::now();
        self.client_repo.update(&client).await?;

        let mut event = Event::new(EventType::ClientUpdated);
        event.tenant_id = Some(client.tenant_id.clone());
        event.actor_id = Some(actor_id.to_string());
        event.resource = RESOURCE_CLIENT.to_string();
        event.target_name = client.client_name.clone();
        event.target_id = client.client_id.clone();
        event
            .metadata
            .insert("client_id".into(), json!(client.client_id));
        self.audit_logger.log(event).await;

        Ok(client)
    }

    /// Soft-delete a client.
    pub async fn delete_client(&self, tenant_id: &str, id: &str, actor_id: &str) -> Result<()> {
        let client = self.client_repo.get_by_id(tenant_id, id).await?;
        self.client_repo.delete(tenant_id, id).await?;

        let mut event = Event::new(EventType::ClientDeleted);
        event.tenant_id = Some(tenant_id.to_string());
        event.actor_id = Some(actor_id.to_string());
        event.resource = RESOURCE_CLIENT.to_string();
        event.target_name = client.client_name.clone();
        event.target_id = client.client_id.clone();
        event
            .metadata
            .insert("client_id".into(), json!(client.client_id));
        self.audit_logger.log(event).await;

        Ok(())
    }
}

// Every configured URI must parse as an absolute URI.
fn validate_client(client: &Client) -> Result<()> {
    if let Some(client_uri) = &client.client_uri {
        url::Url::parse(client_uri)
            .map_err(|err| Error::invalid_input(format!("invalid client_uri: {err}")))?;
    }
    for uri in &client.redirect_uris {
        url::Url::parse(uri)
            .map_err(|_| Error::invalid_input(format!("invalid redirect_uri: {uri}")))?;
    }
    Ok(())
}
