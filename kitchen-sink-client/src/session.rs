/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Call client session bootstrap.
//!
//! Fetch an identity, wrap its token in a refreshable credential, then ask
//! the SDK for a call agent and a device manager in parallel. The session is
//! ready only when both arrive. Nothing is retried.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::TimeDelta;
use identity_client::IdentityApiClient;
use kitchen_sink_types::{AccessToken, Identity};
use thiserror::Error;

use crate::credential::{CommunicationTokenCredential, CredentialError, TokenRefresher};
use crate::sdk::{CallAgent, CallClient, DeviceManager, SdkError};
use crate::store::{Action, Dispatch};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("identity request failed: {0}")]
    Identity(String),

    #[error(transparent)]
    Sdk(#[from] SdkError),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// Where identities and replacement tokens come from.
#[async_trait]
pub trait IdentitySource: Send + Sync {
    async fn fetch_identity(&self) -> Result<Identity, SessionError>;
    async fn refresh_token(&self, user_id: &str) -> Result<AccessToken, SessionError>;
}

#[async_trait]
impl IdentitySource for IdentityApiClient {
    async fn fetch_identity(&self) -> Result<Identity, SessionError> {
        self.get_identity()
            .await
            .map_err(|e| SessionError::Identity(e.to_string()))
    }

    async fn refresh_token(&self, user_id: &str) -> Result<AccessToken, SessionError> {
        IdentityApiClient::refresh_token(self, user_id)
            .await
            .map_err(|e| SessionError::Identity(e.to_string()))
    }
}

/// Refreshes a credential by asking the identity source again.
pub struct IdentityTokenRefresher {
    source: Arc<dyn IdentitySource>,
    user_id: String,
}

impl IdentityTokenRefresher {
    pub fn new(source: Arc<dyn IdentitySource>, user_id: impl Into<String>) -> Self {
        Self {
            source,
            user_id: user_id.into(),
        }
    }
}

#[async_trait]
impl TokenRefresher for IdentityTokenRefresher {
    async fn refresh(&self) -> Result<AccessToken, CredentialError> {
        self.source
            .refresh_token(&self.user_id)
            .await
            .map_err(|e| CredentialError::Refresh(e.to_string()))
    }
}

/// Everything a ready session holds.
#[derive(Clone)]
pub struct Session {
    pub identity: Identity,
    pub credential: Arc<CommunicationTokenCredential>,
    pub call_agent: Arc<dyn CallAgent>,
    pub device_manager: Arc<dyn DeviceManager>,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.identity.user.id
    }
}

/// Bring a session up, reporting each step to `store`.
pub async fn bootstrap<D: Dispatch + ?Sized>(
    source: Arc<dyn IdentitySource>,
    client: &dyn CallClient,
    store: &D,
    refresh_margin: TimeDelta,
) -> Result<Session, SessionError> {
    store.dispatch(Action::RequestIdentity);

    let identity = match source.fetch_identity().await {
        Ok(identity) => identity,
        Err(e) => {
            log::error!("Failed to fetch identity: {e}");
            store.dispatch(Action::IdentityFailed(e.to_string()));
            return Err(e);
        }
    };
    log::info!("Received identity {}", identity.user.id);
    store.dispatch(Action::ReceiveIdentity(identity.clone()));

    let refresher = Arc::new(IdentityTokenRefresher::new(
        Arc::clone(&source),
        identity.user.id.clone(),
    ));
    let credential = Arc::new(
        CommunicationTokenCredential::with_refresher(identity.access_token.clone(), refresher)
            .with_refresh_margin(refresh_margin),
    );

    let (call_agent, device_manager) = futures::join!(
        client.create_call_agent(Arc::clone(&credential)),
        client.get_device_manager()
    );

    match (call_agent, device_manager) {
        (Ok(call_agent), Ok(device_manager)) => {
            store.dispatch(Action::CallAgentReady);
            store.dispatch(Action::DeviceManagerReady);
            log::info!("Session ready for {}", identity.user.id);
            Ok(Session {
                identity,
                credential,
                call_agent,
                device_manager,
            })
        }
        (Err(e), _) | (_, Err(e)) => {
            log::error!("Failed to start calling session: {e}");
            store.dispatch(Action::SessionFailed(e.to_string()));
            Err(e.into())
        }
    }
}
