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

//! Shared helpers for kitchen-sink-client integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{TimeDelta, Utc};
use kitchen_sink_client::store::{reduce, Action, AppState, Dispatch, StoreHandle};
use kitchen_sink_client::{IdentitySource, SessionError};
use kitchen_sink_types::{
    AccessToken, CommunicationTokenClaims, CommunicationUser, CommunicationUserId, Identity,
};
use uuid::Uuid;

/// Store that applies actions synchronously and keeps every snapshot.
#[derive(Clone)]
pub struct RecordingStore {
    inner: Arc<Mutex<(AppState, Vec<AppState>)>>,
}

impl RecordingStore {
    pub fn new(initial: AppState) -> Self {
        Self {
            inner: Arc::new(Mutex::new((initial, Vec::new()))),
        }
    }

    /// A store whose session is ready and whose callee field is valid.
    pub fn ready() -> Self {
        let store = Self::new(AppState::default());
        store.dispatch(Action::RequestIdentity);
        store.dispatch(Action::CallAgentReady);
        store.dispatch(Action::DeviceManagerReady);
        store.dispatch(Action::CalleeChanged(new_user_id()));
        store
    }

    pub fn state(&self) -> AppState {
        self.inner.lock().unwrap().0.clone()
    }

    pub fn history(&self) -> Vec<AppState> {
        self.inner.lock().unwrap().1.clone()
    }
}

impl Dispatch for RecordingStore {
    fn dispatch(&self, action: Action) {
        let mut inner = self.inner.lock().unwrap();
        reduce(&mut inner.0, action);
        let snapshot = inner.0.clone();
        inner.1.push(snapshot);
    }
}

pub fn new_user_id() -> String {
    CommunicationUserId::generate(Uuid::new_v4()).into()
}

/// Unsigned JWT-shaped token whose `sub` is `user_id`.
pub fn token_for(user_id: &str) -> String {
    let claims = CommunicationTokenClaims {
        sub: user_id.to_string(),
        scp: vec!["voip".to_string(), "chat".to_string()],
        exp: (Utc::now() + TimeDelta::hours(1)).timestamp(),
        iss: CommunicationTokenClaims::ISSUER.to_string(),
    };
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
    format!("eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.{payload}.c2lnbmF0dXJl")
}

pub fn identity_for(user_id: &str) -> Identity {
    Identity {
        access_token: AccessToken::new(token_for(user_id), Utc::now() + TimeDelta::hours(1)),
        user: CommunicationUser {
            id: user_id.to_string(),
        },
    }
}

/// Identity source that hands out one fixed identity.
pub struct StaticIdentitySource {
    pub identity: Identity,
    pub refreshes: AtomicUsize,
}

impl StaticIdentitySource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            identity: identity_for(&new_user_id()),
            refreshes: AtomicUsize::new(0),
        })
    }

    pub fn user_id(&self) -> &str {
        &self.identity.user.id
    }
}

#[async_trait]
impl IdentitySource for StaticIdentitySource {
    async fn fetch_identity(&self) -> Result<Identity, SessionError> {
        Ok(self.identity.clone())
    }

    async fn refresh_token(&self, user_id: &str) -> Result<AccessToken, SessionError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(AccessToken::new(
            format!("{}-refreshed", token_for(user_id)),
            Utc::now() + TimeDelta::hours(2),
        ))
    }
}

/// Identity source whose server is down.
pub struct FailingIdentitySource;

#[async_trait]
impl IdentitySource for FailingIdentitySource {
    async fn fetch_identity(&self) -> Result<Identity, SessionError> {
        Err(SessionError::Identity("Server error (503): unavailable".to_string()))
    }

    async fn refresh_token(&self, _: &str) -> Result<AccessToken, SessionError> {
        Err(SessionError::Identity("Server error (503): unavailable".to_string()))
    }
}

/// Wait for a published state, failing the test after five seconds.
pub async fn settle(store: &StoreHandle, predicate: impl FnMut(&AppState) -> bool) -> AppState {
    within(store.wait_for(predicate))
        .await
        .expect("store stopped before reaching the expected state")
}

pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out waiting for state")
}
