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

//! In-process calling SDK.
//!
//! Agents created by a [`LoopbackCallClient`] register on a shared
//! [`LoopbackNetwork`] under the user id found in their access token. A call
//! to a registered user rings that user's agent; accepting connects the two
//! calls so each side sees the other as a remote participant carrying its
//! local video. Everything happens synchronously inside the SDK calls and
//! is reported through the usual events, which makes the loopback useful
//! both for the CLI demo and for deterministic tests.

mod call;
mod media;

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use kitchen_sink_types::CommunicationTokenClaims;
use uuid::Uuid;

use crate::credential::CommunicationTokenCredential;
use crate::sdk::{
    Call, CallAgent, CallClient, CallDirection, CallEndReason, CallState, DeviceManager,
    Emitter, IncomingCall, Listener, SdkError, StartCallOptions, Subscription, VideoDeviceInfo,
};

pub use call::{
    LoopbackCall, LoopbackIncomingCall, LoopbackParticipant, DECLINED_CODE, NOT_FOUND_CODE,
};
pub use media::{default_camera, LoopbackDeviceManager, LoopbackVideoStream};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Extract the `sub` claim from a JWT without verifying it.
pub fn user_id_from_token(token: &str) -> Option<String> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: CommunicationTokenClaims = serde_json::from_slice(&bytes).ok()?;
    Some(claims.sub)
}

/// Directory of live agents, keyed by user id.
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    agents: Arc<Mutex<HashMap<String, Weak<LoopbackCallAgent>>>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn agent(&self, user_id: &str) -> Option<Arc<LoopbackCallAgent>> {
        lock(&self.agents).get(user_id).and_then(Weak::upgrade)
    }

    pub fn registered_users(&self) -> Vec<String> {
        lock(&self.agents)
            .iter()
            .filter(|(_, agent)| agent.strong_count() > 0)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn register(&self, agent: &Arc<LoopbackCallAgent>) {
        let previous = lock(&self.agents).insert(agent.user_id.clone(), Arc::downgrade(agent));
        if previous.is_some_and(|p| p.strong_count() > 0) {
            log::warn!("Agent for {} replaced an existing one", agent.user_id);
        }
    }
}

pub struct LoopbackCallAgent {
    user_id: String,
    network: LoopbackNetwork,
    incoming: Emitter<Arc<dyn IncomingCall>>,
    calls: Mutex<Vec<Arc<LoopbackCall>>>,
}

impl LoopbackCallAgent {
    /// Calls placed or accepted by this agent that have not disconnected.
    pub fn active_calls(&self) -> Vec<Arc<LoopbackCall>> {
        let mut calls = lock(&self.calls);
        calls.retain(|call| call.state() != CallState::Disconnected);
        calls.clone()
    }

    pub fn incoming_listener_count(&self) -> usize {
        self.incoming.listener_count()
    }

    fn track(&self, call: Arc<LoopbackCall>) {
        lock(&self.calls).push(call);
    }

    fn offer(&self, incoming: Arc<LoopbackIncomingCall>) {
        let incoming: Arc<dyn IncomingCall> = incoming;
        self.incoming.emit(&incoming);
    }
}

impl CallAgent for LoopbackCallAgent {
    fn user_id(&self) -> String {
        self.user_id.clone()
    }

    fn start_call(
        &self,
        callees: &[String],
        options: StartCallOptions,
    ) -> Result<Arc<dyn Call>, SdkError> {
        let callee = match callees {
            [callee] => callee.trim(),
            [] => return Err(SdkError::Operation("no callee given".to_string())),
            _ => {
                return Err(SdkError::Operation(
                    "group calls are not supported".to_string(),
                ))
            }
        };

        let call = LoopbackCall::new(
            Uuid::new_v4().to_string(),
            self.user_id.clone(),
            CallDirection::Outgoing,
            options.local_video_streams,
        );
        self.track(Arc::clone(&call));

        match self.network.agent(callee) {
            Some(agent) => {
                call.set_state(CallState::Ringing);
                agent.offer(Arc::new(LoopbackIncomingCall {
                    id: call.id(),
                    caller: self.user_id.clone(),
                    caller_call: Arc::downgrade(&call),
                    callee: Arc::downgrade(&agent),
                    answered: AtomicBool::new(false),
                }));
            }
            None => {
                log::warn!("{callee} is not reachable on the loopback network");
                call.end(CallEndReason {
                    code: NOT_FOUND_CODE,
                    subcode: 0,
                });
            }
        }

        Ok(call)
    }

    fn on_incoming_call(&self, listener: Listener<Arc<dyn IncomingCall>>) -> Subscription {
        self.incoming.subscribe(listener)
    }
}

/// Entry point of the loopback SDK.
pub struct LoopbackCallClient {
    network: LoopbackNetwork,
    cameras: Vec<VideoDeviceInfo>,
    grant_permission: bool,
    device_manager: Arc<LoopbackDeviceManager>,
    agent_failure: Option<String>,
    device_failure: Option<String>,
}

impl LoopbackCallClient {
    /// A client with one camera whose permission prompt is always granted.
    pub fn new(network: LoopbackNetwork) -> Self {
        let cameras = vec![default_camera()];
        Self {
            network,
            device_manager: Arc::new(LoopbackDeviceManager::new(cameras.clone(), true)),
            cameras,
            grant_permission: true,
            agent_failure: None,
            device_failure: None,
        }
    }

    pub fn with_cameras(mut self, cameras: Vec<VideoDeviceInfo>) -> Self {
        self.cameras = cameras;
        self.rebuild_devices()
    }

    pub fn without_cameras(self) -> Self {
        self.with_cameras(Vec::new())
    }

    pub fn denying_permission(mut self) -> Self {
        self.grant_permission = false;
        self.rebuild_devices()
    }

    pub fn failing_call_agent(mut self, message: &str) -> Self {
        self.agent_failure = Some(message.to_string());
        self
    }

    pub fn failing_device_manager(mut self, message: &str) -> Self {
        self.device_failure = Some(message.to_string());
        self
    }

    pub fn network(&self) -> &LoopbackNetwork {
        &self.network
    }

    pub fn device_manager(&self) -> Arc<LoopbackDeviceManager> {
        Arc::clone(&self.device_manager)
    }

    fn rebuild_devices(mut self) -> Self {
        self.device_manager = Arc::new(LoopbackDeviceManager::new(
            self.cameras.clone(),
            self.grant_permission,
        ));
        self
    }
}

#[async_trait]
impl CallClient for LoopbackCallClient {
    async fn create_call_agent(
        &self,
        credential: Arc<CommunicationTokenCredential>,
    ) -> Result<Arc<dyn CallAgent>, SdkError> {
        if let Some(message) = &self.agent_failure {
            return Err(SdkError::Operation(message.clone()));
        }
        let token = credential
            .get_token()
            .await
            .map_err(|e| SdkError::Unauthorized(e.to_string()))?;
        if token.trim().is_empty() {
            return Err(SdkError::Unauthorized("empty access token".to_string()));
        }

        let user_id = user_id_from_token(&token)
            .unwrap_or_else(|| format!("8:loopback:{}", Uuid::new_v4()));
        let agent = Arc::new(LoopbackCallAgent {
            user_id,
            network: self.network.clone(),
            incoming: Emitter::new(),
            calls: Mutex::new(Vec::new()),
        });
        self.network.register(&agent);
        log::info!("Loopback call agent ready for {}", agent.user_id);
        Ok(agent)
    }

    async fn get_device_manager(&self) -> Result<Arc<dyn DeviceManager>, SdkError> {
        if let Some(message) = &self.device_failure {
            return Err(SdkError::Device(message.clone()));
        }
        Ok(self.device_manager())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn token_for(user: &str) -> String {
        let claims = CommunicationTokenClaims {
            sub: user.to_string(),
            scp: vec!["voip".to_string()],
            exp: 4_102_444_800,
            iss: CommunicationTokenClaims::ISSUER.to_string(),
        };
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        format!("eyJhbGciOiJIUzI1NiJ9.{payload}.c2lnbmF0dXJl")
    }

    async fn agent(client: &LoopbackCallClient, user: &str) -> Arc<dyn CallAgent> {
        let credential = Arc::new(CommunicationTokenCredential::new(token_for(user)));
        client.create_call_agent(credential).await.unwrap()
    }

    #[test]
    fn reads_subject_from_token() {
        assert_eq!(user_id_from_token(&token_for("alice")).as_deref(), Some("alice"));
        assert_eq!(user_id_from_token("opaque-token"), None);
        assert_eq!(user_id_from_token("a.!!!.c"), None);
    }

    #[tokio::test]
    async fn agents_register_under_their_user() {
        let client = LoopbackCallClient::new(LoopbackNetwork::new());
        let alice = agent(&client, "alice").await;
        assert_eq!(alice.user_id(), "alice");
        assert!(client.network().agent("alice").is_some());
        drop(alice);
        assert!(client.network().agent("alice").is_none());
    }

    #[tokio::test]
    async fn calling_an_unknown_user_ends_with_not_found() {
        let client = LoopbackCallClient::new(LoopbackNetwork::new());
        let alice = agent(&client, "alice").await;
        let call = alice
            .start_call(&["nobody".to_string()], StartCallOptions::default())
            .unwrap();
        assert_eq!(call.state(), CallState::Disconnected);
        assert_eq!(call.call_end_reason().unwrap().code, NOT_FOUND_CODE);
    }

    #[tokio::test]
    async fn accept_connects_both_sides() {
        let client = LoopbackCallClient::new(LoopbackNetwork::new());
        let alice = agent(&client, "alice").await;
        let bob = agent(&client, "bob").await;

        let offers = Arc::new(Mutex::new(Vec::new()));
        let inbox = Arc::clone(&offers);
        let _sub = bob.on_incoming_call(Arc::new(move |offer: &Arc<dyn IncomingCall>| {
            inbox.lock().unwrap().push(Arc::clone(offer));
        }));

        let outgoing = alice
            .start_call(&["bob".to_string()], StartCallOptions::default())
            .unwrap();
        assert_eq!(outgoing.state(), CallState::Ringing);

        let offer = offers.lock().unwrap().pop().expect("bob was offered a call");
        assert_eq!(offer.caller(), "alice");
        let incoming = offer.accept(Default::default()).await.unwrap();

        assert_eq!(outgoing.state(), CallState::Connected);
        assert_eq!(incoming.state(), CallState::Connected);
        assert_eq!(outgoing.remote_participants()[0].identifier(), "bob");
        assert_eq!(incoming.remote_participants()[0].identifier(), "alice");

        incoming.hang_up().await.unwrap();
        assert_eq!(outgoing.state(), CallState::Disconnected);
        assert_eq!(outgoing.call_end_reason(), Some(CallEndReason::default()));
    }

    #[tokio::test]
    async fn reject_ends_caller_with_declined() {
        let client = LoopbackCallClient::new(LoopbackNetwork::new());
        let alice = agent(&client, "alice").await;
        let bob = agent(&client, "bob").await;

        let rejected = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&rejected);
        let _sub = bob.on_incoming_call(Arc::new(move |offer: &Arc<dyn IncomingCall>| {
            let offer = Arc::clone(offer);
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                offer.reject().await.unwrap();
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }));

        let call = alice
            .start_call(&["bob".to_string()], StartCallOptions::default())
            .unwrap();
        while rejected.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(call.call_end_reason().unwrap().code, DECLINED_CODE);
    }
}
