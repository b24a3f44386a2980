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

//! User-facing call controls: start, accept, decline and hang up.
//!
//! The controller turns user actions into SDK calls, dispatches the
//! resulting state, and attaches a [`CallMirror`] to every call it starts or
//! accepts. Inbound offers arrive through the call agent's listener, which
//! only forwards them to a task owned by the controller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::CalleeValidation;
use crate::mirror::CallMirror;
use crate::sdk::{
    AcceptCallOptions, Call, CallAgent, CallState, DeviceManager, IncomingCall,
    PermissionConstraints, SdkError, StartCallOptions, Subscription, VideoStream,
};
use crate::session::Session;
use crate::store::{Action, Dispatch};

#[derive(Debug, Error)]
pub enum CallError {
    #[error("'{0}' is not a valid callee id")]
    InvalidCallee(String),

    #[error("a call is already in progress")]
    CallInProgress,

    #[error("an incoming call is waiting for an answer")]
    IncomingCallPending,

    #[error("there is no incoming call to answer")]
    NoIncomingCall,

    #[error("there is no active call")]
    NoActiveCall,

    #[error("device permission denied: {0}")]
    PermissionDenied(String),

    #[error(transparent)]
    Sdk(#[from] SdkError),
}

#[derive(Default)]
struct Slots {
    active_call: Option<Arc<dyn Call>>,
    /// Set while a call is being placed or accepted but not yet watched.
    starting: bool,
    incoming: Option<Arc<dyn IncomingCall>>,
    mirror: Option<JoinHandle<()>>,
}

/// Holds the call slot while `start_call` or `accept_incoming` awaits.
/// Released on drop, including when the future is cancelled.
struct Reservation<'a> {
    slots: &'a Mutex<Slots>,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        lock(self.slots).starting = false;
    }
}

fn lock(slots: &Mutex<Slots>) -> std::sync::MutexGuard<'_, Slots> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct VoipController<D: Dispatch + Clone + 'static> {
    call_agent: Arc<dyn CallAgent>,
    device_manager: Arc<dyn DeviceManager>,
    store: D,
    validation: CalleeValidation,
    permission_granted: AtomicBool,
    slots: Mutex<Slots>,
    _incoming_subscription: Mutex<Subscription>,
}

impl<D: Dispatch + Clone + 'static> VoipController<D> {
    /// Create the controller and start listening for inbound offers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(session: &Session, store: D, validation: CalleeValidation) -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Arc<dyn IncomingCall>>();
        let incoming_subscription =
            session
                .call_agent
                .on_incoming_call(Arc::new(move |incoming: &Arc<dyn IncomingCall>| {
                    let _ = tx.send(Arc::clone(incoming));
                }));

        let controller = Arc::new(Self {
            call_agent: Arc::clone(&session.call_agent),
            device_manager: Arc::clone(&session.device_manager),
            store,
            validation,
            permission_granted: AtomicBool::new(false),
            slots: Mutex::new(Slots::default()),
            _incoming_subscription: Mutex::new(incoming_subscription),
        });

        let weak: Weak<Self> = Arc::downgrade(&controller);
        tokio::spawn(async move {
            while let Some(incoming) = rx.recv().await {
                let Some(controller) = weak.upgrade() else {
                    break;
                };
                controller.handle_incoming(incoming).await;
            }
        });

        controller
    }

    pub fn set_callee(&self, raw: &str) {
        self.store.dispatch(Action::CalleeChanged(raw.to_string()));
    }

    /// Place a call to `callee`, with the first camera's video if there is one.
    pub async fn start_call(&self, callee: &str) -> Result<Arc<dyn Call>, CallError> {
        if !self.validation.accepts(callee) {
            return Err(CallError::InvalidCallee(callee.to_string()));
        }
        let _reservation = {
            let mut slots = self.lock_slots();
            if Self::call_in_progress(&mut slots) {
                return Err(CallError::CallInProgress);
            }
            if slots.incoming.is_some() {
                return Err(CallError::IncomingCallPending);
            }
            self.reserve(&mut slots)
        };

        self.ensure_permission().await?;
        let local_video_streams = self.first_camera_stream().await?;
        let options = StartCallOptions {
            local_video_streams,
        };

        let call = self
            .call_agent
            .start_call(&[callee.trim().to_string()], options)
            .map_err(|e| self.report(e))?;

        log::info!("Started call {} to {}", call.id(), callee.trim());
        self.store.dispatch(Action::CallStarted {
            id: call.id(),
            state: call.state(),
            direction: call.direction(),
        });
        self.watch_call(Arc::clone(&call));
        Ok(call)
    }

    /// Accept the pending offer, sending video from the first camera if any.
    pub async fn accept_incoming(&self) -> Result<Arc<dyn Call>, CallError> {
        let (incoming, _reservation) = {
            let mut slots = self.lock_slots();
            if Self::call_in_progress(&mut slots) {
                return Err(CallError::CallInProgress);
            }
            let incoming = slots.incoming.take().ok_or(CallError::NoIncomingCall)?;
            (incoming, self.reserve(&mut slots))
        };

        let local_video_streams = match self.first_camera_stream().await {
            Ok(streams) => streams,
            Err(e) => {
                self.lock_slots().incoming = Some(incoming);
                return Err(e);
            }
        };

        let call = match incoming
            .accept(AcceptCallOptions {
                local_video_streams,
            })
            .await
        {
            Ok(call) => call,
            Err(SdkError::CallEnded) => {
                log::info!("Call {} ended before it was answered", incoming.id());
                self.store.dispatch(Action::IncomingCallDeclined);
                return Err(CallError::Sdk(SdkError::CallEnded));
            }
            Err(e) => {
                self.lock_slots().incoming = Some(incoming);
                return Err(self.report(e));
            }
        };

        log::info!("Accepted call {} from {}", call.id(), incoming.caller());
        self.store.dispatch(Action::IncomingCallAccepted {
            id: call.id(),
            state: call.state(),
        });
        self.watch_call(Arc::clone(&call));
        Ok(call)
    }

    /// Reject the pending offer. The offer is cleared even if rejecting fails.
    pub async fn decline_incoming(&self) -> Result<(), CallError> {
        let incoming = self
            .lock_slots()
            .incoming
            .take()
            .ok_or(CallError::NoIncomingCall)?;

        let result = incoming.reject().await;
        self.store.dispatch(Action::IncomingCallDeclined);
        match result {
            Ok(()) => {
                log::info!("Declined call from {}", incoming.caller());
                Ok(())
            }
            Err(e) => Err(self.report(e)),
        }
    }

    pub async fn hang_up(&self) -> Result<(), CallError> {
        let call = {
            let mut slots = self.lock_slots();
            Self::live_call(&mut slots).ok_or(CallError::NoActiveCall)?
        };
        call.hang_up().await.map_err(|e| self.report(e))?;
        log::info!("Hung up call {}", call.id());
        Ok(())
    }

    pub fn active_call(&self) -> Option<Arc<dyn Call>> {
        Self::live_call(&mut self.lock_slots())
    }

    pub fn has_pending_offer(&self) -> bool {
        self.lock_slots().incoming.is_some()
    }

    /// Ask for device permission, then surface the offer.
    ///
    /// Without permission the offer is dropped silently for the user; the
    /// failure is logged and reported as a permission error.
    async fn handle_incoming(&self, incoming: Arc<dyn IncomingCall>) {
        log::info!("Incoming call {} from {}", incoming.id(), incoming.caller());
        if let Err(e) = self.ensure_permission().await {
            log::warn!("Not showing incoming call {}: {e}", incoming.id());
            return;
        }

        let replaced = self.lock_slots().incoming.replace(Arc::clone(&incoming));
        self.store.dispatch(Action::IncomingCallReceived {
            id: incoming.id(),
            caller: incoming.caller(),
        });

        if let Some(previous) = replaced {
            log::warn!("Incoming call {} superseded by {}", previous.id(), incoming.id());
            if let Err(e) = previous.reject().await {
                log::warn!("Failed to reject superseded call {}: {e}", previous.id());
            }
        }
    }

    async fn ensure_permission(&self) -> Result<(), CallError> {
        if self.permission_granted.load(Ordering::Acquire) {
            return Ok(());
        }
        match self
            .device_manager
            .ask_device_permission(PermissionConstraints::AUDIO_AND_VIDEO)
            .await
        {
            Ok(access) => {
                log::debug!("Device access granted: {access:?}");
                self.permission_granted.store(true, Ordering::Release);
                Ok(())
            }
            Err(e) => {
                let message = match e {
                    SdkError::PermissionDenied(message) => message,
                    other => other.to_string(),
                };
                log::error!("Device permission denied: {message}");
                self.store.dispatch(Action::PermissionDenied(message.clone()));
                Err(CallError::PermissionDenied(message))
            }
        }
    }

    /// Local video from the first camera, or nothing for an audio-only call.
    async fn first_camera_stream(&self) -> Result<Vec<Arc<dyn VideoStream>>, CallError> {
        let cameras = self
            .device_manager
            .get_cameras()
            .await
            .map_err(|e| self.report(e))?;
        let Some(camera) = cameras.first() else {
            log::info!("No camera found, continuing with audio only");
            return Ok(Vec::new());
        };
        let stream = self
            .device_manager
            .create_local_video_stream(camera)
            .map_err(|e| self.report(e))?;
        Ok(vec![stream])
    }

    fn watch_call(&self, call: Arc<dyn Call>) {
        let mirror = CallMirror::attach(Arc::clone(&call), self.store.clone());
        let task = tokio::spawn(mirror.run());

        // A previous mirror stops on its own once its call disconnects.
        let mut slots = self.lock_slots();
        slots.active_call = Some(call);
        slots.mirror = Some(task);
    }

    fn live_call(slots: &mut Slots) -> Option<Arc<dyn Call>> {
        if slots
            .active_call
            .as_ref()
            .is_some_and(|call| call.state() == CallState::Disconnected)
        {
            slots.active_call = None;
        }
        slots.active_call.clone()
    }

    fn call_in_progress(slots: &mut Slots) -> bool {
        slots.starting || Self::live_call(slots).is_some()
    }

    fn reserve(&self, slots: &mut Slots) -> Reservation<'_> {
        slots.starting = true;
        Reservation { slots: &self.slots }
    }

    fn report(&self, error: SdkError) -> CallError {
        log::error!("Call operation failed: {error}");
        self.store.dispatch(Action::OperationFailed(error.to_string()));
        CallError::Sdk(error)
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, Slots> {
        lock(&self.slots)
    }
}

impl<D: Dispatch + Clone + 'static> Drop for VoipController<D> {
    fn drop(&mut self) {
        let slots = self.slots.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slots.mirror.take() {
            task.abort();
        }
    }
}
