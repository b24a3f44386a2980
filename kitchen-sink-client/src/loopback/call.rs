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

//! Loopback calls, remote participants and inbound offers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;

use super::media::LoopbackVideoStream;
use super::LoopbackCallAgent;
use crate::sdk::{
    AcceptCallOptions, Call, CallDirection, CallEndReason, CallEvent, CallState,
    CollectionDiff, Emitter, IncomingCall, Listener, ParticipantEvent, ParticipantState,
    RemoteParticipant, SdkError, StreamKind, Subscription, VideoStream,
};

/// SIP code reported to the caller when the callee declines.
pub const DECLINED_CODE: u32 = 603;
/// SIP code reported when the callee is not registered on the network.
pub const NOT_FOUND_CODE: u32 = 404;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct CallInner {
    id: String,
    state: CallState,
    end_reason: Option<CallEndReason>,
    local_streams: Vec<Arc<dyn VideoStream>>,
    participants: Vec<Arc<LoopbackParticipant>>,
    peer: Weak<LoopbackCall>,
}

/// One side of a loopback call. State changes are driven either by the
/// other side or by the test hooks below.
pub struct LoopbackCall {
    owner: String,
    direction: CallDirection,
    inner: Mutex<CallInner>,
    events: Emitter<CallEvent>,
}

impl LoopbackCall {
    pub(crate) fn new(
        id: String,
        owner: String,
        direction: CallDirection,
        local_streams: Vec<Arc<dyn VideoStream>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            owner,
            direction,
            inner: Mutex::new(CallInner {
                id,
                state: CallState::Connecting,
                end_reason: None,
                local_streams,
                participants: Vec::new(),
                peer: Weak::new(),
            }),
            events: Emitter::new(),
        })
    }

    /// The user this side of the call belongs to.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn set_state(&self, state: CallState) {
        {
            let mut inner = lock(&self.inner);
            if inner.state == state || inner.state == CallState::Disconnected {
                return;
            }
            inner.state = state;
        }
        self.events.emit(&CallEvent::StateChanged);
    }

    pub fn set_id(&self, id: impl Into<String>) {
        lock(&self.inner).id = id.into();
        self.events.emit(&CallEvent::IdChanged);
    }

    /// Disconnect this side with `reason`. Later calls are ignored.
    pub fn end(&self, reason: CallEndReason) {
        {
            let mut inner = lock(&self.inner);
            if inner.state == CallState::Disconnected {
                return;
            }
            inner.state = CallState::Disconnected;
            inner.end_reason = Some(reason);
            inner.peer = Weak::new();
        }
        self.events.emit(&CallEvent::StateChanged);
    }

    /// Add a remote participant carrying `streams`.
    pub fn add_participant(
        &self,
        identifier: &str,
        state: ParticipantState,
        streams: Vec<Arc<LoopbackVideoStream>>,
    ) -> Arc<LoopbackParticipant> {
        let participant = Arc::new(LoopbackParticipant {
            identifier: identifier.to_string(),
            state: Mutex::new(state),
            streams: Mutex::new(streams),
            events: Emitter::new(),
        });
        lock(&self.inner).participants.push(Arc::clone(&participant));
        let added: Arc<dyn RemoteParticipant> = participant.clone();
        self.events
            .emit(&CallEvent::RemoteParticipantsUpdated(CollectionDiff::added(vec![added])));
        participant
    }

    pub fn remove_participant(&self, identifier: &str) -> bool {
        let removed = {
            let mut inner = lock(&self.inner);
            let Some(index) = inner
                .participants
                .iter()
                .position(|p| p.identifier == identifier)
            else {
                return false;
            };
            inner.participants.remove(index)
        };
        let removed: Arc<dyn RemoteParticipant> = removed;
        self.events
            .emit(&CallEvent::RemoteParticipantsUpdated(CollectionDiff::removed(vec![removed])));
        true
    }

    pub fn participant(&self, identifier: &str) -> Option<Arc<LoopbackParticipant>> {
        lock(&self.inner)
            .participants
            .iter()
            .find(|p| p.identifier == identifier)
            .cloned()
    }

    /// Swap every local stream for `stream` in a single update.
    pub fn replace_local_stream(&self, stream: Arc<dyn VideoStream>) {
        let removed = std::mem::replace(
            &mut lock(&self.inner).local_streams,
            vec![Arc::clone(&stream)],
        );
        self.events
            .emit(&CallEvent::LocalVideoStreamsUpdated(CollectionDiff {
                added: vec![stream],
                removed,
            }));
    }

    pub fn listener_count(&self) -> usize {
        self.events.listener_count()
    }

    pub(crate) fn link(&self, peer: &Arc<LoopbackCall>) {
        lock(&self.inner).peer = Arc::downgrade(peer);
    }

    /// What the other side sees of this side's local video.
    pub(crate) fn mirrored_streams(&self) -> Vec<Arc<LoopbackVideoStream>> {
        lock(&self.inner)
            .local_streams
            .iter()
            .map(|s| LoopbackVideoStream::new(s.stream_id(), StreamKind::Remote, s.is_available()))
            .collect()
    }
}

#[async_trait]
impl Call for LoopbackCall {
    fn id(&self) -> String {
        lock(&self.inner).id.clone()
    }

    fn state(&self) -> CallState {
        lock(&self.inner).state.clone()
    }

    fn direction(&self) -> CallDirection {
        self.direction
    }

    fn call_end_reason(&self) -> Option<CallEndReason> {
        lock(&self.inner).end_reason
    }

    fn local_video_streams(&self) -> Vec<Arc<dyn VideoStream>> {
        lock(&self.inner).local_streams.clone()
    }

    fn remote_participants(&self) -> Vec<Arc<dyn RemoteParticipant>> {
        lock(&self.inner)
            .participants
            .iter()
            .map(|p| Arc::clone(p) as Arc<dyn RemoteParticipant>)
            .collect()
    }

    async fn hang_up(&self) -> Result<(), SdkError> {
        if self.state() == CallState::Disconnected {
            return Err(SdkError::CallEnded);
        }
        let peer = lock(&self.inner).peer.upgrade();
        self.set_state(CallState::Disconnecting);
        self.end(CallEndReason::default());
        if let Some(peer) = peer {
            peer.end(CallEndReason::default());
        }
        Ok(())
    }

    fn on_call_event(&self, listener: Listener<CallEvent>) -> Subscription {
        self.events.subscribe(listener)
    }
}

pub struct LoopbackParticipant {
    identifier: String,
    state: Mutex<ParticipantState>,
    streams: Mutex<Vec<Arc<LoopbackVideoStream>>>,
    events: Emitter<ParticipantEvent>,
}

impl LoopbackParticipant {
    pub fn set_state(&self, state: ParticipantState) {
        *lock(&self.state) = state;
        self.events.emit(&ParticipantEvent::StateChanged);
    }

    pub fn add_video_stream(&self, stream_id: &str, available: bool) -> Arc<LoopbackVideoStream> {
        let stream = LoopbackVideoStream::new(stream_id, StreamKind::Remote, available);
        lock(&self.streams).push(Arc::clone(&stream));
        let added: Arc<dyn VideoStream> = stream.clone();
        self.events
            .emit(&ParticipantEvent::VideoStreamsUpdated(CollectionDiff::added(vec![added])));
        stream
    }

    pub fn remove_video_stream(&self, stream_id: &str) -> bool {
        let removed = {
            let mut streams = lock(&self.streams);
            let Some(index) = streams.iter().position(|s| s.stream_id() == stream_id) else {
                return false;
            };
            streams.remove(index)
        };
        let removed: Arc<dyn VideoStream> = removed;
        self.events
            .emit(&ParticipantEvent::VideoStreamsUpdated(CollectionDiff::removed(vec![removed])));
        true
    }

    pub fn stream(&self, stream_id: &str) -> Option<Arc<LoopbackVideoStream>> {
        lock(&self.streams)
            .iter()
            .find(|s| s.stream_id() == stream_id)
            .cloned()
    }

    pub fn listener_count(&self) -> usize {
        self.events.listener_count()
    }
}

impl RemoteParticipant for LoopbackParticipant {
    fn identifier(&self) -> String {
        self.identifier.clone()
    }

    fn state(&self) -> ParticipantState {
        lock(&self.state).clone()
    }

    fn video_streams(&self) -> Vec<Arc<dyn VideoStream>> {
        lock(&self.streams)
            .iter()
            .map(|s| Arc::clone(s) as Arc<dyn VideoStream>)
            .collect()
    }

    fn on_participant_event(&self, listener: Listener<ParticipantEvent>) -> Subscription {
        self.events.subscribe(listener)
    }
}

/// An offer from `caller`, delivered to the callee's agent.
pub struct LoopbackIncomingCall {
    pub(crate) id: String,
    pub(crate) caller: String,
    pub(crate) caller_call: Weak<LoopbackCall>,
    pub(crate) callee: Weak<LoopbackCallAgent>,
    pub(crate) answered: AtomicBool,
}

#[async_trait]
impl IncomingCall for LoopbackIncomingCall {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn caller(&self) -> String {
        self.caller.clone()
    }

    async fn accept(&self, options: AcceptCallOptions) -> Result<Arc<dyn Call>, SdkError> {
        let caller_call = self
            .caller_call
            .upgrade()
            .filter(|call| call.state() != CallState::Disconnected)
            .ok_or(SdkError::CallEnded)?;
        let agent = self.callee.upgrade().ok_or(SdkError::CallEnded)?;
        if self.answered.swap(true, Ordering::SeqCst) {
            return Err(SdkError::Operation("offer already answered".to_string()));
        }

        let call = LoopbackCall::new(
            self.id.clone(),
            agent.user_id.clone(),
            CallDirection::Incoming,
            options.local_video_streams,
        );
        agent.track(Arc::clone(&call));

        call.link(&caller_call);
        caller_call.link(&call);
        call.add_participant(
            caller_call.owner(),
            ParticipantState::Connected,
            caller_call.mirrored_streams(),
        );
        caller_call.add_participant(
            call.owner(),
            ParticipantState::Connected,
            call.mirrored_streams(),
        );
        call.set_state(CallState::Connected);
        caller_call.set_state(CallState::Connected);

        Ok(call)
    }

    async fn reject(&self) -> Result<(), SdkError> {
        if self.answered.swap(true, Ordering::SeqCst) {
            return Err(SdkError::Operation("offer already answered".to_string()));
        }
        if let Some(caller_call) = self.caller_call.upgrade() {
            caller_call.end(CallEndReason {
                code: DECLINED_CODE,
                subcode: 0,
            });
        }
        Ok(())
    }
}
