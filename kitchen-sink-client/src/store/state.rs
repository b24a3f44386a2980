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

//! The application state published by the store.

use std::collections::BTreeMap;

use kitchen_sink_types::Identity;

use crate::config::CalleeValidation;
use crate::sdk::{CallDirection, CallEndReason, CallState, ParticipantState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    FetchingIdentity,
    /// Identity received; call agent and device manager pending.
    Connecting,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Identity,
    Session,
    Permission,
    Operation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    pub kind: ErrorKind,
    pub message: String,
}

/// Where a rendered video tile comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VideoSource {
    Local,
    Remote(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoTile {
    pub source: VideoSource,
    pub stream_id: String,
    pub view_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallView {
    pub id: String,
    pub state: CallState,
    pub direction: CallDirection,
    pub participants: BTreeMap<String, ParticipantState>,
    pub video: Vec<VideoTile>,
}

impl CallView {
    pub fn new(id: String, state: CallState, direction: CallDirection) -> Self {
        Self {
            id,
            state,
            direction,
            participants: BTreeMap::new(),
            video: Vec::new(),
        }
    }

    pub fn local_tiles(&self) -> impl Iterator<Item = &VideoTile> {
        self.video.iter().filter(|t| t.source == VideoSource::Local)
    }

    pub fn remote_tiles(&self) -> impl Iterator<Item = &VideoTile> {
        self.video.iter().filter(|t| t.source != VideoSource::Local)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingCallView {
    pub id: String,
    pub caller: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndedCall {
    pub id: String,
    pub end_reason: Option<CallEndReason>,
}

/// Which controls the user can press. Recomputed on every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub start_call: bool,
    pub hang_up: bool,
    pub accept: bool,
    pub decline: bool,
}

impl Controls {
    pub fn derive(state: &AppState) -> Self {
        let ready = state.is_ready();
        let call_active = state.call.is_some();
        let offer_pending = state.incoming.is_some();
        Self {
            start_call: ready && state.callee_valid && !call_active && !offer_pending,
            hang_up: call_active,
            accept: ready && offer_pending && !call_active,
            decline: offer_pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub session: SessionStatus,
    pub identity: Option<Identity>,
    pub agent_ready: bool,
    pub device_ready: bool,
    pub validation: CalleeValidation,
    pub callee: String,
    pub callee_valid: bool,
    pub call: Option<CallView>,
    pub incoming: Option<IncomingCallView>,
    pub last_ended: Option<EndedCall>,
    pub last_error: Option<ErrorNotice>,
    pub controls: Controls,
}

impl AppState {
    pub fn new(validation: CalleeValidation) -> Self {
        Self {
            session: SessionStatus::Idle,
            identity: None,
            agent_ready: false,
            device_ready: false,
            validation,
            callee: String::new(),
            callee_valid: false,
            call: None,
            incoming: None,
            last_ended: None,
            last_error: None,
            controls: Controls::default(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.session == SessionStatus::Ready && self.agent_ready && self.device_ready
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(CalleeValidation::default())
    }
}
