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

//! Everything that can change the application state.

use kitchen_sink_types::Identity;

use crate::sdk::{CallDirection, CallEndReason, CallState, ParticipantState};
use crate::store::state::VideoSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    RequestIdentity,
    ReceiveIdentity(Identity),
    IdentityFailed(String),
    CallAgentReady,
    DeviceManagerReady,
    SessionFailed(String),

    CalleeChanged(String),

    CallStarted {
        id: String,
        state: CallState,
        direction: CallDirection,
    },
    CallIdChanged(String),
    CallStateChanged {
        state: CallState,
        end_reason: Option<CallEndReason>,
    },

    IncomingCallReceived {
        id: String,
        caller: String,
    },
    /// Moves the pending offer into the active-call slot in one step.
    IncomingCallAccepted {
        id: String,
        state: CallState,
    },
    IncomingCallDeclined,

    ParticipantAdded {
        id: String,
        state: ParticipantState,
    },
    ParticipantStateChanged {
        id: String,
        state: ParticipantState,
    },
    ParticipantRemoved {
        id: String,
    },

    VideoAttached {
        source: VideoSource,
        stream_id: String,
        view_id: String,
    },
    VideoDetached {
        source: VideoSource,
        stream_id: String,
    },

    PermissionDenied(String),
    OperationFailed(String),
    ClearError,
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::RequestIdentity => "RequestIdentity",
            Action::ReceiveIdentity(_) => "ReceiveIdentity",
            Action::IdentityFailed(_) => "IdentityFailed",
            Action::CallAgentReady => "CallAgentReady",
            Action::DeviceManagerReady => "DeviceManagerReady",
            Action::SessionFailed(_) => "SessionFailed",
            Action::CalleeChanged(_) => "CalleeChanged",
            Action::CallStarted { .. } => "CallStarted",
            Action::CallIdChanged(_) => "CallIdChanged",
            Action::CallStateChanged { .. } => "CallStateChanged",
            Action::IncomingCallReceived { .. } => "IncomingCallReceived",
            Action::IncomingCallAccepted { .. } => "IncomingCallAccepted",
            Action::IncomingCallDeclined => "IncomingCallDeclined",
            Action::ParticipantAdded { .. } => "ParticipantAdded",
            Action::ParticipantStateChanged { .. } => "ParticipantStateChanged",
            Action::ParticipantRemoved { .. } => "ParticipantRemoved",
            Action::VideoAttached { .. } => "VideoAttached",
            Action::VideoDetached { .. } => "VideoDetached",
            Action::PermissionDenied(_) => "PermissionDenied",
            Action::OperationFailed(_) => "OperationFailed",
            Action::ClearError => "ClearError",
        }
    }
}
