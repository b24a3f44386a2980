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

//! Capability contract of the calling SDK.
//!
//! Signaling, media and call-state transitions all live behind these traits.
//! Objects push changes to listeners; listeners are plain synchronous
//! callbacks and are expected to do nothing more than enqueue work.
//! [`crate::loopback`] provides an in-process implementation.

mod subscription;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::credential::CommunicationTokenCredential;

pub use subscription::{Emitter, Listener, Subscription};

/// Errors reported by SDK operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SdkError {
    #[error("device permission denied: {0}")]
    PermissionDenied(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("device unavailable: {0}")]
    Device(String),

    #[error("call has already ended")]
    CallEnded,

    #[error("renderer has been disposed")]
    Disposed,

    #[error("{0}")]
    Operation(String),
}

/// Lifecycle label of a call, as reported by the SDK.
///
/// Labels the application reacts to have named variants; anything else is
/// carried verbatim in [`CallState::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallState {
    None,
    Connecting,
    Ringing,
    EarlyMedia,
    Connected,
    LocalHold,
    RemoteHold,
    InLobby,
    Disconnecting,
    Disconnected,
    Other(String),
}

impl CallState {
    pub fn as_label(&self) -> &str {
        match self {
            CallState::None => "None",
            CallState::Connecting => "Connecting",
            CallState::Ringing => "Ringing",
            CallState::EarlyMedia => "EarlyMedia",
            CallState::Connected => "Connected",
            CallState::LocalHold => "LocalHold",
            CallState::RemoteHold => "RemoteHold",
            CallState::InLobby => "InLobby",
            CallState::Disconnecting => "Disconnecting",
            CallState::Disconnected => "Disconnected",
            CallState::Other(label) => label,
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label {
            "None" => CallState::None,
            "Connecting" => CallState::Connecting,
            "Ringing" => CallState::Ringing,
            "EarlyMedia" => CallState::EarlyMedia,
            "Connected" => CallState::Connected,
            "LocalHold" => CallState::LocalHold,
            "RemoteHold" => CallState::RemoteHold,
            "InLobby" => CallState::InLobby,
            "Disconnecting" => CallState::Disconnecting,
            "Disconnected" => CallState::Disconnected,
            other => CallState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// State of a remote participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParticipantState {
    Idle,
    Connecting,
    Ringing,
    EarlyMedia,
    Connected,
    Hold,
    InLobby,
    Disconnected,
    Other(String),
}

impl fmt::Display for ParticipantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ParticipantState::Idle => "Idle",
            ParticipantState::Connecting => "Connecting",
            ParticipantState::Ringing => "Ringing",
            ParticipantState::EarlyMedia => "EarlyMedia",
            ParticipantState::Connected => "Connected",
            ParticipantState::Hold => "Hold",
            ParticipantState::InLobby => "InLobby",
            ParticipantState::Disconnected => "Disconnected",
            ParticipantState::Other(label) => label,
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallDirection {
    Incoming,
    Outgoing,
}

/// Why a call ended. `code` follows SIP conventions (0 = normal hang-up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallEndReason {
    pub code: u32,
    pub subcode: u32,
}

impl fmt::Display for CallEndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code {} / subcode {}", self.code, self.subcode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoDeviceInfo {
    pub id: String,
    pub name: String,
}

/// Which devices to request access to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionConstraints {
    pub audio: bool,
    pub video: bool,
}

impl PermissionConstraints {
    pub const AUDIO_AND_VIDEO: Self = Self {
        audio: true,
        video: true,
    };
}

/// Access actually granted by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceAccess {
    pub audio: bool,
    pub video: bool,
}

/// Surface a renderer draws into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererView {
    pub view_id: String,
    pub stream_id: String,
}

/// Items added to and removed from an SDK collection in one update.
#[derive(Clone)]
pub struct CollectionDiff<T> {
    pub added: Vec<T>,
    pub removed: Vec<T>,
}

impl<T> CollectionDiff<T> {
    pub fn added(items: Vec<T>) -> Self {
        Self {
            added: items,
            removed: Vec::new(),
        }
    }

    pub fn removed(items: Vec<T>) -> Self {
        Self {
            added: Vec::new(),
            removed: items,
        }
    }
}

#[derive(Clone, Default)]
pub struct StartCallOptions {
    pub local_video_streams: Vec<Arc<dyn VideoStream>>,
}

#[derive(Clone, Default)]
pub struct AcceptCallOptions {
    pub local_video_streams: Vec<Arc<dyn VideoStream>>,
}

#[derive(Clone)]
pub enum CallEvent {
    IdChanged,
    StateChanged,
    LocalVideoStreamsUpdated(CollectionDiff<Arc<dyn VideoStream>>),
    RemoteParticipantsUpdated(CollectionDiff<Arc<dyn RemoteParticipant>>),
}

#[derive(Clone)]
pub enum ParticipantEvent {
    StateChanged,
    VideoStreamsUpdated(CollectionDiff<Arc<dyn VideoStream>>),
}

/// Entry point of the SDK: one per process.
#[async_trait]
pub trait CallClient: Send + Sync {
    async fn create_call_agent(
        &self,
        credential: Arc<CommunicationTokenCredential>,
    ) -> Result<Arc<dyn CallAgent>, SdkError>;

    async fn get_device_manager(&self) -> Result<Arc<dyn DeviceManager>, SdkError>;
}

/// Places calls and announces inbound offers.
pub trait CallAgent: Send + Sync {
    fn user_id(&self) -> String;

    fn start_call(
        &self,
        callees: &[String],
        options: StartCallOptions,
    ) -> Result<Arc<dyn Call>, SdkError>;

    fn on_incoming_call(&self, listener: Listener<Arc<dyn IncomingCall>>) -> Subscription;
}

#[async_trait]
pub trait DeviceManager: Send + Sync {
    async fn ask_device_permission(
        &self,
        constraints: PermissionConstraints,
    ) -> Result<DeviceAccess, SdkError>;

    async fn get_cameras(&self) -> Result<Vec<VideoDeviceInfo>, SdkError>;

    fn create_local_video_stream(
        &self,
        camera: &VideoDeviceInfo,
    ) -> Result<Arc<dyn VideoStream>, SdkError>;
}

#[async_trait]
pub trait Call: Send + Sync {
    fn id(&self) -> String;
    fn state(&self) -> CallState;
    fn direction(&self) -> CallDirection;
    fn call_end_reason(&self) -> Option<CallEndReason>;
    fn local_video_streams(&self) -> Vec<Arc<dyn VideoStream>>;
    fn remote_participants(&self) -> Vec<Arc<dyn RemoteParticipant>>;

    async fn hang_up(&self) -> Result<(), SdkError>;

    fn on_call_event(&self, listener: Listener<CallEvent>) -> Subscription;
}

pub trait RemoteParticipant: Send + Sync {
    fn identifier(&self) -> String;
    fn state(&self) -> ParticipantState;
    fn video_streams(&self) -> Vec<Arc<dyn VideoStream>>;
    fn on_participant_event(&self, listener: Listener<ParticipantEvent>) -> Subscription;
}

pub trait VideoStream: Send + Sync {
    fn stream_id(&self) -> String;
    fn kind(&self) -> StreamKind;
    fn is_available(&self) -> bool;

    /// Fires with the new availability whenever it flips.
    fn on_availability_changed(&self, listener: Listener<bool>) -> Subscription;

    fn create_renderer(&self) -> Result<Box<dyn VideoStreamRenderer>, SdkError>;
}

/// A renderer holds display resources until [`dispose`](Self::dispose) is called.
#[async_trait]
pub trait VideoStreamRenderer: Send + Sync {
    async fn create_view(&self) -> Result<RendererView, SdkError>;
    fn dispose(&self);
}

#[async_trait]
pub trait IncomingCall: Send + Sync {
    fn id(&self) -> String;
    fn caller(&self) -> String;
    async fn accept(&self, options: AcceptCallOptions) -> Result<Arc<dyn Call>, SdkError>;
    async fn reject(&self) -> Result<(), SdkError>;
}
