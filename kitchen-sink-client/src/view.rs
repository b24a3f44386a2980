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

//! View models derived from the published [`AppState`].
//!
//! These carry everything a rendering layer needs (labels, enabled flags,
//! the views to place in each video container) and nothing about how it is
//! drawn.

use std::fmt;

use crate::store::{AppState, ErrorKind, SessionStatus, VideoSource};

pub const TITLE: &str = "Voice over Internet Protocol";
pub const CALLEE_PLACEHOLDER: &str = "Recipient ACS ID";
pub const START_CALL_LABEL: &str = "Start Call";
pub const HANG_UP_LABEL: &str = "Hang Up";
pub const ACCEPT_LABEL: &str = "Accept";
pub const DECLINE_LABEL: &str = "Decline";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: &'static str,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextField {
    pub value: String,
    pub placeholder: &'static str,
    pub valid: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingToast {
    pub message: String,
    pub accept: Button,
    pub decline: Button,
}

/// A container the SDK renders one or more views into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoContainer {
    pub label: String,
    pub view_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoipView {
    pub title: &'static str,
    pub callee: TextField,
    pub start_call: Button,
    pub hang_up: Button,
    pub call_id: Option<String>,
    pub call_state: Option<String>,
    pub last_call: Option<String>,
    pub toast: Option<IncomingToast>,
    pub local_video: VideoContainer,
    pub remote_video: Vec<VideoContainer>,
    pub banner: Option<String>,
}

impl VoipView {
    pub fn from_state(state: &AppState) -> Self {
        let controls = state.controls;

        let (call_id, call_state) = match &state.call {
            Some(call) => (Some(call.id.clone()), Some(call.state.to_string())),
            None => (None, None),
        };

        let last_call = state.last_ended.as_ref().map(|ended| match ended.end_reason {
            Some(reason) => format!("Call {} ended ({reason})", ended.id),
            None => format!("Call {} ended", ended.id),
        });

        let toast = state.incoming.as_ref().map(|offer| IncomingToast {
            message: format!("Incoming call from {}", offer.caller),
            accept: Button {
                label: ACCEPT_LABEL,
                enabled: controls.accept,
            },
            decline: Button {
                label: DECLINE_LABEL,
                enabled: controls.decline,
            },
        });

        let local_video = VideoContainer {
            label: "Local video".to_string(),
            view_ids: state
                .call
                .iter()
                .flat_map(|call| call.local_tiles())
                .map(|tile| tile.view_id.clone())
                .collect(),
        };

        let mut remote_video: Vec<VideoContainer> = Vec::new();
        if let Some(call) = &state.call {
            for participant in call.participants.keys() {
                let source = VideoSource::Remote(participant.clone());
                remote_video.push(VideoContainer {
                    label: participant.clone(),
                    view_ids: call
                        .video
                        .iter()
                        .filter(|tile| tile.source == source)
                        .map(|tile| tile.view_id.clone())
                        .collect(),
                });
            }
        }

        let banner = state.last_error.as_ref().map(|error| {
            let prefix = match error.kind {
                ErrorKind::Identity => "Could not get an identity",
                ErrorKind::Session => "Could not start the calling session",
                ErrorKind::Permission => "Camera and microphone access denied",
                ErrorKind::Operation => "Call operation failed",
            };
            format!("{prefix}: {}", error.message)
        });

        Self {
            title: TITLE,
            callee: TextField {
                value: state.callee.clone(),
                placeholder: CALLEE_PLACEHOLDER,
                valid: state.callee_valid,
            },
            start_call: Button {
                label: START_CALL_LABEL,
                enabled: controls.start_call,
            },
            hang_up: Button {
                label: HANG_UP_LABEL,
                enabled: controls.hang_up,
            },
            call_id,
            call_state,
            last_call,
            toast,
            local_video,
            remote_video,
            banner,
        }
    }
}

impl fmt::Display for VoipView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |b: &Button| if b.enabled { "on" } else { "off" };
        write!(
            f,
            "[{}] {}={} {}={}",
            self.title,
            self.start_call.label,
            flag(&self.start_call),
            self.hang_up.label,
            flag(&self.hang_up)
        )?;
        if let (Some(id), Some(state)) = (&self.call_id, &self.call_state) {
            write!(f, " call={id} state={state}")?;
        }
        let remote: usize = self.remote_video.iter().map(|c| c.view_ids.len()).sum();
        write!(
            f,
            " video(local={}, remote={remote})",
            self.local_video.view_ids.len()
        )?;
        if let Some(toast) = &self.toast {
            write!(f, " | {}", toast.message)?;
        }
        if let Some(last) = &self.last_call {
            write!(f, " | {last}")?;
        }
        if let Some(banner) = &self.banner {
            write!(f, " | {banner}")?;
        }
        Ok(())
    }
}

/// Who is signed in, for the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityBadge {
    pub status: &'static str,
    pub user_id: Option<String>,
}

impl IdentityBadge {
    pub fn from_state(state: &AppState) -> Self {
        let status = match state.session {
            SessionStatus::Idle => "Not signed in",
            SessionStatus::FetchingIdentity => "Fetching identity",
            SessionStatus::Connecting => "Connecting",
            SessionStatus::Ready => "Ready",
            SessionStatus::Failed => "Unavailable",
        };
        Self {
            status,
            user_id: state.identity.as_ref().map(|i| i.user.id.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::{CallDirection, CallState, ParticipantState};
    use crate::store::{reduce, Action};

    fn ready() -> AppState {
        let mut state = AppState::default();
        for action in [
            Action::RequestIdentity,
            Action::CallAgentReady,
            Action::DeviceManagerReady,
        ] {
            reduce(&mut state, action);
        }
        state
    }

    #[test]
    fn idle_view_has_fixed_labels() {
        let view = VoipView::from_state(&AppState::default());
        assert_eq!(view.title, "Voice over Internet Protocol");
        assert_eq!(view.callee.placeholder, "Recipient ACS ID");
        assert!(!view.start_call.enabled);
        assert!(!view.hang_up.enabled);
        assert!(view.call_id.is_none());
        assert!(view.toast.is_none());
    }

    #[test]
    fn call_fields_and_video_follow_state() {
        let mut state = ready();
        for action in [
            Action::CallStarted {
                id: "call-9".to_string(),
                state: CallState::Connected,
                direction: CallDirection::Outgoing,
            },
            Action::ParticipantAdded {
                id: "bob".to_string(),
                state: ParticipantState::Connected,
            },
            Action::VideoAttached {
                source: VideoSource::Remote("bob".to_string()),
                stream_id: "s".to_string(),
                view_id: "view-1".to_string(),
            },
        ] {
            reduce(&mut state, action);
        }

        let view = VoipView::from_state(&state);
        assert_eq!(view.call_id.as_deref(), Some("call-9"));
        assert_eq!(view.call_state.as_deref(), Some("Connected"));
        assert!(view.hang_up.enabled);
        assert_eq!(view.remote_video.len(), 1);
        assert_eq!(view.remote_video[0].view_ids, vec!["view-1".to_string()]);
        assert!(view.to_string().contains("call=call-9"));
    }

    #[test]
    fn toast_reflects_offer() {
        let mut state = ready();
        reduce(
            &mut state,
            Action::IncomingCallReceived {
                id: "offer".to_string(),
                caller: "alice".to_string(),
            },
        );
        let toast = VoipView::from_state(&state).toast.unwrap();
        assert_eq!(toast.message, "Incoming call from alice");
        assert!(toast.accept.enabled);
        assert!(toast.decline.enabled);
    }

    #[test]
    fn errors_become_a_banner() {
        let mut state = AppState::default();
        reduce(&mut state, Action::PermissionDenied("blocked".to_string()));
        let view = VoipView::from_state(&state);
        assert_eq!(
            view.banner.as_deref(),
            Some("Camera and microphone access denied: blocked")
        );
    }

    #[test]
    fn badge_tracks_session() {
        let mut state = AppState::default();
        assert_eq!(IdentityBadge::from_state(&state).status, "Not signed in");
        reduce(&mut state, Action::IdentityFailed("down".to_string()));
        assert_eq!(IdentityBadge::from_state(&state).status, "Unavailable");
    }
}
