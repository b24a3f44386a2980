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

//! Pure state transitions. Controls are recomputed in the same step as the
//! change that affects them, so no published snapshot is half-updated.

use crate::sdk::{CallDirection, CallState};
use crate::store::actions::Action;
use crate::store::state::{
    AppState, CallView, Controls, EndedCall, ErrorKind, ErrorNotice, IncomingCallView,
    SessionStatus, VideoSource, VideoTile,
};

pub fn reduce(state: &mut AppState, action: Action) {
    apply(state, action);
    state.controls = Controls::derive(state);
}

fn apply(state: &mut AppState, action: Action) {
    match action {
        Action::RequestIdentity => {
            state.session = SessionStatus::FetchingIdentity;
            state.identity = None;
            state.agent_ready = false;
            state.device_ready = false;
        }
        Action::ReceiveIdentity(identity) => {
            state.identity = Some(identity);
            state.session = SessionStatus::Connecting;
        }
        Action::IdentityFailed(message) => {
            state.session = SessionStatus::Failed;
            state.last_error = Some(notice(ErrorKind::Identity, message));
        }
        Action::CallAgentReady => {
            state.agent_ready = true;
            promote_when_ready(state);
        }
        Action::DeviceManagerReady => {
            state.device_ready = true;
            promote_when_ready(state);
        }
        Action::SessionFailed(message) => {
            state.session = SessionStatus::Failed;
            state.agent_ready = false;
            state.device_ready = false;
            state.last_error = Some(notice(ErrorKind::Session, message));
        }

        Action::CalleeChanged(raw) => {
            state.callee_valid = state.validation.accepts(&raw);
            state.callee = raw;
        }

        Action::CallStarted {
            id,
            state: call_state,
            direction,
        } => {
            state.last_ended = None;
            state.call = Some(CallView::new(id, call_state, direction));
        }
        Action::CallIdChanged(id) => {
            if let Some(call) = state.call.as_mut() {
                call.id = id;
            }
        }
        Action::CallStateChanged {
            state: call_state,
            end_reason,
        } => {
            if call_state == CallState::Disconnected {
                if let Some(call) = state.call.take() {
                    state.last_ended = Some(EndedCall {
                        id: call.id,
                        end_reason,
                    });
                }
            } else if let Some(call) = state.call.as_mut() {
                call.state = call_state;
            }
        }

        Action::IncomingCallReceived { id, caller } => {
            state.incoming = Some(IncomingCallView { id, caller });
        }
        Action::IncomingCallAccepted { id, state: call_state } => {
            state.incoming = None;
            state.last_ended = None;
            state.call = Some(CallView::new(id, call_state, CallDirection::Incoming));
        }
        Action::IncomingCallDeclined => {
            state.incoming = None;
        }

        Action::ParticipantAdded {
            id,
            state: participant,
        } => {
            if let Some(call) = state.call.as_mut() {
                call.participants.insert(id, participant);
            }
        }
        Action::ParticipantStateChanged {
            id,
            state: participant,
        } => {
            if let Some(slot) = state
                .call
                .as_mut()
                .and_then(|call| call.participants.get_mut(&id))
            {
                *slot = participant;
            }
        }
        Action::ParticipantRemoved { id } => {
            if let Some(call) = state.call.as_mut() {
                call.participants.remove(&id);
                let source = VideoSource::Remote(id);
                call.video.retain(|tile| tile.source != source);
            }
        }

        Action::VideoAttached {
            source,
            stream_id,
            view_id,
        } => {
            if let Some(call) = state.call.as_mut() {
                call.video
                    .retain(|tile| !(tile.source == source && tile.stream_id == stream_id));
                call.video.push(VideoTile {
                    source,
                    stream_id,
                    view_id,
                });
            }
        }
        Action::VideoDetached { source, stream_id } => {
            if let Some(call) = state.call.as_mut() {
                call.video
                    .retain(|tile| !(tile.source == source && tile.stream_id == stream_id));
            }
        }

        Action::PermissionDenied(message) => {
            state.last_error = Some(notice(ErrorKind::Permission, message));
        }
        Action::OperationFailed(message) => {
            state.last_error = Some(notice(ErrorKind::Operation, message));
        }
        Action::ClearError => state.last_error = None,
    }
}

fn promote_when_ready(state: &mut AppState) {
    if state.agent_ready && state.device_ready && state.session != SessionStatus::Failed {
        state.session = SessionStatus::Ready;
    }
}

fn notice(kind: ErrorKind, message: String) -> ErrorNotice {
    ErrorNotice { kind, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalleeValidation;
    use crate::sdk::{CallEndReason, ParticipantState};

    const CALLEE: &str =
        "8:acs:3f1c9a52-7d1e-4b7a-9e0c-5a2f4c7b8d10_9b2e4f6a-1c3d-4e5f-8a7b-6c5d4e3f2a1b";

    fn ready_state() -> AppState {
        let mut state = AppState::new(CalleeValidation::Length);
        reduce(&mut state, Action::RequestIdentity);
        reduce(&mut state, Action::CallAgentReady);
        reduce(&mut state, Action::DeviceManagerReady);
        state
    }

    fn run(state: &mut AppState, actions: Vec<Action>) {
        for action in actions {
            reduce(state, action);
        }
    }

    #[test]
    fn start_call_needs_ready_session_and_valid_callee() {
        let mut state = AppState::new(CalleeValidation::Length);
        reduce(&mut state, Action::CalleeChanged(CALLEE.to_string()));
        assert!(state.callee_valid);
        assert!(!state.controls.start_call);

        reduce(&mut state, Action::RequestIdentity);
        reduce(&mut state, Action::CallAgentReady);
        assert!(!state.controls.start_call);
        reduce(&mut state, Action::DeviceManagerReady);
        assert_eq!(state.session, SessionStatus::Ready);
        assert!(state.controls.start_call);

        reduce(&mut state, Action::CalleeChanged(CALLEE[..78].to_string()));
        assert!(!state.controls.start_call);
    }

    #[test]
    fn active_call_swaps_controls() {
        let mut state = ready_state();
        reduce(&mut state, Action::CalleeChanged(CALLEE.to_string()));
        reduce(
            &mut state,
            Action::CallStarted {
                id: "call-1".to_string(),
                state: CallState::Connecting,
                direction: CallDirection::Outgoing,
            },
        );
        assert!(state.controls.hang_up);
        assert!(!state.controls.start_call);

        reduce(
            &mut state,
            Action::CallStateChanged {
                state: CallState::Connected,
                end_reason: None,
            },
        );
        assert_eq!(state.call.as_ref().unwrap().state, CallState::Connected);
        assert!(state.controls.hang_up);
        assert!(!state.controls.start_call);
    }

    #[test]
    fn disconnect_records_end_reason_and_clears_call() {
        let mut state = ready_state();
        run(
            &mut state,
            vec![
                Action::CalleeChanged(CALLEE.to_string()),
                Action::CallStarted {
                    id: "call-1".to_string(),
                    state: CallState::Connected,
                    direction: CallDirection::Outgoing,
                },
                Action::CallStateChanged {
                    state: CallState::Disconnected,
                    end_reason: Some(CallEndReason {
                        code: 603,
                        subcode: 0,
                    }),
                },
            ],
        );
        assert!(state.call.is_none());
        let ended = state.last_ended.as_ref().unwrap();
        assert_eq!(ended.id, "call-1");
        assert_eq!(ended.end_reason.unwrap().code, 603);
        assert!(state.controls.start_call);
        assert!(!state.controls.hang_up);
    }

    #[test]
    fn accepting_moves_offer_into_call_in_one_step() {
        let mut state = ready_state();
        reduce(
            &mut state,
            Action::IncomingCallReceived {
                id: "offer-1".to_string(),
                caller: "8:acs:caller".to_string(),
            },
        );
        assert!(state.controls.accept);
        assert!(state.controls.decline);

        reduce(
            &mut state,
            Action::IncomingCallAccepted {
                id: "offer-1".to_string(),
                state: CallState::Connected,
            },
        );
        assert!(state.incoming.is_none());
        let call = state.call.as_ref().unwrap();
        assert_eq!(call.direction, CallDirection::Incoming);
        assert!(!state.controls.accept);
        assert!(state.controls.hang_up);
    }

    #[test]
    fn offer_during_active_call_can_only_be_declined() {
        let mut state = ready_state();
        run(
            &mut state,
            vec![
                Action::CallStarted {
                    id: "call-1".to_string(),
                    state: CallState::Connected,
                    direction: CallDirection::Outgoing,
                },
                Action::IncomingCallReceived {
                    id: "offer-2".to_string(),
                    caller: "someone".to_string(),
                },
            ],
        );
        assert!(!state.controls.accept);
        assert!(state.controls.decline);

        reduce(&mut state, Action::IncomingCallDeclined);
        assert!(state.incoming.is_none());
        assert!(state.call.is_some());
    }

    #[test]
    fn identity_failure_leaves_everything_disabled() {
        let mut state = AppState::default();
        run(
            &mut state,
            vec![
                Action::CalleeChanged(CALLEE.to_string()),
                Action::RequestIdentity,
                Action::IdentityFailed("issuer down".to_string()),
            ],
        );
        assert_eq!(state.session, SessionStatus::Failed);
        assert_eq!(state.last_error.as_ref().unwrap().kind, ErrorKind::Identity);
        assert_eq!(state.controls, Controls::default());
    }

    #[test]
    fn session_failure_drops_the_successful_half() {
        let mut state = AppState::default();
        run(
            &mut state,
            vec![
                Action::RequestIdentity,
                Action::CallAgentReady,
                Action::SessionFailed("no devices".to_string()),
            ],
        );
        assert!(!state.agent_ready);
        assert!(!state.is_ready());
        assert_eq!(state.last_error.as_ref().unwrap().kind, ErrorKind::Session);
    }

    #[test]
    fn removing_participant_drops_its_tiles() {
        let mut state = ready_state();
        run(
            &mut state,
            vec![
                Action::CallStarted {
                    id: "call-1".to_string(),
                    state: CallState::Connected,
                    direction: CallDirection::Outgoing,
                },
                Action::ParticipantAdded {
                    id: "bob".to_string(),
                    state: ParticipantState::Connected,
                },
                Action::VideoAttached {
                    source: VideoSource::Remote("bob".to_string()),
                    stream_id: "s1".to_string(),
                    view_id: "v1".to_string(),
                },
                Action::VideoAttached {
                    source: VideoSource::Local,
                    stream_id: "cam".to_string(),
                    view_id: "v2".to_string(),
                },
                Action::ParticipantRemoved {
                    id: "bob".to_string(),
                },
            ],
        );
        let call = state.call.as_ref().unwrap();
        assert!(call.participants.is_empty());
        assert_eq!(call.remote_tiles().count(), 0);
        assert_eq!(call.local_tiles().count(), 1);
    }

    #[test]
    fn events_without_a_call_are_ignored() {
        let mut state = ready_state();
        let before = state.clone();
        run(
            &mut state,
            vec![
                Action::CallIdChanged("ghost".to_string()),
                Action::CallStateChanged {
                    state: CallState::Disconnected,
                    end_reason: None,
                },
                Action::ParticipantRemoved {
                    id: "bob".to_string(),
                },
            ],
        );
        assert_eq!(state, before);
    }
}
