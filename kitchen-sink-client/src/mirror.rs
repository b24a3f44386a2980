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

//! Call State Mirror.
//!
//! Copies what the SDK pushes about one call into the store: id and state
//! changes, remote participants, and the video streams of both sides.
//!
//! SDK listeners only enqueue a [`MirrorSignal`]; the mirror is the single
//! consumer and handles signals one at a time, reading the current value
//! from the SDK object when it does (several state changes may collapse into
//! one). For every tracked participant and stream it owns the
//! [`Subscription`]s, so dropping an entry detaches its listeners.
//!
//! Renderers are created on the first transition to available and disposed
//! on the transition back, on removal, and when the call disconnects. There
//! is never more than one renderer per stream.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::sdk::{
    Call, CallEvent, CallState, CollectionDiff, ParticipantEvent, RemoteParticipant,
    RendererView, Subscription, VideoStream, VideoStreamRenderer,
};
use crate::store::{Action, Dispatch, VideoSource};

/// Identifies a stream across both sides of the call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StreamKey {
    Local(String),
    Remote { participant: String, stream: String },
}

impl StreamKey {
    fn source(&self) -> VideoSource {
        match self {
            StreamKey::Local(_) => VideoSource::Local,
            StreamKey::Remote { participant, .. } => VideoSource::Remote(participant.clone()),
        }
    }

    fn stream_id(&self) -> &str {
        match self {
            StreamKey::Local(stream) | StreamKey::Remote { stream, .. } => stream,
        }
    }

    fn belongs_to(&self, participant_id: &str) -> bool {
        matches!(self, StreamKey::Remote { participant, .. } if participant == participant_id)
    }
}

/// Work queued by SDK listeners.
pub enum MirrorSignal {
    CallIdChanged,
    CallStateChanged,
    LocalStreams(CollectionDiff<Arc<dyn VideoStream>>),
    Participants(CollectionDiff<Arc<dyn RemoteParticipant>>),
    ParticipantStateChanged(String),
    ParticipantStreams {
        participant: String,
        diff: CollectionDiff<Arc<dyn VideoStream>>,
    },
    Availability(StreamKey),
}

struct ParticipantEntry {
    participant: Arc<dyn RemoteParticipant>,
    _subscription: Subscription,
}

struct ActiveRenderer {
    renderer: Box<dyn VideoStreamRenderer>,
    view: RendererView,
}

struct StreamEntry {
    stream: Arc<dyn VideoStream>,
    _subscription: Subscription,
    renderer: Option<ActiveRenderer>,
}

pub struct CallMirror<D: Dispatch> {
    call: Arc<dyn Call>,
    store: D,
    signals_tx: mpsc::UnboundedSender<MirrorSignal>,
    signals_rx: mpsc::UnboundedReceiver<MirrorSignal>,
    call_subscription: Option<Subscription>,
    participants: HashMap<String, ParticipantEntry>,
    streams: HashMap<StreamKey, StreamEntry>,
    stopped: bool,
}

impl<D: Dispatch> CallMirror<D> {
    /// Subscribe to `call` and queue its current contents.
    ///
    /// Streams and participants already present on the call are treated as
    /// if they had just been added, and the id and state are re-read, so
    /// nothing that happened before the mirror attached is lost.
    pub fn attach(call: Arc<dyn Call>, store: D) -> Self {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();

        let tx = signals_tx.clone();
        let call_subscription = call.on_call_event(Arc::new(move |event: &CallEvent| {
            let signal = match event {
                CallEvent::IdChanged => MirrorSignal::CallIdChanged,
                CallEvent::StateChanged => MirrorSignal::CallStateChanged,
                CallEvent::LocalVideoStreamsUpdated(diff) => MirrorSignal::LocalStreams(diff.clone()),
                CallEvent::RemoteParticipantsUpdated(diff) => {
                    MirrorSignal::Participants(diff.clone())
                }
            };
            let _ = tx.send(signal);
        }));

        let _ = signals_tx.send(MirrorSignal::CallIdChanged);
        let _ = signals_tx.send(MirrorSignal::CallStateChanged);
        let _ = signals_tx.send(MirrorSignal::LocalStreams(CollectionDiff::added(
            call.local_video_streams(),
        )));
        let _ = signals_tx.send(MirrorSignal::Participants(CollectionDiff::added(
            call.remote_participants(),
        )));

        Self {
            call,
            store,
            signals_tx,
            signals_rx,
            call_subscription: Some(call_subscription),
            participants: HashMap::new(),
            streams: HashMap::new(),
            stopped: false,
        }
    }

    /// Process signals until the call disconnects.
    pub async fn run(mut self) {
        log::debug!("Mirroring call {}", self.call.id());
        while !self.stopped {
            match self.signals_rx.recv().await {
                Some(signal) => self.handle(signal).await,
                None => break,
            }
        }
        log::debug!("Mirror for call {} stopped", self.call.id());
    }

    /// Process every signal queued so far without waiting for more.
    /// Returns `false` once the mirror has stopped.
    pub async fn drain_pending(&mut self) -> bool {
        while !self.stopped {
            match self.signals_rx.try_recv() {
                Ok(signal) => self.handle(signal).await,
                Err(_) => break,
            }
        }
        !self.stopped
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Subscriptions held for a participant, including its streams.
    pub fn live_subscriptions_for(&self, participant_id: &str) -> usize {
        let own = usize::from(self.participants.contains_key(participant_id));
        let streams = self
            .streams
            .keys()
            .filter(|key| key.belongs_to(participant_id))
            .count();
        own + streams
    }

    pub fn live_renderers(&self) -> usize {
        self.streams
            .values()
            .filter(|entry| entry.renderer.is_some())
            .count()
    }

    pub fn tracked_streams(&self) -> usize {
        self.streams.len()
    }

    async fn handle(&mut self, signal: MirrorSignal) {
        match signal {
            MirrorSignal::CallIdChanged => {
                self.store.dispatch(Action::CallIdChanged(self.call.id()));
            }
            MirrorSignal::CallStateChanged => self.on_state_changed(),
            MirrorSignal::LocalStreams(diff) => {
                // Removals first, so a replaced camera is torn down before
                // its successor attaches.
                for stream in diff.removed {
                    self.remove_stream(&StreamKey::Local(stream.stream_id()));
                }
                for stream in diff.added {
                    let key = StreamKey::Local(stream.stream_id());
                    self.add_stream(key, stream).await;
                }
            }
            MirrorSignal::Participants(diff) => {
                for participant in diff.removed {
                    self.remove_participant(&participant.identifier());
                }
                for participant in diff.added {
                    self.add_participant(participant).await;
                }
            }
            MirrorSignal::ParticipantStateChanged(id) => {
                if let Some(entry) = self.participants.get(&id) {
                    self.store.dispatch(Action::ParticipantStateChanged {
                        state: entry.participant.state(),
                        id,
                    });
                }
            }
            MirrorSignal::ParticipantStreams { participant, diff } => {
                if !self.participants.contains_key(&participant) {
                    return;
                }
                for stream in diff.removed {
                    self.remove_stream(&StreamKey::Remote {
                        participant: participant.clone(),
                        stream: stream.stream_id(),
                    });
                }
                for stream in diff.added {
                    let key = StreamKey::Remote {
                        participant: participant.clone(),
                        stream: stream.stream_id(),
                    };
                    self.add_stream(key, stream).await;
                }
            }
            MirrorSignal::Availability(key) => self.sync_renderer(&key).await,
        }
    }

    fn on_state_changed(&mut self) {
        let state = self.call.state();
        if state == CallState::Disconnected {
            let end_reason = self.call.call_end_reason();
            match end_reason {
                Some(reason) => log::info!("Call {} ended: {reason}", self.call.id()),
                None => log::info!("Call {} ended", self.call.id()),
            }
            self.store.dispatch(Action::CallStateChanged { state, end_reason });
            self.teardown();
        } else {
            log::debug!("Call {} is {state}", self.call.id());
            self.store.dispatch(Action::CallStateChanged {
                state,
                end_reason: None,
            });
        }
    }

    async fn add_participant(&mut self, participant: Arc<dyn RemoteParticipant>) {
        let id = participant.identifier();
        if self.participants.contains_key(&id) {
            return;
        }

        let tx = self.signals_tx.clone();
        let participant_id = id.clone();
        let subscription =
            participant.on_participant_event(Arc::new(move |event: &ParticipantEvent| {
                let signal = match event {
                    ParticipantEvent::StateChanged => {
                        MirrorSignal::ParticipantStateChanged(participant_id.clone())
                    }
                    ParticipantEvent::VideoStreamsUpdated(diff) => MirrorSignal::ParticipantStreams {
                        participant: participant_id.clone(),
                        diff: diff.clone(),
                    },
                };
                let _ = tx.send(signal);
            }));

        log::info!("Participant {id} joined");
        self.store.dispatch(Action::ParticipantAdded {
            id: id.clone(),
            state: participant.state(),
        });

        let streams = participant.video_streams();
        self.participants.insert(
            id.clone(),
            ParticipantEntry {
                participant,
                _subscription: subscription,
            },
        );
        for stream in streams {
            let key = StreamKey::Remote {
                participant: id.clone(),
                stream: stream.stream_id(),
            };
            self.add_stream(key, stream).await;
        }
    }

    fn remove_participant(&mut self, id: &str) {
        if self.participants.remove(id).is_none() {
            return;
        }
        let keys: Vec<StreamKey> = self
            .streams
            .keys()
            .filter(|key| key.belongs_to(id))
            .cloned()
            .collect();
        for key in keys {
            self.remove_stream(&key);
        }
        log::info!("Participant {id} left");
        self.store.dispatch(Action::ParticipantRemoved { id: id.to_string() });
    }

    async fn add_stream(&mut self, key: StreamKey, stream: Arc<dyn VideoStream>) {
        if self.streams.contains_key(&key) {
            return;
        }
        let tx = self.signals_tx.clone();
        let signal_key = key.clone();
        let subscription = stream.on_availability_changed(Arc::new(move |_: &bool| {
            let _ = tx.send(MirrorSignal::Availability(signal_key.clone()));
        }));
        self.streams.insert(
            key.clone(),
            StreamEntry {
                stream,
                _subscription: subscription,
                renderer: None,
            },
        );
        self.sync_renderer(&key).await;
    }

    fn remove_stream(&mut self, key: &StreamKey) {
        if let Some(mut entry) = self.streams.remove(key) {
            if let Some(active) = entry.renderer.take() {
                self.dispose(key, active);
            }
        }
    }

    /// Bring the renderer for `key` in line with the stream's availability.
    async fn sync_renderer(&mut self, key: &StreamKey) {
        let Some(entry) = self.streams.get_mut(key) else {
            return;
        };
        let available = entry.stream.is_available();

        if !available {
            if let Some(active) = entry.renderer.take() {
                self.dispose(key, active);
            }
            return;
        }
        if entry.renderer.is_some() {
            return;
        }

        let renderer = match entry.stream.create_renderer() {
            Ok(renderer) => renderer,
            Err(e) => {
                log::error!("Failed to create renderer for {key:?}: {e}");
                self.store.dispatch(Action::OperationFailed(e.to_string()));
                return;
            }
        };
        let view = match renderer.create_view().await {
            Ok(view) => view,
            Err(e) => {
                log::error!("Failed to create view for {key:?}: {e}");
                renderer.dispose();
                self.store.dispatch(Action::OperationFailed(e.to_string()));
                return;
            }
        };

        // The stream may have been removed while the view was being created.
        let Some(entry) = self.streams.get_mut(key) else {
            renderer.dispose();
            return;
        };
        self.store.dispatch(Action::VideoAttached {
            source: key.source(),
            stream_id: key.stream_id().to_string(),
            view_id: view.view_id.clone(),
        });
        entry.renderer = Some(ActiveRenderer { renderer, view });
    }

    fn dispose(&self, key: &StreamKey, active: ActiveRenderer) {
        log::debug!("Disposing view {} for {key:?}", active.view.view_id);
        active.renderer.dispose();
        self.store.dispatch(Action::VideoDetached {
            source: key.source(),
            stream_id: key.stream_id().to_string(),
        });
    }

    fn teardown(&mut self) {
        self.call_subscription = None;
        for (key, mut entry) in self.streams.drain() {
            if let Some(active) = entry.renderer.take() {
                log::debug!("Disposing view {} for {key:?}", active.view.view_id);
                active.renderer.dispose();
            }
        }
        self.participants.clear();
        self.stopped = true;
    }
}
