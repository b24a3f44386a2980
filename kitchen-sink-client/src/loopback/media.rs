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

//! Loopback devices, video streams and renderers.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::sdk::{
    DeviceAccess, DeviceManager, Emitter, Listener, PermissionConstraints, RendererView,
    SdkError, StreamKind, Subscription, VideoDeviceInfo, VideoStream, VideoStreamRenderer,
};

#[derive(Default)]
struct RenderStats {
    created: AtomicUsize,
    disposals: AtomicUsize,
    live: AtomicUsize,
}

/// A video stream whose availability is flipped by hand.
pub struct LoopbackVideoStream {
    id: String,
    kind: StreamKind,
    available: AtomicBool,
    availability: Emitter<bool>,
    stats: Arc<RenderStats>,
}

impl LoopbackVideoStream {
    pub fn new(id: impl Into<String>, kind: StreamKind, available: bool) -> Arc<Self> {
        Arc::new(Self {
            id: id.into(),
            kind,
            available: AtomicBool::new(available),
            availability: Emitter::new(),
            stats: Arc::new(RenderStats::default()),
        })
    }

    /// Change availability, notifying listeners only on an actual flip.
    pub fn set_available(&self, available: bool) {
        if self.available.swap(available, Ordering::SeqCst) != available {
            self.availability.emit(&available);
        }
    }

    pub fn renderers_created(&self) -> usize {
        self.stats.created.load(Ordering::SeqCst)
    }

    /// Every call to `dispose`, including repeated ones on the same renderer.
    pub fn disposals(&self) -> usize {
        self.stats.disposals.load(Ordering::SeqCst)
    }

    pub fn live_renderers(&self) -> usize {
        self.stats.live.load(Ordering::SeqCst)
    }

    pub fn listener_count(&self) -> usize {
        self.availability.listener_count()
    }
}

impl VideoStream for LoopbackVideoStream {
    fn stream_id(&self) -> String {
        self.id.clone()
    }

    fn kind(&self) -> StreamKind {
        self.kind
    }

    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    fn on_availability_changed(&self, listener: Listener<bool>) -> Subscription {
        self.availability.subscribe(listener)
    }

    fn create_renderer(&self) -> Result<Box<dyn VideoStreamRenderer>, SdkError> {
        let n = self.stats.created.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(LoopbackRenderer {
            stream_id: self.id.clone(),
            view_id: format!("{}-view-{n}", self.id),
            disposed: AtomicBool::new(false),
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct LoopbackRenderer {
    stream_id: String,
    view_id: String,
    disposed: AtomicBool,
    stats: Arc<RenderStats>,
}

#[async_trait]
impl VideoStreamRenderer for LoopbackRenderer {
    async fn create_view(&self) -> Result<RendererView, SdkError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(SdkError::Disposed);
        }
        Ok(RendererView {
            view_id: self.view_id.clone(),
            stream_id: self.stream_id.clone(),
        })
    }

    fn dispose(&self) {
        self.stats.disposals.fetch_add(1, Ordering::SeqCst);
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.stats.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

pub fn default_camera() -> VideoDeviceInfo {
    VideoDeviceInfo {
        id: "loopback-camera-0".to_string(),
        name: "Loopback Camera".to_string(),
    }
}

/// Device manager with a fixed camera list and a fixed permission answer.
pub struct LoopbackDeviceManager {
    cameras: Vec<VideoDeviceInfo>,
    grant_permission: bool,
    permission_requests: AtomicUsize,
    local_streams: Mutex<Vec<Arc<LoopbackVideoStream>>>,
}

impl LoopbackDeviceManager {
    pub fn new(cameras: Vec<VideoDeviceInfo>, grant_permission: bool) -> Self {
        Self {
            cameras,
            grant_permission,
            permission_requests: AtomicUsize::new(0),
            local_streams: Mutex::new(Vec::new()),
        }
    }

    pub fn permission_requests(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    /// Every local stream created so far, oldest first.
    pub fn local_streams(&self) -> Vec<Arc<LoopbackVideoStream>> {
        self.local_streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl DeviceManager for LoopbackDeviceManager {
    async fn ask_device_permission(
        &self,
        constraints: PermissionConstraints,
    ) -> Result<DeviceAccess, SdkError> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        if !self.grant_permission {
            return Err(SdkError::PermissionDenied(
                "the user blocked camera and microphone access".to_string(),
            ));
        }
        Ok(DeviceAccess {
            audio: constraints.audio,
            video: constraints.video && !self.cameras.is_empty(),
        })
    }

    async fn get_cameras(&self) -> Result<Vec<VideoDeviceInfo>, SdkError> {
        Ok(self.cameras.clone())
    }

    fn create_local_video_stream(
        &self,
        camera: &VideoDeviceInfo,
    ) -> Result<Arc<dyn VideoStream>, SdkError> {
        if !self.cameras.iter().any(|c| c.id == camera.id) {
            return Err(SdkError::Device(format!("unknown camera {}", camera.id)));
        }
        let mut streams = self
            .local_streams
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let stream = LoopbackVideoStream::new(
            format!("{}-{}", camera.id, streams.len()),
            StreamKind::Local,
            true,
        );
        streams.push(Arc::clone(&stream));
        Ok(stream)
    }
}
