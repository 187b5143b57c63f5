//! Local capture and remote stream binding for the call overlay.
//!
//! Local tracks are shared (`Arc<LocalTrack>`) between the pipeline and the
//! peer connection that sends them, so stopping or muting a track is seen by
//! both without a lock.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use carelink_common::{EventBus, Notification};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

/// What to capture. The call overlay always asks for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub video: bool,
    pub audio: bool,
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self {
            video: true,
            audio: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    #[error("permission to use camera and microphone was denied")]
    PermissionDenied,
    #[error("no capture device available: {0}")]
    NoDevice(String),
}

// ---------------------------------------------------------------------------
// Local tracks
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct LocalTrack {
    id: String,
    kind: TrackKind,
    enabled: AtomicBool,
    stopped: AtomicBool,
}

impl LocalTrack {
    pub fn new(kind: TrackKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            enabled: AtomicBool::new(true),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }

    /// Stop capturing. Irreversible.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone)]
pub struct LocalStream {
    id: String,
    tracks: Vec<Arc<LocalTrack>>,
}

impl LocalStream {
    pub fn new(tracks: Vec<Arc<LocalTrack>>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            tracks,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn tracks(&self) -> &[Arc<LocalTrack>] {
        &self.tracks
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &Arc<LocalTrack>> {
        self.tracks.iter().filter(|t| t.kind == TrackKind::Audio)
    }

    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }

    pub fn set_audio_enabled(&self, enabled: bool) {
        for track in self.audio_tracks() {
            track.set_enabled(enabled);
        }
    }

    /// True while at least one track is still capturing.
    pub fn is_live(&self) -> bool {
        self.tracks.iter().any(|t| !t.is_stopped())
    }
}

// ---------------------------------------------------------------------------
// Remote stream
// ---------------------------------------------------------------------------

/// A track announced by the remote side of a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub stream_id: String,
    pub track_id: String,
    pub kind: TrackKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    pub id: String,
    pub tracks: Vec<RemoteTrack>,
}

// ---------------------------------------------------------------------------
// Devices
// ---------------------------------------------------------------------------

/// Capture device access.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<LocalStream, MediaError>;
}

/// Generated capture tracks standing in for camera and microphone hardware.
#[derive(Debug, Default)]
pub struct SyntheticDevices {
    deny: AtomicBool,
    acquisitions: AtomicUsize,
}

impl SyntheticDevices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Devices that refuse access, like a user declining the permission prompt.
    pub fn denying() -> Self {
        let devices = Self::default();
        devices.set_denied(true);
        devices
    }

    pub fn set_denied(&self, deny: bool) {
        self.deny.store(deny, Ordering::Release);
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::Acquire)
    }
}

#[async_trait]
impl MediaDevices for SyntheticDevices {
    async fn acquire(&self, constraints: &MediaConstraints) -> Result<LocalStream, MediaError> {
        if self.deny.load(Ordering::Acquire) {
            return Err(MediaError::PermissionDenied);
        }
        let mut tracks = Vec::new();
        if constraints.video {
            tracks.push(Arc::new(LocalTrack::new(TrackKind::Video)));
        }
        if constraints.audio {
            tracks.push(Arc::new(LocalTrack::new(TrackKind::Audio)));
        }
        if tracks.is_empty() {
            return Err(MediaError::NoDevice("no track kinds requested".into()));
        }
        self.acquisitions.fetch_add(1, Ordering::AcqRel);
        Ok(LocalStream::new(tracks))
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Local preview and remote view for one call overlay.
pub struct MediaPipeline {
    devices: Arc<dyn MediaDevices>,
    constraints: MediaConstraints,
    local: Option<LocalStream>,
    remote: Option<RemoteStream>,
    last_error: Option<MediaError>,
    muted: bool,
    events: EventBus,
}

impl MediaPipeline {
    pub fn new(devices: Arc<dyn MediaDevices>, events: EventBus) -> Self {
        Self {
            devices,
            constraints: MediaConstraints::default(),
            local: None,
            remote: None,
            last_error: None,
            muted: false,
            events,
        }
    }

    /// Acquire camera and microphone for the local preview.
    ///
    /// A live stream is reused. On denial the error is recorded, a
    /// notification raised, and the preview left empty.
    pub async fn acquire_local(&mut self) -> Result<&LocalStream, MediaError> {
        if !self.local.as_ref().is_some_and(LocalStream::is_live) {
            match self.devices.acquire(&self.constraints).await {
                Ok(stream) => {
                    info!(stream = stream.id(), tracks = stream.tracks().len(), "local media acquired");
                    stream.set_audio_enabled(!self.muted);
                    self.last_error = None;
                    self.local = Some(stream);
                }
                Err(e) => {
                    warn!(error = %e, "local media unavailable");
                    self.events.notify(Notification::error(
                        "Camera Error",
                        "Could not access your camera. Please check permissions.",
                    ));
                    self.last_error = Some(e.clone());
                    self.local = None;
                    return Err(e);
                }
            }
        }
        self.local.as_ref().ok_or(MediaError::NoDevice("no local stream".into()))
    }

    pub fn local_stream(&self) -> Option<&LocalStream> {
        self.local.as_ref()
    }

    pub fn remote_stream(&self) -> Option<&RemoteStream> {
        self.remote.as_ref()
    }

    pub fn last_error(&self) -> Option<&MediaError> {
        self.last_error.as_ref()
    }

    /// Bind a remote track. Only the first remote stream is shown; tracks
    /// of any later stream are ignored.
    pub fn attach_remote_track(&mut self, track: RemoteTrack) -> bool {
        match &mut self.remote {
            None => {
                info!(stream = %track.stream_id, kind = ?track.kind, "remote stream attached");
                self.remote = Some(RemoteStream {
                    id: track.stream_id.clone(),
                    tracks: vec![track],
                });
                true
            }
            Some(remote) if remote.id == track.stream_id => {
                debug!(stream = %track.stream_id, kind = ?track.kind, "remote track added");
                remote.tracks.push(track);
                true
            }
            Some(remote) => {
                warn!(bound = %remote.id, ignored = %track.stream_id, "ignoring additional remote stream");
                false
            }
        }
    }

    /// Stop every local track and clear both views.
    pub fn release(&mut self) {
        if let Some(stream) = self.local.take() {
            stream.stop_all();
            info!(stream = stream.id(), "local media released");
        }
        self.remote = None;
        self.muted = false;
    }

    /// Flip the local audio tracks. Returns the new muted state.
    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        if let Some(stream) = &self.local {
            stream.set_audio_enabled(!self.muted);
        }
        self.muted
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline(devices: SyntheticDevices) -> MediaPipeline {
        MediaPipeline::new(Arc::new(devices), EventBus::default())
    }

    fn remote(stream: &str, kind: TrackKind) -> RemoteTrack {
        RemoteTrack {
            stream_id: stream.into(),
            track_id: uuid::Uuid::new_v4().to_string(),
            kind,
        }
    }

    #[tokio::test]
    async fn acquire_yields_video_and_audio() {
        let mut media = pipeline(SyntheticDevices::new());
        let stream = media.acquire_local().await.unwrap();
        let kinds: Vec<_> = stream.tracks().iter().map(|t| t.kind()).collect();
        assert_eq!(kinds, [TrackKind::Video, TrackKind::Audio]);
    }

    #[tokio::test]
    async fn live_stream_is_reused() {
        let devices = Arc::new(SyntheticDevices::new());
        let mut media = MediaPipeline::new(devices.clone(), EventBus::default());
        media.acquire_local().await.unwrap();
        media.acquire_local().await.unwrap();
        assert_eq!(devices.acquisitions(), 1);

        media.release();
        media.acquire_local().await.unwrap();
        assert_eq!(devices.acquisitions(), 2);
    }

    #[tokio::test]
    async fn denial_records_error_and_notifies() {
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let mut media = MediaPipeline::new(Arc::new(SyntheticDevices::denying()), events);

        assert_eq!(
            media.acquire_local().await.unwrap_err(),
            MediaError::PermissionDenied
        );
        assert!(media.local_stream().is_none());
        assert_eq!(media.last_error(), Some(&MediaError::PermissionDenied));
        assert!(matches!(
            rx.try_recv(),
            Ok(carelink_common::Event::Notify { ref title, .. }) if title == "Camera Error"
        ));
    }

    #[tokio::test]
    async fn mute_flips_audio_only() {
        let mut media = pipeline(SyntheticDevices::new());
        let tracks: Vec<_> = media.acquire_local().await.unwrap().tracks().to_vec();

        assert!(media.toggle_mute());
        for track in &tracks {
            assert_eq!(track.is_enabled(), track.kind() == TrackKind::Video);
        }
        assert!(!media.toggle_mute());
        assert!(tracks.iter().all(|t| t.is_enabled()));
    }

    #[tokio::test]
    async fn release_stops_tracks_and_clears_views() {
        let mut media = pipeline(SyntheticDevices::new());
        let tracks: Vec<_> = media.acquire_local().await.unwrap().tracks().to_vec();
        media.attach_remote_track(remote("r1", TrackKind::Video));
        media.toggle_mute();

        media.release();
        assert!(tracks.iter().all(|t| t.is_stopped()));
        assert!(media.local_stream().is_none());
        assert!(media.remote_stream().is_none());
        assert!(!media.is_muted());
    }

    #[test]
    fn only_first_remote_stream_binds() {
        let mut media = pipeline(SyntheticDevices::new());
        assert!(media.attach_remote_track(remote("r1", TrackKind::Video)));
        assert!(media.attach_remote_track(remote("r1", TrackKind::Audio)));
        assert!(!media.attach_remote_track(remote("r2", TrackKind::Video)));

        let bound = media.remote_stream().unwrap();
        assert_eq!(bound.id, "r1");
        assert_eq!(bound.tracks.len(), 2);
    }
}
