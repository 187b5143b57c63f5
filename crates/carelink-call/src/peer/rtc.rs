//! [`PeerConnector`] backed by the `webrtc` crate.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use carelink_config::IceConfig;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::{MediaEngine, MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::api::{APIBuilder, API};
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::media::Sample;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::RTCRtpTransceiver;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

use super::{ConnectionEvent, ConnectionState, PeerConnection, PeerConnector, PeerEvent};
use crate::media::{LocalStream, LocalTrack, RemoteTrack, TrackKind};
use crate::relay::{IceCandidate, SdpKind, SessionDescription};
use crate::CallError;

/// One Opus frame of silence (TOC byte for 20 ms CELT FB, empty payload).
const OPUS_SILENCE: [u8; 3] = [0xF8, 0xFF, 0xFE];
const AUDIO_FRAME: Duration = Duration::from_millis(20);

fn negotiation<E: std::fmt::Display>(what: &'static str) -> impl FnOnce(E) -> CallError {
    move |e| CallError::Negotiation(format!("{what}: {e}"))
}

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

pub struct WebRtcConnector {
    api: API,
    ice_servers: Vec<String>,
}

impl WebRtcConnector {
    pub fn new(ice: &IceConfig) -> Result<Self, CallError> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(negotiation("register codecs"))?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)
            .map_err(negotiation("register interceptors"))?;
        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();
        Ok(Self {
            api,
            ice_servers: ice.stun_servers.clone(),
        })
    }
}

#[async_trait]
impl PeerConnector for WebRtcConnector {
    async fn connect(
        &self,
        id: u64,
        events: mpsc::Sender<ConnectionEvent>,
    ) -> Result<Box<dyn PeerConnection>, CallError> {
        let ice_servers = if self.ice_servers.is_empty() {
            Vec::new()
        } else {
            vec![RTCIceServer {
                urls: self.ice_servers.clone(),
                ..Default::default()
            }]
        };
        let config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };
        let pc = Arc::new(
            self.api
                .new_peer_connection(config)
                .await
                .map_err(negotiation("create peer connection"))?,
        );
        install_handlers(&pc, id, events);
        info!(connection = id, "peer connection created");
        Ok(Box::new(WebRtcPeer {
            id,
            pc,
            closed: Arc::new(AtomicBool::new(false)),
        }))
    }
}

fn install_handlers(pc: &RTCPeerConnection, id: u64, events: mpsc::Sender<ConnectionEvent>) {
    let tx = events.clone();
    pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
        debug!(connection = id, ?state, "peer connection state");
        let tx = tx.clone();
        Box::pin(async move {
            if let Some(state) = map_state(state) {
                let _ = tx
                    .send(ConnectionEvent {
                        connection: id,
                        event: PeerEvent::StateChanged(state),
                    })
                    .await;
            }
        })
    }));

    let tx = events.clone();
    pc.on_ice_candidate(Box::new(move |candidate: Option<RTCIceCandidate>| {
        let tx = tx.clone();
        Box::pin(async move {
            // None marks the end of gathering.
            let Some(candidate) = candidate else { return };
            match candidate.to_json() {
                Ok(init) => {
                    let _ = tx
                        .send(ConnectionEvent {
                            connection: id,
                            event: PeerEvent::LocalCandidate(IceCandidate {
                                candidate: init.candidate,
                                sdp_mid: init.sdp_mid,
                                sdp_mline_index: init.sdp_mline_index,
                                username_fragment: init.username_fragment,
                            }),
                        })
                        .await;
                }
                Err(e) => warn!(connection = id, error = %e, "failed to serialize local candidate"),
            }
        })
    }));

    let tx = events;
    pc.on_track(Box::new(
        move |track: Arc<TrackRemote>, _receiver: Arc<RTCRtpReceiver>, _transceiver: Arc<RTCRtpTransceiver>| {
            let tx = tx.clone();
            Box::pin(async move {
                let kind = match track.kind() {
                    RTPCodecType::Audio => TrackKind::Audio,
                    RTPCodecType::Video => TrackKind::Video,
                    other => {
                        debug!(connection = id, ?other, "ignoring remote track");
                        return;
                    }
                };
                let remote = RemoteTrack {
                    stream_id: track.stream_id(),
                    track_id: track.id(),
                    kind,
                };
                let _ = tx
                    .send(ConnectionEvent {
                        connection: id,
                        event: PeerEvent::RemoteTrack(remote),
                    })
                    .await;
            })
        },
    ));
}

fn map_state(state: RTCPeerConnectionState) -> Option<ConnectionState> {
    Some(match state {
        RTCPeerConnectionState::New => ConnectionState::New,
        RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
        RTCPeerConnectionState::Connected => ConnectionState::Connected,
        RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
        RTCPeerConnectionState::Failed => ConnectionState::Failed,
        RTCPeerConnectionState::Closed => ConnectionState::Closed,
        _ => return None,
    })
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

struct WebRtcPeer {
    id: u64,
    pc: Arc<RTCPeerConnection>,
    closed: Arc<AtomicBool>,
}

impl WebRtcPeer {
    fn to_rtc(desc: &SessionDescription) -> Result<RTCSessionDescription, CallError> {
        let sdp = desc.sdp.clone();
        match desc.kind {
            SdpKind::Offer => RTCSessionDescription::offer(sdp),
            SdpKind::Answer => RTCSessionDescription::answer(sdp),
            SdpKind::Pranswer => RTCSessionDescription::pranswer(sdp),
            SdpKind::Rollback => {
                return Err(CallError::Negotiation("rollback is not supported".into()))
            }
        }
        .map_err(negotiation("parse session description"))
    }

    fn from_rtc(desc: RTCSessionDescription) -> Result<SessionDescription, CallError> {
        let kind = match desc.sdp_type {
            RTCSdpType::Offer => SdpKind::Offer,
            RTCSdpType::Answer => SdpKind::Answer,
            RTCSdpType::Pranswer => SdpKind::Pranswer,
            RTCSdpType::Rollback => SdpKind::Rollback,
            other => {
                return Err(CallError::Negotiation(format!(
                    "unexpected description type {other:?}"
                )))
            }
        };
        Ok(SessionDescription {
            kind,
            sdp: desc.sdp,
        })
    }

    /// Feed a silent Opus stream while the track is live; muting pauses it.
    fn spawn_audio_pump(&self, source: Arc<LocalTrack>, sink: Arc<TrackLocalStaticSample>) {
        let closed = Arc::clone(&self.closed);
        let connection = self.id;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(AUDIO_FRAME);
            while !source.is_stopped() && !closed.load(Ordering::Acquire) {
                ticker.tick().await;
                if !source.is_enabled() {
                    continue;
                }
                let sample = Sample {
                    data: Bytes::from_static(&OPUS_SILENCE),
                    duration: AUDIO_FRAME,
                    ..Default::default()
                };
                if let Err(e) = sink.write_sample(&sample).await {
                    debug!(connection, error = %e, "audio pump stopped");
                    break;
                }
            }
        });
    }
}

#[async_trait]
impl PeerConnection for WebRtcPeer {
    async fn add_local_tracks(&self, stream: &LocalStream) -> Result<(), CallError> {
        for track in stream.tracks() {
            let capability = match track.kind() {
                TrackKind::Audio => RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_OPUS.to_string(),
                    clock_rate: 48_000,
                    channels: 2,
                    ..Default::default()
                },
                TrackKind::Video => RTCRtpCodecCapability {
                    mime_type: MIME_TYPE_VP8.to_string(),
                    clock_rate: 90_000,
                    ..Default::default()
                },
            };
            let sink = Arc::new(TrackLocalStaticSample::new(
                capability,
                track.id().to_string(),
                stream.id().to_string(),
            ));
            let rtp_sender = self
                .pc
                .add_track(Arc::clone(&sink) as Arc<dyn TrackLocal + Send + Sync>)
                .await
                .map_err(negotiation("add track"))?;

            // Drain RTCP so the interceptors keep running.
            tokio::spawn(async move {
                let mut rtcp_buf = vec![0u8; 1500];
                while rtp_sender.read(&mut rtcp_buf).await.is_ok() {}
            });

            if track.kind() == TrackKind::Audio {
                self.spawn_audio_pump(Arc::clone(track), sink);
            }
        }
        debug!(connection = self.id, tracks = stream.tracks().len(), "local tracks added");
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, CallError> {
        let offer = self
            .pc
            .create_offer(None)
            .await
            .map_err(negotiation("create offer"))?;
        Self::from_rtc(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription, CallError> {
        let answer = self
            .pc
            .create_answer(None)
            .await
            .map_err(negotiation("create answer"))?;
        Self::from_rtc(answer)
    }

    async fn set_local_description(&self, desc: &SessionDescription) -> Result<(), CallError> {
        self.pc
            .set_local_description(Self::to_rtc(desc)?)
            .await
            .map_err(negotiation("set local description"))
    }

    async fn set_remote_description(&self, desc: &SessionDescription) -> Result<(), CallError> {
        self.pc
            .set_remote_description(Self::to_rtc(desc)?)
            .await
            .map_err(negotiation("set remote description"))
    }

    async fn add_ice_candidate(&self, candidate: &IceCandidate) -> Result<(), CallError> {
        let init = RTCIceCandidateInit {
            candidate: candidate.candidate.clone(),
            sdp_mid: candidate.sdp_mid.clone(),
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: candidate.username_fragment.clone(),
        };
        self.pc
            .add_ice_candidate(init)
            .await
            .map_err(negotiation("add candidate"))
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.pc.close().await {
            warn!(connection = self.id, error = %e, "error closing peer connection");
        }
        info!(connection = self.id, "peer connection closed");
    }
}
