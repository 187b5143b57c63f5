//! Peer connection seam.
//!
//! The session layer drives a [`PeerConnection`] through offer/answer and
//! candidate exchange; connection-side happenings come back as
//! [`ConnectionEvent`]s tagged with the connection id, so events from a
//! connection that has already been replaced can be told apart.

mod rtc;

pub use self::rtc::WebRtcConnector;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::media::{LocalStream, RemoteTrack};
use crate::relay::{IceCandidate, SessionDescription};
use crate::CallError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PeerEvent {
    /// A local candidate ready to be sent to the remote peer.
    LocalCandidate(IceCandidate),
    RemoteTrack(RemoteTrack),
    StateChanged(ConnectionState),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionEvent {
    pub connection: u64,
    pub event: PeerEvent,
}

/// One peer-to-peer media connection.
#[async_trait]
pub trait PeerConnection: Send + Sync {
    /// Attach every track of the local stream for sending.
    async fn add_local_tracks(&self, stream: &LocalStream) -> Result<(), CallError>;
    async fn create_offer(&self) -> Result<SessionDescription, CallError>;
    async fn create_answer(&self) -> Result<SessionDescription, CallError>;
    async fn set_local_description(&self, desc: &SessionDescription) -> Result<(), CallError>;
    async fn set_remote_description(&self, desc: &SessionDescription) -> Result<(), CallError>;
    async fn add_ice_candidate(&self, candidate: &IceCandidate) -> Result<(), CallError>;
    async fn close(&self);
}

/// Creates peer connections. `id` tags every event the connection emits.
#[async_trait]
pub trait PeerConnector: Send + Sync {
    async fn connect(
        &self,
        id: u64,
        events: mpsc::Sender<ConnectionEvent>,
    ) -> Result<Box<dyn PeerConnection>, CallError>;
}
