//! Peer-to-peer video calling for CareLink.
//!
//! Four layers, leaves first:
//! - [`relay`]: Socket.IO signaling client (peer list, offer/answer/candidate relay)
//! - [`session`]: the single-call negotiator state machine
//! - [`media`]: local capture and remote stream binding
//! - [`controller`]: the call overlay's state and command loop
//!
//! Peer connections are created through the [`peer::PeerConnector`] seam; the
//! production implementation is backed by the `webrtc` crate.

pub mod controller;
pub mod media;
pub mod peer;
pub mod relay;
pub mod session;

#[cfg(test)]
pub(crate) mod fakes;

pub use controller::{CallCommand, CallController, CallView};
pub use media::{
    LocalStream, LocalTrack, MediaConstraints, MediaDevices, MediaError, MediaPipeline,
    RemoteStream, RemoteTrack, SyntheticDevices, TrackKind,
};
pub use peer::{
    ConnectionEvent, ConnectionState, PeerConnection, PeerConnector, PeerEvent, WebRtcConnector,
};
pub use relay::{
    IceCandidate, Peer, RelayClient, RelayDialer, RelayError, RelayEvent, SessionDescription,
    Signaling, SocketIoDialer,
};
pub use session::{CallSnapshot, CallState, Negotiator};

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("a call is already in progress")]
    Busy,
    #[error("no call session")]
    NoSession,
    #[error("not connected to the signaling relay")]
    NotConnected,
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("negotiation failed: {0}")]
    Negotiation(String),
    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl From<CallError> for carelink_common::CareError {
    fn from(err: CallError) -> Self {
        use carelink_common::CareError;
        match err {
            CallError::Media(e) => CareError::Media(e.to_string()),
            CallError::Relay(e) => CareError::Network(e.to_string()),
            other => CareError::Negotiation(other.to_string()),
        }
    }
}
