//! Relay-facing types: peers, session descriptions, candidates, events.

use serde::{Deserialize, Serialize};

use super::wire::{SocketPacket, WireError};

// ---------------------------------------------------------------------------
// Peers and signaling payloads
// ---------------------------------------------------------------------------

/// Another participant known to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Socket.IO session id assigned by the relay.
    #[serde(rename = "sid")]
    pub id: String,
    #[serde(rename = "username")]
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
    Pranswer,
    Rollback,
}

/// A session description in browser `RTCSessionDescriptionInit` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// A network-path candidate in browser `RTCIceCandidateInit` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default)]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_mline_index: Option<u16>,
    #[serde(
        rename = "usernameFragment",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub username_fragment: Option<String>,
}

// ---------------------------------------------------------------------------
// Events and commands
// ---------------------------------------------------------------------------

/// Events emitted by the relay connection task.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// Socket.IO connect acknowledged; `join_room` has been sent.
    Connected { self_id: String },
    /// Current room roster, own entry removed.
    PeerList(Vec<Peer>),
    Offer {
        sender_id: String,
        description: SessionDescription,
    },
    /// The relay does not stamp a sender on answers.
    Answer {
        sender_id: Option<String>,
        description: SessionDescription,
    },
    Candidate {
        sender_id: Option<String>,
        candidate: IceCandidate,
    },
    Disconnected { reason: String },
    Error(String),
}

#[derive(Debug)]
pub(crate) enum RelayCommand {
    Emit(SocketPacket),
    Disconnect,
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("relay connection closed")]
    Closed,
    #[error("invalid relay URL {0:?}")]
    InvalidUrl(String),
    #[error(transparent)]
    Wire(#[from] WireError),
}

/// Build the Engine.IO WebSocket endpoint from a relay base URL.
pub fn socket_url(base: &str) -> Result<String, RelayError> {
    let base = base.trim_end_matches('/');
    let (scheme, rest) = base
        .split_once("://")
        .ok_or_else(|| RelayError::InvalidUrl(base.to_string()))?;
    let ws_scheme = match scheme {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        _ => return Err(RelayError::InvalidUrl(base.to_string())),
    };
    Ok(format!(
        "{ws_scheme}://{rest}/socket.io/?EIO=4&transport=websocket"
    ))
}

/// Random `User-<0..999>` display name announced on join.
pub fn generate_display_name() -> String {
    use rand::Rng;
    format!("User-{}", rand::thread_rng().gen_range(0..1000))
}
