//! Socket.IO signaling relay client.
//!
//! Speaks Engine.IO v4 over a single WebSocket using `tokio-tungstenite`.
//! Joins the relay's room under a display name, tracks the roster, and
//! relays offers, answers, and candidates between peers.

mod client;
mod connection;
mod protocol;
mod types;
pub mod wire;


pub use client::{RelayClient, SocketIoDialer};
pub use types::{
    generate_display_name, socket_url, IceCandidate, Peer, RelayError, RelayEvent, SdpKind,
    SessionDescription,
};
pub use wire::WireError;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outbound half of the relay as seen by the call session.
#[async_trait]
pub trait Signaling: Send + Sync {
    async fn send_offer(&self, target: &str, offer: &SessionDescription) -> Result<(), RelayError>;
    async fn send_answer(&self, target: &str, answer: &SessionDescription)
        -> Result<(), RelayError>;
    async fn send_candidate(&self, target: &str, candidate: &IceCandidate)
        -> Result<(), RelayError>;
    async fn disconnect(&self);
}

/// Opens a relay connection: the outbound handle plus the inbound event stream.
pub trait RelayDialer: Send + Sync {
    fn dial(&self) -> (Arc<dyn Signaling>, mpsc::Receiver<RelayEvent>);
}
