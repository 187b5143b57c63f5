//! Public handle for the relay connection.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use carelink_config::SignalingConfig;
use tokio::sync::{mpsc, RwLock};

use super::connection::{connection_loop, ConnectionParams};
use super::protocol;
use super::types::{
    generate_display_name, IceCandidate, RelayCommand, RelayError, RelayEvent,
    SessionDescription,
};
use super::wire::SocketPacket;
use super::{RelayDialer, Signaling};

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Handle for the background relay connection.
///
/// All methods are non-blocking and queue commands for the connection task.
#[derive(Clone)]
pub struct RelayClient {
    command_tx: mpsc::Sender<RelayCommand>,
    connected: Arc<RwLock<bool>>,
}

impl RelayClient {
    /// Spawn the connection task. Returns `(client, event_receiver)`.
    pub fn connect(config: &SignalingConfig, display_name: String) -> (Self, mpsc::Receiver<RelayEvent>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(64);
        let connected = Arc::new(RwLock::new(false));

        let params = ConnectionParams {
            url: config.url.clone(),
            display_name,
            connect_timeout: Duration::from_secs(u64::from(config.connect_timeout_secs)),
        };
        tokio::spawn(connection_loop(
            params,
            Arc::clone(&connected),
            event_tx,
            command_rx,
        ));

        (
            Self {
                command_tx,
                connected,
            },
            event_rx,
        )
    }

    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    async fn emit(&self, packet: SocketPacket) -> Result<(), RelayError> {
        self.command_tx
            .send(RelayCommand::Emit(packet))
            .await
            .map_err(|_| RelayError::Closed)
    }
}

#[async_trait]
impl Signaling for RelayClient {
    async fn send_offer(&self, target: &str, offer: &SessionDescription) -> Result<(), RelayError> {
        self.emit(protocol::video_offer(target, offer)).await
    }

    async fn send_answer(
        &self,
        target: &str,
        answer: &SessionDescription,
    ) -> Result<(), RelayError> {
        self.emit(protocol::video_answer(target, answer)).await
    }

    async fn send_candidate(
        &self,
        target: &str,
        candidate: &IceCandidate,
    ) -> Result<(), RelayError> {
        self.emit(protocol::ice_candidate(target, candidate)).await
    }

    async fn disconnect(&self) {
        let _ = self.command_tx.send(RelayCommand::Disconnect).await;
    }
}

// ---------------------------------------------------------------------------
// Dialer
// ---------------------------------------------------------------------------

/// Dials the configured Socket.IO relay.
#[derive(Debug, Clone)]
pub struct SocketIoDialer {
    config: SignalingConfig,
    display_name: String,
}

impl SocketIoDialer {
    /// Uses the configured display name, or a random `User-<n>` if empty.
    pub fn new(config: SignalingConfig) -> Self {
        let display_name = if config.display_name.trim().is_empty() {
            generate_display_name()
        } else {
            config.display_name.clone()
        };
        Self {
            config,
            display_name,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

impl RelayDialer for SocketIoDialer {
    fn dial(&self) -> (Arc<dyn Signaling>, mpsc::Receiver<RelayEvent>) {
        let (client, events) = RelayClient::connect(&self.config, self.display_name.clone());
        (Arc::new(client), events)
    }
}
