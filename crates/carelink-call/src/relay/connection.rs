//! Background WebSocket task for the signaling relay.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, RwLock};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, error, info, warn};

use super::protocol::{join_room, translate_event};
use super::types::{socket_url, RelayCommand, RelayEvent};
use super::wire::{EnginePacket, SocketPacket};

/// Liveness window used until the server's handshake announces its own.
const DEFAULT_LIVENESS: Duration = Duration::from_secs(45);

pub(crate) struct ConnectionParams {
    pub(crate) url: String,
    pub(crate) display_name: String,
    pub(crate) connect_timeout: Duration,
}

// ---------------------------------------------------------------------------
// Connection Loop
// ---------------------------------------------------------------------------

/// Connect once, run until the transport closes or `Disconnect` is received.
///
/// There is no reconnect: a lost transport ends the task with a
/// `Disconnected` event.
pub(crate) async fn connection_loop(
    params: ConnectionParams,
    connected: Arc<RwLock<bool>>,
    event_tx: mpsc::Sender<RelayEvent>,
    mut command_rx: mpsc::Receiver<RelayCommand>,
) {
    let url = match socket_url(&params.url) {
        Ok(url) => url,
        Err(e) => {
            error!(error = %e, "invalid relay URL");
            let _ = event_tx.send(RelayEvent::Error(e.to_string())).await;
            return;
        }
    };
    info!(url = %url, "connecting to signaling relay");

    let ws_stream = match tokio::time::timeout(
        params.connect_timeout,
        tokio_tungstenite::connect_async(&url),
    )
    .await
    {
        Ok(Ok((ws_stream, _))) => ws_stream,
        Ok(Err(e)) => {
            error!(error = %e, "failed to connect to signaling relay");
            let _ = event_tx
                .send(RelayEvent::Error(format!("Connection failed: {e}")))
                .await;
            return;
        }
        Err(_elapsed) => {
            let secs = params.connect_timeout.as_secs();
            error!(secs, "signaling relay connection timed out");
            let _ = event_tx
                .send(RelayEvent::Error(format!(
                    "Connection timed out after {secs}s"
                )))
                .await;
            return;
        }
    };

    let (mut ws_write, mut ws_read) = ws_stream.split();
    let mut self_id: Option<String> = None;
    let mut liveness = DEFAULT_LIVENESS;
    // Only inbound frames push the deadline back.
    let deadline = tokio::time::sleep(liveness);
    tokio::pin!(deadline);

    let reason = loop {
        tokio::select! {
            _ = &mut deadline => break "ping timeout".to_string(),
            frame = ws_read.next() => {
                let Some(frame) = frame else {
                    break "transport closed".to_string();
                };
                deadline.as_mut().reset(Instant::now() + liveness);
                let text = match frame {
                    Ok(WsMessage::Text(text)) => text,
                    Ok(WsMessage::Close(_)) => break "transport closed".to_string(),
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(error = %e, "relay WebSocket error");
                        break format!("transport error: {e}");
                    }
                };

                let packet = match EnginePacket::decode(text.as_str()) {
                    Ok(packet) => packet,
                    Err(e) => {
                        warn!(error = %e, "dropping malformed engine.io frame");
                        continue;
                    }
                };

                let mut outbound: Vec<String> = Vec::new();
                match packet {
                    EnginePacket::Open(handshake) => {
                        debug!(sid = %handshake.sid, "engine.io open");
                        liveness = Duration::from_millis(
                            handshake.ping_interval.saturating_add(handshake.ping_timeout),
                        );
                        deadline.as_mut().reset(Instant::now() + liveness);
                        outbound.push(SocketPacket::connect().to_frame());
                    }
                    EnginePacket::Ping(data) => outbound.push(EnginePacket::Pong(data).encode()),
                    EnginePacket::Close => break "server closed session".to_string(),
                    EnginePacket::Message(payload) => {
                        match handle_socket_packet(&payload, &mut self_id, &connected, &event_tx, &params.display_name).await {
                            SocketOutcome::Continue => {}
                            SocketOutcome::Send(frame) => outbound.push(frame),
                            SocketOutcome::Stop(reason) => break reason,
                        }
                    }
                    EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => {}
                }

                for frame in outbound {
                    if let Err(e) = ws_write.send(WsMessage::Text(frame.into())).await {
                        warn!(error = %e, "failed to write to relay");
                    }
                }
            }
            cmd = command_rx.recv() => {
                match cmd {
                    Some(RelayCommand::Emit(packet)) => {
                        if self_id.is_none() {
                            warn!("relay not joined yet, dropping outbound packet");
                            continue;
                        }
                        if let Err(e) = ws_write.send(WsMessage::Text(packet.to_frame().into())).await {
                            warn!(error = %e, "failed to send to relay");
                        }
                    }
                    Some(RelayCommand::Disconnect) | None => {
                        let _ = ws_write
                            .send(WsMessage::Text(SocketPacket::disconnect().to_frame().into()))
                            .await;
                        let _ = ws_write.send(WsMessage::Close(None)).await;
                        break "client disconnect".to_string();
                    }
                }
            }
        }
    };

    *connected.write().await = false;
    info!(reason = %reason, "signaling relay disconnected");
    let _ = event_tx.send(RelayEvent::Disconnected { reason }).await;
}

enum SocketOutcome {
    Continue,
    Send(String),
    Stop(String),
}

async fn handle_socket_packet(
    payload: &str,
    self_id: &mut Option<String>,
    connected: &Arc<RwLock<bool>>,
    event_tx: &mpsc::Sender<RelayEvent>,
    display_name: &str,
) -> SocketOutcome {
    let packet = match SocketPacket::decode(payload) {
        Ok(packet) => packet,
        Err(e) => {
            warn!(error = %e, "dropping malformed socket.io packet");
            return SocketOutcome::Continue;
        }
    };

    match packet {
        SocketPacket::Connect { data, .. } => {
            let Some(sid) = data
                .as_ref()
                .and_then(|d| d.get("sid"))
                .and_then(|s| s.as_str())
            else {
                warn!("socket.io connect without sid");
                return SocketOutcome::Continue;
            };
            info!(sid, display_name, "joined signaling relay");
            *self_id = Some(sid.to_string());
            *connected.write().await = true;
            let _ = event_tx
                .send(RelayEvent::Connected {
                    self_id: sid.to_string(),
                })
                .await;
            SocketOutcome::Send(join_room(display_name).to_frame())
        }
        SocketPacket::Event { name, args, .. } => {
            match translate_event(&name, args, self_id.as_deref()) {
                Ok(Some(event)) => {
                    let _ = event_tx.send(event).await;
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, event = %name, "dropping malformed relay event"),
            }
            SocketOutcome::Continue
        }
        SocketPacket::Disconnect { .. } => SocketOutcome::Stop("server disconnect".into()),
        SocketPacket::ConnectError { data, .. } => {
            let message = data
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("connect error")
                .to_string();
            error!(message = %message, "relay refused connection");
            let _ = event_tx.send(RelayEvent::Error(message.clone())).await;
            SocketOutcome::Stop(message)
        }
        SocketPacket::Ack { ack_id, .. } => {
            debug!(ack_id, "ignoring ack");
            SocketOutcome::Continue
        }
    }
}
