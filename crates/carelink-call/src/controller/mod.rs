//! Call overlay state and its command loop.
//!
//! [`CallController`] owns the relay handle, the negotiator and the media
//! pipeline. Every mutation happens on the task running [`CallController::run`],
//! which multiplexes UI commands, relay events and peer-connection events.
//! Renderers watch [`CallView`].


use std::sync::Arc;

use carelink_common::{Event, EventBus, Notification};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::media::{MediaDevices, MediaPipeline};
use crate::peer::{ConnectionEvent, PeerConnector};
use crate::relay::{Peer, RelayDialer, RelayEvent, Signaling};
use crate::session::{CallState, Negotiator};
use crate::CallError;

/// User intents from the call overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallCommand {
    SelectPeer(String),
    StartCall,
    EndCall,
    ToggleMute,
    Close,
}

/// Everything the overlay renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallView {
    /// Callable peers; empty unless Idle.
    pub peers: Vec<Peer>,
    pub selected: Option<String>,
    pub state: CallState,
    pub remote_peer: Option<String>,
    pub muted: bool,
    pub connected: bool,
    pub can_start: bool,
    pub local_preview: bool,
    pub remote_preview: bool,
}

pub struct CallController {
    dialer: Arc<dyn RelayDialer>,
    connector: Arc<dyn PeerConnector>,
    events: EventBus,
    media: MediaPipeline,
    signaling: Option<Arc<dyn Signaling>>,
    negotiator: Option<Negotiator>,
    relay_events: Option<mpsc::Receiver<RelayEvent>>,
    connection_tx: mpsc::Sender<ConnectionEvent>,
    connection_rx: mpsc::Receiver<ConnectionEvent>,
    peers: Vec<Peer>,
    selected: Option<String>,
    connected: bool,
    opened: bool,
    closed: bool,
    view: watch::Sender<CallView>,
}

impl CallController {
    pub fn new(
        dialer: Arc<dyn RelayDialer>,
        connector: Arc<dyn PeerConnector>,
        devices: Arc<dyn MediaDevices>,
        events: EventBus,
    ) -> Self {
        let (connection_tx, connection_rx) = mpsc::channel(256);
        let (view, _) = watch::channel(CallView::default());
        Self {
            dialer,
            connector,
            media: MediaPipeline::new(devices, events.clone()),
            events,
            signaling: None,
            negotiator: None,
            relay_events: None,
            connection_tx,
            connection_rx,
            peers: Vec::new(),
            selected: None,
            connected: false,
            opened: false,
            closed: false,
            view,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CallView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> CallView {
        self.view.borrow().clone()
    }

    pub fn state(&self) -> CallState {
        self.negotiator
            .as_ref()
            .map_or(CallState::Idle, Negotiator::state)
    }

    /// Connect the relay and start the local preview. Dials at most once.
    pub async fn open(&mut self) {
        if self.opened {
            return;
        }
        self.opened = true;

        let (signaling, relay_events) = self.dialer.dial();
        self.negotiator = Some(Negotiator::new(
            Arc::clone(&self.connector),
            Arc::clone(&signaling),
            self.connection_tx.clone(),
            self.events.clone(),
        ));
        self.signaling = Some(signaling);
        self.relay_events = Some(relay_events);
        info!("call overlay opened");

        // Denial is recorded and notified by the pipeline.
        let _ = self.media.acquire_local().await;
        self.refresh();
    }

    /// Process commands and events until `Close` or the command channel ends.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<CallCommand>) {
        self.open().await;
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(cmd) => {
                        if !self.handle_command(cmd).await {
                            break;
                        }
                    }
                    None => {
                        self.close().await;
                        break;
                    }
                },
                event = next_relay_event(&mut self.relay_events) => match event {
                    Some(event) => self.handle_relay_event(event).await,
                    None => {
                        debug!("relay event stream ended");
                        self.relay_events = None;
                    }
                },
                Some(event) = self.connection_rx.recv() => {
                    self.handle_connection_event(event).await;
                }
            }
        }
    }

    /// Apply one UI command. Returns `false` once the overlay is closed.
    pub async fn handle_command(&mut self, command: CallCommand) -> bool {
        debug!(?command, "call command");
        if self.closed {
            return false;
        }
        match command {
            CallCommand::SelectPeer(id) => {
                if self.peers.iter().any(|p| p.id == id) {
                    self.selected = Some(id);
                } else {
                    warn!(peer = %id, "ignoring selection of unknown peer");
                }
            }
            CallCommand::StartCall => self.start_call().await,
            CallCommand::EndCall => {
                if let Some(negotiator) = &mut self.negotiator {
                    negotiator.end_call(&mut self.media).await;
                } else {
                    self.media.release();
                }
                self.selected = None;
            }
            CallCommand::ToggleMute => {
                if let Some(negotiator) = &mut self.negotiator {
                    negotiator.toggle_mute(&mut self.media);
                } else {
                    self.media.toggle_mute();
                }
            }
            CallCommand::Close => {
                self.close().await;
                return false;
            }
        }
        self.refresh();
        true
    }

    async fn start_call(&mut self) {
        let Some(peer) = self.selected.clone() else {
            debug!("no peer selected, not calling");
            return;
        };
        if !self.connected {
            warn!(peer = %peer, "relay not connected, not calling");
            return;
        }
        let Some(negotiator) = &mut self.negotiator else {
            return;
        };
        if let Err(e) = negotiator.start_call(&peer, &mut self.media).await {
            // Busy leaves the current call running; other errors were notified.
            debug!(error = %e, "start call rejected");
        }
    }

    pub async fn handle_relay_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Connected { self_id } => {
                info!(self_id = %self_id, "relay connected");
                if let Some(negotiator) = &mut self.negotiator {
                    negotiator.set_self_id(self_id);
                }
                self.set_connected(true);
            }
            RelayEvent::PeerList(peers) => self.update_peers(peers).await,
            RelayEvent::Offer {
                sender_id,
                description,
            } => {
                let Some(negotiator) = &mut self.negotiator else {
                    return;
                };
                match negotiator
                    .accept_offer(&sender_id, &description, &mut self.media)
                    .await
                {
                    Ok(()) => self.selected = Some(sender_id),
                    Err(e) => debug!(error = %e, sender = %sender_id, "offer not accepted"),
                }
            }
            RelayEvent::Answer {
                sender_id,
                description,
            } => {
                if let Some(negotiator) = &mut self.negotiator {
                    if let Err(e) = negotiator
                        .apply_answer(sender_id.as_deref(), &description, &mut self.media)
                        .await
                    {
                        debug!(error = %e, "answer not applied");
                    }
                }
            }
            RelayEvent::Candidate {
                sender_id,
                candidate,
            } => {
                if let Some(negotiator) = &mut self.negotiator {
                    if let Err(e) = negotiator
                        .add_remote_candidate(sender_id.as_deref(), &candidate)
                        .await
                    {
                        debug!(error = %e, "candidate not applied");
                    }
                }
            }
            RelayEvent::Disconnected { reason } => {
                warn!(reason = %reason, "relay disconnected");
                self.set_connected(false);
                self.peers.clear();
                self.selected = None;
                self.events.publish(Event::PeersUpdated { count: 0 });
                if let Some(negotiator) = &mut self.negotiator {
                    if negotiator.state() != CallState::Idle {
                        negotiator
                            .fail(&mut self.media, CallError::NotConnected)
                            .await;
                    }
                }
            }
            RelayEvent::Error(message) => {
                warn!(error = %message, "relay error");
                self.events
                    .notify(Notification::error("Connection Error", message));
            }
        }
        self.refresh();
    }

    pub async fn handle_connection_event(&mut self, event: ConnectionEvent) {
        if let Some(negotiator) = &mut self.negotiator {
            negotiator.on_connection_event(event, &mut self.media).await;
            self.refresh();
        }
    }

    /// End any call, release media and disconnect the relay.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Some(negotiator) = &mut self.negotiator {
            negotiator.end_call(&mut self.media).await;
        }
        self.media.release();
        if let Some(signaling) = self.signaling.take() {
            signaling.disconnect().await;
        }
        self.relay_events = None;
        self.peers.clear();
        self.selected = None;
        self.set_connected(false);
        info!("call overlay closed");
        self.refresh();
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn update_peers(&mut self, peers: Vec<Peer>) {
        debug!(count = peers.len(), "peer list updated");
        let present = |id: &str| peers.iter().any(|p| p.id == id);

        if self.selected.as_deref().is_some_and(|id| !present(id)) {
            self.selected = None;
        }
        if let Some(negotiator) = &mut self.negotiator {
            if let Some(remote) = negotiator.remote_peer() {
                if !present(remote) {
                    info!(peer = %remote, "remote peer left");
                    negotiator.end_call(&mut self.media).await;
                    self.events.notify(Notification::info(
                        "Call Ended",
                        "The other participant left the call.",
                    ));
                }
            }
        }

        self.events
            .publish(Event::PeersUpdated { count: peers.len() });
        self.peers = peers;
    }

    fn set_connected(&mut self, connected: bool) {
        if self.connected != connected {
            self.connected = connected;
            self.events.publish(Event::RelayConnectivity { connected });
        }
    }

    fn refresh(&self) {
        let snapshot = self
            .negotiator
            .as_ref()
            .map(Negotiator::snapshot)
            .unwrap_or_default();
        let idle = snapshot.state == CallState::Idle;
        let view = CallView {
            peers: if idle { self.peers.clone() } else { Vec::new() },
            selected: self.selected.clone(),
            state: snapshot.state,
            remote_peer: snapshot.remote_peer,
            muted: self.media.is_muted(),
            connected: self.connected,
            can_start: idle && self.connected && self.selected.is_some(),
            local_preview: self.media.local_stream().is_some(),
            remote_preview: self.media.remote_stream().is_some(),
        };
        self.view.send_replace(view);
    }
}

async fn next_relay_event(rx: &mut Option<mpsc::Receiver<RelayEvent>>) -> Option<RelayEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
