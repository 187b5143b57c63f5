use std::sync::Arc;

use carelink_common::{Event, EventBus, Notification};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use super::{CallSnapshot, CallState};
use crate::media::MediaPipeline;
use crate::peer::{ConnectionEvent, ConnectionState, PeerConnection, PeerConnector, PeerEvent};
use crate::relay::{IceCandidate, SessionDescription, Signaling};
use crate::CallError;

/// The one live call. Exists only while Negotiating or Active.
struct Session {
    state: CallState,
    remote_peer: String,
    connection: Option<(u64, Arc<dyn PeerConnection>)>,
}

/// How an inbound offer relates to the current session.
enum Incoming {
    Fresh,
    Renegotiate(Arc<dyn PeerConnection>),
    Collision,
}

/// Drives offer/answer and candidate exchange for at most one call.
///
/// Every method runs on the controller task; local media is borrowed from
/// the caller's [`MediaPipeline`] and released on every exit from a call.
pub struct Negotiator {
    connector: Arc<dyn PeerConnector>,
    signaling: Arc<dyn Signaling>,
    connection_events: mpsc::Sender<ConnectionEvent>,
    events: EventBus,
    session: Option<Session>,
    self_id: Option<String>,
    next_connection: u64,
    muted: bool,
    snapshot: watch::Sender<CallSnapshot>,
}

impl Negotiator {
    pub fn new(
        connector: Arc<dyn PeerConnector>,
        signaling: Arc<dyn Signaling>,
        connection_events: mpsc::Sender<ConnectionEvent>,
        events: EventBus,
    ) -> Self {
        let (snapshot, _) = watch::channel(CallSnapshot::default());
        Self {
            connector,
            signaling,
            connection_events,
            events,
            session: None,
            self_id: None,
            next_connection: 1,
            muted: false,
            snapshot,
        }
    }

    /// Our relay id, used to settle offer collisions.
    pub fn set_self_id(&mut self, id: impl Into<String>) {
        self.self_id = Some(id.into());
    }

    /// When both sides offer at once, the lower id drops its own offer and
    /// answers. Without a known id we always yield.
    fn yields_to(&self, peer: &str) -> bool {
        self.self_id.as_deref().map_or(true, |me| me < peer)
    }

    pub fn subscribe(&self) -> watch::Receiver<CallSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> CallSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> CallState {
        self.session.as_ref().map_or(CallState::Idle, |s| s.state)
    }

    pub fn remote_peer(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.remote_peer.as_str())
    }

    /// Id of the live connection, if any.
    pub fn connection_id(&self) -> Option<u64> {
        self.session
            .as_ref()
            .and_then(|s| s.connection.as_ref())
            .map(|(id, _)| *id)
    }

    // -----------------------------------------------------------------------
    // Outbound call
    // -----------------------------------------------------------------------

    pub async fn start_call(&mut self, peer: &str, media: &mut MediaPipeline) -> Result<(), CallError> {
        if let Some(session) = &self.session {
            warn!(peer, current = %session.remote_peer, "call already in progress");
            return Err(CallError::Busy);
        }
        info!(peer, "starting call");
        self.session = Some(Session {
            state: CallState::Negotiating,
            remote_peer: peer.to_string(),
            connection: None,
        });

        match self.send_offer(peer, media).await {
            Ok(()) => {
                self.publish();
                Ok(())
            }
            Err(e) => Err(self.fail(media, e).await),
        }
    }

    async fn send_offer(&mut self, peer: &str, media: &mut MediaPipeline) -> Result<(), CallError> {
        let stream = media.acquire_local().await?.clone();
        let pc = self.open_connection().await?;
        pc.add_local_tracks(&stream).await?;
        let offer = pc.create_offer().await?;
        pc.set_local_description(&offer).await?;
        self.signaling.send_offer(peer, &offer).await?;
        debug!(peer, "offer sent");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Inbound call
    // -----------------------------------------------------------------------

    pub async fn accept_offer(
        &mut self,
        sender: &str,
        offer: &SessionDescription,
        media: &mut MediaPipeline,
    ) -> Result<(), CallError> {
        let incoming = match &self.session {
            Some(session) if session.remote_peer != sender => {
                warn!(sender, current = %session.remote_peer, "rejecting offer while busy");
                return Err(CallError::Busy);
            }
            Some(session) if session.state == CallState::Active => match &session.connection {
                Some((_, pc)) => Incoming::Renegotiate(Arc::clone(pc)),
                None => Incoming::Fresh,
            },
            Some(_) => Incoming::Collision,
            None => Incoming::Fresh,
        };

        let result = match incoming {
            Incoming::Renegotiate(pc) => {
                info!(sender, "renegotiating call");
                self.send_answer(sender, &pc, offer).await
            }
            Incoming::Collision if !self.yields_to(sender) => {
                info!(sender, "offer collision, keeping our offer");
                return Err(CallError::Busy);
            }
            Incoming::Collision => {
                info!(sender, "offer collision, answering theirs");
                self.close_pending().await;
                self.answer_new(sender, offer, media).await
            }
            Incoming::Fresh => {
                info!(sender, "accepting call");
                self.session = Some(Session {
                    state: CallState::Negotiating,
                    remote_peer: sender.to_string(),
                    connection: None,
                });
                self.answer_new(sender, offer, media).await
            }
        };

        match result {
            Ok(()) => {
                self.set_state(CallState::Active);
                Ok(())
            }
            Err(e) => Err(self.fail(media, e).await),
        }
    }

    /// Close the connection carrying our unanswered offer; the session stays.
    async fn close_pending(&mut self) {
        let pending = self.session.as_mut().and_then(|s| s.connection.take());
        if let Some((id, pc)) = pending {
            debug!(connection = id, "closing pending offer");
            pc.close().await;
        }
    }

    async fn answer_new(
        &mut self,
        sender: &str,
        offer: &SessionDescription,
        media: &mut MediaPipeline,
    ) -> Result<(), CallError> {
        let stream = media.acquire_local().await?.clone();
        let pc = self.open_connection().await?;
        pc.add_local_tracks(&stream).await?;
        self.send_answer(sender, &pc, offer).await
    }

    async fn send_answer(
        &self,
        sender: &str,
        pc: &Arc<dyn PeerConnection>,
        offer: &SessionDescription,
    ) -> Result<(), CallError> {
        pc.set_remote_description(offer).await?;
        let answer = pc.create_answer().await?;
        pc.set_local_description(&answer).await?;
        self.signaling.send_answer(sender, &answer).await?;
        debug!(sender, "answer sent");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Remote answer and candidates
    // -----------------------------------------------------------------------

    pub async fn apply_answer(
        &mut self,
        sender: Option<&str>,
        answer: &SessionDescription,
        media: &mut MediaPipeline,
    ) -> Result<(), CallError> {
        let pc = match &self.session {
            Some(session) if session.state == CallState::Negotiating => {
                if sender.is_some_and(|s| s != session.remote_peer) {
                    warn!(sender, peer = %session.remote_peer, "dropping answer from another peer");
                    return Err(CallError::NoSession);
                }
                session.connection.as_ref().map(|(_, pc)| Arc::clone(pc))
            }
            _ => None,
        };
        let Some(pc) = pc else {
            warn!(sender, "dropping answer with no pending call");
            return Err(CallError::NoSession);
        };

        match pc.set_remote_description(answer).await {
            Ok(()) => {
                info!(peer = self.remote_peer(), "call answered");
                self.set_state(CallState::Active);
                Ok(())
            }
            Err(e) => Err(self.fail(media, e).await),
        }
    }

    /// Apply a remote candidate to the live connection. Nothing is buffered.
    pub async fn add_remote_candidate(
        &mut self,
        sender: Option<&str>,
        candidate: &IceCandidate,
    ) -> Result<(), CallError> {
        let Some(session) = &self.session else {
            debug!(sender, "dropping candidate with no call");
            return Err(CallError::NoSession);
        };
        if sender.is_some_and(|s| s != session.remote_peer) {
            warn!(sender, peer = %session.remote_peer, "dropping candidate from another peer");
            return Err(CallError::NoSession);
        }
        let Some((id, pc)) = &session.connection else {
            debug!(sender, "dropping candidate with no connection");
            return Err(CallError::NoSession);
        };
        if let Err(e) = pc.add_ice_candidate(candidate).await {
            warn!(connection = id, error = %e, "failed to add remote candidate");
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Connection events
    // -----------------------------------------------------------------------

    pub async fn on_connection_event(&mut self, event: ConnectionEvent, media: &mut MediaPipeline) {
        if self.connection_id() != Some(event.connection) {
            debug!(connection = event.connection, "ignoring event from stale connection");
            return;
        }
        match event.event {
            PeerEvent::LocalCandidate(candidate) => {
                let Some(peer) = self.remote_peer() else {
                    debug!("no remote peer, dropping local candidate");
                    return;
                };
                if let Err(e) = self.signaling.send_candidate(peer, &candidate).await {
                    warn!(error = %e, "failed to send local candidate");
                }
            }
            PeerEvent::RemoteTrack(track) => {
                media.attach_remote_track(track);
            }
            PeerEvent::StateChanged(state) => match state {
                ConnectionState::Failed => {
                    let err = CallError::Negotiation("peer connection failed".into());
                    self.fail(media, err).await;
                }
                ConnectionState::Disconnected => {
                    warn!(connection = event.connection, "peer connection interrupted");
                }
                other => debug!(connection = event.connection, state = ?other, "peer connection state"),
            },
        }
    }

    // -----------------------------------------------------------------------
    // Teardown and mute
    // -----------------------------------------------------------------------

    /// Close the connection, release local media, go Idle. Safe in any state.
    pub async fn end_call(&mut self, media: &mut MediaPipeline) {
        if let Some(session) = self.session.take() {
            if let Some((_, pc)) = session.connection {
                pc.close().await;
            }
            info!(peer = %session.remote_peer, "call ended");
        }
        media.release();
        self.muted = false;
        self.publish();
    }

    /// Flip local audio; returns the new muted state.
    pub fn toggle_mute(&mut self, media: &mut MediaPipeline) -> bool {
        self.muted = media.toggle_mute();
        self.publish();
        self.muted
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn open_connection(&mut self) -> Result<Arc<dyn PeerConnection>, CallError> {
        let id = self.next_connection;
        self.next_connection += 1;
        let pc: Arc<dyn PeerConnection> =
            Arc::from(self.connector.connect(id, self.connection_events.clone()).await?);
        match &mut self.session {
            Some(session) => session.connection = Some((id, Arc::clone(&pc))),
            None => {
                pc.close().await;
                return Err(CallError::NoSession);
            }
        }
        Ok(pc)
    }

    /// Error exit: tear down through `end_call`, notify, hand the error back.
    pub async fn fail(&mut self, media: &mut MediaPipeline, err: CallError) -> CallError {
        error!(error = %err, peer = self.remote_peer(), "call failed");
        self.end_call(media).await;
        // Media failures are already surfaced by the pipeline.
        if !matches!(err, CallError::Media(_)) {
            self.events
                .notify(Notification::error("Call Failed", err.to_string()));
        }
        err
    }

    fn set_state(&mut self, state: CallState) {
        if let Some(session) = &mut self.session {
            session.state = state;
        }
        self.publish();
    }

    fn publish(&self) {
        let snapshot = CallSnapshot {
            state: self.state(),
            remote_peer: self.remote_peer().map(str::to_string),
            muted: self.muted,
        };
        self.events.publish(Event::CallStateChanged {
            state: snapshot.state.to_string(),
            peer: snapshot.remote_peer.clone(),
        });
        self.snapshot.send_replace(snapshot);
    }
}
