//! In-memory stand-ins for the relay and peer-connection seams.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::media::LocalStream;
use crate::peer::{ConnectionEvent, PeerConnection, PeerConnector};
use crate::relay::{
    IceCandidate, RelayDialer, RelayError, RelayEvent, SessionDescription, Signaling,
};
use crate::CallError;

// ---------------------------------------------------------------------------
// Signaling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Sent {
    Offer(String, SessionDescription),
    Answer(String, SessionDescription),
    Candidate(String, IceCandidate),
}

#[derive(Default)]
pub(crate) struct FakeSignaling {
    sent: Mutex<Vec<Sent>>,
    disconnects: AtomicUsize,
}

impl FakeSignaling {
    pub(crate) fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub(crate) fn offers(&self) -> usize {
        self.sent()
            .iter()
            .filter(|s| matches!(s, Sent::Offer(..)))
            .count()
    }

    pub(crate) fn disconnects(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Signaling for FakeSignaling {
    async fn send_offer(&self, target: &str, offer: &SessionDescription) -> Result<(), RelayError> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Offer(target.into(), offer.clone()));
        Ok(())
    }

    async fn send_answer(&self, target: &str, answer: &SessionDescription) -> Result<(), RelayError> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Answer(target.into(), answer.clone()));
        Ok(())
    }

    async fn send_candidate(&self, target: &str, candidate: &IceCandidate) -> Result<(), RelayError> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Candidate(target.into(), candidate.clone()));
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct FakeDialer {
    pub(crate) signaling: Arc<FakeSignaling>,
    events: Mutex<Option<mpsc::Receiver<RelayEvent>>>,
    dials: AtomicUsize,
}

impl FakeDialer {
    /// Dialer plus the sender that plays the relay's side of the event stream.
    pub(crate) fn new() -> (Self, mpsc::Sender<RelayEvent>) {
        let (tx, rx) = mpsc::channel(64);
        let dialer = Self {
            signaling: Arc::new(FakeSignaling::default()),
            events: Mutex::new(Some(rx)),
            dials: AtomicUsize::new(0),
        };
        (dialer, tx)
    }

    pub(crate) fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

impl RelayDialer for FakeDialer {
    fn dial(&self) -> (Arc<dyn Signaling>, mpsc::Receiver<RelayEvent>) {
        self.dials.fetch_add(1, Ordering::SeqCst);
        let rx = self
            .events
            .lock()
            .unwrap()
            .take()
            .unwrap_or_else(|| mpsc::channel(1).1);
        (self.signaling.clone(), rx)
    }
}

// ---------------------------------------------------------------------------
// Peer connections
// ---------------------------------------------------------------------------

/// What a fake connection has been asked to do.
#[derive(Debug, Default)]
pub(crate) struct PeerLog {
    pub(crate) id: u64,
    pub(crate) closed: AtomicBool,
    pub(crate) tracks: AtomicUsize,
    pub(crate) local: Mutex<Vec<SessionDescription>>,
    pub(crate) remote: Mutex<Vec<SessionDescription>>,
    pub(crate) candidates: Mutex<Vec<IceCandidate>>,
}

#[derive(Default)]
pub(crate) struct FakeConnector {
    connections: Mutex<Vec<Arc<PeerLog>>>,
    max_live: AtomicUsize,
    pub(crate) fail_connect: AtomicBool,
    pub(crate) fail_remote_description: AtomicBool,
    pub(crate) fail_candidates: AtomicBool,
}

impl FakeConnector {
    pub(crate) fn live(&self) -> usize {
        self.connections
            .lock()
            .unwrap()
            .iter()
            .filter(|c| !c.closed.load(Ordering::SeqCst))
            .count()
    }

    pub(crate) fn max_live(&self) -> usize {
        self.max_live.load(Ordering::SeqCst)
    }

    pub(crate) fn created(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    pub(crate) fn last(&self) -> Option<Arc<PeerLog>> {
        self.connections.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PeerConnector for FakeConnector {
    async fn connect(
        &self,
        id: u64,
        _events: mpsc::Sender<ConnectionEvent>,
    ) -> Result<Box<dyn PeerConnection>, CallError> {
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(CallError::Negotiation("connector refused".into()));
        }
        let log = Arc::new(PeerLog {
            id,
            ..Default::default()
        });
        self.connections.lock().unwrap().push(log.clone());
        self.max_live.fetch_max(self.live(), Ordering::SeqCst);
        Ok(Box::new(FakePeerConnection {
            log,
            fail_remote_description: self.fail_remote_description.load(Ordering::SeqCst),
            fail_candidates: self.fail_candidates.load(Ordering::SeqCst),
        }))
    }
}

struct FakePeerConnection {
    log: Arc<PeerLog>,
    fail_remote_description: bool,
    fail_candidates: bool,
}

#[async_trait]
impl PeerConnection for FakePeerConnection {
    async fn add_local_tracks(&self, stream: &LocalStream) -> Result<(), CallError> {
        self.log
            .tracks
            .fetch_add(stream.tracks().len(), Ordering::SeqCst);
        Ok(())
    }

    async fn create_offer(&self) -> Result<SessionDescription, CallError> {
        Ok(SessionDescription::offer(format!("offer-{}", self.log.id)))
    }

    async fn create_answer(&self) -> Result<SessionDescription, CallError> {
        Ok(SessionDescription::answer(format!("answer-{}", self.log.id)))
    }

    async fn set_local_description(&self, desc: &SessionDescription) -> Result<(), CallError> {
        self.log.local.lock().unwrap().push(desc.clone());
        Ok(())
    }

    async fn set_remote_description(&self, desc: &SessionDescription) -> Result<(), CallError> {
        if self.fail_remote_description {
            return Err(CallError::Negotiation("bad remote description".into()));
        }
        self.log.remote.lock().unwrap().push(desc.clone());
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: &IceCandidate) -> Result<(), CallError> {
        if self.fail_candidates {
            return Err(CallError::Negotiation("bad candidate".into()));
        }
        self.log.candidates.lock().unwrap().push(candidate.clone());
        Ok(())
    }

    async fn close(&self) {
        self.log.closed.store(true, Ordering::SeqCst);
    }
}

pub(crate) fn candidate(n: u32) -> IceCandidate {
    IceCandidate {
        candidate: format!("candidate:{n} 1 udp 2122260223 10.0.0.{n} 5000{n} typ host"),
        sdp_mid: Some("0".into()),
        sdp_mline_index: Some(0),
        username_fragment: None,
    }
}
