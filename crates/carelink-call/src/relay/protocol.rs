//! Relay event vocabulary: payload validation and outbound builders.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::types::{IceCandidate, Peer, RelayEvent, SessionDescription};
use super::wire::SocketPacket;

pub(crate) const JOIN_ROOM: &str = "join_room";
pub(crate) const USER_LIST: &str = "user_list";
pub(crate) const VIDEO_OFFER: &str = "video_offer";
pub(crate) const VIDEO_ANSWER: &str = "video_answer";
pub(crate) const ICE_CANDIDATE: &str = "ice_candidate";

#[derive(Deserialize)]
struct OfferPayload {
    offer: SessionDescription,
    source: String,
}

#[derive(Deserialize)]
struct AnswerPayload {
    answer: SessionDescription,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Deserialize)]
struct CandidatePayload {
    candidate: IceCandidate,
    #[serde(default)]
    source: Option<String>,
}

/// Translate an inbound Socket.IO event into a [`RelayEvent`].
///
/// Returns `Ok(None)` for events this client doesn't consume and `Err` for
/// known events whose payload fails validation.
pub(crate) fn translate_event(
    name: &str,
    args: Vec<Value>,
    self_id: Option<&str>,
) -> Result<Option<RelayEvent>, String> {
    let data = args.into_iter().next().unwrap_or(Value::Null);
    match name {
        USER_LIST => {
            let entries = match data {
                Value::Array(entries) => entries,
                other => return Err(format!("user_list is not an array: {other}")),
            };
            let peers = entries
                .into_iter()
                .filter_map(|entry| match serde_json::from_value::<Peer>(entry) {
                    Ok(peer) => Some(peer),
                    Err(e) => {
                        warn!(error = %e, "dropping malformed user_list entry");
                        None
                    }
                })
                .filter(|peer| Some(peer.id.as_str()) != self_id)
                .collect();
            Ok(Some(RelayEvent::PeerList(peers)))
        }
        VIDEO_OFFER => {
            let p: OfferPayload = parse(name, data)?;
            Ok(Some(RelayEvent::Offer {
                sender_id: p.source,
                description: p.offer,
            }))
        }
        VIDEO_ANSWER => {
            let p: AnswerPayload = parse(name, data)?;
            Ok(Some(RelayEvent::Answer {
                sender_id: p.source,
                description: p.answer,
            }))
        }
        ICE_CANDIDATE => {
            let p: CandidatePayload = parse(name, data)?;
            Ok(Some(RelayEvent::Candidate {
                sender_id: p.source,
                candidate: p.candidate,
            }))
        }
        other => {
            debug!(event = other, "ignoring relay event");
            Ok(None)
        }
    }
}

fn parse<T: for<'de> Deserialize<'de>>(name: &str, data: Value) -> Result<T, String> {
    serde_json::from_value(data).map_err(|e| format!("invalid {name} payload: {e}"))
}

pub(crate) fn join_room(username: &str) -> SocketPacket {
    SocketPacket::event(JOIN_ROOM, json!({ "username": username }))
}

pub(crate) fn video_offer(target: &str, offer: &SessionDescription) -> SocketPacket {
    SocketPacket::event(VIDEO_OFFER, json!({ "offer": offer, "target": target }))
}

pub(crate) fn video_answer(target: &str, answer: &SessionDescription) -> SocketPacket {
    SocketPacket::event(VIDEO_ANSWER, json!({ "answer": answer, "target": target }))
}

pub(crate) fn ice_candidate(target: &str, candidate: &IceCandidate) -> SocketPacket {
    SocketPacket::event(
        ICE_CANDIDATE,
        json!({ "candidate": candidate, "target": target }),
    )
}
