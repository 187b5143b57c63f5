//! Engine.IO v4 / Socket.IO v4 text packet codec.
//!
//! Only the WebSocket transport is spoken, so every frame carries exactly
//! one Engine.IO packet. Binary Socket.IO packets are rejected.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("empty packet")]
    Empty,
    #[error("unknown {layer} packet type {kind:?}")]
    UnknownType { layer: &'static str, kind: char },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),
    #[error("malformed packet: {0}")]
    Malformed(String),
    #[error("unsupported packet: {0}")]
    Unsupported(&'static str),
}

// ---------------------------------------------------------------------------
// Engine.IO
// ---------------------------------------------------------------------------

/// Handshake carried by the Engine.IO `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    pub ping_interval: u64,
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    pub fn decode(frame: &str) -> Result<Self, WireError> {
        let mut chars = frame.chars();
        let kind = chars.next().ok_or(WireError::Empty)?;
        let body = chars.as_str();
        match kind {
            '0' => serde_json::from_str(body)
                .map(EnginePacket::Open)
                .map_err(|e| WireError::InvalidJson(e.to_string())),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(body.to_string())),
            '3' => Ok(EnginePacket::Pong(body.to_string())),
            '4' => Ok(EnginePacket::Message(body.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            other => Err(WireError::UnknownType {
                layer: "engine.io",
                kind: other,
            }),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            EnginePacket::Open(handshake) => {
                format!("0{}", serde_json::to_string(handshake).unwrap_or_default())
            }
            EnginePacket::Close => "1".into(),
            EnginePacket::Ping(data) => format!("2{data}"),
            EnginePacket::Pong(data) => format!("3{data}"),
            EnginePacket::Message(data) => format!("4{data}"),
            EnginePacket::Upgrade => "5".into(),
            EnginePacket::Noop => "6".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Socket.IO
// ---------------------------------------------------------------------------

pub const DEFAULT_NAMESPACE: &str = "/";

#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack_id: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        data: Value,
    },
}

impl SocketPacket {
    /// An event on the default namespace with a single argument.
    pub fn event(name: impl Into<String>, data: Value) -> Self {
        SocketPacket::Event {
            namespace: DEFAULT_NAMESPACE.into(),
            ack_id: None,
            name: name.into(),
            args: vec![data],
        }
    }

    pub fn connect() -> Self {
        SocketPacket::Connect {
            namespace: DEFAULT_NAMESPACE.into(),
            data: None,
        }
    }

    pub fn disconnect() -> Self {
        SocketPacket::Disconnect {
            namespace: DEFAULT_NAMESPACE.into(),
        }
    }

    /// Decode the payload of an Engine.IO `message` packet.
    pub fn decode(payload: &str) -> Result<Self, WireError> {
        let mut chars = payload.chars();
        let kind = chars.next().ok_or(WireError::Empty)?;
        let mut rest = chars.as_str();

        if matches!(kind, '5' | '6') {
            return Err(WireError::Unsupported("binary socket.io packets"));
        }

        let namespace = if rest.starts_with('/') {
            match rest.find(',') {
                Some(idx) => {
                    let ns = &rest[..idx];
                    rest = &rest[idx + 1..];
                    ns.to_string()
                }
                None => {
                    let ns = rest.to_string();
                    rest = "";
                    ns
                }
            }
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let ack_id = if digits > 0 {
            let id = rest[..digits]
                .parse::<u64>()
                .map_err(|e| WireError::Malformed(format!("ack id: {e}")))?;
            rest = &rest[digits..];
            Some(id)
        } else {
            None
        };

        let data = if rest.is_empty() {
            None
        } else {
            Some(
                serde_json::from_str::<Value>(rest)
                    .map_err(|e| WireError::InvalidJson(e.to_string()))?,
            )
        };

        match kind {
            '0' => Ok(SocketPacket::Connect { namespace, data }),
            '1' => Ok(SocketPacket::Disconnect { namespace }),
            '2' => {
                let mut items = match data {
                    Some(Value::Array(items)) => items.into_iter(),
                    _ => return Err(WireError::Malformed("event payload is not an array".into())),
                };
                let name = match items.next() {
                    Some(Value::String(name)) => name,
                    _ => return Err(WireError::Malformed("event has no name".into())),
                };
                Ok(SocketPacket::Event {
                    namespace,
                    ack_id,
                    name,
                    args: items.collect(),
                })
            }
            '3' => {
                let ack_id =
                    ack_id.ok_or_else(|| WireError::Malformed("ack without id".into()))?;
                let args = match data {
                    Some(Value::Array(items)) => items,
                    None => Vec::new(),
                    Some(_) => return Err(WireError::Malformed("ack payload is not an array".into())),
                };
                Ok(SocketPacket::Ack {
                    namespace,
                    ack_id,
                    args,
                })
            }
            '4' => Ok(SocketPacket::ConnectError {
                namespace,
                data: data.unwrap_or(Value::Null),
            }),
            other => Err(WireError::UnknownType {
                layer: "socket.io",
                kind: other,
            }),
        }
    }

    /// Encode as the payload of an Engine.IO `message` packet.
    pub fn encode(&self) -> String {
        fn prefix(kind: char, namespace: &str) -> String {
            if namespace == DEFAULT_NAMESPACE {
                kind.to_string()
            } else {
                format!("{kind}{namespace},")
            }
        }

        match self {
            SocketPacket::Connect { namespace, data } => {
                let mut out = prefix('0', namespace);
                if let Some(data) = data {
                    out.push_str(&data.to_string());
                }
                out
            }
            SocketPacket::Disconnect { namespace } => prefix('1', namespace),
            SocketPacket::Event {
                namespace,
                ack_id,
                name,
                args,
            } => {
                let mut out = prefix('2', namespace);
                if let Some(id) = ack_id {
                    out.push_str(&id.to_string());
                }
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                out.push_str(&Value::Array(items).to_string());
                out
            }
            SocketPacket::Ack {
                namespace,
                ack_id,
                args,
            } => {
                let mut out = prefix('3', namespace);
                out.push_str(&ack_id.to_string());
                out.push_str(&Value::Array(args.clone()).to_string());
                out
            }
            SocketPacket::ConnectError { namespace, data } => {
                format!("{}{data}", prefix('4', namespace))
            }
        }
    }

    /// Wrap into the Engine.IO frame that carries it.
    pub fn to_frame(&self) -> String {
        EnginePacket::Message(self.encode()).encode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_open_handshake() {
        let packet = EnginePacket::decode(
            r#"0{"sid":"lv_VI97HAXpY6yYWAAAC","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#,
        )
        .unwrap();
        match packet {
            EnginePacket::Open(h) => {
                assert_eq!(h.sid, "lv_VI97HAXpY6yYWAAAC");
                assert_eq!(h.ping_interval, 25000);
                assert_eq!(h.ping_timeout, 20000);
                assert_eq!(h.max_payload, Some(1_000_000));
            }
            other => panic!("expected open, got {other:?}"),
        }
    }

    #[test]
    fn ping_is_answered_with_matching_pong() {
        assert_eq!(EnginePacket::decode("2").unwrap(), EnginePacket::Ping(String::new()));
        assert_eq!(EnginePacket::Pong(String::new()).encode(), "3");
        assert_eq!(
            EnginePacket::decode("2probe").unwrap(),
            EnginePacket::Ping("probe".into())
        );
    }

    #[test]
    fn engine_errors_are_values() {
        assert_eq!(EnginePacket::decode(""), Err(WireError::Empty));
        assert!(matches!(
            EnginePacket::decode("9"),
            Err(WireError::UnknownType { kind: '9', .. })
        ));
        assert!(matches!(
            EnginePacket::decode("0{not json"),
            Err(WireError::InvalidJson(_))
        ));
    }

    #[test]
    fn decodes_connect_ack_with_sid() {
        let packet = SocketPacket::decode(r#"0{"sid":"wZX3oN0bSVIhsaknAAAI"}"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::Connect {
                namespace: "/".into(),
                data: Some(json!({"sid": "wZX3oN0bSVIhsaknAAAI"})),
            }
        );
    }

    #[test]
    fn decodes_event_with_namespace_and_ack() {
        let packet = SocketPacket::decode(r#"2/admin,13["user_list",[{"username":"a","sid":"x"}]]"#)
            .unwrap();
        assert_eq!(
            packet,
            SocketPacket::Event {
                namespace: "/admin".into(),
                ack_id: Some(13),
                name: "user_list".into(),
                args: vec![json!([{"username": "a", "sid": "x"}])],
            }
        );
    }

    #[test]
    fn encodes_event_on_default_namespace() {
        let packet = SocketPacket::event("join_room", json!({"username": "User-7"}));
        assert_eq!(packet.encode(), r#"2["join_room",{"username":"User-7"}]"#);
        assert_eq!(packet.to_frame(), r#"42["join_room",{"username":"User-7"}]"#);
    }

    #[test]
    fn encodes_connect_and_disconnect() {
        assert_eq!(SocketPacket::connect().to_frame(), "40");
        assert_eq!(SocketPacket::disconnect().to_frame(), "41");
        let ns = SocketPacket::Disconnect {
            namespace: "/admin".into(),
        };
        assert_eq!(ns.encode(), "1/admin,");
    }

    #[test]
    fn event_round_trip_keeps_ack_id() {
        let packet = SocketPacket::Event {
            namespace: "/".into(),
            ack_id: Some(4),
            name: "video_offer".into(),
            args: vec![json!({"target": "b"})],
        };
        assert_eq!(SocketPacket::decode(&packet.encode()).unwrap(), packet);
    }

    #[test]
    fn decodes_connect_error() {
        let packet = SocketPacket::decode(r#"4{"message":"Not authorized"}"#).unwrap();
        assert_eq!(
            packet,
            SocketPacket::ConnectError {
                namespace: "/".into(),
                data: json!({"message": "Not authorized"}),
            }
        );
    }

    #[test]
    fn malformed_socket_packets_are_errors() {
        assert!(matches!(
            SocketPacket::decode(r#"2{"not":"array"}"#),
            Err(WireError::Malformed(_))
        ));
        assert!(matches!(SocketPacket::decode("2[]"), Err(WireError::Malformed(_))));
        assert!(matches!(SocketPacket::decode("2[42]"), Err(WireError::Malformed(_))));
        assert!(matches!(SocketPacket::decode("3[]"), Err(WireError::Malformed(_))));
        assert!(matches!(
            SocketPacket::decode(r#"51-["x",{"_placeholder":true,"num":0}]"#),
            Err(WireError::Unsupported(_))
        ));
        assert!(matches!(
            SocketPacket::decode("2[\"x\""),
            Err(WireError::InvalidJson(_))
        ));
        assert_eq!(SocketPacket::decode(""), Err(WireError::Empty));
    }
}
