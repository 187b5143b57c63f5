//! The single-call negotiation state machine.
//!
//! `Idle → Negotiating → Active → Idle`. An inbound offer moves straight to
//! `Active` once the answer has been sent; an outbound call waits for the
//! remote answer.

mod negotiator;


pub use negotiator::Negotiator;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CallState {
    #[default]
    Idle,
    Negotiating,
    Active,
}

impl CallState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Negotiating => "negotiating",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the rendering layer observes about the call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallSnapshot {
    pub state: CallState,
    pub remote_peer: Option<String>,
    pub muted: bool,
}
