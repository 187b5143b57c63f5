use serde::{Deserialize, Serialize};
use std::fmt;

/// Sequential identifier of a chat message within one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic counter handing out `MessageId`s, starting at 1.
#[derive(Debug)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> MessageId {
        let id = MessageId(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_starts_at_one_and_increments() {
        let mut seq = IdSequence::new();
        assert_eq!(seq.next_id(), MessageId(1));
        assert_eq!(seq.next_id(), MessageId(2));
    }

    #[test]
    fn message_id_display() {
        assert_eq!(MessageId(42).to_string(), "42");
    }

    #[test]
    fn message_id_orders_numerically() {
        assert!(MessageId(2) < MessageId(10));
    }
}
