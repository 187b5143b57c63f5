use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::notifications::{Notification, NotificationLevel};

/// Application-wide events fanned out to whatever renders the widget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    MessageAppended { id: u64 },
    Typing(bool),
    Notify {
        level: NotificationLevel,
        title: String,
        body: String,
    },
    CallStateChanged { state: String, peer: Option<String> },
    PeersUpdated { count: usize },
    RelayConnectivity { connected: bool },
    Shutdown,
    #[serde(other)]
    Unknown,
}

impl From<Notification> for Event {
    fn from(n: Notification) -> Self {
        Event::Notify {
            level: n.level,
            title: n.title,
            body: n.body,
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: Event) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Publish a one-shot user notification.
    pub fn notify(&self, notification: Notification) -> usize {
        self.publish(notification.into())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
