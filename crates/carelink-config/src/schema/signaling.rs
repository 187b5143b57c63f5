//! Signaling relay configuration.

use serde::{Deserialize, Serialize};

/// Connection settings for the Socket.IO signaling relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    /// Base URL of the relay (`http`, `https`, `ws` or `wss`).
    pub url: String,
    /// Name announced on join. Empty means a random `User-<n>` name.
    pub display_name: String,
    pub connect_timeout_secs: u32,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5000".into(),
            display_name: String::new(),
            connect_timeout_secs: 15,
        }
    }
}
