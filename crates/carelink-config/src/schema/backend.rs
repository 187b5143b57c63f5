//! Assistant backend endpoint configuration.

use serde::{Deserialize, Serialize};

/// Where the chat, scan, and text-to-speech endpoints live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Scheme, host and port of the assistant backend. No trailing slash.
    pub base_url: String,
    /// Sent as `user_id` with every chat request.
    pub user_id: String,
    /// Whole-request timeout for backend calls.
    pub timeout_secs: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".into(),
            user_id: "default_user".into(),
            timeout_secs: 30,
        }
    }
}

impl BackendConfig {
    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }

    pub fn chat_url(&self) -> String {
        self.endpoint("/api/chat")
    }

    pub fn scan_url(&self) -> String {
        self.endpoint("/api/scan-prescription")
    }

    pub fn speech_url(&self) -> String {
        self.endpoint("/api/text-to-speech")
    }
}
