//! Health-assistant client for CareLink.
//!
//! Provides:
//! - the chat thread (message list, typing indicator, tools panel)
//! - chat, prescription OCR and text-to-speech backend clients
//! - voice input with an optional Whisper-compatible transcriber
//!
//! Every backend is reached through a trait so the thread and scanners can
//! be driven by fakes in tests.

pub mod attachments;
pub mod backend;
pub mod prescription;
pub mod speech;
pub mod thread;
pub mod tools;
pub mod voice;

pub use attachments::{Attachment, Medication};
pub use backend::{ChatBackend, HttpBackend, ScanBackend, SpeechBackend};
pub use prescription::{ImageSource, PrescriptionScanner, ScanReport};
pub use speech::{SpeechClient, SpeechClip};
pub use thread::{Author, ChatMessage, ChatThread};
pub use tools::{Tool, ToolAction, ToolOutcome};
pub use voice::{HttpTranscriber, Transcriber, VoiceInput, VoiceLanguage};

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("network error: {0}")]
    Network(String),
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("input is empty")]
    EmptyInput,
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl From<AssistantError> for carelink_common::CareError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::Network(msg) => carelink_common::CareError::Network(msg),
            other => carelink_common::CareError::Backend(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_common::CareError;

    #[test]
    fn network_error_maps_to_care_network() {
        let err: CareError = AssistantError::Network("refused".into()).into();
        assert!(matches!(err, CareError::Network(ref m) if m == "refused"));
    }

    #[test]
    fn api_error_maps_to_backend() {
        let err: CareError = AssistantError::Api {
            status: 502,
            message: "bad gateway".into(),
        }
        .into();
        assert!(matches!(err, CareError::Backend(_)));
        assert!(err.to_string().contains("502"));
    }
}
