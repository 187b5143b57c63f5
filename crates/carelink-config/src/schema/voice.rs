//! Voice input configuration types.

use serde::{Deserialize, Serialize};

/// Recognition languages offered by the voice input selector.
pub const SUPPORTED_LANGUAGES: &[&str] = &["en-US", "es-ES", "fr-FR", "de-DE", "zh-CN", "hi-IN"];

/// Voice input and transcription settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// BCP-47 tag, one of [`SUPPORTED_LANGUAGES`].
    pub language: String,
    /// Start in offline mode (no recognition service calls).
    pub offline: bool,
    /// Whisper-compatible transcription endpoint.
    pub transcription_url: String,
    pub transcription_api_key: Option<String>,
    pub model: String,
}

impl std::fmt::Debug for VoiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceConfig")
            .field("language", &self.language)
            .field("offline", &self.offline)
            .field("transcription_url", &self.transcription_url)
            .field(
                "transcription_api_key",
                &self.transcription_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("model", &self.model)
            .finish()
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            language: "en-US".into(),
            offline: false,
            transcription_url: "https://api.openai.com/v1/audio/transcriptions".into(),
            transcription_api_key: None,
            model: "whisper-1".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_api_key() {
        let config = VoiceConfig {
            transcription_api_key: Some("sk-secret".into()),
            ..Default::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
