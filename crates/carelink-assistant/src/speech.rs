//! Text-to-speech: request synthesized audio and decode the returned data URL.

use std::sync::Arc;

use base64::Engine as _;
use carelink_common::{EventBus, Notification};
use tracing::{debug, warn};

use crate::backend::SpeechBackend;
use crate::AssistantError;

/// Decoded audio returned by the speech endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechClip {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// `en-US` → `en`.
pub fn primary_subtag(language: &str) -> &str {
    language.split('-').next().unwrap_or(language)
}

/// Decode a `data:<mime>;base64,<payload>` URL.
pub fn decode_data_url(url: &str) -> Result<SpeechClip, AssistantError> {
    let rest = url
        .strip_prefix("data:")
        .ok_or_else(|| AssistantError::Parse("audio_url is not a data URL".into()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| AssistantError::Parse("data URL has no payload".into()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| AssistantError::Parse("data URL is not base64-encoded".into()))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| AssistantError::Parse(format!("invalid base64 audio: {e}")))?;
    Ok(SpeechClip {
        mime: mime.to_string(),
        bytes,
    })
}

pub struct SpeechClient {
    backend: Arc<dyn SpeechBackend>,
    events: EventBus,
}

impl SpeechClient {
    pub fn new(backend: Arc<dyn SpeechBackend>, events: EventBus) -> Self {
        Self { backend, events }
    }

    /// Synthesize `text` in the given voice language (full BCP-47 tag).
    pub async fn speak(&self, text: &str, language: &str) -> Result<SpeechClip, AssistantError> {
        let result = self.synthesize(text, primary_subtag(language)).await;
        if let Err(e) = &result {
            warn!(error = %e, "text-to-speech failed");
            self.events
                .notify(Notification::error("Speech Error", "Failed to generate speech"));
        }
        result
    }

    async fn synthesize(&self, text: &str, lang: &str) -> Result<SpeechClip, AssistantError> {
        if text.trim().is_empty() {
            return Err(AssistantError::EmptyInput);
        }
        let resp = self.backend.synthesize(text, lang).await?;
        match resp.audio_url {
            Some(url) if resp.success => {
                let clip = decode_data_url(&url)?;
                debug!(mime = %clip.mime, size = clip.bytes.len(), "speech decoded");
                Ok(clip)
            }
            _ => Err(AssistantError::Api {
                status: 200,
                message: resp
                    .error
                    .unwrap_or_else(|| "failed to generate speech".into()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SpeechResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSpeech {
        response: SpeechResponse,
        langs: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl SpeechBackend for FakeSpeech {
        async fn synthesize(
            &self,
            _text: &str,
            lang: &str,
        ) -> Result<SpeechResponse, AssistantError> {
            self.langs.lock().unwrap().push(lang.to_string());
            Ok(self.response.clone())
        }
    }

    #[test]
    fn primary_subtag_strips_region() {
        assert_eq!(primary_subtag("en-US"), "en");
        assert_eq!(primary_subtag("zh-CN"), "zh");
        assert_eq!(primary_subtag("hi"), "hi");
    }

    #[test]
    fn decodes_mp3_data_url() {
        let clip = decode_data_url("data:audio/mp3;base64,SUQz").unwrap();
        assert_eq!(clip.mime, "audio/mp3");
        assert_eq!(clip.bytes, b"ID3");
    }

    #[test]
    fn rejects_non_data_url() {
        assert!(decode_data_url("https://cdn.example.org/a.mp3").is_err());
        assert!(decode_data_url("data:audio/mp3,plain").is_err());
    }

    #[tokio::test]
    async fn speak_sends_primary_subtag() {
        let backend = Arc::new(FakeSpeech {
            response: SpeechResponse {
                success: true,
                audio_url: Some("data:audio/mp3;base64,SUQz".into()),
                error: None,
            },
            ..Default::default()
        });
        let client = SpeechClient::new(backend.clone(), EventBus::default());
        let clip = client.speak("Drink water", "fr-FR").await.unwrap();
        assert_eq!(clip.bytes, b"ID3");
        assert_eq!(*backend.langs.lock().unwrap(), vec!["fr".to_string()]);
    }

    #[tokio::test]
    async fn failure_raises_speech_error_notification() {
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let backend = Arc::new(FakeSpeech {
            response: SpeechResponse {
                success: false,
                audio_url: None,
                error: Some("gTTS unavailable".into()),
            },
            ..Default::default()
        });
        let client = SpeechClient::new(backend, events);
        assert!(client.speak("hello", "en-US").await.is_err());
        match rx.try_recv() {
            Ok(carelink_common::Event::Notify { title, .. }) => assert_eq!(title, "Speech Error"),
            other => panic!("expected notification, got {other:?}"),
        }
    }
}
