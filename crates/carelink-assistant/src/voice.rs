//! Voice input: language selection, listening state, and transcription.
//!
//! Recorded audio goes to a Whisper-compatible `/audio/transcriptions`
//! endpoint and the transcript is submitted to the chat thread.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use carelink_common::{EventBus, MessageId, Notification};
use carelink_config::VoiceConfig;
use tracing::{debug, info, warn};

use crate::speech::primary_subtag;
use crate::thread::ChatThread;
use crate::AssistantError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceLanguage {
    #[default]
    EnglishUs,
    Spanish,
    French,
    German,
    Chinese,
    Hindi,
}

impl VoiceLanguage {
    pub const ALL: [VoiceLanguage; 6] = [
        VoiceLanguage::EnglishUs,
        VoiceLanguage::Spanish,
        VoiceLanguage::French,
        VoiceLanguage::German,
        VoiceLanguage::Chinese,
        VoiceLanguage::Hindi,
    ];

    pub fn code(self) -> &'static str {
        match self {
            VoiceLanguage::EnglishUs => "en-US",
            VoiceLanguage::Spanish => "es-ES",
            VoiceLanguage::French => "fr-FR",
            VoiceLanguage::German => "de-DE",
            VoiceLanguage::Chinese => "zh-CN",
            VoiceLanguage::Hindi => "hi-IN",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            VoiceLanguage::EnglishUs => "English (US)",
            VoiceLanguage::Spanish => "Spanish",
            VoiceLanguage::French => "French",
            VoiceLanguage::German => "German",
            VoiceLanguage::Chinese => "Chinese",
            VoiceLanguage::Hindi => "Hindi",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.code().eq_ignore_ascii_case(code))
    }
}

/// Speech-to-text seam.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// `language` is an ISO-639-1 code such as `en`.
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        filename: &str,
        language: &str,
    ) -> Result<String, AssistantError>;
}

/// Whisper-compatible multipart transcription client.
pub struct HttpTranscriber {
    url: String,
    api_key: Option<String>,
    model: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for HttpTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTranscriber")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .finish()
    }
}

impl HttpTranscriber {
    pub fn from_config(config: &VoiceConfig) -> Result<Self, AssistantError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| AssistantError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            url: config.transcription_url.clone(),
            api_key: config
                .transcription_api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
            model: config.model.clone(),
            http,
        })
    }
}

fn audio_mime(filename: &str) -> &'static str {
    match filename.rsplit('.').next() {
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("webm") => "audio/webm",
        Some("ogg") => "audio/ogg",
        _ => "audio/wav",
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        filename: &str,
        language: &str,
    ) -> Result<String, AssistantError> {
        debug!(model = %self.model, size = audio.len(), language, "transcription request");

        let file_part = reqwest::multipart::Part::bytes(audio)
            .file_name(filename.to_string())
            .mime_str(audio_mime(filename))
            .map_err(|e| AssistantError::Parse(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("language", language.to_string());

        let mut request = self.http.post(&self.url).multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| AssistantError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AssistantError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AssistantError::Parse(e.to_string()))?;
        json["text"]
            .as_str()
            .map(|t| t.trim().to_string())
            .ok_or_else(|| AssistantError::Parse("no 'text' field in response".into()))
    }
}

/// Voice input state: selected language, listening flag, offline toggle.
pub struct VoiceInput {
    language: VoiceLanguage,
    listening: bool,
    offline: bool,
    transcriber: Option<Arc<dyn Transcriber>>,
    events: EventBus,
}

impl VoiceInput {
    pub fn new(
        language: VoiceLanguage,
        transcriber: Option<Arc<dyn Transcriber>>,
        events: EventBus,
    ) -> Self {
        Self {
            language,
            listening: false,
            offline: false,
            transcriber,
            events,
        }
    }

    pub fn language(&self) -> VoiceLanguage {
        self.language
    }

    pub fn set_language(&mut self, language: VoiceLanguage) {
        self.language = language;
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn toggle_offline(&mut self) -> bool {
        self.offline = !self.offline;
        let notification = if self.offline {
            Notification::info(
                "Offline Mode",
                "Using device-based recognition for offline use",
            )
        } else {
            Notification::info(
                "Online Mode",
                "Connected to cloud services for better recognition",
            )
        };
        self.events.notify(notification);
        self.offline
    }

    /// Begin a recording. Fails with `Unavailable` when no recognizer can
    /// serve the current mode.
    pub fn start_listening(&mut self) -> Result<(), AssistantError> {
        if self.offline || self.transcriber.is_none() {
            let reason = if self.offline {
                "no on-device recognizer in offline mode"
            } else {
                "no transcription service configured"
            };
            warn!(reason, "voice input unavailable");
            self.events.notify(Notification::error(
                "Recognition Error",
                "Failed to start speech recognition",
            ));
            return Err(AssistantError::Unavailable(reason.into()));
        }
        self.listening = true;
        self.events.notify(Notification::info(
            "Listening...",
            format!("Voice recognition active in {}", self.language.label()),
        ));
        Ok(())
    }

    /// Transcribe a finished recording. Listening stops either way.
    pub async fn finish(&mut self, audio: Vec<u8>, filename: &str) -> Result<String, AssistantError> {
        let was_listening = std::mem::replace(&mut self.listening, false);
        let transcriber = match (&self.transcriber, was_listening) {
            (Some(t), true) => t.clone(),
            _ => return Err(AssistantError::Unavailable("not listening".into())),
        };

        match transcriber
            .transcribe(audio, filename, primary_subtag(self.language.code()))
            .await
        {
            Ok(text) => {
                info!(len = text.len(), "transcription complete");
                Ok(text)
            }
            Err(e) => {
                warn!(error = %e, "transcription failed");
                self.events
                    .notify(Notification::error("Recognition Error", format!("Error: {e}")));
                Err(e)
            }
        }
    }

    /// Transcribe a recording and submit the transcript to `thread`.
    pub async fn submit_recording(
        &mut self,
        thread: &mut ChatThread,
        audio: Vec<u8>,
        filename: &str,
    ) -> Result<MessageId, AssistantError> {
        let transcript = self.finish(audio, filename).await?;
        thread.submit(&transcript).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Answer, ChatBackend, ChatReply};
    use carelink_common::Event;
    use std::sync::Mutex;

    struct FakeTranscriber {
        languages: Mutex<Vec<String>>,
        text: &'static str,
    }

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(
            &self,
            _audio: Vec<u8>,
            _filename: &str,
            language: &str,
        ) -> Result<String, AssistantError> {
            self.languages.lock().unwrap().push(language.to_string());
            Ok(self.text.to_string())
        }
    }

    struct EchoChat;

    #[async_trait]
    impl ChatBackend for EchoChat {
        async fn ask(&self, _user_id: &str, question: &str) -> Result<ChatReply, AssistantError> {
            Ok(ChatReply {
                answer: Answer::Text(format!("you said {question}")),
                attachments: vec![],
            })
        }
    }

    fn fake(text: &'static str) -> Arc<FakeTranscriber> {
        Arc::new(FakeTranscriber {
            languages: Mutex::new(Vec::new()),
            text,
        })
    }

    #[test]
    fn language_codes_round_trip() {
        for lang in VoiceLanguage::ALL {
            assert_eq!(VoiceLanguage::from_code(lang.code()), Some(lang));
        }
        assert_eq!(VoiceLanguage::from_code("pt-BR"), None);
        assert_eq!(
            VoiceLanguage::ALL.map(VoiceLanguage::code).as_slice(),
            carelink_config::SUPPORTED_LANGUAGES
        );
    }

    #[test]
    fn without_transcriber_voice_is_unavailable() {
        let mut voice = VoiceInput::new(VoiceLanguage::EnglishUs, None, EventBus::default());
        assert!(matches!(
            voice.start_listening(),
            Err(AssistantError::Unavailable(_))
        ));
        assert!(!voice.is_listening());
    }

    #[test]
    fn offline_toggle_notifies_and_blocks_listening() {
        let events = EventBus::default();
        let mut rx = events.subscribe();
        let mut voice = VoiceInput::new(VoiceLanguage::EnglishUs, Some(fake("hi")), events);

        assert!(voice.toggle_offline());
        match rx.try_recv() {
            Ok(Event::Notify { title, .. }) => assert_eq!(title, "Offline Mode"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(voice.start_listening().is_err());

        assert!(!voice.toggle_offline());
        assert!(voice.start_listening().is_ok());
        assert!(voice.is_listening());
    }

    #[tokio::test]
    async fn transcript_is_submitted_to_thread() {
        let events = EventBus::default();
        let transcriber = fake("how do I track milestones");
        let mut voice = VoiceInput::new(VoiceLanguage::Hindi, Some(transcriber.clone()), events.clone());
        let mut thread = ChatThread::new(Arc::new(EchoChat), "default_user", events);

        voice.start_listening().unwrap();
        let id = voice
            .submit_recording(&mut thread, vec![0; 16], "clip.wav")
            .await
            .unwrap();

        assert!(!voice.is_listening());
        assert_eq!(*transcriber.languages.lock().unwrap(), vec!["hi".to_string()]);
        let messages = thread.messages();
        assert_eq!(messages.last().unwrap().id, id);
        assert_eq!(messages[1].text, "how do I track milestones");
        assert_eq!(messages[2].text, "- you said how do I track milestones");
    }

    #[tokio::test]
    async fn finish_without_listening_is_rejected() {
        let mut voice = VoiceInput::new(VoiceLanguage::EnglishUs, Some(fake("x")), EventBus::default());
        assert!(voice.finish(vec![], "a.wav").await.is_err());
    }

    #[test]
    fn transcriber_debug_redacts_key() {
        let config = VoiceConfig {
            transcription_api_key: Some("sk-live".into()),
            ..Default::default()
        };
        let transcriber = HttpTranscriber::from_config(&config).unwrap();
        assert!(!format!("{transcriber:?}").contains("sk-live"));
    }

    #[test]
    fn audio_mime_from_extension() {
        assert_eq!(audio_mime("a.webm"), "audio/webm");
        assert_eq!(audio_mime("a.raw"), "audio/wav");
    }
}
