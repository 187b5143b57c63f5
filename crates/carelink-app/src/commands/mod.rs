//! Subcommand drivers.
//!
//! Each command builds the services it needs from config, shares one
//! [`EventBus`] with a printer task that renders notifications, and tears
//! the printer down when it finishes.

pub mod call;
pub mod chat;
pub mod oneshot;

use std::sync::Arc;

use carelink_assistant::{
    ChatThread, HttpBackend, HttpTranscriber, PrescriptionScanner, SpeechClient, Transcriber,
    VoiceInput, VoiceLanguage,
};
use carelink_common::{CareError, Event, EventBus};
use carelink_config::{CareConfig, VoiceConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cli::Command;
use crate::render;

/// Endpoint that cannot be used without an API key.
const HOSTED_TRANSCRIPTION: &str = "https://api.openai.com/";

pub async fn run(command: Command, config: CareConfig) -> carelink_common::Result<()> {
    let events = EventBus::default();
    let printer = spawn_printer(&events);

    let result = match command {
        Command::Chat => {
            let mut services = Services::from_config(&config, events.clone())?;
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            chat::run(&mut services, &config, &events, &mut lines).await
        }
        Command::Ask { question } => {
            let mut services = Services::from_config(&config, events.clone())?;
            oneshot::ask(&mut services.thread, &question.join(" ")).await
        }
        Command::Scan { image } => {
            let services = Services::from_config(&config, events.clone())?;
            oneshot::scan(&services.scanner, &image).await
        }
        Command::Speak { text, lang, out } => {
            let services = Services::from_config(&config, events.clone())?;
            let lang = lang.unwrap_or_else(|| config.voice.language.clone());
            let out = out.unwrap_or_else(|| "speech.mp3".into());
            oneshot::speak(&services.speech, &text.join(" "), &lang, &out).await
        }
        Command::Call => {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            call::run(&config, &events, &mut lines).await
        }
    };

    events.publish(Event::Shutdown);
    let _ = printer.await;
    result
}

/// The assistant-side services one command session works with.
pub struct Services {
    pub thread: ChatThread,
    pub scanner: PrescriptionScanner,
    pub speech: SpeechClient,
    pub voice: VoiceInput,
}

impl Services {
    pub fn from_config(config: &CareConfig, events: EventBus) -> Result<Self, CareError> {
        let backend = Arc::new(HttpBackend::new(config.backend.clone())?);
        let language = VoiceLanguage::from_code(&config.voice.language).unwrap_or_default();
        Ok(Self {
            thread: ChatThread::new(backend.clone(), config.backend.user_id.clone(), events.clone()),
            scanner: PrescriptionScanner::new(backend.clone(), events.clone()),
            speech: SpeechClient::new(backend, events.clone()),
            voice: VoiceInput::new(language, transcriber(&config.voice), events),
        })
    }
}

/// A transcriber when the voice section points somewhere usable.
///
/// The hosted endpoint needs a key; any other URL (a local Whisper server)
/// is tried without one.
pub fn transcriber(voice: &VoiceConfig) -> Option<Arc<dyn Transcriber>> {
    let url = voice.transcription_url.trim();
    let has_key = voice
        .transcription_api_key
        .as_deref()
        .is_some_and(|k| !k.trim().is_empty());
    if url.is_empty() || (url.starts_with(HOSTED_TRANSCRIPTION) && !has_key) {
        debug!("no transcription service configured");
        return None;
    }
    match HttpTranscriber::from_config(voice) {
        Ok(t) => Some(Arc::new(t)),
        Err(e) => {
            warn!(error = %e, "transcription client unavailable");
            None
        }
    }
}

/// Render notifications and the typing indicator until `Shutdown`.
fn spawn_printer(events: &EventBus) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(Event::Notify { level, title, body }) => {
                    eprintln!("{}", render::notification(level, &title, &body));
                }
                Ok(Event::Typing(true)) => eprintln!("assistant is typing..."),
                Ok(Event::Shutdown) | Err(RecvError::Closed) => break,
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => debug!(skipped = n, "notification printer lagged"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hosted_transcription_needs_a_key() {
        let mut voice = VoiceConfig::default();
        assert!(transcriber(&voice).is_none());

        voice.transcription_api_key = Some("  ".into());
        assert!(transcriber(&voice).is_none());

        voice.transcription_api_key = Some("sk-test".into());
        assert!(transcriber(&voice).is_some());
    }

    #[test]
    fn local_transcription_needs_no_key() {
        let voice = VoiceConfig {
            transcription_url: "http://localhost:9000/v1/audio/transcriptions".into(),
            ..Default::default()
        };
        assert!(transcriber(&voice).is_some());
    }
}
