//! Non-interactive commands: `ask`, `scan`, `speak`.

use std::path::Path;

use carelink_assistant::{ChatThread, ImageSource, PrescriptionScanner, SpeechClient, VoiceLanguage};
use carelink_common::CareError;
use tracing::info;

use crate::render;

pub async fn ask(thread: &mut ChatThread, question: &str) -> carelink_common::Result<()> {
    thread.submit(question).await?;
    if let Some(reply) = thread.messages().last() {
        println!("{}", render::message(reply));
    }
    Ok(())
}

pub async fn scan(scanner: &PrescriptionScanner, image: &Path) -> carelink_common::Result<()> {
    let source = ImageSource::from_path(image)?;
    let report = scanner.scan(&source).await?;
    println!("{}", render::scan_report(&report));
    Ok(())
}

pub async fn speak(
    speech: &SpeechClient,
    text: &str,
    lang: &str,
    out: &Path,
) -> carelink_common::Result<()> {
    let language = VoiceLanguage::from_code(lang).ok_or_else(|| {
        CareError::Other(format!(
            "unsupported voice language {lang:?}; expected one of {}",
            supported_codes()
        ))
    })?;
    let clip = speech.speak(text, language.code()).await?;
    tokio::fs::write(out, &clip.bytes).await?;
    info!(path = %out.display(), bytes = clip.bytes.len(), mime = %clip.mime, "speech written");
    println!("Wrote {} ({} bytes)", out.display(), clip.bytes.len());
    Ok(())
}

pub fn supported_codes() -> String {
    VoiceLanguage::ALL
        .iter()
        .map(|l| l.code())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use carelink_assistant::backend::{Answer, ChatBackend, ChatReply, SpeechBackend, SpeechResponse};
    use carelink_assistant::AssistantError;
    use carelink_common::EventBus;

    use super::*;

    struct Echo;

    #[async_trait]
    impl ChatBackend for Echo {
        async fn ask(&self, _user: &str, question: &str) -> Result<ChatReply, AssistantError> {
            Ok(ChatReply {
                answer: Answer::Text(question.to_uppercase()),
                attachments: vec![],
            })
        }
    }

    struct Tts;

    #[async_trait]
    impl SpeechBackend for Tts {
        async fn synthesize(&self, _text: &str, lang: &str) -> Result<SpeechResponse, AssistantError> {
            assert_eq!(lang, "fr");
            Ok(SpeechResponse {
                success: true,
                // "ID3"
                audio_url: Some("data:audio/mp3;base64,SUQz".into()),
                error: None,
            })
        }
    }

    #[tokio::test]
    async fn ask_appends_reply() {
        let mut thread = ChatThread::new(Arc::new(Echo), "u1", EventBus::default());
        ask(&mut thread, "hello").await.unwrap();
        assert_eq!(thread.messages().last().unwrap().text, "- HELLO");
    }

    #[tokio::test]
    async fn ask_rejects_blank_question() {
        let mut thread = ChatThread::new(Arc::new(Echo), "u1", EventBus::default());
        assert!(ask(&mut thread, "   ").await.is_err());
        assert_eq!(thread.messages().len(), 1);
    }

    #[tokio::test]
    async fn speak_writes_decoded_audio() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("hello.mp3");
        let speech = SpeechClient::new(Arc::new(Tts), EventBus::default());

        speak(&speech, "bonjour", "fr-FR", &out).await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"ID3");
    }

    #[tokio::test]
    async fn speak_rejects_unknown_language() {
        let dir = tempfile::tempdir().unwrap();
        let speech = SpeechClient::new(Arc::new(Tts), EventBus::default());
        let err = speak(&speech, "hi", "xx-YY", &dir.path().join("x.mp3"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("en-US"));
    }
}
