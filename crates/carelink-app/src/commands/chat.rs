//! Interactive chat: one line per message, `/`-prefixed lines are commands.

use std::path::PathBuf;

use carelink_assistant::{
    AssistantError, ImageSource, ScanReport, Tool, ToolAction, ToolOutcome, VoiceLanguage,
};
use carelink_common::EventBus;
use carelink_config::CareConfig;
use tokio::io::{AsyncBufRead, Lines};
use tracing::{debug, warn};

use super::{call, oneshot, Services};
use crate::render;

const HELP: &str = "\
Type a message to ask the assistant. Commands:
  /tools            show or hide the tools panel
  /tool <n|name>    run a tool (growth, articles, scan, video)
  /scan <image>     scan a prescription image into the chat
  /add              add the last scan's medications to your tracker
  /speak            read the last answer aloud (writes an mp3)
  /lang [code]      show or set the voice language
  /offline          toggle offline voice recognition
  /voice <audio>    transcribe a recording and send it
  /quit             leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Message(String),
    ToggleTools,
    Tool(Tool),
    Scan(PathBuf),
    AddToTracker,
    Speak,
    Language(Option<String>),
    ToggleOffline,
    Voice(PathBuf),
    Help,
    Quit,
    Invalid(String),
}

pub fn parse_input(line: &str) -> ChatInput {
    let line = line.trim();
    let Some(command) = line.strip_prefix('/') else {
        return ChatInput::Message(line.to_string());
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };
    match name {
        "tools" => ChatInput::ToggleTools,
        "tool" => match parse_tool(arg) {
            Some(tool) => ChatInput::Tool(tool),
            None => ChatInput::Invalid(format!("unknown tool {arg:?}")),
        },
        "scan" if !arg.is_empty() => ChatInput::Scan(PathBuf::from(arg)),
        "scan" => ChatInput::Invalid("usage: /scan <image>".into()),
        "add" => ChatInput::AddToTracker,
        "speak" => ChatInput::Speak,
        "lang" => ChatInput::Language((!arg.is_empty()).then(|| arg.to_string())),
        "offline" => ChatInput::ToggleOffline,
        "voice" if !arg.is_empty() => ChatInput::Voice(PathBuf::from(arg)),
        "voice" => ChatInput::Invalid("usage: /voice <audio file>".into()),
        "help" | "?" => ChatInput::Help,
        "quit" | "exit" | "q" => ChatInput::Quit,
        other => ChatInput::Invalid(format!("unknown command /{other}")),
    }
}

fn parse_tool(arg: &str) -> Option<Tool> {
    if let Ok(n) = arg.parse::<usize>() {
        return Tool::ALL.get(n.checked_sub(1)?).copied();
    }
    match arg.to_ascii_lowercase().as_str() {
        "growth" => Some(Tool::Growth),
        "articles" | "article" => Some(Tool::Articles),
        "scan" | "rx" | "scan-rx" => Some(Tool::ScanPrescription),
        "video" | "call" | "video-call" => Some(Tool::VideoCall),
        _ => None,
    }
}

/// Chat state the loop keeps between lines.
#[derive(Default)]
struct ChatState {
    last_scan: Option<ScanReport>,
}

pub async fn run<R>(
    services: &mut Services,
    config: &CareConfig,
    events: &EventBus,
    lines: &mut Lines<R>,
) -> carelink_common::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut state = ChatState::default();
    if let Some(greeting) = services.thread.messages().first() {
        println!("{}", render::message(greeting));
    }
    println!("(type /help for commands)");

    while let Some(line) = lines.next_line().await? {
        let input = parse_input(&line);
        debug!(?input, "chat input");
        if input == ChatInput::Quit {
            break;
        }
        if let Some(action) = handle(services, &mut state, input).await {
            match action {
                ToolAction::OpenVideoCall => call::run(config, events, lines).await?,
                ToolAction::OpenScanner => println!("Use /scan <image> to scan a prescription."),
                ToolAction::Prompt(_) => {}
            }
        }
    }
    Ok(())
}

/// Apply one input. Returns a flow the caller must open, if any.
async fn handle(
    services: &mut Services,
    state: &mut ChatState,
    input: ChatInput,
) -> Option<ToolAction> {
    match input {
        ChatInput::Message(text) => {
            match services.thread.submit(&text).await {
                Ok(_) => print_last(services),
                Err(AssistantError::EmptyInput) => {}
                Err(e) => warn!(error = %e, "message not sent"),
            }
        }
        ChatInput::ToggleTools => {
            if services.thread.toggle_tools() {
                println!("{}", render::tools());
            } else {
                println!("(tools hidden)");
            }
        }
        ChatInput::Tool(tool) => match services.thread.select_tool(tool).await {
            Ok(ToolOutcome::Submitted(_)) => print_last(services),
            Ok(ToolOutcome::Open(action)) => return Some(action),
            Err(e) => warn!(error = %e, tool = tool.label(), "tool failed"),
        },
        ChatInput::Scan(path) => scan_into_chat(services, state, path).await,
        ChatInput::AddToTracker => match &state.last_scan {
            Some(report) => {
                if services.scanner.add_to_tracker(report).is_none() {
                    println!("The last scan found no medications to add.");
                }
            }
            None => println!("Scan a prescription first with /scan <image>."),
        },
        ChatInput::Speak => speak_last(services).await,
        ChatInput::Language(None) => {
            let mode = if services.voice.is_offline() { "offline" } else { "online" };
            println!(
                "Voice language: {} ({}), {mode} recognition. Supported: {}",
                services.voice.language().label(),
                services.voice.language().code(),
                oneshot::supported_codes()
            );
        }
        ChatInput::Language(Some(code)) => match VoiceLanguage::from_code(&code) {
            Some(lang) => {
                services.voice.set_language(lang);
                println!("Voice language set to {}.", lang.label());
            }
            None => println!("Unsupported language {code:?}. Supported: {}", oneshot::supported_codes()),
        },
        ChatInput::ToggleOffline => {
            services.voice.toggle_offline();
        }
        ChatInput::Voice(path) => voice_into_chat(services, path).await,
        ChatInput::Help => println!("{HELP}"),
        ChatInput::Invalid(message) => println!("{message}"),
        ChatInput::Quit => {}
    }
    None
}

fn print_last(services: &Services) {
    if let Some(msg) = services.thread.messages().last() {
        println!("{}", render::message(msg));
    }
}

async fn scan_into_chat(services: &mut Services, state: &mut ChatState, path: PathBuf) {
    let image = match ImageSource::from_path(&path) {
        Ok(image) => image,
        Err(e) => {
            println!("Could not read {}: {e}", path.display());
            return;
        }
    };
    // Failures are notified by the scanner.
    if let Ok(report) = services.scanner.scan(&image).await {
        services.thread.append_scan(&report);
        print_last(services);
        if report.offers_tracker_action() {
            println!("Type /add to add these medications to your tracker.");
        }
        state.last_scan = Some(report);
    }
}

async fn speak_last(services: &mut Services) {
    let Some(reply) = services.thread.messages().iter().rev().find(|m| !m.is_user()) else {
        return;
    };
    let (id, text) = (reply.id, reply.text.clone());
    let language = services.voice.language();
    if let Ok(clip) = services.speech.speak(&text, language.code()).await {
        let path = PathBuf::from(format!("reply-{id}.mp3"));
        match tokio::fs::write(&path, &clip.bytes).await {
            Ok(()) => println!("Saved speech to {}", path.display()),
            Err(e) => println!("Could not write {}: {e}", path.display()),
        }
    }
}

async fn voice_into_chat(services: &mut Services, path: PathBuf) {
    let audio = match tokio::fs::read(&path).await {
        Ok(audio) => audio,
        Err(e) => {
            println!("Could not read {}: {e}", path.display());
            return;
        }
    };
    if services.voice.start_listening().is_err() {
        return;
    }
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("recording.wav")
        .to_string();
    match services
        .voice
        .submit_recording(&mut services.thread, audio, &filename)
        .await
    {
        Ok(_) => {
            let user = services.thread.messages().iter().rev().find(|m| m.is_user());
            if let Some(user) = user {
                println!("{}", render::message(user));
            }
            print_last(services);
        }
        Err(e) => debug!(error = %e, "voice message not sent"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use carelink_assistant::backend::{Answer, ChatBackend, ChatReply};
    use carelink_assistant::{
        ChatThread, HttpBackend, PrescriptionScanner, SpeechClient, Transcriber, VoiceInput,
    };
    use tokio::io::AsyncBufReadExt;

    use super::*;

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(parse_input("  hi there "), ChatInput::Message("hi there".into()));
        assert_eq!(parse_input(""), ChatInput::Message(String::new()));
    }

    #[test]
    fn commands_parse() {
        assert_eq!(parse_input("/tools"), ChatInput::ToggleTools);
        assert_eq!(parse_input("/tool 3"), ChatInput::Tool(Tool::Growth));
        assert_eq!(parse_input("/tool Articles"), ChatInput::Tool(Tool::Articles));
        assert_eq!(parse_input("/scan rx.png"), ChatInput::Scan("rx.png".into()));
        assert_eq!(parse_input("/lang fr-FR"), ChatInput::Language(Some("fr-FR".into())));
        assert_eq!(parse_input("/lang"), ChatInput::Language(None));
        assert_eq!(parse_input("/voice a.wav"), ChatInput::Voice("a.wav".into()));
        assert_eq!(parse_input("/q"), ChatInput::Quit);
    }

    #[test]
    fn bad_commands_are_invalid() {
        assert!(matches!(parse_input("/tool 9"), ChatInput::Invalid(_)));
        assert!(matches!(parse_input("/tool 0"), ChatInput::Invalid(_)));
        assert!(matches!(parse_input("/scan"), ChatInput::Invalid(m) if m.starts_with("usage")));
        assert!(matches!(parse_input("/dance"), ChatInput::Invalid(_)));
    }

    /// Records every question it is asked.
    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    #[async_trait]
    impl ChatBackend for Recorder {
        async fn ask(&self, _user: &str, question: &str) -> Result<ChatReply, AssistantError> {
            self.0.lock().unwrap().push(question.to_string());
            Ok(ChatReply {
                answer: Answer::Points(vec!["ok".into()]),
                attachments: vec![],
            })
        }
    }

    struct Fixed(&'static str);

    #[async_trait]
    impl Transcriber for Fixed {
        async fn transcribe(
            &self,
            _audio: Vec<u8>,
            _filename: &str,
            _language: &str,
        ) -> Result<String, AssistantError> {
            Ok(self.0.to_string())
        }
    }

    fn services(chat: Arc<Recorder>, transcriber: Option<Arc<dyn Transcriber>>) -> Services {
        let events = EventBus::default();
        // Scan and speech are never reached in these tests.
        let unused = Arc::new(HttpBackend::new(Default::default()).unwrap());
        Services {
            thread: ChatThread::new(chat, "u1", events.clone()),
            scanner: PrescriptionScanner::new(unused.clone(), events.clone()),
            speech: SpeechClient::new(unused, events.clone()),
            voice: VoiceInput::new(VoiceLanguage::default(), transcriber, events),
        }
    }

    #[tokio::test]
    async fn loop_submits_messages_and_prompts_until_quit() {
        let chat = Arc::new(Recorder::default());
        let mut services = services(chat.clone(), None);
        let input: &[u8] = b"hello\n\n   \n/tool growth\n/quit\nnever sent\n";
        let mut lines = input.lines();

        run(&mut services, &CareConfig::default(), &EventBus::default(), &mut lines)
            .await
            .unwrap();

        assert_eq!(
            *chat.0.lock().unwrap(),
            ["hello", "Show me my baby’s growth"]
        );
        // greeting + 2 questions + 2 answers
        assert_eq!(services.thread.messages().len(), 5);
    }

    #[tokio::test]
    async fn voice_recording_is_submitted_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("note.wav");
        std::fs::write(&audio, b"RIFF").unwrap();

        let chat = Arc::new(Recorder::default());
        let mut services = services(chat.clone(), Some(Arc::new(Fixed("is this rash normal"))));
        let mut state = ChatState::default();
        handle(&mut services, &mut state, ChatInput::Voice(audio)).await;

        assert_eq!(*chat.0.lock().unwrap(), ["is this rash normal"]);
        assert!(!services.voice.is_listening());
    }

    #[tokio::test]
    async fn voice_without_transcriber_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("note.wav");
        std::fs::write(&audio, b"RIFF").unwrap();

        let chat = Arc::new(Recorder::default());
        let mut services = services(chat.clone(), None);
        handle(&mut services, &mut ChatState::default(), ChatInput::Voice(audio)).await;
        assert!(chat.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_without_scan_is_harmless() {
        let chat = Arc::new(Recorder::default());
        let mut services = services(chat, None);
        let mut state = ChatState::default();
        assert_eq!(handle(&mut services, &mut state, ChatInput::AddToTracker).await, None);
    }

    #[tokio::test]
    async fn video_tool_asks_caller_to_open_call() {
        let chat = Arc::new(Recorder::default());
        let mut services = services(chat.clone(), None);
        let action = handle(&mut services, &mut ChatState::default(), ChatInput::Tool(Tool::VideoCall)).await;
        assert_eq!(action, Some(ToolAction::OpenVideoCall));
        assert!(chat.0.lock().unwrap().is_empty());
    }
}
