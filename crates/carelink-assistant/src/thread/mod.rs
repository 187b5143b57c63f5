//! The chat thread: ordered messages, typing indicator, and tools panel.
//!
//! A thread is driven from a single task. Each mutation publishes an
//! [`Event`] on the shared bus so a renderer can follow along.

mod hints;


use std::sync::Arc;

use carelink_common::{Event, EventBus, IdSequence, MessageId, Notification};
use tracing::{info, warn};

use crate::attachments::{parse_attachments, Attachment};
use crate::backend::ChatBackend;
use crate::prescription::ScanReport;
use crate::tools::{Tool, ToolAction, ToolOutcome};
use crate::AssistantError;

pub use hints::keyword_hints;

pub const GREETING: &str = "Hello! I'm your assistant. Ask me anything!";

pub const FALLBACK_ANSWER: &str = "- I’m sorry, I can’t answer that.\n- Try a different question.\n- I can help with health or cooking.";

pub const SCAN_INTRO: &str = "I've scanned your prescription. Here are the details:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Author {
    User,
    Assistant,
}

/// One message in the thread. Immutable once appended.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub text: String,
    pub author: Author,
    pub attachments: Vec<Attachment>,
}

impl ChatMessage {
    pub fn is_user(&self) -> bool {
        self.author == Author::User
    }
}

pub struct ChatThread {
    backend: Arc<dyn ChatBackend>,
    user_id: String,
    messages: Vec<ChatMessage>,
    ids: IdSequence,
    typing: bool,
    tools_visible: bool,
    events: EventBus,
}

impl ChatThread {
    /// Start a thread holding only the assistant greeting.
    pub fn new(backend: Arc<dyn ChatBackend>, user_id: impl Into<String>, events: EventBus) -> Self {
        let mut thread = Self {
            backend,
            user_id: user_id.into(),
            messages: Vec::new(),
            ids: IdSequence::new(),
            typing: false,
            tools_visible: false,
            events,
        };
        thread.append(Author::Assistant, GREETING.into(), Vec::new());
        thread
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn tools_visible(&self) -> bool {
        self.tools_visible
    }

    pub fn toggle_tools(&mut self) -> bool {
        self.tools_visible = !self.tools_visible;
        self.tools_visible
    }

    /// Submit a question and append the reply (or the fallback answer).
    ///
    /// Blank input returns `EmptyInput` without calling the backend or
    /// touching the thread. Backend failures are absorbed: the fallback
    /// answer is appended and an error notification raised.
    pub async fn submit(&mut self, input: &str) -> Result<MessageId, AssistantError> {
        if input.trim().is_empty() {
            return Err(AssistantError::EmptyInput);
        }

        self.append(Author::User, input.to_string(), Vec::new());
        self.tools_visible = false;
        self.set_typing(true);

        let result = self.backend.ask(&self.user_id, input).await;
        self.set_typing(false);

        let id = match result {
            Ok(reply) => {
                let attachments = parse_attachments(reply.attachments);
                let id = self.append(Author::Assistant, reply.answer.to_bullets(), attachments);
                for hint in keyword_hints(input) {
                    self.events.notify(hint);
                }
                id
            }
            Err(e) => {
                warn!(error = %e, "chat request failed, using fallback answer");
                let id = self.append(Author::Assistant, FALLBACK_ANSWER.into(), Vec::new());
                self.events
                    .notify(Notification::error("Error", "Try again later."));
                id
            }
        };
        Ok(id)
    }

    /// Run a tools-panel entry. Prompt tools submit to this thread; the
    /// rest are handed back for the caller to open.
    pub async fn select_tool(&mut self, tool: Tool) -> Result<ToolOutcome, AssistantError> {
        match tool.action() {
            ToolAction::Prompt(prompt) => self.submit(prompt).await.map(ToolOutcome::Submitted),
            action => Ok(ToolOutcome::Open(action)),
        }
    }

    /// Post a finished prescription scan into the thread.
    pub fn append_scan(&mut self, report: &ScanReport) -> MessageId {
        let id = self.append(
            Author::Assistant,
            SCAN_INTRO.into(),
            vec![report.to_attachment()],
        );
        self.events.notify(Notification::info(
            "Prescription Scanned",
            "Prescription details have been added to your chat.",
        ));
        id
    }

    fn append(&mut self, author: Author, text: String, attachments: Vec<Attachment>) -> MessageId {
        let id = self.ids.next_id();
        info!(id = id.0, ?author, attachments = attachments.len(), "message appended");
        self.messages.push(ChatMessage {
            id,
            text,
            author,
            attachments,
        });
        self.events.publish(Event::MessageAppended { id: id.0 });
        id
    }

    fn set_typing(&mut self, typing: bool) {
        self.typing = typing;
        self.events.publish(Event::Typing(typing));
    }
}
