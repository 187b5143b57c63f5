//! Health backend seams and the reqwest implementation.

mod client;
mod types;

pub use client::HttpBackend;
pub use types::{Answer, ChatReply, ChatRequest, ScanResponse, SpeechRequest, SpeechResponse};

use async_trait::async_trait;

use crate::prescription::ImageSource;
use crate::AssistantError;

/// `POST /api/chat`.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn ask(&self, user_id: &str, question: &str) -> Result<ChatReply, AssistantError>;
}

/// `POST /api/scan-prescription`.
#[async_trait]
pub trait ScanBackend: Send + Sync {
    async fn scan(&self, image: &ImageSource) -> Result<ScanResponse, AssistantError>;
}

/// `POST /api/text-to-speech`.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn synthesize(&self, text: &str, lang: &str) -> Result<SpeechResponse, AssistantError>;
}
