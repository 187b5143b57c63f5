//! reqwest client for the chat, OCR and text-to-speech endpoints.

use std::time::Duration;

use async_trait::async_trait;
use carelink_config::BackendConfig;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::types::{ChatReply, ChatRequest, ScanResponse, SpeechRequest, SpeechResponse};
use super::{ChatBackend, ScanBackend, SpeechBackend};
use crate::prescription::ImageSource;
use crate::AssistantError;

/// HTTP client for the health backend. No auth headers are sent.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    config: BackendConfig,
    http: reqwest::Client,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self, AssistantError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(u64::from(config.timeout_secs)))
            .build()
            .map_err(|e| AssistantError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }
}

/// Map a non-2xx response to `AssistantError::Api`, otherwise decode JSON.
async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AssistantError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = if status == StatusCode::TOO_MANY_REQUESTS {
            "rate limited".to_string()
        } else {
            body
        };
        return Err(AssistantError::Api {
            status: status.as_u16(),
            message,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| AssistantError::Parse(e.to_string()))
}

fn network(e: reqwest::Error) -> AssistantError {
    AssistantError::Network(e.to_string())
}

#[async_trait]
impl ChatBackend for HttpBackend {
    async fn ask(&self, user_id: &str, question: &str) -> Result<ChatReply, AssistantError> {
        debug!(len = question.len(), "chat request");
        let response = self
            .http
            .post(self.config.chat_url())
            .json(&ChatRequest { user_id, question })
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }
}

#[async_trait]
impl ScanBackend for HttpBackend {
    async fn scan(&self, image: &ImageSource) -> Result<ScanResponse, AssistantError> {
        let request = self.http.post(self.config.scan_url());
        let request = match image {
            ImageSource::DataUrl(url) => {
                debug!(len = url.len(), "OCR request (data URL)");
                request.json(&serde_json::json!({ "imageData": url }))
            }
            ImageSource::File {
                bytes,
                filename,
                mime,
            } => {
                debug!(size = bytes.len(), %filename, "OCR request (multipart)");
                let part = reqwest::multipart::Part::bytes(bytes.clone())
                    .file_name(filename.clone())
                    .mime_str(mime)
                    .map_err(|e| AssistantError::Parse(e.to_string()))?;
                request.multipart(reqwest::multipart::Form::new().part("image", part))
            }
        };
        let response = request.send().await.map_err(network)?;
        decode(response).await
    }
}

#[async_trait]
impl SpeechBackend for HttpBackend {
    async fn synthesize(&self, text: &str, lang: &str) -> Result<SpeechResponse, AssistantError> {
        debug!(len = text.len(), lang, "text-to-speech request");
        let response = self
            .http
            .post(self.config.speech_url())
            .json(&SpeechRequest { text, lang })
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }
}
