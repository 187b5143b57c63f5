//! Request and response bodies for the health backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attachments::Medication;

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub user_id: &'a str,
    pub question: &'a str,
}

/// The backend answers with either a list of points or a single string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Points(Vec<String>),
    Text(String),
}

impl Answer {
    /// Render as a bulleted list, one `- ` line per point.
    pub fn to_bullets(&self) -> String {
        match self {
            Answer::Points(points) => points
                .iter()
                .map(|p| format!("- {p}"))
                .collect::<Vec<_>>()
                .join("\n"),
            Answer::Text(text) => format!("- {text}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatReply {
    pub answer: Answer,
    /// Raw attachments; decoded (and filtered) by the thread.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub attachments: Vec<Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub medications: Vec<Medication>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeechRequest<'a> {
    pub text: &'a str,
    pub lang: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeechResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
