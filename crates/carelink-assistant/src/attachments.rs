//! Typed message attachments.
//!
//! The backend sends attachments as `{"type": ..., "data": ...}` objects.
//! Each one is decoded on its own; an unknown type or malformed payload is
//! logged and dropped without affecting its siblings.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSuggestion {
    #[serde(default)]
    pub id: Option<Value>,
    pub title: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSuggestion {
    #[serde(default)]
    pub id: Option<Value>,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionDetails {
    #[serde(default)]
    pub doctor: Option<String>,
    #[serde(default)]
    pub issue_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub medications: Vec<Medication>,
}

/// Rich content attached to an assistant message.
#[derive(Debug, Clone, PartialEq)]
pub enum Attachment {
    VideoSuggestions(Vec<VideoSuggestion>),
    /// Chart data, passed through untouched to whatever draws it.
    GrowthChart(Value),
    ArticleSuggestions(Vec<ArticleSuggestion>),
    Prescription(PrescriptionDetails),
    InteractiveAssistant,
    QrCode { description: String },
}

#[derive(Deserialize)]
struct RawAttachment {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct Suggestions<T> {
    suggestions: Vec<T>,
}

#[derive(Deserialize)]
struct QrCodeData {
    description: String,
}

impl Attachment {
    /// Wire name of this attachment's `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            Attachment::VideoSuggestions(_) => "video",
            Attachment::GrowthChart(_) => "growth",
            Attachment::ArticleSuggestions(_) => "article",
            Attachment::Prescription(_) => "prescription",
            Attachment::InteractiveAssistant => "ai",
            Attachment::QrCode { .. } => "qr-code",
        }
    }

    /// Decode a single wire attachment.
    pub fn from_wire(value: Value) -> Result<Self, String> {
        let raw: RawAttachment =
            serde_json::from_value(value).map_err(|e| format!("bad envelope: {e}"))?;
        let data = raw.data;
        let parsed = match raw.kind.as_str() {
            "video" => serde_json::from_value::<Suggestions<VideoSuggestion>>(data)
                .map(|s| Attachment::VideoSuggestions(s.suggestions)),
            "growth" => Ok(Attachment::GrowthChart(data)),
            "article" => serde_json::from_value::<Suggestions<ArticleSuggestion>>(data)
                .map(|s| Attachment::ArticleSuggestions(s.suggestions)),
            "prescription" => serde_json::from_value(data).map(Attachment::Prescription),
            "ai" => Ok(Attachment::InteractiveAssistant),
            "qr-code" => serde_json::from_value::<QrCodeData>(data).map(|q| Attachment::QrCode {
                description: q.description,
            }),
            other => return Err(format!("unknown attachment type {other:?}")),
        };
        parsed.map_err(|e| format!("bad {} payload: {e}", raw.kind))
    }

    /// Encode back into the `{"type", "data"}` wire shape.
    pub fn to_wire(&self) -> Value {
        let data = match self {
            Attachment::VideoSuggestions(s) => serde_json::json!({ "suggestions": s }),
            Attachment::GrowthChart(v) => v.clone(),
            Attachment::ArticleSuggestions(s) => serde_json::json!({ "suggestions": s }),
            Attachment::Prescription(p) => serde_json::to_value(p).unwrap_or(Value::Null),
            Attachment::InteractiveAssistant => Value::Null,
            Attachment::QrCode { description } => {
                serde_json::json!({ "description": description })
            }
        };
        serde_json::json!({ "type": self.kind(), "data": data })
    }
}

/// Decode a list of wire attachments, dropping the ones that don't parse.
pub fn parse_attachments(values: Vec<Value>) -> Vec<Attachment> {
    values
        .into_iter()
        .filter_map(|value| match Attachment::from_wire(value) {
            Ok(attachment) => Some(attachment),
            Err(e) => {
                warn!(error = %e, "dropping malformed attachment");
                None
            }
        })
        .collect()
}
