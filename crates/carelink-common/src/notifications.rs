use serde::{Deserialize, Serialize};

/// Severity level for user notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// A one-shot user notification (toast). Delivered once over the
/// [`EventBus`](crate::EventBus), never queued or replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(level: NotificationLevel, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, title, body)
    }

    pub fn warning(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Warning, title, body)
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Error, title, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_level() {
        let n = Notification::info("Scan Complete", "Found 2 medications in your prescription.");
        assert_eq!(n.level, NotificationLevel::Info);
        assert_eq!(n.title, "Scan Complete");

        assert_eq!(Notification::warning("a", "b").level, NotificationLevel::Warning);
        assert_eq!(Notification::error("a", "b").level, NotificationLevel::Error);
    }

    #[test]
    fn level_serializes_lowercase() {
        let json = serde_json::to_string(&Notification::error("Error", "Try again later.")).unwrap();
        assert_eq!(
            json,
            r#"{"level":"error","title":"Error","body":"Try again later."}"#
        );
    }
}
