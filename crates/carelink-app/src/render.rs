//! Plain-text rendering of chat messages, notifications and the call view.

use std::fmt::Write as _;

use carelink_assistant::attachments::PrescriptionDetails;
use carelink_assistant::{Attachment, Author, ChatMessage, ScanReport, Tool};
use carelink_call::{CallState, CallView};
use carelink_common::NotificationLevel;

pub fn message(msg: &ChatMessage) -> String {
    let who = match msg.author {
        Author::User => "you",
        Author::Assistant => "assistant",
    };
    let mut out = format!("[{who}] {}", msg.text);
    for attachment in &msg.attachments {
        out.push('\n');
        out.push_str(&self::attachment(attachment));
    }
    out
}

pub fn attachment(attachment: &Attachment) -> String {
    match attachment {
        Attachment::VideoSuggestions(videos) => {
            let mut out = String::from("  Suggested videos:");
            for v in videos {
                let _ = write!(out, "\n    * {}", v.title);
                if let Some(url) = &v.url {
                    let _ = write!(out, " <{url}>");
                }
            }
            out
        }
        Attachment::GrowthChart(_) => "  [growth chart]".to_string(),
        Attachment::ArticleSuggestions(articles) => {
            let mut out = String::from("  Suggested articles:");
            for a in articles {
                let _ = write!(out, "\n    * {}", a.title);
                if !a.description.is_empty() {
                    let _ = write!(out, ": {}", a.description);
                }
            }
            out
        }
        Attachment::Prescription(details) => prescription(details),
        Attachment::InteractiveAssistant => "  [interactive assistant]".to_string(),
        Attachment::QrCode { description } => format!("  [QR code] {description}"),
    }
}

fn prescription(details: &PrescriptionDetails) -> String {
    let mut out = String::from("  Prescription:");
    if let Some(doctor) = &details.doctor {
        let _ = write!(out, "\n    Doctor: {doctor}");
    }
    if let Some(date) = &details.issue_date {
        let _ = write!(out, "\n    Issued: {date}");
    }
    for m in &details.medications {
        let _ = write!(out, "\n    * {} {} {}", m.name, m.dosage, m.frequency);
    }
    if let Some(notes) = &details.notes {
        let _ = write!(out, "\n    Notes: {notes}");
    }
    out
}

pub fn scan_report(report: &ScanReport) -> String {
    let mut out = format!("Found {} medication(s).", report.medications.len());
    for m in &report.medications {
        let _ = write!(out, "\n  * {} {} {}", m.name, m.dosage, m.frequency);
    }
    if !report.text.is_empty() {
        let _ = write!(out, "\n\n{}", report.text);
    }
    out
}

pub fn notification(level: NotificationLevel, title: &str, body: &str) -> String {
    let tag = match level {
        NotificationLevel::Info => "info",
        NotificationLevel::Warning => "warn",
        NotificationLevel::Error => "error",
    };
    format!("({tag}) {title}: {body}")
}

pub fn tools() -> String {
    let names: Vec<String> = Tool::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| format!("{}. {}", i + 1, t.label()))
        .collect();
    format!("Tools: {}", names.join("  "))
}

pub fn call_view(view: &CallView) -> String {
    let relay = if view.connected { "connected" } else { "offline" };
    let mut out = format!("relay: {relay} | call: {}", view.state);
    if let Some(peer) = &view.remote_peer {
        let _ = write!(out, " with {peer}");
    }
    if view.muted {
        out.push_str(" | muted");
    }
    let _ = write!(
        out,
        " | camera: {} | remote video: {}",
        on_off(view.local_preview),
        on_off(view.remote_preview)
    );

    if view.state == CallState::Idle {
        if view.peers.is_empty() {
            out.push_str("\n  no one else is online");
        }
        for (i, peer) in view.peers.iter().enumerate() {
            let marker = if view.selected.as_deref() == Some(peer.id.as_str()) {
                '>'
            } else {
                ' '
            };
            let _ = write!(out, "\n {marker}{}. {}", i + 1, peer.display_name);
        }
    }
    out
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
