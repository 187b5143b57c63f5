//! Tools panel entries.

use carelink_common::MessageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    VideoCall,
    ScanPrescription,
    Growth,
    Articles,
}

/// What selecting a tool does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolAction {
    /// Submit a canned question to the chat.
    Prompt(&'static str),
    OpenVideoCall,
    OpenScanner,
}

/// Result of running a tool against the chat thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOutcome {
    /// The prompt was submitted; carries the assistant reply's id.
    Submitted(MessageId),
    /// The caller must open a flow the thread doesn't own.
    Open(ToolAction),
}

impl Tool {
    pub const ALL: [Tool; 4] = [
        Tool::VideoCall,
        Tool::ScanPrescription,
        Tool::Growth,
        Tool::Articles,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Tool::VideoCall => "Video Call",
            Tool::ScanPrescription => "Scan Rx",
            Tool::Growth => "Growth",
            Tool::Articles => "Articles",
        }
    }

    pub fn action(self) -> ToolAction {
        match self {
            Tool::VideoCall => ToolAction::OpenVideoCall,
            Tool::ScanPrescription => ToolAction::OpenScanner,
            Tool::Growth => ToolAction::Prompt("Show me my baby’s growth"),
            Tool::Articles => ToolAction::Prompt("Show me newborn care articles"),
        }
    }
}
