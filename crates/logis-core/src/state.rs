//! UI-agnostic conversation state types
//!
//! The controller is the only writer of [`ConversationState`]. Front ends get
//! clones of it (or a watch subscription) and render from those.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// The author of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Label shown next to the turn in the transcript
    pub fn display_name(&self) -> &'static str {
        match self {
            ChatRole::User => "Vos",
            ChatRole::Assistant => "Logis",
        }
    }
}

/// A single message in the conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    role: ChatRole,
    content: String,
    timestamp: DateTime<Local>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, content)
    }

    fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Local::now(),
        }
    }

    pub fn role(&self) -> ChatRole {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    /// `HH:MM`, the way the transcript shows it
    pub fn time_label(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}

/// Everything a front end needs to render one conversation.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub(crate) turns: Vec<ChatTurn>,
    pub(crate) session_id: Option<String>,
    pub(crate) pending: bool,
    pub(crate) connected: bool,
    pub(crate) product_count: Option<u64>,
    pub(crate) draft: String,
    pub(crate) epoch: u64,
}

impl ConversationState {
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// True exactly while a chat request is in flight
    pub fn pending(&self) -> bool {
        self.pending
    }

    /// Last known result of the startup health probe
    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn product_count(&self) -> Option<u64> {
        self.product_count
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Number of resets since the controller was created
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn assistant_turns(&self) -> usize {
        self.turns
            .iter()
            .filter(|turn| turn.role == ChatRole::Assistant)
            .count()
    }

    /// Short form of the session id for status bars: the first 12 characters
    /// followed by an ellipsis.
    pub fn session_label(&self) -> Option<String> {
        self.session_id.as_ref().map(|id| {
            let short: String = id.chars().take(12).collect();
            format!("{}...", short)
        })
    }

    /// Whether the send button should be enabled for the current draft
    pub fn can_send_draft(&self) -> bool {
        !self.pending && !self.draft.trim().is_empty()
    }
}
