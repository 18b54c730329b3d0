//! Conversation sessions.
//!
//! A session pairs one conversation history with the tool context (session
//! state plus working directory) its tool calls run against.

use crate::history::ConversationHistory;
use crate::message::Message;
use crate::state::{SessionState, ToolContext};
use chrono::{DateTime, Utc};
use parley_core::ConversationSessionId;
use std::path::PathBuf;

/// One isolated conversation.
#[derive(Debug)]
pub struct Session {
    /// Session id.
    pub id: ConversationSessionId,
    /// Messages exchanged so far.
    pub history: ConversationHistory,
    /// State and file root handed to tool calls.
    pub context: ToolContext,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Updated on every append.
    pub last_active_at: DateTime<Utc>,
}

impl Session {
    /// Creates a new session whose file tools work in `working_dir`.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            id: ConversationSessionId::new(),
            history: ConversationHistory::new(),
            context: ToolContext::new(working_dir),
            created_at: now,
            last_active_at: now,
        }
    }

    /// Starts the history with a system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.history = ConversationHistory::with_system_prompt(prompt);
        self
    }

    /// Appends one message.
    pub fn add_message(&mut self, message: Message) {
        self.history.push(message);
        self.touch();
    }

    /// Adds several messages at once.
    pub fn add_messages(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.history.extend(messages);
        self.touch();
    }

    /// Messages in the history, including any system prompt.
    #[must_use]
    pub fn message_count(&self) -> usize {
        self.history.len()
    }

    /// Most recent message.
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }

    /// Returns a copy of the remembered preferences and topics.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.context.snapshot()
    }

    fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }
}
