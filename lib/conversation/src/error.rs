//! Error types for the conversation crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `ToolError`: registry-level failures while registering or invoking tools
//! - `ConversationError`: high-level wrapper naming the session involved

use parley_core::ConversationSessionId;
use std::fmt;

/// Errors from the tool registry.
///
/// Tool functions report their own domain failures as text. These variants
/// cover everything the registry itself can reject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolError {
    /// A tool with this name is already registered.
    DuplicateName { name: String },
    /// No tool with this name is registered.
    UnknownTool { name: String },
    /// Arguments were missing, malformed, or of the wrong shape.
    ArgumentValidation { name: String, reason: String },
    /// The tool's callable failed.
    Execution { name: String, reason: String },
}

impl ToolError {
    /// Returns the name of the tool involved.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        match self {
            Self::DuplicateName { name }
            | Self::UnknownTool { name }
            | Self::ArgumentValidation { name, .. }
            | Self::Execution { name, .. } => name,
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName { name } => write!(f, "tool already registered: {name}"),
            Self::UnknownTool { name } => write!(f, "unknown tool: {name}"),
            Self::ArgumentValidation { name, reason } => {
                write!(f, "invalid arguments for tool '{name}': {reason}")
            }
            Self::Execution { name, reason } => {
                write!(f, "tool '{name}' execution failed: {reason}")
            }
        }
    }
}

impl std::error::Error for ToolError {}

/// Session-level errors, attached as rootcause context above turn failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    /// No live session has this id.
    SessionNotFound { session_id: ConversationSessionId },
    /// A turn on this session failed. Wraps the underlying turn error.
    MessageProcessing { session_id: ConversationSessionId },
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound { session_id } => {
                write!(f, "session not found: {session_id}")
            }
            Self::MessageProcessing { session_id } => {
                write!(f, "message processing failed for session {session_id}")
            }
        }
    }
}

impl std::error::Error for ConversationError {}
