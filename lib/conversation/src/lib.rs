//! Conversation model for parley.
//!
//! This crate provides:
//!
//! - **Messages and history**: the ordered, append-only log sent to the model
//! - **Session state**: remembered preferences and tracked topics, scoped to
//!   one conversation and handed to tools through a [`ToolContext`]
//! - **Tool registry**: statically declared tool descriptors, schema
//!   derivation, and validated dispatch by name

pub mod error;
pub mod history;
pub mod message;
pub mod session;
pub mod state;
pub mod tool;

pub use error::{ConversationError, ToolError};
pub use history::ConversationHistory;
pub use message::{Message, MessageRole, ToolCall};
pub use session::Session;
pub use state::{SessionState, ToolContext};
pub use tool::{
    ErasedTool, NoArgs, ParameterKind, ParameterSpec, Tool, ToolDescriptor, ToolFailure,
    ToolRegistry,
};
