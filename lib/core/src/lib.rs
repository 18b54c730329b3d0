//! Core types shared by every parley crate.
//!
//! Holds the strongly-typed identifiers used across conversations and the
//! rootcause-based `Result` alias.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{ConversationSessionId, MessageId, ParseIdError, ToolCallId};
