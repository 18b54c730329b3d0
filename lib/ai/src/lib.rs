//! Model-facing half of parley.
//!
//! - **Backend**: the [`ModelBackend`] contract and an OpenAI-compatible
//!   HTTP implementation
//! - **Orchestrator**: the per-turn loop that resolves tool calls before
//!   producing a final assistant message
//! - **Service**: the caller-facing session table and `send_message`

pub mod backend;
pub mod error;
pub mod openai;
pub mod orchestrator;
pub mod service;

pub use backend::{Completion, CompletionOptions, ModelBackend};
pub use error::{EndpointError, TurnError};
pub use openai::{ModelEndpointConfig, OpenAiCompatibleBackend};
pub use orchestrator::{ChatOrchestrator, OrchestratorConfig, ToolErrorPolicy};
pub use service::{ChatService, SessionDefaults};
