//! Model backend abstraction.
//!
//! A backend turns the conversation so far plus the advertised tool schema
//! into either a final message or a batch of tool-call requests.

use crate::error::EndpointError;
use async_trait::async_trait;
use parley_conversation::{Message, ToolCall};
use serde_json::Value as JsonValue;

/// Sampling and tool-handling settings for one completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate; endpoint default when unset.
    pub max_tokens: Option<u32>,
    /// Whether tool calls are resolved by the orchestrator. When false the
    /// tool schema is withheld from the request.
    pub auto_invoke_tools: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.7),
            max_tokens: None,
            auto_invoke_tools: true,
        }
    }
}

impl CompletionOptions {
    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the max tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// What the model answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// A final assistant message.
    Message(String),
    /// One or more tool calls to resolve before the model can answer.
    ToolCalls {
        /// Text the model sent alongside the calls, if any.
        content: Option<String>,
        /// The requested calls, in the model's order.
        calls: Vec<ToolCall>,
    },
}

/// Trait for chat-completion backends.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Requests a completion for `history` with `tools` advertised.
    ///
    /// # Errors
    ///
    /// Returns `EndpointError::Unavailable` if the endpoint cannot be
    /// reached, or `EndpointError::MalformedResponse` if its answer cannot be
    /// interpreted.
    async fn complete(
        &self,
        history: &[Message],
        tools: &[JsonValue],
        options: &CompletionOptions,
    ) -> Result<Completion, EndpointError>;

    /// Returns the model name.
    fn model(&self) -> &str;
}
