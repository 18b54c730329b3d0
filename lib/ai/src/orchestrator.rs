//! Tool-calling turn loop.
//!
//! One turn:
//!
//! ```text
//! AwaitingUser -> Completing -> (DispatchingTools -> Completing)* -> Finalizing
//! ```
//!
//! Each dispatch cycle runs all requested calls concurrently and then commits
//! the assistant's tool-call message and every result to history in one step,
//! ordered as the model requested them. A turn that is dropped or fails
//! therefore never leaves a tool call without its result.

use crate::backend::{Completion, CompletionOptions, ModelBackend};
use crate::error::TurnError;
use futures::future::join_all;
use futures::stream::{self, Stream};
use parley_conversation::{Message, Session, ToolCall, ToolContext, ToolRegistry};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What to do when a tool call fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorPolicy {
    /// Fail the turn with the tool error.
    #[default]
    Abort,
    /// Hand the error text to the model as the tool's result.
    ReportToModel,
}

/// Turn-loop settings.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens per completion.
    pub max_tokens: Option<u32>,
    /// Dispatch cycles allowed per turn before giving up.
    pub max_tool_cycles: u32,
    /// How failed tool calls are handled.
    pub tool_error_policy: ToolErrorPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: None,
            max_tool_cycles: 8,
            tool_error_policy: ToolErrorPolicy::Abort,
        }
    }
}

impl OrchestratorConfig {
    /// Sets the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the cycle limit.
    #[must_use]
    pub fn with_max_tool_cycles(mut self, max_tool_cycles: u32) -> Self {
        self.max_tool_cycles = max_tool_cycles;
        self
    }

    /// Sets the tool error policy.
    #[must_use]
    pub fn with_tool_error_policy(mut self, policy: ToolErrorPolicy) -> Self {
        self.tool_error_policy = policy;
        self
    }
}

/// Drives turns against a backend with a fixed tool registry.
pub struct ChatOrchestrator<B> {
    backend: B,
    registry: Arc<ToolRegistry>,
    config: OrchestratorConfig,
    tools: Vec<JsonValue>,
}

impl<B: ModelBackend> ChatOrchestrator<B> {
    /// Creates an orchestrator. The registry's schema is rendered once here.
    #[must_use]
    pub fn new(backend: B, registry: Arc<ToolRegistry>, config: OrchestratorConfig) -> Self {
        let tools = registry.to_llm_format();
        Self {
            backend,
            registry,
            config,
            tools,
        }
    }

    /// Returns the tool registry.
    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Returns the backend.
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.config.temperature),
            max_tokens: self.config.max_tokens,
            auto_invoke_tools: true,
        }
    }

    /// Runs one turn and returns the assistant's final text.
    ///
    /// The user message is appended first and stays in history even if the
    /// turn fails.
    ///
    /// # Errors
    ///
    /// - `TurnError::Endpoint` if a completion request fails
    /// - `TurnError::Tool` if a tool call fails under [`ToolErrorPolicy::Abort`]
    /// - `TurnError::ToolLoopExceeded` past `max_tool_cycles` dispatch cycles
    #[instrument(skip_all, fields(session = %session.id, model = %self.backend.model()))]
    pub async fn send(
        &self,
        session: &mut Session,
        user_text: impl Into<String>,
    ) -> Result<String, TurnError> {
        session.add_message(Message::user(user_text));
        let options = self.options();
        let mut cycles = 0u32;

        loop {
            let completion = self
                .backend
                .complete(session.history.messages(), &self.tools, &options)
                .await?;

            match completion {
                Completion::Message(text) => {
                    session.add_message(Message::assistant(text.clone()));
                    info!(cycles, "turn complete");
                    return Ok(text);
                }
                Completion::ToolCalls { content, calls } => {
                    cycles += 1;
                    if cycles > self.config.max_tool_cycles {
                        warn!(
                            max_cycles = self.config.max_tool_cycles,
                            "model kept requesting tools"
                        );
                        return Err(TurnError::ToolLoopExceeded {
                            max_cycles: self.config.max_tool_cycles,
                        });
                    }

                    let results = self.dispatch(&calls, &session.context).await?;
                    let mut committed = Vec::with_capacity(results.len() + 1);
                    committed.push(Message::assistant_tool_calls(content, calls));
                    committed.extend(results);
                    session.add_messages(committed);
                }
            }
        }
    }

    /// Runs one turn, yielding the final text as a stream.
    ///
    /// Responses are not streamed token by token; the stream yields exactly
    /// one item once the turn finishes.
    pub fn send_stream<'a>(
        &'a self,
        session: &'a mut Session,
        user_text: impl Into<String>,
    ) -> impl Stream<Item = Result<String, TurnError>> + 'a {
        let user_text = user_text.into();
        stream::once(async move { self.send(session, user_text).await })
    }

    async fn dispatch(
        &self,
        calls: &[ToolCall],
        ctx: &ToolContext,
    ) -> Result<Vec<Message>, TurnError> {
        debug!(count = calls.len(), "dispatching tool calls");
        let outcomes = join_all(
            calls
                .iter()
                .map(|call| self.registry.invoke(&call.name, &call.arguments, ctx)),
        )
        .await;

        calls
            .iter()
            .zip(outcomes)
            .map(|(call, outcome)| match outcome {
                Ok(result) => Ok(Message::tool(&call.id, result)),
                Err(e) => match self.config.tool_error_policy {
                    ToolErrorPolicy::Abort => Err(e.into()),
                    ToolErrorPolicy::ReportToModel => {
                        Ok(Message::tool(&call.id, format!("Error: {e}")))
                    }
                },
            })
            .collect()
    }
}
