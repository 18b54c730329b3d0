//! OpenAI-compatible chat-completions backend.
//!
//! Works with any endpoint speaking the `/chat/completions` dialect (Ollama,
//! llama.cpp server, vLLM, hosted OpenAI). Only non-streaming requests are
//! made.

use crate::backend::{Completion, CompletionOptions, ModelBackend};
use crate::error::EndpointError;
use async_trait::async_trait;
use parley_conversation::{Message, ToolCall};
use parley_core::ToolCallId;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Longest slice of an error body kept in `Unavailable` reasons.
const ERROR_BODY_LIMIT: usize = 512;

/// Where and how to reach the model endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelEndpointConfig {
    /// Base URL up to and including the API version segment.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Bearer token. Local servers ignore it but it is always sent.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Whole-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:11434/v1".to_string()
}

fn default_model() -> String {
    "llama3.2".to_string()
}

fn default_api_key() -> String {
    "not-needed".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for ModelEndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            api_key: default_api_key(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ModelEndpointConfig {
    /// Returns the full chat-completions URL.
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// A [`ModelBackend`] over HTTP.
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    config: ModelEndpointConfig,
    endpoint: String,
}

impl OpenAiCompatibleBackend {
    /// Builds the HTTP client for `config`.
    ///
    /// # Errors
    ///
    /// Returns `EndpointError::Unavailable` if the HTTP client cannot be
    /// constructed.
    pub fn new(config: ModelEndpointConfig) -> Result<Self, EndpointError> {
        let endpoint = config.completions_url();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EndpointError::Unavailable {
                endpoint: endpoint.clone(),
                reason: format!("HTTP client error: {e}"),
            })?;

        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    /// Returns the chat-completions URL requests go to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn unavailable(&self, reason: impl Into<String>) -> EndpointError {
        EndpointError::Unavailable {
            endpoint: self.endpoint.clone(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl ModelBackend for OpenAiCompatibleBackend {
    #[instrument(skip_all, fields(model = %self.config.model, messages = history.len()))]
    async fn complete(
        &self,
        history: &[Message],
        tools: &[JsonValue],
        options: &CompletionOptions,
    ) -> Result<Completion, EndpointError> {
        let tools = if options.auto_invoke_tools { tools } else { &[] };
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: to_wire_messages(history),
            tool_choice: (!tools.is_empty()).then_some("auto"),
            tools: (!tools.is_empty()).then_some(tools),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            stream: false,
        };

        let started = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.unavailable(format!("failed to read response body: {e}")))?;

        if !status.is_success() {
            warn!(%status, "model endpoint returned an error status");
            return Err(self.unavailable(format!(
                "HTTP {status}: {}",
                truncate(&body, ERROR_BODY_LIMIT)
            )));
        }

        debug!(
            %status,
            latency_ms = started.elapsed().as_millis() as u64,
            "received completion"
        );
        parse_completion(&body)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [JsonValue]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

/// A chat message as the endpoint sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    /// `system`, `user`, `assistant` or `tool`.
    pub role: String,
    /// Text content; `null` on assistant tool-call messages.
    #[serde(default)]
    pub content: Option<String>,
    /// Calls requested by the assistant. Some servers send `null` here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<WireToolCall>>,
    /// Call a tool message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// A tool call on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireToolCall {
    /// Call id; some local servers omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Always `function`.
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    /// The function being called.
    pub function: WireFunction,
}

fn function_kind() -> String {
    "function".to_string()
}

/// Function name and arguments of a wire tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFunction {
    /// Tool name.
    pub name: String,
    /// JSON-encoded arguments. Some servers send an object instead of a
    /// string; both are accepted.
    #[serde(default)]
    pub arguments: JsonValue,
}

/// Converts history into the endpoint's message shape.
#[must_use]
pub fn to_wire_messages(history: &[Message]) -> Vec<WireMessage> {
    history
        .iter()
        .map(|message| {
            let tool_calls = message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: Some(call.id.clone()),
                    kind: function_kind(),
                    function: WireFunction {
                        name: call.name.clone(),
                        arguments: JsonValue::String(call.arguments.clone()),
                    },
                })
                .collect::<Vec<_>>();

            WireMessage {
                role: message.role.as_str().to_string(),
                content: message.content.clone(),
                tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                tool_call_id: message.tool_call_id.clone(),
            }
        })
        .collect()
}

/// Interprets a chat-completions response body.
///
/// # Errors
///
/// Returns `EndpointError::MalformedResponse` if the body is not JSON, has no
/// choices, names a tool call without a function name, or carries neither
/// content nor tool calls.
pub fn parse_completion(body: &str) -> Result<Completion, EndpointError> {
    let response: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| EndpointError::MalformedResponse {
            reason: format!("invalid JSON: {e}"),
        })?;

    let message = response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| EndpointError::MalformedResponse {
            reason: "response contained no choices".to_string(),
        })?;

    let tool_calls = message.tool_calls.unwrap_or_default();
    if tool_calls.is_empty() {
        return message
            .content
            .map(Completion::Message)
            .ok_or_else(|| EndpointError::MalformedResponse {
                reason: "message has neither content nor tool calls".to_string(),
            });
    }

    let calls = tool_calls
        .into_iter()
        .map(into_tool_call)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Completion::ToolCalls {
        content: message.content.filter(|text| !text.trim().is_empty()),
        calls,
    })
}

fn into_tool_call(wire: WireToolCall) -> Result<ToolCall, EndpointError> {
    if wire.function.name.is_empty() {
        return Err(EndpointError::MalformedResponse {
            reason: "tool call is missing a function name".to_string(),
        });
    }

    let arguments = match wire.function.arguments {
        JsonValue::String(text) => text,
        JsonValue::Null => String::new(),
        other => other.to_string(),
    };
    let id = wire
        .id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| ToolCallId::new().to_string());

    Ok(ToolCall::new(id, wire.function.name, arguments))
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn completions_url_tolerates_trailing_slash() {
        let config = ModelEndpointConfig {
            base_url: "http://localhost:8080/v1/".to_string(),
            ..ModelEndpointConfig::default()
        };
        assert_eq!(
            config.completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn wire_messages_carry_tool_calls_and_results() {
        let history = vec![
            Message::user("what day is it?"),
            Message::assistant_tool_calls(
                None,
                vec![ToolCall::new("call_1", "current_day_of_week", "{}")],
            ),
            Message::tool("call_1", "Tuesday"),
        ];

        let wire = serde_json::to_value(to_wire_messages(&history)).unwrap();

        assert_eq!(wire[0], json!({"role": "user", "content": "what day is it?"}));
        assert_eq!(
            wire[1],
            json!({
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "current_day_of_week", "arguments": "{}"}
                }]
            })
        );
        assert_eq!(
            wire[2],
            json!({"role": "tool", "content": "Tuesday", "tool_call_id": "call_1"})
        );
    }

    #[test]
    fn parses_a_final_message() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hi there"}}]}"#;
        assert_eq!(
            parse_completion(body).unwrap(),
            Completion::Message("Hi there".to_string())
        );
    }

    #[test]
    fn null_tool_calls_is_a_final_message() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hi","tool_calls":null}}]}"#;
        assert_eq!(
            parse_completion(body).unwrap(),
            Completion::Message("Hi".to_string())
        );
    }

    #[test]
    fn parses_tool_calls() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [
                        {"id": "a", "type": "function",
                         "function": {"name": "calculate", "arguments": "{\"expression\":\"2+2\"}"}},
                        {"id": "b", "type": "function",
                         "function": {"name": "current_time", "arguments": "{}"}}
                    ]
                }
            }]
        })
        .to_string();

        let Completion::ToolCalls { content, calls } = parse_completion(&body).unwrap() else {
            panic!("expected tool calls");
        };
        assert_eq!(content, None);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], ToolCall::new("a", "calculate", r#"{"expression":"2+2"}"#));
        assert_eq!(calls[1].name, "current_time");
    }

    #[test]
    fn accepts_object_arguments_and_missing_ids() {
        let body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "tool_calls": [
                        {"function": {"name": "recall_preference", "arguments": {"key": "color"}}}
                    ]
                }
            }]
        })
        .to_string();

        let Completion::ToolCalls { calls, .. } = parse_completion(&body).unwrap() else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].arguments, r#"{"key":"color"}"#);
        assert!(calls[0].id.starts_with("call_"), "{}", calls[0].id);
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        for body in [
            "not json",
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"message":{"role":"assistant","tool_calls":[{"function":{"name":""}}]}}]}"#,
        ] {
            assert!(
                matches!(
                    parse_completion(body),
                    Err(EndpointError::MalformedResponse { .. })
                ),
                "{body}"
            );
        }
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("hi", 10), "hi");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let backend = OpenAiCompatibleBackend::new(ModelEndpointConfig {
            base_url: "http://127.0.0.1:1/v1".to_string(),
            timeout_secs: 5,
            ..ModelEndpointConfig::default()
        })
        .unwrap();

        let err = backend
            .complete(&[Message::user("hello")], &[], &CompletionOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, EndpointError::Unavailable { .. }), "{err}");
        assert_eq!(backend.model(), "llama3.2");
    }
}
