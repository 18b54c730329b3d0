//! Tool registry for conversation mode.
//!
//! Tools are host functions the model may call mid-conversation. Each tool
//! declares its name, description, and parameters up front; the registry
//! turns those declarations into the schema advertised to the model and
//! dispatches calls by name into the tool's typed argument struct.

use crate::error::ToolError;
use crate::state::ToolContext;
use async_trait::async_trait;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// Failure raised by a tool's callable.
pub type ToolFailure = Box<dyn std::error::Error + Send + Sync>;

/// Semantic type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Free text.
    String,
    /// Any JSON number.
    Number,
    /// A whole number.
    Integer,
    /// true or false.
    Boolean,
}

impl ParameterKind {
    /// Returns the JSON Schema type name.
    #[must_use]
    pub const fn json_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
        }
    }

    fn accepts(&self, value: &JsonValue) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
        }
    }
}

/// A named parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Parameter name, as it appears in the arguments object.
    pub name: String,
    /// Expected JSON type.
    pub kind: ParameterKind,
    /// Human-readable description shown to the model.
    pub description: String,
    /// Whether the model must supply it.
    pub required: bool,
}

impl ParameterSpec {
    /// Declares a required parameter.
    #[must_use]
    pub fn required(
        name: impl Into<String>,
        kind: ParameterKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
        }
    }

    /// Declares an optional parameter.
    #[must_use]
    pub fn optional(
        name: impl Into<String>,
        kind: ParameterKind,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Argument struct for tools that take no parameters.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct NoArgs {}

/// A host function the model can call.
///
/// `Args` is the typed argument struct; the registry validates the model's
/// JSON against [`Tool::parameters`] and then deserializes into it.
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    /// Typed arguments.
    type Args: DeserializeOwned + Send;

    /// Unique tool name.
    fn name(&self) -> &'static str;

    /// What the tool does, written for the model.
    fn description(&self) -> &'static str;

    /// Declared parameters, in documentation order.
    fn parameters(&self) -> Vec<ParameterSpec> {
        Vec::new()
    }

    /// Runs the tool.
    ///
    /// Domain failures (missing file, bad expression) belong in the returned
    /// text. An `Err` is reserved for failures the tool cannot describe.
    async fn call(&self, ctx: &ToolContext, args: Self::Args) -> Result<String, ToolFailure>;
}

/// Object-safe form of [`Tool`], taking raw JSON arguments.
#[async_trait]
pub trait ErasedTool: Send + Sync {
    /// Deserializes `args` and runs the tool.
    async fn call_json(&self, ctx: &ToolContext, args: JsonValue) -> Result<String, ToolError>;
}

#[async_trait]
impl<T: Tool> ErasedTool for T {
    async fn call_json(&self, ctx: &ToolContext, args: JsonValue) -> Result<String, ToolError> {
        let args: T::Args =
            serde_json::from_value(args).map_err(|e| ToolError::ArgumentValidation {
                name: self.name().to_string(),
                reason: e.to_string(),
            })?;

        Tool::call(self, ctx, args)
            .await
            .map_err(|e| ToolError::Execution {
                name: self.name().to_string(),
                reason: e.to_string(),
            })
    }
}

/// Statically declared description of a registered tool.
#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    parameters: Vec<ParameterSpec>,
    handler: Arc<dyn ErasedTool>,
}

impl ToolDescriptor {
    /// Builds a descriptor from a tool's own declarations.
    #[must_use]
    pub fn from_tool<T: Tool>(tool: T) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters(),
            handler: Arc::new(tool),
        }
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tool description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the declared parameters.
    #[must_use]
    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Derives the JSON Schema for the arguments object.
    #[must_use]
    pub fn input_schema(&self) -> JsonValue {
        let properties: serde_json::Map<String, JsonValue> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({
                        "type": p.kind.json_type(),
                        "description": p.description,
                    }),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Formats the descriptor as an OpenAI `tools` entry.
    #[must_use]
    pub fn to_llm_format(&self) -> JsonValue {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema(),
            }
        })
    }

    /// Checks an arguments object against the declared parameters.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::ArgumentValidation` if the value is not an object,
    /// a required parameter is missing, or a parameter has the wrong type.
    pub fn validate_arguments(&self, args: &JsonValue) -> Result<(), ToolError> {
        let invalid = |reason: String| ToolError::ArgumentValidation {
            name: self.name.clone(),
            reason,
        };

        let object = args
            .as_object()
            .ok_or_else(|| invalid(format!("expected a JSON object, got {args}")))?;

        for param in &self.parameters {
            match object.get(&param.name) {
                None | Some(JsonValue::Null) if param.required => {
                    return Err(invalid(format!(
                        "missing required parameter '{}'",
                        param.name
                    )));
                }
                None | Some(JsonValue::Null) => {}
                Some(value) if !param.kind.accepts(value) => {
                    return Err(invalid(format!(
                        "parameter '{}' must be a {}",
                        param.name,
                        param.kind.json_type()
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(())
    }
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Registry of available tools, in registration order.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool descriptor.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::DuplicateName` if the name is already taken.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<(), ToolError> {
        if self.index.contains_key(descriptor.name()) {
            return Err(ToolError::DuplicateName {
                name: descriptor.name().to_string(),
            });
        }
        self.index
            .insert(descriptor.name().to_string(), self.descriptors.len());
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Registers a tool by value.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::DuplicateName` if the name is already taken.
    pub fn register_tool<T: Tool>(&mut self, tool: T) -> Result<(), ToolError> {
        self.register(ToolDescriptor::from_tool(tool))
    }

    /// Gets a tool descriptor by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.descriptors[i])
    }

    /// Returns every descriptor in registration order.
    #[must_use]
    pub fn describe_all(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Converts descriptors to the `tools` array expected by chat APIs.
    #[must_use]
    pub fn to_llm_format(&self) -> Vec<JsonValue> {
        self.descriptors
            .iter()
            .map(ToolDescriptor::to_llm_format)
            .collect()
    }

    /// Invokes a tool by name with a JSON-encoded arguments payload.
    ///
    /// An empty payload counts as `{}`.
    ///
    /// # Errors
    ///
    /// - `UnknownTool` if nothing is registered under `name`
    /// - `ArgumentValidation` if the payload does not fit the parameters
    /// - `Execution` if the callable fails or panics
    #[instrument(skip_all, fields(tool = %name))]
    pub async fn invoke(
        &self,
        name: &str,
        arguments: &str,
        ctx: &ToolContext,
    ) -> Result<String, ToolError> {
        let descriptor = self.get(name).ok_or_else(|| ToolError::UnknownTool {
            name: name.to_string(),
        })?;

        let args = parse_arguments(name, arguments)?;
        if let Err(e) = descriptor.validate_arguments(&args) {
            warn!(error = %e, "rejected tool arguments");
            return Err(e);
        }

        let started = Instant::now();
        let outcome = AssertUnwindSafe(descriptor.handler.call_json(ctx, args))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(ToolError::Execution {
                    name: name.to_string(),
                    reason: panic_message(panic.as_ref()),
                })
            });

        let latency_ms = started.elapsed().as_millis();
        match &outcome {
            Ok(_) => debug!(latency_ms, "tool completed"),
            Err(e) => warn!(latency_ms, error = %e, "tool failed"),
        }
        outcome
    }
}

fn parse_arguments(name: &str, raw: &str) -> Result<JsonValue, ToolError> {
    if raw.trim().is_empty() {
        return Ok(JsonValue::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw).map_err(|e| ToolError::ArgumentValidation {
        name: name.to_string(),
        reason: format!("arguments are not valid JSON: {e}"),
    })
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
