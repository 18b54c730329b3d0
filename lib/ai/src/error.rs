//! Error types for the AI crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `EndpointError`: the model endpoint could not be reached or understood
//! - `TurnError`: why a conversation turn aborted (wraps the lower errors)

use parley_conversation::ToolError;
use std::fmt;

/// Errors from the model endpoint adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    /// The HTTP exchange could not be completed (refused, timed out, non-2xx).
    Unavailable { endpoint: String, reason: String },
    /// The response did not have the expected shape.
    MalformedResponse { reason: String },
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable { endpoint, reason } => {
                write!(f, "model endpoint '{endpoint}' unavailable: {reason}")
            }
            Self::MalformedResponse { reason } => {
                write!(f, "malformed model response: {reason}")
            }
        }
    }
}

impl std::error::Error for EndpointError {}

/// Why a turn was aborted.
///
/// A failed turn appends no assistant message; the session stays usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnError {
    /// The registry rejected or failed a tool call.
    Tool(ToolError),
    /// The model endpoint failed.
    Endpoint(EndpointError),
    /// The model kept requesting tools past the cycle limit.
    ToolLoopExceeded { max_cycles: u32 },
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tool(e) => write!(f, "tool call failed: {e}"),
            Self::Endpoint(e) => write!(f, "completion failed: {e}"),
            Self::ToolLoopExceeded { max_cycles } => {
                write!(f, "model requested tools for more than {max_cycles} cycles")
            }
        }
    }
}

impl std::error::Error for TurnError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Tool(e) => Some(e),
            Self::Endpoint(e) => Some(e),
            Self::ToolLoopExceeded { .. } => None,
        }
    }
}

impl From<ToolError> for TurnError {
    fn from(e: ToolError) -> Self {
        Self::Tool(e)
    }
}

impl From<EndpointError> for TurnError {
    fn from(e: EndpointError) -> Self {
        Self::Endpoint(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_error_display() {
        let err = EndpointError::Unavailable {
            endpoint: "http://localhost:11434/v1/chat/completions".to_string(),
            reason: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("11434"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn turn_error_wraps_tool_errors() {
        let err: TurnError = ToolError::UnknownTool {
            name: "fly".to_string(),
        }
        .into();
        assert!(err.to_string().contains("unknown tool: fly"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn loop_exceeded_display() {
        let err = TurnError::ToolLoopExceeded { max_cycles: 8 };
        assert!(err.to_string().contains('8'));
    }
}
