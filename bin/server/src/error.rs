//! HTTP-facing error type.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use parley_conversation::ConversationError;
use parley_core::ConversationSessionId;
use rootcause::prelude::Report;
use serde_json::json;
use std::fmt;

/// Errors returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The path segment is not a session id.
    InvalidSessionId { value: String },
    /// No live session has this id.
    SessionNotFound { session_id: ConversationSessionId },
    /// The turn failed at the endpoint, in a tool, or in the loop guard.
    TurnFailed { details: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSessionId { value } => write!(f, "invalid session id '{value}'"),
            Self::SessionNotFound { session_id } => write!(f, "session '{session_id}' not found"),
            Self::TurnFailed { details } => write!(f, "turn failed: {details}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<Report<ConversationError>> for ApiError {
    fn from(report: Report<ConversationError>) -> Self {
        match report.current_context() {
            ConversationError::SessionNotFound { session_id } => Self::SessionNotFound {
                session_id: *session_id,
            },
            ConversationError::MessageProcessing { .. } => Self::TurnFailed {
                details: report.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidSessionId { .. } => StatusCode::BAD_REQUEST,
            Self::SessionNotFound { .. } => StatusCode::NOT_FOUND,
            Self::TurnFailed { details } => {
                tracing::error!(%details, "chat turn failed");
                StatusCode::BAD_GATEWAY
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_match_the_failure() {
        let missing = ApiError::SessionNotFound {
            session_id: ConversationSessionId::new(),
        };
        let bad = ApiError::InvalidSessionId {
            value: "nope".to_string(),
        };
        let failed = ApiError::TurnFailed {
            details: "connection refused".to_string(),
        };

        assert_eq!(missing.into_response().status(), StatusCode::NOT_FOUND);
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(failed.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn reports_map_by_context() {
        let session_id = ConversationSessionId::new();
        let report: Report<ConversationError> =
            ConversationError::SessionNotFound { session_id }.into();

        assert!(matches!(
            ApiError::from(report),
            ApiError::SessionNotFound { .. }
        ));
    }
}
