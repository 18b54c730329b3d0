//! Session API routes.
//!
//! - `POST   /api/sessions`                 start a session
//! - `DELETE /api/sessions/{id}`            end a session
//! - `POST   /api/sessions/{id}/messages`   run one turn
//! - `GET    /api/sessions/{id}/messages`   read the history

use crate::error::ApiError;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
};
use parley_ai::{ChatService, ModelBackend};
use parley_conversation::ConversationHistory;
use parley_core::ConversationSessionId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Response body for a new session.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionCreated {
    /// Id to use in later requests.
    pub session_id: ConversationSessionId,
}

/// Request body for a turn.
#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// The user's message.
    pub message: String,
}

/// Response body for a turn.
#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageResponse {
    /// The assistant's reply.
    pub reply: String,
}

/// Builds the API router over `service`.
pub fn router<B: ModelBackend + 'static>(service: Arc<ChatService<B>>) -> Router {
    Router::new()
        .route("/api/sessions", post(create_session::<B>))
        .route("/api/sessions/{id}", delete(end_session::<B>))
        .route(
            "/api/sessions/{id}/messages",
            post(send_message::<B>).get(history::<B>),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

fn parse_session_id(raw: &str) -> Result<ConversationSessionId, ApiError> {
    raw.parse().map_err(|_| ApiError::InvalidSessionId {
        value: raw.to_string(),
    })
}

async fn create_session<B: ModelBackend + 'static>(
    State(service): State<Arc<ChatService<B>>>,
) -> (StatusCode, Json<SessionCreated>) {
    let session_id = service.create_session();
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

async fn end_session<B: ModelBackend + 'static>(
    State(service): State<Arc<ChatService<B>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session_id = parse_session_id(&id)?;
    if service.end_session(session_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound { session_id })
    }
}

async fn send_message<B: ModelBackend + 'static>(
    State(service): State<Arc<ChatService<B>>>,
    Path(id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let session_id = parse_session_id(&id)?;
    let reply = service.send_message(session_id, request.message).await?;
    Ok(Json(SendMessageResponse { reply }))
}

async fn history<B: ModelBackend + 'static>(
    State(service): State<Arc<ChatService<B>>>,
    Path(id): Path<String>,
) -> Result<Json<ConversationHistory>, ApiError> {
    let session_id = parse_session_id(&id)?;
    Ok(Json(service.history(session_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, Response};
    use parley_ai::{
        ChatOrchestrator, Completion, CompletionOptions, EndpointError, OrchestratorConfig,
        SessionDefaults,
    };
    use parley_conversation::{Message, MessageRole, ToolCall};
    use serde_json::{Value as JsonValue, json};
    use tower::ServiceExt;

    /// Answers weekday questions through the tool and everything else
    /// directly. "outage" fails at the endpoint.
    struct FakeBackend;

    #[async_trait]
    impl ModelBackend for FakeBackend {
        async fn complete(
            &self,
            history: &[Message],
            _tools: &[JsonValue],
            _options: &CompletionOptions,
        ) -> Result<Completion, EndpointError> {
            let Some(last) = history.last() else {
                return Err(EndpointError::MalformedResponse {
                    reason: "empty history".to_string(),
                });
            };
            match (last.role, last.text()) {
                (MessageRole::User, "outage") => Err(EndpointError::Unavailable {
                    endpoint: "fake".to_string(),
                    reason: "connection refused".to_string(),
                }),
                (MessageRole::User, "What day is it?") => Ok(Completion::ToolCalls {
                    content: None,
                    calls: vec![ToolCall::new("call_1", "current_day_of_week", "{}")],
                }),
                (MessageRole::Tool, day) => Ok(Completion::Message(format!("Today is {day}."))),
                (_, text) => Ok(Completion::Message(format!("You said: {text}"))),
            }
        }

        fn model(&self) -> &str {
            "fake"
        }
    }

    fn app() -> Router {
        let registry = Arc::new(parley_tools::builtin_registry().unwrap());
        let orchestrator =
            ChatOrchestrator::new(FakeBackend, registry, OrchestratorConfig::default());
        router(Arc::new(ChatService::new(
            orchestrator,
            SessionDefaults::default(),
        )))
    }

    async fn json_body(response: Response<Body>) -> JsonValue {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create(app: &Router) -> String {
        let response = app
            .clone()
            .oneshot(
                Request::post("/api/sessions")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["session_id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    fn post_message(id: &str, message: &str) -> Request<Body> {
        Request::post(format!("/api/sessions/{id}/messages"))
            .header("content-type", "application/json")
            .body(Body::from(json!({ "message": message }).to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn full_turn_over_http() {
        let app = app();
        let id = create(&app).await;

        let response = app
            .clone()
            .oneshot(post_message(&id, "What day is it?"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let reply = json_body(response).await["reply"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(reply.starts_with("Today is "), "{reply}");

        let response = app
            .oneshot(
                Request::get(format!("/api/sessions/{id}/messages"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let history = json_body(response).await;
        let roles: Vec<_> = history
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["role"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(roles, ["user", "assistant", "tool", "assistant"]);
    }

    #[tokio::test]
    async fn endpoint_failure_is_bad_gateway() {
        let app = app();
        let id = create(&app).await;

        let response = app.oneshot(post_message(&id, "outage")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let app = app();
        let id = ConversationSessionId::new().to_string();

        let response = app.oneshot(post_message(&id, "hello")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn malformed_session_id_is_bad_request() {
        let response = app()
            .oneshot(post_message("not-an-id", "hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn ending_a_session_twice() {
        let app = app();
        let id = create(&app).await;
        let end = || {
            Request::delete(format!("/api/sessions/{id}"))
                .body(Body::empty())
                .unwrap()
        };

        let first = app.clone().oneshot(end()).await.unwrap();
        let second = app.oneshot(end()).await.unwrap();

        assert_eq!(first.status(), StatusCode::NO_CONTENT);
        assert_eq!(second.status(), StatusCode::NOT_FOUND);
    }
}
