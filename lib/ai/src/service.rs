//! Caller-facing chat service.
//!
//! Owns the session table. Each session sits behind its own async mutex, so
//! turns on one session are serialized while different sessions run in
//! parallel.

use crate::backend::ModelBackend;
use crate::orchestrator::ChatOrchestrator;
use futures::stream::{self, Stream};
use parley_conversation::{ConversationError, ConversationHistory, Session, SessionState};
use parley_core::ConversationSessionId;
use rootcause::prelude::ResultExt;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::Mutex;
use tracing::{info, instrument};

/// Settings applied to every new session.
#[derive(Debug, Clone, Default)]
pub struct SessionDefaults {
    /// Directory the file tools work in.
    pub working_dir: PathBuf,
    /// Prompt placed at the start of each history.
    pub system_prompt: Option<String>,
}

type SessionHandle = Arc<Mutex<Session>>;

/// Session table plus the orchestrator that runs turns.
pub struct ChatService<B> {
    orchestrator: ChatOrchestrator<B>,
    defaults: SessionDefaults,
    sessions: RwLock<HashMap<ConversationSessionId, SessionHandle>>,
}

impl<B: ModelBackend> ChatService<B> {
    /// Creates a service with no sessions.
    #[must_use]
    pub fn new(orchestrator: ChatOrchestrator<B>, defaults: SessionDefaults) -> Self {
        Self {
            orchestrator,
            defaults,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the orchestrator.
    #[must_use]
    pub fn orchestrator(&self) -> &ChatOrchestrator<B> {
        &self.orchestrator
    }

    /// Starts a new session and returns its id.
    pub fn create_session(&self) -> ConversationSessionId {
        let mut session = Session::new(self.defaults.working_dir.clone());
        if let Some(prompt) = &self.defaults.system_prompt {
            session = session.with_system_prompt(prompt.clone());
        }
        let id = session.id;

        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(Mutex::new(session)));
        info!(session = %id, "session created");
        id
    }

    /// Discards a session. Returns false if it did not exist.
    pub fn end_session(&self, id: ConversationSessionId) -> bool {
        let removed = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some();
        if removed {
            info!(session = %id, "session ended");
        }
        removed
    }

    /// Returns the number of live sessions.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns a copy of a session's history.
    ///
    /// Waits for any in-flight turn on the session to finish.
    ///
    /// # Errors
    ///
    /// Returns `ConversationError::SessionNotFound` for an unknown id.
    pub async fn history(
        &self,
        id: ConversationSessionId,
    ) -> parley_core::Result<ConversationHistory, ConversationError> {
        let session = self.session(id)?;
        let session = session.lock().await;
        Ok(session.history.clone())
    }

    /// Returns a copy of a session's remembered preferences and topics.
    ///
    /// # Errors
    ///
    /// Returns `ConversationError::SessionNotFound` for an unknown id.
    pub async fn state(
        &self,
        id: ConversationSessionId,
    ) -> parley_core::Result<SessionState, ConversationError> {
        let session = self.session(id)?;
        let session = session.lock().await;
        Ok(session.state())
    }

    /// Runs one turn on a session and returns the assistant's reply.
    ///
    /// # Errors
    ///
    /// - `ConversationError::SessionNotFound` for an unknown id
    /// - `ConversationError::MessageProcessing` wrapping the turn failure
    #[instrument(skip_all, fields(session = %id))]
    pub async fn send_message(
        &self,
        id: ConversationSessionId,
        text: impl Into<String>,
    ) -> parley_core::Result<String, ConversationError> {
        let session = self.session(id)?;
        let mut session = session.lock().await;
        self.orchestrator
            .send(&mut session, text)
            .await
            .context(ConversationError::MessageProcessing { session_id: id })
    }

    /// Streaming form of [`ChatService::send_message`]. Yields one item.
    pub fn send_message_stream(
        &self,
        id: ConversationSessionId,
        text: impl Into<String>,
    ) -> impl Stream<Item = parley_core::Result<String, ConversationError>> + '_ {
        let text = text.into();
        stream::once(async move { self.send_message(id, text).await })
    }

    fn session(
        &self,
        id: ConversationSessionId,
    ) -> parley_core::Result<SessionHandle, ConversationError> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or_else(|| ConversationError::SessionNotFound { session_id: id }.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Completion, CompletionOptions};
    use crate::error::EndpointError;
    use crate::orchestrator::OrchestratorConfig;
    use async_trait::async_trait;
    use futures::StreamExt;
    use parley_conversation::{Message, MessageRole, ToolCall};
    use serde_json::Value as JsonValue;

    /// Echoes the last message. `remember <topic>` asks for `track_topic`
    /// and `fail` simulates an outage.
    struct EchoBackend;

    #[async_trait]
    impl ModelBackend for EchoBackend {
        async fn complete(
            &self,
            history: &[Message],
            _tools: &[JsonValue],
            _options: &CompletionOptions,
        ) -> Result<Completion, EndpointError> {
            let last = history.last().ok_or_else(|| EndpointError::MalformedResponse {
                reason: "empty history".to_string(),
            })?;
            if last.role == MessageRole::User {
                if let Some(topic) = last.text().strip_prefix("remember ") {
                    let args = serde_json::json!({ "topic": topic }).to_string();
                    return Ok(Completion::ToolCalls {
                        content: None,
                        calls: vec![ToolCall::new("t1", "track_topic", args)],
                    });
                }
                if last.text() == "fail" {
                    return Err(EndpointError::Unavailable {
                        endpoint: "test".to_string(),
                        reason: "down".to_string(),
                    });
                }
            }
            Ok(Completion::Message(format!("echo: {}", last.text())))
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    fn service(system_prompt: Option<&str>) -> ChatService<EchoBackend> {
        let registry = Arc::new(parley_tools::builtin_registry().unwrap());
        let orchestrator = ChatOrchestrator::new(EchoBackend, registry, OrchestratorConfig::default());
        ChatService::new(
            orchestrator,
            SessionDefaults {
                working_dir: PathBuf::from("."),
                system_prompt: system_prompt.map(str::to_string),
            },
        )
    }

    #[tokio::test]
    async fn send_message_returns_the_reply() {
        let service = service(None);
        let id = service.create_session();

        let reply = service.send_message(id, "hello").await.unwrap();

        assert_eq!(reply, "echo: hello");
        assert_eq!(service.history(id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn sessions_start_with_the_system_prompt() {
        let service = service(Some("Be brief."));
        let id = service.create_session();

        let history = service.history(id).await.unwrap();
        assert_eq!(history.messages()[0].role, MessageRole::System);
        assert_eq!(history.messages()[0].text(), "Be brief.");
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let service = service(None);
        let a = service.create_session();
        let b = service.create_session();

        service.send_message(a, "remember rust").await.unwrap();

        assert_eq!(service.state(a).await.unwrap().topics(), ["rust".to_string()]);
        assert!(service.state(b).await.unwrap().topics().is_empty());
        assert!(service.history(b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_session_is_reported() {
        let service = service(None);
        let missing = ConversationSessionId::new();

        let err = service.send_message(missing, "hi").await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            ConversationError::SessionNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn turn_failures_are_wrapped_with_the_session() {
        let service = service(None);
        let id = service.create_session();

        let err = service.send_message(id, "fail").await.unwrap_err();

        assert_eq!(
            err.current_context(),
            &ConversationError::MessageProcessing { session_id: id }
        );
        // The user message stays, nothing else is added.
        assert_eq!(service.history(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn ended_sessions_are_gone() {
        let service = service(None);
        let id = service.create_session();
        assert_eq!(service.session_count(), 1);

        assert!(service.end_session(id));
        assert!(!service.end_session(id));
        assert_eq!(service.session_count(), 0);
        assert!(service.history(id).await.is_err());
    }

    #[tokio::test]
    async fn stream_yields_one_reply() {
        let service = service(None);
        let id = service.create_session();

        let replies: Vec<_> = service
            .send_message_stream(id, "hi")
            .map(|r| r.unwrap())
            .collect()
            .await;

        assert_eq!(replies, vec!["echo: hi".to_string()]);
    }
}
