//! Per-session state handed to tool invocations.

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Preferences and topics remembered during one conversation.
///
/// Only tool calls mutate it. It dies with its session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    preferences: HashMap<String, String>,
    topics: Vec<String>,
}

impl SessionState {
    /// Creates empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under the lower-cased `key`, replacing any prior value.
    pub fn remember(&mut self, key: &str, value: impl Into<String>) {
        self.preferences.insert(key.to_lowercase(), value.into());
    }

    /// Looks up a preference, ignoring the key's case.
    #[must_use]
    pub fn recall(&self, key: &str) -> Option<&str> {
        self.preferences.get(&key.to_lowercase()).map(String::as_str)
    }

    /// Records a topic unless it is already tracked.
    ///
    /// Returns whether the topic was new.
    pub fn track_topic(&mut self, topic: &str) -> bool {
        if self.topics.iter().any(|t| t == topic) {
            return false;
        }
        self.topics.push(topic.to_string());
        true
    }

    /// Returns tracked topics in first-seen order.
    #[must_use]
    pub fn topics(&self) -> &[String] {
        &self.topics
    }

    /// Returns the number of remembered preferences.
    #[must_use]
    pub fn preference_count(&self) -> usize {
        self.preferences.len()
    }
}

/// Everything a tool may touch while it runs.
///
/// Each session owns exactly one context. Tools dispatched concurrently
/// within a turn share it, so the state sits behind a mutex that must never
/// be held across an await point; [`ToolContext::with_state`] enforces that
/// by only lending the state to a synchronous closure.
#[derive(Debug)]
pub struct ToolContext {
    state: Mutex<SessionState>,
    working_dir: PathBuf,
}

impl ToolContext {
    /// Creates a context whose file tools resolve names against `working_dir`.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            state: Mutex::new(SessionState::new()),
            working_dir: working_dir.into(),
        }
    }

    /// Runs `f` with exclusive access to the session state.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }

    /// Returns a copy of the current session state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.with_state(|state| state.clone())
    }

    /// Returns the directory file tools operate in.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Resolves a relative file name against the working directory.
    #[must_use]
    pub fn resolve(&self, filename: &str) -> PathBuf {
        self.working_dir.join(filename)
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new(".")
    }
}
