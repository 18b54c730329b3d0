//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating nested keys (`MODEL__BASE_URL`, `CHAT__MAX_TOOL_CYCLES`).
//!
//! See [`ModelEndpointConfig`] for the model endpoint settings.

use parley_ai::{ModelEndpointConfig, OrchestratorConfig, SessionDefaults, ToolErrorPolicy};
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration composed from library configs.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Model endpoint configuration.
    #[serde(default)]
    pub model: ModelEndpointConfig,

    /// Chat turn and session configuration.
    #[serde(default)]
    pub chat: ChatConfig,
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

/// Turn-loop and session settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per completion; endpoint default when unset.
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Dispatch cycles allowed per turn.
    #[serde(default = "default_max_tool_cycles")]
    pub max_tool_cycles: u32,

    /// `abort` fails the turn on a tool error; `report_to_model` passes the
    /// error text back to the model.
    #[serde(default)]
    pub tool_error_policy: ToolErrorPolicy,

    /// Prompt placed at the start of every session.
    #[serde(default)]
    pub system_prompt: Option<String>,

    /// Directory the file tools read and write.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tool_cycles() -> u32 {
    8
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: None,
            max_tool_cycles: default_max_tool_cycles(),
            tool_error_policy: ToolErrorPolicy::default(),
            system_prompt: None,
            working_dir: default_working_dir(),
        }
    }
}

impl ChatConfig {
    /// Turn-loop settings for the orchestrator.
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            max_tool_cycles: self.max_tool_cycles,
            tool_error_policy: self.tool_error_policy,
        }
    }

    /// Settings applied to each new session.
    #[must_use]
    pub fn session_defaults(&self) -> SessionDefaults {
        SessionDefaults {
            working_dir: self.working_dir.clone(),
            system_prompt: self.system_prompt.clone(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_config_has_correct_defaults() {
        let config = ChatConfig::default();
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tool_cycles, 8);
        assert_eq!(config.tool_error_policy, ToolErrorPolicy::Abort);
        assert_eq!(config.working_dir, PathBuf::from("."));
        assert!(config.system_prompt.is_none());
    }

    #[test]
    fn empty_source_uses_defaults() {
        let config: ServerConfig = config::Config::builder()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.model.base_url, "http://localhost:11434/v1");
        assert_eq!(config.model.model, "llama3.2");
        assert_eq!(config.model.api_key, "not-needed");
        assert_eq!(config.chat.max_tool_cycles, 8);
    }

    #[test]
    fn nested_overrides_apply() {
        let config: ServerConfig = config::Config::builder()
            .set_override("chat.max_tool_cycles", 3_i64)
            .unwrap()
            .set_override("chat.tool_error_policy", "report_to_model")
            .unwrap()
            .set_override("model.model", "qwen2.5")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.chat.max_tool_cycles, 3);
        assert_eq!(config.chat.tool_error_policy, ToolErrorPolicy::ReportToModel);
        assert_eq!(config.model.model, "qwen2.5");
        assert_eq!(config.model.timeout_secs, 120);

        let orchestrator = config.chat.orchestrator_config();
        assert_eq!(orchestrator.max_tool_cycles, 3);
    }
}
