use serde::{Deserialize, Serialize};
use std::str::FromStr;
use crate::error::AgentError;

/// What the controller does with a recoverable dispatch error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Record the error as a `ToolResult` payload and let the model retry.
    #[default]
    Recover,
    /// Abort the run.
    Fail,
}

impl FromStr for ErrorPolicy {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "recover" => Ok(ErrorPolicy::Recover),
            "fail"    => Ok(ErrorPolicy::Fail),
            other     => Err(AgentError::Config(format!(
                "unknown error policy '{}' (expected 'recover' or 'fail')", other
            ))),
        }
    }
}

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_MAX_CYCLES: usize = 15;

/// Run configuration for the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model name handed to the model collaborator on every Decide step
    pub model: String,

    /// Hard cap on Decide→Act cycles; a reply that still requests tools
    /// once this many Act steps have run aborts with `CycleLimitExceeded`
    pub max_cycles: usize,

    pub on_unknown_tool: ErrorPolicy,

    pub on_invalid_arguments: ErrorPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model:                DEFAULT_MODEL.to_string(),
            max_cycles:           DEFAULT_MAX_CYCLES,
            on_unknown_tool:      ErrorPolicy::Recover,
            on_invalid_arguments: ErrorPolicy::Recover,
        }
    }
}

impl AgentConfig {
    /// Defaults overlaid with `AGENTLOOP_*` environment variables.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`AgentConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AgentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(model) = lookup("AGENTLOOP_MODEL").filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }
        if let Some(raw) = lookup("AGENTLOOP_MAX_CYCLES") {
            config.max_cycles = raw.trim().parse().map_err(|_| {
                AgentError::Config(format!("AGENTLOOP_MAX_CYCLES must be a non-negative integer, got '{}'", raw))
            })?;
        }
        if let Some(raw) = lookup("AGENTLOOP_ON_UNKNOWN_TOOL") {
            config.on_unknown_tool = raw.parse()?;
        }
        if let Some(raw) = lookup("AGENTLOOP_ON_INVALID_ARGUMENTS") {
            config.on_invalid_arguments = raw.parse()?;
        }

        tracing::debug!(?config, "loaded agent config");
        Ok(config)
    }
}
