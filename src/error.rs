use thiserror::Error;
use crate::types::State;
use crate::events::Event;
use crate::transcript::Transcript;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Unknown tool '{tool}' requested by call {call_id}")]
    UnknownTool { tool: String, call_id: String },

    #[error("Invalid arguments for tool '{tool}' (call {call_id}): {reason}")]
    InvalidArguments { tool: String, call_id: String, reason: String },

    #[error("Cycle limit exceeded: model still requesting tools after {0} cycles")]
    CycleLimitExceeded(usize),

    #[error("Invalid transition: {from} + {event} not in transition table")]
    InvalidTransition { from: State, event: Event },

    #[error("Run already aborted: {0}")]
    RunAborted(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Build error: {0}")]
    BuildError(String),
}

/// A fatal run error together with everything appended before it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    #[source]
    pub error:      AgentError,
    pub transcript: Transcript,
}
