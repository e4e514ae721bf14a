use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// The controller's position in the decide/act cycle.
///
/// Closed set: every transition is enumerated in [`crate::transitions`].
/// `Done` is the only terminal state; fatal errors unwind the run without
/// entering a state of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    Deciding,
    Acting,
    Done,
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Done)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Deciding => "Deciding",
            State::Acting   => "Acting",
            State::Done     => "Done",
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlates this call with the `ToolResult` that answers it.
    pub id:   String,
    pub name: String,
    pub args: HashMap<String, Value>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, args: HashMap<String, Value>) -> Self {
        Self { id: id.into(), name: name.into(), args }
    }
}

/// One reply from the model collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelReply {
    pub content:    Option<String>,
    /// Executed strictly in this order during the following Act step.
    pub tool_calls: Vec<ToolCall>,
}

impl ModelReply {
    /// A reply with text and no tool calls; ends the run.
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), tool_calls: Vec::new() }
    }

    pub fn with_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self { content: None, tool_calls }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Payload of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ToolContent {
    Text(String),
    Structured(Value),
    /// A recoverable failure fed back to the model.
    Error(String),
}

impl ToolContent {
    /// Plain strings become `Text`; every other JSON value stays structured.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(s) => ToolContent::Text(s),
            other            => ToolContent::Structured(other),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolContent::Error(_))
    }

    /// Renders the payload as the text sent back to a model provider.
    pub fn to_text(&self) -> String {
        match self {
            ToolContent::Text(s)       => s.clone(),
            ToolContent::Structured(v) => v.to_string(),
            ToolContent::Error(e)      => format!("ERROR: {}", e),
        }
    }
}

impl std::fmt::Display for ToolContent {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

/// The answer to exactly one `ToolCall` of the preceding reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub call_id: String,
    /// Name of the tool that was requested; providers such as Gemini key
    /// function responses by name rather than by id.
    pub name:    String,
    pub content: ToolContent,
}

/// One entry of the conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    Human { content: String },
    ModelReply(ModelReply),
    ToolResult(ToolResult),
}

impl Message {
    pub fn human(content: impl Into<String>) -> Self {
        Message::Human { content: content.into() }
    }

    pub fn as_model_reply(&self) -> Option<&ModelReply> {
        match self {
            Message::ModelReply(reply) => Some(reply),
            _ => None,
        }
    }

    pub fn as_tool_result(&self) -> Option<&ToolResult> {
        match self {
            Message::ToolResult(result) => Some(result),
            _ => None,
        }
    }
}

/// High-level events emitted by the engine while it runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AgentOutput {
    /// A new state has started execution
    StateStarted(State),
    /// The model answered a Decide step
    ModelReplied {
        content:    Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    /// A tool call is about to be dispatched
    ToolCallStarted {
        id:   String,
        name: String,
        args: HashMap<String, Value>,
    },
    /// A tool call produced its result
    ToolCallFinished {
        id:      String,
        name:    String,
        content: ToolContent,
    },
    /// The controller moved between states
    Transition {
        from:  State,
        event: String,
        to:    State,
    },
    /// The run reached `Done`; carries the last reply's text
    FinalAnswer(Option<String>),
    /// The run aborted with a fatal error
    Error(String),
}

impl std::fmt::Display for AgentOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AgentOutput::StateStarted(state) => write!(f, "[{}]", state),
            AgentOutput::ModelReplied { content, tool_calls } => {
                if let Some(text) = content {
                    write!(f, "  model: {}", text)?;
                    if !tool_calls.is_empty() {
                        writeln!(f)?;
                    }
                }
                for (i, call) in tool_calls.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "  model → {}({}) id={}",
                        call.name,
                        serde_json::to_string(&call.args).unwrap_or_default(),
                        call.id)?;
                }
                Ok(())
            }
            AgentOutput::ToolCallStarted { id, name, .. } => write!(f, "  calling {} id={}", name, id),
            AgentOutput::ToolCallFinished { name, content, .. } => write!(f, "  {} ← {}", name, content),
            AgentOutput::Transition { from, event, to } => write!(f, "  ══ {} --{}--> {} ══", from, event, to),
            AgentOutput::FinalAnswer(answer) => {
                write!(f, "  final: {}", answer.as_deref().unwrap_or("[no text]"))
            }
            AgentOutput::Error(e) => write!(f, "  error: {}", e),
        }
    }
}
