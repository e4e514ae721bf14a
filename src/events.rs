use serde::{Deserialize, Serialize};

/// Outcome of one state handler; drives the next transition lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    /// Decide step: the reply requested one or more tools.
    ToolCallsRequested,
    /// Decide step: the reply carried no tool calls.
    FinalReply,
    /// Act step: every call in the latest reply has a result.
    ToolsDispatched,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ToolCallsRequested => "ToolCallsRequested",
            Event::FinalReply         => "FinalReply",
            Event::ToolsDispatched    => "ToolsDispatched",
        }
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
