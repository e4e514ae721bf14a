pub mod types;
pub mod transcript;
pub mod events;
pub mod transitions;
pub mod tools;
pub mod states;
pub mod engine;
pub mod trace;
pub mod config;
pub mod error;
pub mod builder;
pub mod llm;

// Convenience re-exports at crate root
pub use builder::AgentBuilder;
pub use engine::{AgentEngine, run_agent};
pub use transcript::Transcript;
pub use types::{State, Message, ModelReply, ToolCall, ToolResult, ToolContent, AgentOutput};
pub use events::Event;
pub use config::{AgentConfig, ErrorPolicy};
pub use tools::{ToolRegistry, ToolFn, ToolSpec, ToolSchema};
pub use llm::{ModelCaller, RetryingModel};
pub use trace::{TraceEntry, Trace};
pub use error::{AgentError, RunFailure};
