use std::sync::Arc;
use crate::config::{AgentConfig, ErrorPolicy};
use crate::engine::AgentEngine;
use crate::error::AgentError;
use crate::llm::ModelCaller;
use crate::tools::{ToolFn, ToolRegistry, ToolSpec};
use crate::transcript::Transcript;

/// Assembles an [`AgentEngine`] from its injected collaborators.
pub struct AgentBuilder {
    human:  String,
    tools:  ToolRegistry,
    llm:    Option<Arc<dyn ModelCaller>>,
    config: AgentConfig,
    /// First registration failure, reported by `build()`.
    error:  Option<AgentError>,
}

impl AgentBuilder {
    /// Starts a builder for a run seeded with one human message.
    pub fn new(human: impl Into<String>) -> Self {
        Self {
            human:  human.into(),
            tools:  ToolRegistry::new(),
            llm:    None,
            config: AgentConfig::default(),
            error:  None,
        }
    }

    pub fn llm(mut self, llm: Arc<dyn ModelCaller>) -> Self {
        self.llm = Some(llm); self
    }

    /// Replaces the whole configuration; later setters still apply on top.
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config; self
    }

    /// Set the model name passed to the model collaborator.
    ///
    /// # Example
    /// ```no_run
    /// # use agentloop::AgentBuilder;
    /// AgentBuilder::new("task").model("gemini-2.0-flash");
    /// AgentBuilder::new("task").model("gpt-4o-mini");
    /// ```
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into(); self
    }

    pub fn max_cycles(mut self, n: usize) -> Self {
        self.config.max_cycles = n; self
    }

    pub fn on_unknown_tool(mut self, policy: ErrorPolicy) -> Self {
        self.config.on_unknown_tool = policy; self
    }

    pub fn on_invalid_arguments(mut self, policy: ErrorPolicy) -> Self {
        self.config.on_invalid_arguments = policy; self
    }

    pub fn tool(
        self,
        name:        impl Into<String>,
        description: impl Into<String>,
        schema:      serde_json::Value,
        func:        ToolFn,
    ) -> Self {
        self.tool_spec(ToolSpec::new(name, description, schema, func))
    }

    pub fn tool_spec(mut self, spec: ToolSpec) -> Self {
        if let Err(err) = self.tools.register(spec) {
            self.error.get_or_insert(err);
        }
        self
    }

    pub fn build(self) -> Result<AgentEngine, AgentError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let llm = self.llm
            .ok_or_else(|| AgentError::BuildError("Model caller is required".to_string()))?;

        AgentEngine::new(llm, self.tools, self.config, Transcript::seeded(self.human))
    }
}
