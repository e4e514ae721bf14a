//! Handlers for the two working states of the controller.
//!
//! Each handler performs its state's work against the shared
//! [`StepContext`] and returns the [`Event`](crate::events::Event) that
//! drives the next transition. Fatal conditions are returned as
//! `Err(AgentError)` and unwind the run; recoverable ones are written into
//! the transcript as data.

use tokio::sync::mpsc::UnboundedSender;
use crate::config::AgentConfig;
use crate::llm::ModelCaller;
use crate::tools::ToolRegistry;
use crate::trace::Trace;
use crate::transcript::Transcript;
use crate::types::AgentOutput;

mod deciding;
mod acting;

pub use deciding::decide;
pub use acting::act;

/// Everything a handler may read or write during one step.
pub struct StepContext<'a> {
    pub transcript: &'a mut Transcript,
    pub trace:      &'a mut Trace,
    pub model:      &'a dyn ModelCaller,
    pub tools:      &'a ToolRegistry,
    pub config:     &'a AgentConfig,
    /// Completed Act steps so far in this run.
    pub cycles:     usize,
    pub output_tx:  Option<&'a UnboundedSender<AgentOutput>>,
}

impl StepContext<'_> {
    pub(crate) fn emit(&self, output: AgentOutput) {
        if let Some(tx) = self.output_tx {
            let _ = tx.send(output);
        }
    }
}
