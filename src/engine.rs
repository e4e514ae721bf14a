use std::sync::Arc;
use crate::config::AgentConfig;
use crate::error::{AgentError, RunFailure};
use crate::llm::ModelCaller;
use crate::states::{self, StepContext};
use crate::tools::ToolRegistry;
use crate::trace::Trace;
use crate::transcript::Transcript;
use crate::transitions::transition;
use crate::types::{AgentOutput, State};
use futures::stream::BoxStream;
use tokio::sync::mpsc;

/// The controller: owns the transcript and alternates Decide and Act steps
/// until the model replies without tool calls.
pub struct AgentEngine {
    model:      Arc<dyn ModelCaller>,
    tools:      ToolRegistry,
    config:     AgentConfig,
    transcript: Transcript,
    trace:      Trace,
    state:      State,
    cycles:     usize,
    /// Set by the first fatal error; the engine refuses further steps.
    aborted:    Option<String>,
}

impl AgentEngine {
    /// Creates a new engine. Prefer using AgentBuilder for ergonomic construction.
    ///
    /// The transcript must already contain at least one human message.
    pub fn new(
        model:      Arc<dyn ModelCaller>,
        tools:      ToolRegistry,
        config:     AgentConfig,
        transcript: Transcript,
    ) -> Result<Self, AgentError> {
        if !transcript.has_human_message() {
            return Err(AgentError::BuildError(
                "transcript must contain a human message before the first Decide step".to_string(),
            ));
        }
        Ok(Self {
            model,
            tools,
            config,
            transcript,
            trace: Trace::new(),
            state: State::Deciding,
            cycles: 0,
            aborted: None,
        })
    }

    /// Run to `Done`. On a fatal error the partial transcript stays
    /// available through [`AgentEngine::transcript`].
    pub async fn run(&mut self) -> Result<&Transcript, AgentError> {
        while !self.state.is_terminal() {
            self.step(None).await?;
        }
        Ok(&self.transcript)
    }

    /// Consumes the engine, returning the final transcript or the fatal
    /// error together with the partial transcript.
    pub async fn run_to_completion(mut self) -> Result<Transcript, RunFailure> {
        let outcome = self.run().await.map(|_| ());
        match outcome {
            Ok(()) => Ok(self.transcript),
            Err(error) => Err(RunFailure { error, transcript: self.transcript }),
        }
    }

    /// Executes a single state handler and the transition it selects.
    /// A no-op once the engine is `Done`.
    pub async fn step(&mut self, tx: Option<&mpsc::UnboundedSender<AgentOutput>>) -> Result<(), AgentError> {
        if let Some(reason) = &self.aborted {
            return Err(AgentError::RunAborted(reason.clone()));
        }
        if self.state.is_terminal() {
            return Ok(());
        }
        tracing::info!(state = %self.state, cycle = self.cycles, "agent step");

        let from = self.state;
        let mut ctx = StepContext {
            transcript: &mut self.transcript,
            trace:      &mut self.trace,
            model:      self.model.as_ref(),
            tools:      &self.tools,
            config:     &self.config,
            cycles:     self.cycles,
            output_tx:  tx,
        };

        let outcome = match from {
            State::Deciding => states::decide(&mut ctx).await,
            State::Acting   => states::act(&mut ctx).await,
            State::Done     => return Ok(()),
        };

        let result = outcome.and_then(|event| {
            let next = transition(from, &event)?;
            Ok((event, next))
        });

        let (event, next) = match result {
            Ok(pair) => pair,
            Err(err) => {
                tracing::error!(state = %from, error = %err, "agent run aborted");
                self.aborted = Some(err.to_string());
                if let Some(tx) = tx {
                    let _ = tx.send(AgentOutput::Error(err.to_string()));
                }
                return Err(err);
            }
        };

        tracing::debug!(state = %from, event = %event, "state produced event");
        if from == State::Acting {
            self.cycles += 1;
        }

        tracing::info!(from = %from, event = %event, to = %next, "transition");
        if let Some(tx) = tx {
            let _ = tx.send(AgentOutput::Transition { from, event: event.to_string(), to: next });
            if next == State::Done {
                let answer = self.transcript.last_reply().and_then(|r| r.content.clone());
                let _ = tx.send(AgentOutput::FinalAnswer(answer));
            }
        }

        self.state = next;
        Ok(())
    }

    /// Run the agent and return a stream of AgentOutput events.
    /// The stream ends after `Done` or after the `Error` event of a fatal failure.
    pub fn run_streaming(&mut self) -> BoxStream<'_, AgentOutput> {
        use futures::stream;
        use futures::StreamExt;

        let (tx, rx) = mpsc::unbounded_channel();

        stream::unfold((self, rx, tx, false), |(engine, mut rx, tx, mut failed)| async move {
            loop {
                // Yield anything the last step emitted before stepping again.
                if let Ok(msg) = rx.try_recv() {
                    return Some((msg, (engine, rx, tx, failed)));
                }
                if failed || engine.aborted.is_some() || engine.state.is_terminal() {
                    return None;
                }
                if engine.step(Some(&tx)).await.is_err() {
                    failed = true;
                }
            }
        }).boxed()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn into_transcript(self) -> Transcript {
        self.transcript
    }

    /// Returns a reference to the full execution trace.
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Returns the current state (useful for inspection after run).
    pub fn current_state(&self) -> State {
        self.state
    }

    /// The fatal error that stopped this engine, if any.
    pub fn aborted(&self) -> Option<&str> {
        self.aborted.as_deref()
    }

    /// Completed Decide→Act cycles.
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Run entry point: one human message in, the final transcript out.
///
/// `max_cycles` overrides the default cycle ceiling when given.
pub async fn run_agent(
    model:      Arc<dyn ModelCaller>,
    tools:      ToolRegistry,
    human:      impl Into<String>,
    max_cycles: Option<usize>,
) -> Result<Transcript, RunFailure> {
    let mut config = AgentConfig::default();
    if let Some(max) = max_cycles {
        config.max_cycles = max;
    }

    let transcript = Transcript::seeded(human);
    let engine = match AgentEngine::new(model, tools, config, transcript.clone()) {
        Ok(engine) => engine,
        Err(error) => return Err(RunFailure { error, transcript }),
    };
    engine.run_to_completion().await
}
