use crate::error::AgentError;
use crate::events::Event;
use crate::states::StepContext;
use std::collections::HashSet;
use crate::types::{AgentOutput, Message, ModelReply, State};

/// Decide step: hand the transcript to the model and append its reply.
pub async fn decide(ctx: &mut StepContext<'_>) -> Result<Event, AgentError> {
    ctx.emit(AgentOutput::StateStarted(State::Deciding));

    let schemas = ctx.tools.schemas();
    let reply = match ctx.model.call(ctx.transcript.all(), &schemas, &ctx.config.model).await {
        Ok(reply) => reply,
        Err(err) => {
            ctx.trace.log(ctx.cycles, "Deciding", "MODEL_UNAVAILABLE", &err);
            return Err(AgentError::ModelUnavailable(err));
        }
    };

    if let Err(err) = check_call_ids(&reply) {
        ctx.trace.log(ctx.cycles, "Deciding", "MODEL_UNAVAILABLE", &err);
        return Err(AgentError::ModelUnavailable(err));
    }

    let wants_tools = reply.has_tool_calls();
    ctx.emit(AgentOutput::ModelReplied {
        content:    reply.content.clone(),
        tool_calls: reply.tool_calls.clone(),
    });

    if wants_tools {
        let names: Vec<&str> = reply.tool_calls.iter().map(|c| c.name.as_str()).collect();
        ctx.trace.log(ctx.cycles, "Deciding", "MODEL_TOOL_CALLS", &names.join(","));
    } else {
        let preview: String = reply.content.as_deref().unwrap_or("").chars().take(100).collect();
        ctx.trace.log(ctx.cycles, "Deciding", "MODEL_FINAL_REPLY", &preview);
    }

    ctx.transcript.append(Message::ModelReply(reply));

    if !wants_tools {
        return Ok(Event::FinalReply);
    }

    if ctx.cycles >= ctx.config.max_cycles {
        ctx.trace.log(ctx.cycles, "Deciding", "CYCLE_LIMIT", &format!("max_cycles={}", ctx.config.max_cycles));
        return Err(AgentError::CycleLimitExceeded(ctx.config.max_cycles));
    }

    Ok(Event::ToolCallsRequested)
}

/// Every call in a reply needs a non-empty id that no other call in the
/// same reply uses, or its result could not be correlated.
fn check_call_ids(reply: &ModelReply) -> Result<(), String> {
    let mut seen = HashSet::new();
    for call in &reply.tool_calls {
        if call.id.is_empty() {
            return Err(format!("tool call '{}' has no identifier", call.name));
        }
        if !seen.insert(call.id.as_str()) {
            return Err(format!("tool call id '{}' appears more than once in one reply", call.id));
        }
    }
    Ok(())
}
