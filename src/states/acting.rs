use crate::config::ErrorPolicy;
use crate::error::AgentError;
use crate::events::Event;
use crate::states::StepContext;
use crate::tools::DispatchError;
use crate::types::{AgentOutput, Message, State, ToolContent, ToolResult};

/// Act step: run every tool call of the latest reply, in order, appending
/// one `ToolResult` per call.
pub async fn act(ctx: &mut StepContext<'_>) -> Result<Event, AgentError> {
    ctx.emit(AgentOutput::StateStarted(State::Acting));

    let calls = match ctx.transcript.last().and_then(Message::as_model_reply) {
        Some(reply) => reply.tool_calls.clone(),
        None => {
            let err = "Acting entered without a pending model reply";
            ctx.trace.log(ctx.cycles, "Acting", "NO_PENDING_REPLY", err);
            return Err(AgentError::InvalidTransition {
                from:  State::Acting,
                event: Event::ToolsDispatched,
            });
        }
    };

    for call in calls {
        ctx.trace.log(ctx.cycles, "Acting", "TOOL_EXECUTE", &format!(
            "tool='{}' id={} args={}",
            call.name, call.id, serde_json::to_string(&call.args).unwrap_or_default()
        ));
        ctx.emit(AgentOutput::ToolCallStarted {
            id:   call.id.clone(),
            name: call.name.clone(),
            args: call.args.clone(),
        });

        let content = match ctx.tools.dispatch(&call) {
            Ok(value) => {
                let content = ToolContent::from_value(value);
                ctx.trace.log(ctx.cycles, "Acting", "TOOL_SUCCESS",
                    &content.to_text().chars().take(100).collect::<String>());
                content
            }
            Err(err) => {
                let message = err.describe(&call);
                let policy = match err {
                    DispatchError::UnknownTool         => ctx.config.on_unknown_tool,
                    DispatchError::InvalidArguments(_) => ctx.config.on_invalid_arguments,
                    DispatchError::Failed(_)           => ErrorPolicy::Recover,
                };

                if policy == ErrorPolicy::Fail {
                    ctx.trace.log(ctx.cycles, "Acting", "TOOL_FATAL", &message);
                    if let Some(fatal) = err.into_agent_error(&call) {
                        return Err(fatal);
                    }
                }

                tracing::warn!(tool = %call.name, call_id = %call.id, error = %message, "tool call failed, reporting to model");
                ctx.trace.log(ctx.cycles, "Acting", "TOOL_FAILURE", &message);
                ToolContent::Error(message)
            }
        };

        ctx.emit(AgentOutput::ToolCallFinished {
            id:      call.id.clone(),
            name:    call.name.clone(),
            content: content.clone(),
        });
        ctx.transcript.append(Message::ToolResult(ToolResult {
            call_id: call.id,
            name:    call.name,
            content,
        }));
    }

    Ok(Event::ToolsDispatched)
}
