use crate::types::State;
use crate::events::Event;
use crate::error::AgentError;

/// The complete transition function of the controller.
///
/// ```text
/// Deciding --ToolCallsRequested--> Acting
/// Deciding --FinalReply----------> Done
/// Acting   --ToolsDispatched-----> Deciding
/// ```
///
/// Any other pair is illegal and yields `AgentError::InvalidTransition`.
/// `Done` has no outgoing transitions; the engine stops before asking.
pub fn transition(state: State, event: &Event) -> Result<State, AgentError> {
    match (state, event) {
        (State::Deciding, Event::ToolCallsRequested) => Ok(State::Acting),
        (State::Deciding, Event::FinalReply)         => Ok(State::Done),
        (State::Acting,   Event::ToolsDispatched)    => Ok(State::Deciding),
        (from, event) => Err(AgentError::InvalidTransition { from, event: *event }),
    }
}

/// Validates that a given (state, event) pair is legal.
pub fn is_valid_transition(state: State, event: &Event) -> bool {
    transition(state, event).is_ok()
}
