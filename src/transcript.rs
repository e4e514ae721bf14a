use serde::{Deserialize, Serialize};
use crate::types::{Message, ModelReply};

/// Append-only conversation history shared by the Decide and Act steps.
///
/// Insertion order is conversation order. Entries are never reordered,
/// mutated, or removed; the only write operation is [`Transcript::append`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self { messages: Vec::new() }
    }

    /// A transcript seeded with the initial human message.
    pub fn seeded(human: impl Into<String>) -> Self {
        let mut transcript = Self::new();
        transcript.append(Message::human(human));
        transcript
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The most recent message, or `None` for an empty transcript.
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Read-only ordered view handed to the model collaborator.
    pub fn all(&self) -> &[Message] {
        &self.messages
    }

    /// The most recent model reply, if any.
    pub fn last_reply(&self) -> Option<&ModelReply> {
        self.messages.iter().rev().find_map(Message::as_model_reply)
    }

    pub fn has_human_message(&self) -> bool {
        self.messages.iter().any(|m| matches!(m, Message::Human { .. }))
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Serializes the transcript to a pretty-printed JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.messages)
            .unwrap_or_else(|_| "[]".to_string())
    }
}
