use std::sync::Mutex;
use crate::llm::ModelCaller;
use crate::tools::ToolSchema;
use crate::types::{Message, ModelReply};
use async_trait::async_trait;

/// Scripted model collaborator: hands out programmed replies in order.
pub struct MockModel {
    replies:  Mutex<Vec<Result<ModelReply, String>>>,
    call_log: Mutex<Vec<(String, usize)>>,  // (model, transcript length)
}

impl MockModel {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self::from_results(replies.into_iter().map(Ok).collect())
    }

    /// Script that may include failures, e.g. to simulate an outage.
    pub fn from_results(replies: Vec<Result<ModelReply, String>>) -> Self {
        Self {
            replies:  Mutex::new(replies),
            call_log: Mutex::new(Vec::new()),
        }
    }

    /// Returns the number of times call() was invoked
    pub fn call_count(&self) -> usize {
        self.call_log.lock().map(|log| log.len()).unwrap_or(0)
    }

    /// Returns the model string passed to the Nth call (0-indexed)
    pub fn model_for_call(&self, n: usize) -> Option<String> {
        self.call_log.lock().ok()?
            .get(n)
            .map(|(model, _)| model.clone())
    }

    /// Returns how many messages the transcript held on the Nth call
    pub fn transcript_len_for_call(&self, n: usize) -> Option<usize> {
        self.call_log.lock().ok()?
            .get(n)
            .map(|(_, len)| *len)
    }
}

#[async_trait]
impl ModelCaller for MockModel {
    async fn call(
        &self,
        messages: &[Message],
        _tools:   &[ToolSchema],
        model:    &str,
    ) -> Result<ModelReply, String> {
        self.call_log.lock()
            .map_err(|_| "MockModel: call log poisoned".to_string())?
            .push((model.to_string(), messages.len()));

        let mut replies = self.replies.lock()
            .map_err(|_| "MockModel: script poisoned".to_string())?;
        if replies.is_empty() {
            return Err("MockModel: no more programmed replies".to_string());
        }
        replies.remove(0)
    }
}
