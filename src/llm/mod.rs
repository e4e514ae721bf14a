use crate::tools::ToolSchema;
use crate::types::{Message, ModelReply};
use async_trait::async_trait;

mod openai;
mod gemini;
mod mock;
mod retry;

pub use openai::OpenAiModel;
pub use gemini::GeminiModel;
pub use mock::MockModel;
pub use retry::RetryingModel;

/// The single interface between the controller and any model provider.
///
/// # Contract
/// - Must be Send + Sync (used behind `Arc<dyn ModelCaller>`)
/// - Receives the full ordered transcript and the registered tool schemas
/// - Returns exactly one `ModelReply` per call
/// - Every returned `ToolCall` carries a non-empty id; providers that do
///   not supply one must generate it
/// - Returns Err(String) for any failure, including replies that cannot be
///   parsed; the controller treats this as `ModelUnavailable`
///
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelCaller: Send + Sync {
    async fn call(
        &self,
        messages: &[Message],
        tools:    &[ToolSchema],
        model:    &str,
    ) -> Result<ModelReply, String>;
}

/// Identifier for a tool call the provider left unnamed.
pub(crate) fn generate_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}
