use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage,
        ChatCompletionTool,
        ChatCompletionToolType,
        CreateChatCompletionRequestArgs,
        FunctionObject,
        ChatCompletionMessageToolCall,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use crate::llm::ModelCaller;
use crate::tools::ToolSchema;
use crate::types::{Message, ModelReply, ToolCall};
use std::collections::HashMap;

pub struct OpenAiModel {
    client: Client<OpenAIConfig>,
}

impl OpenAiModel {
    /// Standard OpenAI client using OPENAI_API_KEY env var
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    /// Custom base URL — for Groq, Together, Ollama, or Google's
    /// OpenAI-compatible endpoint.
    /// api_base example: "https://generativelanguage.googleapis.com/v1beta/openai"
    pub fn with_base_url(api_base: impl Into<String>, api_key: impl Into<String>) -> Self {
        let config = OpenAIConfig::new()
            .with_api_base(api_base)
            .with_api_key(api_key);
        Self { client: Client::with_config(config) }
    }

    /// Convert our ToolSchema into async-openai's ChatCompletionTool type
    fn build_tools(tools: &[ToolSchema]) -> Vec<ChatCompletionTool> {
        tools.iter().map(|schema| {
            ChatCompletionTool {
                r#type: ChatCompletionToolType::Function,
                function: FunctionObject {
                    name:        schema.name.clone(),
                    description: Some(schema.description.clone()),
                    parameters:  Some(schema.input_schema.clone()),
                },
            }
        }).collect()
    }

    /// Renders the transcript in chat-completions message format.
    pub(crate) fn build_messages(messages: &[Message]) -> Vec<Value> {
        messages.iter().map(|message| match message {
            Message::Human { content } => json!({
                "role": "user",
                "content": content
            }),
            Message::ModelReply(reply) => {
                let mut msg = json!({
                    "role": "assistant",
                    "content": reply.content
                });
                if reply.has_tool_calls() {
                    msg["tool_calls"] = reply.tool_calls.iter().map(|call| json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": serde_json::to_string(&call.args).unwrap_or_default()
                        }
                    })).collect();
                }
                msg
            }
            Message::ToolResult(result) => json!({
                "role": "tool",
                "tool_call_id": result.call_id,
                "content": result.content.to_text()
            }),
        }).collect()
    }

    fn parse_tool_call(tc: &ChatCompletionMessageToolCall) -> Result<ToolCall, String> {
        let raw = tc.function.arguments.trim();
        let args: HashMap<String, Value> = if raw.is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str(raw)
                .map_err(|e| format!("Failed to parse tool args: {}", e))?
        };
        let id = if tc.id.is_empty() { super::generate_call_id() } else { tc.id.clone() };
        Ok(ToolCall { id, name: tc.function.name.clone(), args })
    }
}

impl Default for OpenAiModel {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl ModelCaller for OpenAiModel {
    async fn call(
        &self,
        messages: &[Message],
        tools:    &[ToolSchema],
        model:    &str,
    ) -> Result<ModelReply, String> {
        // serde round-trip into the typed request messages
        let messages: Vec<ChatCompletionRequestMessage> =
            serde_json::from_value(Value::Array(Self::build_messages(messages)))
                .map_err(|e| format!("Failed to build messages: {}", e))?;

        let oai_tools = Self::build_tools(tools);

        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder.model(model).messages(messages);

        if !oai_tools.is_empty() {
            request_builder.tools(oai_tools);
        }

        let request = request_builder.build()
            .map_err(|e| format!("Failed to build request: {}", e))?;

        let response = self.client.chat()
            .create(request)
            .await
            .map_err(|e| format!("OpenAI API error: {}", e))?;

        let choice = response.choices.into_iter().next()
            .ok_or("Empty response from OpenAI")?;

        let message = choice.message;
        let tool_calls = message.tool_calls
            .unwrap_or_default()
            .iter()
            .map(Self::parse_tool_call)
            .collect::<Result<Vec<_>, _>>()?;

        if tool_calls.is_empty() && message.content.is_none() {
            return Err("No content or tool calls in OpenAI response".to_string());
        }

        Ok(ModelReply { content: message.content, tool_calls })
    }
}
