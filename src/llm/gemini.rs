use async_trait::async_trait;
use serde_json::{json, Value};
use crate::llm::ModelCaller;
use crate::tools::ToolSchema;
use crate::types::{Message, ModelReply, ToolCall, ToolContent};
use std::collections::HashMap;

// ── Gemini request types ─────────────────────────────────

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools:    Vec<GeminiToolDef>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiToolDef {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(serde::Serialize)]
struct FunctionDeclaration {
    name:        String,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters:  Option<Value>,
}

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
struct GeminiContent {
    #[serde(default)]
    role:  String,
    #[serde(default)]
    parts: Vec<Value>,   // text | functionCall | functionResponse
}

// ── Gemini response types ────────────────────────────────

#[derive(serde::Deserialize, Debug)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(serde::Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content:       Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(serde::Deserialize, Debug)]
struct FunctionCallPart {
    id:   Option<String>,
    name: String,
    #[serde(default)]
    args: HashMap<String, Value>,
}

// ── Caller ───────────────────────────────────────────────

/// Google Generative Language API (`models/{model}:generateContent`).
pub struct GeminiModel {
    client:   reqwest::Client,
    api_key:  String,
    api_base: String,
}

impl GeminiModel {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client:   reqwest::Client::new(),
            api_key:  api_key.into(),
            api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
        }
    }

    pub fn from_env() -> Result<Self, String> {
        let key = std::env::var("GOOGLE_API_KEY")
            .map_err(|_| "GOOGLE_API_KEY not set".to_string())?;
        Ok(Self::new(key))
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn build_tool_defs(tools: &[ToolSchema]) -> Vec<GeminiToolDef> {
        if tools.is_empty() {
            return Vec::new();
        }
        vec![GeminiToolDef {
            function_declarations: tools.iter().map(|s| FunctionDeclaration {
                name:        s.name.clone(),
                description: s.description.clone(),
                // Gemini rejects empty parameter objects
                parameters:  s.input_schema.get("properties")
                    .filter(|p| p.as_object().is_some_and(|o| !o.is_empty()))
                    .map(|_| strip_unsupported(&s.input_schema)),
            }).collect(),
        }]
    }

    /// Converts the transcript into Gemini `contents`. Consecutive tool
    /// results are grouped into one `user` turn of function responses.
    fn build_contents(messages: &[Message]) -> Vec<GeminiContent> {
        let mut contents: Vec<GeminiContent> = Vec::new();

        for message in messages {
            match message {
                Message::Human { content } => contents.push(GeminiContent {
                    role:  "user".to_string(),
                    parts: vec![json!({ "text": content })],
                }),
                Message::ModelReply(reply) => {
                    let mut parts = Vec::new();
                    if let Some(text) = reply.content.as_ref().filter(|t| !t.is_empty()) {
                        parts.push(json!({ "text": text }));
                    }
                    for call in &reply.tool_calls {
                        parts.push(json!({
                            "functionCall": { "id": call.id, "name": call.name, "args": call.args }
                        }));
                    }
                    contents.push(GeminiContent { role: "model".to_string(), parts });
                }
                Message::ToolResult(result) => {
                    let response = match &result.content {
                        ToolContent::Error(e) => json!({ "error": e }),
                        ToolContent::Text(t)  => json!({ "result": t }),
                        ToolContent::Structured(v) => json!({ "result": v }),
                    };
                    let part = json!({
                        "functionResponse": { "id": result.call_id, "name": result.name, "response": response }
                    });
                    let grouped = contents.last_mut().filter(|c| {
                        c.role == "user" && c.parts.iter().all(|p| p.get("functionResponse").is_some())
                    });
                    match grouped {
                        Some(turn) => turn.parts.push(part),
                        None => contents.push(GeminiContent { role: "user".to_string(), parts: vec![part] }),
                    }
                }
            }
        }

        contents
    }

    fn parse_reply(parsed: GenerateContentResponse) -> Result<ModelReply, String> {
        let candidate = parsed.candidates.into_iter().next()
            .ok_or("Gemini returned no candidates")?;
        let content = candidate.content.ok_or_else(|| format!(
            "Gemini candidate has no content (finish_reason={})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        ))?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for part in content.parts {
            if let Some(t) = part.get("text").and_then(Value::as_str) {
                text.push_str(t);
            } else if let Some(fc) = part.get("functionCall") {
                let fc: FunctionCallPart = serde_json::from_value(fc.clone())
                    .map_err(|e| format!("Invalid Gemini function call: {}", e))?;
                let id = fc.id.filter(|id| !id.is_empty()).unwrap_or_else(super::generate_call_id);
                tool_calls.push(ToolCall { id, name: fc.name, args: fc.args });
            }
        }

        if text.is_empty() && tool_calls.is_empty() {
            return Err("Gemini returned empty content".to_string());
        }

        Ok(ModelReply {
            content: if text.is_empty() { None } else { Some(text) },
            tool_calls,
        })
    }
}

/// Drops JSON Schema keywords the Gemini function schema does not accept.
fn strip_unsupported(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(map.iter()
            .filter(|(k, _)| !matches!(k.as_str(), "additionalProperties" | "$schema"))
            .map(|(k, v)| (k.clone(), strip_unsupported(v)))
            .collect()),
        Value::Array(items) => Value::Array(items.iter().map(strip_unsupported).collect()),
        other => other.clone(),
    }
}

#[async_trait]
impl ModelCaller for GeminiModel {
    async fn call(
        &self,
        messages: &[Message],
        tools:    &[ToolSchema],
        model:    &str,
    ) -> Result<ModelReply, String> {
        let body = GenerateContentRequest {
            contents: Self::build_contents(messages),
            tools:    Self::build_tool_defs(tools),
        };

        let response = self.client
            .post(format!("{}/models/{}:generateContent", self.api_base, model))
            .header("x-goog-api-key", &self.api_key)
            .header("content-type",   "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Network error: {}", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body   = response.text().await.unwrap_or_default();
            return Err(format!("Gemini API error {}: {}", status, body));
        }

        let parsed: GenerateContentResponse = response.json()
            .await
            .map_err(|e| format!("Failed to parse Gemini response: {}", e))?;

        Self::parse_reply(parsed)
    }
}
