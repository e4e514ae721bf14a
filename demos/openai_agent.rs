//! # OpenAI-compatible Agent
//!
//! Same adder loop against any chat-completions endpoint, using the
//! one-shot `run_agent` entry point.
//!
//! # Usage
//! ```bash
//! OPENAI_API_KEY=sk-... cargo run --example openai_agent
//! OPENAI_BASE_URL=https://generativelanguage.googleapis.com/v1beta/openai \
//!     OPENAI_API_KEY=$GOOGLE_API_KEY AGENTLOOP_MODEL=gemini-2.0-flash \
//!     cargo run --example openai_agent
//! ```

use agentloop::{AgentBuilder, AgentConfig, Message, ToolSpec};
use agentloop::llm::OpenAiModel;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let llm = match std::env::var("OPENAI_BASE_URL") {
        Ok(base) => OpenAiModel::with_base_url(base, std::env::var("OPENAI_API_KEY")?),
        Err(_)   => OpenAiModel::new(),
    };

    let mut config = AgentConfig::from_env()?;
    if std::env::var("AGENTLOOP_MODEL").is_err() {
        config.model = "gpt-4o-mini".to_string();
    }

    let adder = ToolSpec::new(
        "adder",
        "Adds a and b.",
        json!({
            "type": "object",
            "properties": { "a": { "type": "integer" }, "b": { "type": "integer" } },
            "required": ["a", "b"]
        }),
        Arc::new(|args: &HashMap<String, Value>| {
            let a = args["a"].as_i64().ok_or("a must be an integer")?;
            let b = args["b"].as_i64().ok_or("b must be an integer")?;
            let sum = a.checked_add(b).ok_or("sum overflows i64")?;
            Ok(json!(sum))
        }),
    );

    let engine = AgentBuilder::new("What's 55 + 108")
        .llm(Arc::new(llm))
        .config(config)
        .tool_spec(adder)
        .build()?;

    match engine.run_to_completion().await {
        Ok(transcript) => {
            for message in transcript.all() {
                match message {
                    Message::Human { content } => println!("human: {}", content),
                    Message::ModelReply(reply) => {
                        for call in &reply.tool_calls {
                            println!("model: {}({:?}) [{}]", call.name, call.args, call.id);
                        }
                        if let Some(text) = &reply.content {
                            println!("model: {}", text);
                        }
                    }
                    Message::ToolResult(result) => println!("tool[{}]: {}", result.call_id, result.content),
                }
            }
        }
        Err(failure) => {
            eprintln!("Agent failed: {} (after {} messages)", failure, failure.transcript.len());
            std::process::exit(1);
        }
    }

    Ok(())
}
