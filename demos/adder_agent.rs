//! # Adder Agent
//!
//! Wires a Gemini model to the decide/act loop with a single `adder` tool
//! and prints the decision loop as it runs.
//!
//! # Usage
//! ```bash
//! GOOGLE_API_KEY=... cargo run --example adder_agent
//! RUST_LOG=debug GOOGLE_API_KEY=... cargo run --example adder_agent
//! ```
//! A `.env` file in the working directory is read as well.

use agentloop::{AgentBuilder, AgentConfig, AgentOutput, RetryingModel};
use agentloop::llm::GeminiModel;
use futures::StreamExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn integer_arg(args: &HashMap<String, Value>, name: &str) -> Result<i64, String> {
    let value = args.get(name).ok_or_else(|| format!("missing '{}'", name))?;
    if let Some(n) = value.as_i64() {
        return Ok(n);
    }
    // Gemini may send whole numbers as floats
    match value.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
        Some(_) => Err(format!("'{}' is not an integer in the i64 range", name)),
        None => Err(format!("'{}' is not an integer", name)),
    }
}

fn add(args: &HashMap<String, Value>) -> Result<Value, String> {
    let a = integer_arg(args, "a")?;
    let b = integer_arg(args, "b")?;
    println!("  (adder tool called with a={} b={})", a, b);
    let sum = a.checked_add(b).ok_or("sum overflows i64")?;
    Ok(json!(sum))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    if std::env::var("GOOGLE_API_KEY").is_err() {
        eprintln!("Can't find google API key");
        std::process::exit(1);
    }

    let gemini = GeminiModel::from_env().map_err(anyhow::Error::msg)?;
    let llm = Arc::new(RetryingModel::new(Arc::new(gemini), 3));
    let config = AgentConfig::from_env()?;

    let mut engine = AgentBuilder::new("What's 55 + 108")
        .llm(llm)
        .config(config)
        .tool(
            "adder",
            "Adds a and b.",
            json!({
                "type": "object",
                "properties": {
                    "a": { "type": "integer", "description": "first number" },
                    "b": { "type": "integer", "description": "second number" }
                },
                "required": ["a", "b"]
            }),
            Arc::new(add),
        )
        .build()?;

    println!("=== agentloop adder agent ===\n");
    let mut failed = false;
    {
        let mut events = engine.run_streaming();
        while let Some(event) = events.next().await {
            failed |= matches!(event, AgentOutput::Error(_));
            println!("{}", event);
        }
    }

    println!("\n--- transcript ---\n{}", engine.transcript().to_json());
    engine.trace().print();

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(a: Value, b: Value) -> HashMap<String, Value> {
        HashMap::from([("a".to_string(), a), ("b".to_string(), b)])
    }

    #[test]
    fn adds_whole_floats() {
        assert_eq!(add(&args(json!(55.0), json!(108))), Ok(json!(163)));
    }

    #[test]
    fn overflow_is_an_error() {
        assert!(add(&args(json!(i64::MAX), json!(1))).is_err());
    }

    #[test]
    fn out_of_range_float_is_rejected() {
        assert!(integer_arg(&args(json!(1e300), json!(1)), "a").is_err());
        assert!(integer_arg(&args(json!(1.5), json!(1)), "a").is_err());
    }
}
