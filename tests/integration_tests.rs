//! Integration tests for agentloop-rs.
//!
//! All tests use `MockModel` — no network calls are made.
//! Run with: `cargo test`

use agentloop::{
    run_agent, AgentBuilder, AgentEngine, AgentError, AgentOutput, ErrorPolicy,
    Message, ModelReply, State, ToolCall, ToolContent, ToolRegistry, ToolSpec,
};
use agentloop::llm::MockModel;
use futures::StreamExt;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ─────────────────────────────────────────────────────────────────────────────
// Test helpers
// ─────────────────────────────────────────────────────────────────────────────

fn adder_spec() -> ToolSpec {
    ToolSpec::new(
        "adder",
        "Adds two integers",
        json!({
            "type": "object",
            "properties": {
                "a": { "type": "integer" },
                "b": { "type": "integer" }
            },
            "required": ["a", "b"]
        }),
        Arc::new(|args: &HashMap<String, Value>| {
            let a = args["a"].as_i64().ok_or("a is not an integer")?;
            let b = args["b"].as_i64().ok_or("b is not an integer")?;
            let sum = a.checked_add(b).ok_or("sum overflows i64")?;
            Ok(json!(sum))
        }),
    )
}

fn adder_call(id: &str, a: i64, b: i64) -> ToolCall {
    ToolCall::new(id, "adder", HashMap::from([
        ("a".to_string(), json!(a)),
        ("b".to_string(), json!(b)),
    ]))
}

fn tool_reply(calls: Vec<ToolCall>) -> ModelReply {
    ModelReply::with_tool_calls(calls)
}

fn registry() -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    tools.register(adder_spec()).expect("adder registers");
    tools
}

fn engine_with(mock: Arc<MockModel>) -> AgentEngine {
    AgentBuilder::new("What's 55 + 108")
        .llm(mock)
        .tool_spec(adder_spec())
        .build()
        .expect("builder should succeed")
}

// ─────────────────────────────────────────────────────────────────────────────
// Adder scenario
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_adder_scenario_transcript() {
    let mock = Arc::new(MockModel::new(vec![
        tool_reply(vec![adder_call("call_1", 55, 108)]),
        ModelReply::text("163"),
    ]));

    let mut engine = engine_with(mock.clone());
    engine.run().await.expect("run should complete");

    assert_eq!(engine.current_state(), State::Done);
    let messages = engine.transcript().all();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[0], Message::human("What's 55 + 108"));
    assert_eq!(messages[1].as_model_reply().unwrap().tool_calls[0].name, "adder");

    let result = messages[2].as_tool_result().expect("third message is a tool result");
    assert_eq!(result.call_id, "call_1");
    assert_eq!(result.content, ToolContent::Structured(json!(163)));

    assert_eq!(messages[3], Message::ModelReply(ModelReply::text("163")));
    assert_eq!(mock.call_count(), 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Transcript length after N cycles
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_transcript_length_after_n_cycles() {
    for n in 0..5usize {
        let mut replies: Vec<ModelReply> = (0..n)
            .map(|i| tool_reply(vec![adder_call(&format!("call_{}", i), i as i64, 1)]))
            .collect();
        replies.push(ModelReply::text("done"));

        let transcript = run_agent(Arc::new(MockModel::new(replies)), registry(), "count", Some(5))
            .await
            .expect("run should complete within max_cycles");

        assert_eq!(transcript.len(), 1 + 2 * n + 1, "n = {}", n);
    }
}

#[tokio::test]
async fn test_immediate_answer_has_two_messages() {
    let mut engine = engine_with(Arc::new(MockModel::new(vec![ModelReply::text("hello")])));
    engine.run().await.expect("run should complete");

    assert_eq!(engine.transcript().len(), 2);
    assert_eq!(engine.current_state(), State::Done);
    assert_eq!(engine.cycles(), 0);
}

#[tokio::test]
async fn test_exactly_max_cycles_still_completes() {
    let mock = Arc::new(MockModel::new(vec![
        tool_reply(vec![adder_call("c1", 1, 1)]),
        tool_reply(vec![adder_call("c2", 2, 2)]),
        ModelReply::text("4"),
    ]));

    let mut engine = AgentBuilder::new("twice")
        .llm(mock)
        .tool_spec(adder_spec())
        .max_cycles(2)
        .build()
        .unwrap();

    engine.run().await.expect("two cycles fit in max_cycles = 2");
    assert_eq!(engine.cycles(), 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Call id correlation and ordering
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_results_follow_call_order_and_ids() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let seen = order.clone();

    let mock = Arc::new(MockModel::new(vec![
        tool_reply(vec![
            ToolCall::new("z-first", "record", HashMap::from([("tag".to_string(), json!("one"))])),
            ToolCall::new("a-second", "record", HashMap::from([("tag".to_string(), json!("two"))])),
            ToolCall::new("m-third", "record", HashMap::from([("tag".to_string(), json!("three"))])),
        ]),
        ModelReply::text("recorded"),
    ]));

    let mut engine = AgentBuilder::new("record three")
        .llm(mock.clone())
        .tool("record", "Records a tag", json!({}), Arc::new(move |args: &HashMap<String, Value>| {
            let tag = args["tag"].as_str().unwrap_or_default().to_string();
            seen.lock().unwrap().push(tag.clone());
            Ok(json!(tag))
        }))
        .build()
        .unwrap();

    engine.run().await.unwrap();

    assert_eq!(*order.lock().unwrap(), ["one", "two", "three"]);
    let ids: Vec<&str> = engine.transcript().all().iter()
        .filter_map(Message::as_tool_result)
        .map(|r| r.call_id.as_str())
        .collect();
    assert_eq!(ids, ["z-first", "a-second", "m-third"]);

    // The second Decide step saw the human message, the reply and all three results.
    assert_eq!(mock.transcript_len_for_call(1), Some(5));
}

// ─────────────────────────────────────────────────────────────────────────────
// Determinism
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_replay_yields_identical_transcript() {
    let script = || vec![
        tool_reply(vec![adder_call("call_1", 55, 108)]),
        tool_reply(vec![adder_call("call_2", 163, 1)]),
        ModelReply::text("164"),
    ];

    let first = run_agent(Arc::new(MockModel::new(script())), registry(), "What's 55 + 108 + 1", None)
        .await
        .unwrap();
    let second = run_agent(Arc::new(MockModel::new(script())), registry(), "What's 55 + 108 + 1", None)
        .await
        .unwrap();

    assert_eq!(first, second);
}

// ─────────────────────────────────────────────────────────────────────────────
// Cycle limit
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_cycle_limit_exceeded_returns_partial_transcript() {
    let replies: Vec<ModelReply> = (0..10)
        .map(|i| tool_reply(vec![adder_call(&format!("loop_{}", i), 1, 1)]))
        .collect();

    let failure = run_agent(Arc::new(MockModel::new(replies)), registry(), "loop forever", Some(3))
        .await
        .unwrap_err();

    assert!(matches!(failure.error, AgentError::CycleLimitExceeded(3)), "got {:?}", failure.error);
    // human + 3 × (reply, result) + the reply that broke the limit
    assert_eq!(failure.transcript.len(), 1 + 2 * 3 + 1);
    let last = failure.transcript.last().and_then(Message::as_model_reply).expect("ends with a reply");
    assert_eq!(last.tool_calls[0].id, "loop_3");
}

#[tokio::test]
async fn test_rerun_after_cycle_limit_leaves_transcript_unchanged() {
    let mock = Arc::new(MockModel::new(vec![
        tool_reply(vec![adder_call("c0", 1, 1)]),
        tool_reply(vec![adder_call("c1", 2, 2)]),
        ModelReply::text("done"),
    ]));

    let mut engine = AgentBuilder::new("loop")
        .llm(mock.clone())
        .tool_spec(adder_spec())
        .max_cycles(0)
        .build()
        .unwrap();

    assert!(matches!(engine.run().await, Err(AgentError::CycleLimitExceeded(0))));
    let len_after_failure = engine.transcript().len();

    assert!(matches!(engine.run().await, Err(AgentError::RunAborted(_))));
    assert_eq!(engine.transcript().len(), len_after_failure);
    assert_eq!(mock.call_count(), 1);

    let events: Vec<AgentOutput> = engine.run_streaming().collect().await;
    assert!(events.is_empty());
    assert_eq!(engine.transcript().len(), len_after_failure);
}

#[tokio::test]
async fn test_rerun_after_fail_policy_does_not_dispatch_again() {
    let mock = Arc::new(MockModel::new(vec![
        tool_reply(vec![adder_call("ok", 1, 2), ToolCall::new("bad", "multiplier", HashMap::new())]),
        ModelReply::text("unused"),
    ]));

    let mut engine = AgentBuilder::new("mixed")
        .llm(mock)
        .tool_spec(adder_spec())
        .on_unknown_tool(ErrorPolicy::Fail)
        .build()
        .unwrap();

    assert!(matches!(engine.run().await, Err(AgentError::UnknownTool { .. })));
    assert_eq!(engine.transcript().len(), 3);

    assert!(matches!(engine.run().await, Err(AgentError::RunAborted(_))));
    assert_eq!(engine.transcript().len(), 3);
}

#[tokio::test]
async fn test_overflowing_tool_result_is_reported_not_panicked() {
    let mock = Arc::new(MockModel::new(vec![
        tool_reply(vec![adder_call("big", i64::MAX, 1)]),
        ModelReply::text("too big"),
    ]));

    let mut engine = engine_with(mock);
    engine.run().await.expect("overflow is a recoverable tool failure");
    let result = engine.transcript().all()[2].as_tool_result().unwrap();
    assert_eq!(result.content, ToolContent::Error("sum overflows i64".to_string()));
}

#[tokio::test]
async fn test_zero_max_cycles_allows_direct_answer_only() {
    let ok = run_agent(Arc::new(MockModel::new(vec![ModelReply::text("fine")])), registry(), "hi", Some(0))
        .await;
    assert!(ok.is_ok());

    let err = run_agent(
        Arc::new(MockModel::new(vec![tool_reply(vec![adder_call("c", 1, 2)])])),
        registry(), "hi", Some(0),
    ).await.unwrap_err();
    assert!(matches!(err.error, AgentError::CycleLimitExceeded(0)));
    assert_eq!(err.transcript.len(), 2);
}

// ─────────────────────────────────────────────────────────────────────────────
// Recoverable and fatal dispatch errors
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unknown_tool_is_recovered_by_default() {
    let mock = Arc::new(MockModel::new(vec![
        tool_reply(vec![ToolCall::new("c1", "multiplier", HashMap::new())]),
        tool_reply(vec![adder_call("c2", 2, 3)]),
        ModelReply::text("5"),
    ]));

    let mut engine = engine_with(mock);
    engine.run().await.expect("unknown tool is not fatal by default");

    let result = engine.transcript().all()[2].as_tool_result().unwrap();
    assert_eq!(result.call_id, "c1");
    match &result.content {
        ToolContent::Error(msg) => assert!(msg.contains("not found"), "{}", msg),
        other => panic!("expected error payload, got {:?}", other),
    }
    assert_eq!(engine.trace().for_event("TOOL_FAILURE").len(), 1);
}

#[tokio::test]
async fn test_unknown_tool_fails_when_configured() {
    let mock = Arc::new(MockModel::new(vec![
        tool_reply(vec![ToolCall::new("c1", "multiplier", HashMap::new())]),
    ]));

    let mut engine = AgentBuilder::new("multiply")
        .llm(mock)
        .tool_spec(adder_spec())
        .on_unknown_tool(ErrorPolicy::Fail)
        .build()
        .unwrap();

    let err = engine.run().await.unwrap_err();
    match err {
        AgentError::UnknownTool { tool, call_id } => {
            assert_eq!(tool, "multiplier");
            assert_eq!(call_id, "c1");
        }
        other => panic!("expected UnknownTool, got {:?}", other),
    }
    // Transcript ends with the reply that named the unknown tool.
    assert_eq!(engine.transcript().len(), 2);
    assert_eq!(engine.current_state(), State::Acting);
}

#[tokio::test]
async fn test_invalid_arguments_recovered_then_fatal() {
    let bad_call = || ToolCall::new("bad", "adder", HashMap::from([("a".to_string(), json!("x"))]));

    let recovered = run_agent(
        Arc::new(MockModel::new(vec![tool_reply(vec![bad_call()]), ModelReply::text("sorry")])),
        registry(), "add", None,
    ).await.unwrap();
    assert!(recovered.all()[2].as_tool_result().unwrap().content.is_error());

    let mut engine = AgentBuilder::new("add")
        .llm(Arc::new(MockModel::new(vec![tool_reply(vec![bad_call()])])))
        .tool_spec(adder_spec())
        .on_invalid_arguments(ErrorPolicy::Fail)
        .build()
        .unwrap();
    assert!(matches!(engine.run().await, Err(AgentError::InvalidArguments { .. })));
}

#[tokio::test]
async fn test_tool_failure_is_reported_to_model() {
    let mock = Arc::new(MockModel::new(vec![
        tool_reply(vec![ToolCall::new("c1", "flaky", HashMap::new())]),
        ModelReply::text("the tool failed"),
    ]));

    let mut engine = AgentBuilder::new("try it")
        .llm(mock)
        .tool("flaky", "Always fails", json!({}), Arc::new(|_: &HashMap<String, Value>| {
            Err("disk full".to_string())
        }))
        .on_unknown_tool(ErrorPolicy::Fail)
        .on_invalid_arguments(ErrorPolicy::Fail)
        .build()
        .unwrap();

    engine.run().await.expect("tool failures never abort the run");
    let result = engine.transcript().all()[2].as_tool_result().unwrap();
    assert_eq!(result.content, ToolContent::Error("disk full".to_string()));
}

#[tokio::test]
async fn test_model_outage_is_fatal() {
    let mock = Arc::new(MockModel::from_results(vec![
        Ok(tool_reply(vec![adder_call("c1", 1, 2)])),
        Err("503 upstream unavailable".to_string()),
    ]));

    let failure = engine_with(mock).run_to_completion().await.unwrap_err();
    assert!(matches!(failure.error, AgentError::ModelUnavailable(_)));
    // human, reply, tool result — the failed Decide appended nothing
    assert_eq!(failure.transcript.len(), 3);
    assert!(failure.transcript.last().and_then(Message::as_tool_result).is_some());
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_builder_requires_llm() {
    let result = AgentBuilder::new("test no llm").build();
    match result.err() {
        Some(AgentError::BuildError(msg)) => assert!(msg.to_lowercase().contains("required"), "{}", msg),
        other => panic!("Expected BuildError, got: {:?}", other.map(|e| e.to_string())),
    }
}

#[test]
fn test_builder_rejects_duplicate_tools() {
    let result = AgentBuilder::new("dup")
        .llm(Arc::new(MockModel::new(vec![])))
        .tool_spec(adder_spec())
        .tool_spec(adder_spec())
        .build();
    assert!(matches!(result.err(), Some(AgentError::BuildError(_))));
}

// ─────────────────────────────────────────────────────────────────────────────
// Event stream and trace
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_streaming_emits_decision_loop() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mock = Arc::new(MockModel::new(vec![
        tool_reply(vec![adder_call("call_1", 55, 108)]),
        ModelReply::text("163"),
    ]));
    let mut engine = AgentBuilder::new("What's 55 + 108")
        .llm(mock)
        .tool("adder", "Adds", json!({}), Arc::new(move |args: &HashMap<String, Value>| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!(args["a"].as_i64().unwrap_or(0) + args["b"].as_i64().unwrap_or(0)))
        }))
        .build()
        .unwrap();

    let events: Vec<AgentOutput> = engine.run_streaming().collect().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let started: Vec<State> = events.iter().filter_map(|e| match e {
        AgentOutput::StateStarted(s) => Some(*s),
        _ => None,
    }).collect();
    assert_eq!(started, [State::Deciding, State::Acting, State::Deciding]);

    assert!(events.iter().any(|e| matches!(e,
        AgentOutput::ToolCallFinished { id, content: ToolContent::Structured(v), .. } if id == "call_1" && *v == json!(163)
    )));
    assert!(matches!(events.last(), Some(AgentOutput::FinalAnswer(Some(a))) if a == "163"));
    assert_eq!(engine.current_state(), State::Done);
}

#[tokio::test]
async fn test_streaming_ends_with_error_on_fatal_failure() {
    let mock = Arc::new(MockModel::new(vec![]));
    let mut engine = engine_with(mock);

    let events: Vec<AgentOutput> = engine.run_streaming().collect().await;
    assert!(matches!(events.last(), Some(AgentOutput::Error(e)) if e.contains("Model unavailable")));
}

#[tokio::test]
async fn test_trace_records_each_step() {
    let mock = Arc::new(MockModel::new(vec![
        tool_reply(vec![adder_call("call_1", 55, 108)]),
        ModelReply::text("163"),
    ]));
    let mut engine = engine_with(mock);
    engine.run().await.unwrap();

    let trace = engine.trace();
    assert_eq!(trace.for_state("Deciding").len(), 2);
    assert_eq!(trace.for_event("TOOL_EXECUTE").len(), 1);
    assert_eq!(trace.for_event("TOOL_SUCCESS").len(), 1);
    assert_eq!(trace.for_event("MODEL_FINAL_REPLY").len(), 1);
    assert!(trace.to_json().contains("TOOL_SUCCESS"));
}
