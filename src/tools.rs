use std::collections::HashMap;
use std::sync::Arc;
use serde_json::Value;
use crate::error::AgentError;
use crate::types::ToolCall;

/// A tool function: takes JSON args, returns a JSON result or an error string.
/// Arc<dyn Fn> — shareable, Send + Sync for thread safety.
pub type ToolFn = Arc<dyn Fn(&HashMap<String, Value>) -> Result<Value, String> + Send + Sync>;

/// Tool schema for sending to the model (OpenAI / Gemini function format)
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolSchema {
    pub name:         String,
    pub description:  String,
    pub input_schema: Value,   // JSON Schema object
}

/// A tool as registered with the controller: name, schema, and implementation.
#[derive(Clone)]
pub struct ToolSpec {
    pub schema: ToolSchema,
    pub func:   ToolFn,
}

impl ToolSpec {
    /// # Arguments
    /// * `name`        - Unique tool name within a run
    /// * `description` - Clear description of what this tool does and when to use it
    /// * `schema`      - JSON Schema for the input parameters
    /// * `func`        - The actual implementation
    pub fn new(
        name:        impl Into<String>,
        description: impl Into<String>,
        schema:      Value,
        func:        ToolFn,
    ) -> Self {
        Self {
            schema: ToolSchema {
                name:         name.into(),
                description:  description.into(),
                input_schema: schema,
            },
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    /// Checks `args` against the declared schema.
    pub fn validate(&self, args: &HashMap<String, Value>) -> Result<(), String> {
        validate_args(&self.schema.input_schema, args)
    }
}

impl std::fmt::Debug for ToolSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSpec").field("schema", &self.schema).finish_non_exhaustive()
    }
}

/// Why a tool call did not produce a value.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    UnknownTool,
    InvalidArguments(String),
    /// The tool ran and reported a failure.
    Failed(String),
}

impl DispatchError {
    /// Converts to the controller's error taxonomy. Tool failures have no
    /// fatal counterpart and return `None`.
    pub fn into_agent_error(self, call: &ToolCall) -> Option<AgentError> {
        match self {
            DispatchError::UnknownTool => Some(AgentError::UnknownTool {
                tool:    call.name.clone(),
                call_id: call.id.clone(),
            }),
            DispatchError::InvalidArguments(reason) => Some(AgentError::InvalidArguments {
                tool:    call.name.clone(),
                call_id: call.id.clone(),
                reason,
            }),
            DispatchError::Failed(_) => None,
        }
    }

    /// Error text recorded in the transcript for the model to read.
    pub fn describe(&self, call: &ToolCall) -> String {
        match self {
            DispatchError::UnknownTool => format!("Tool '{}' not found in registry", call.name),
            DispatchError::InvalidArguments(reason) => {
                format!("Invalid arguments for tool '{}': {}", call.name, reason)
            }
            DispatchError::Failed(message) => message.clone(),
        }
    }
}

/// The immutable set of tools available during one run.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolSpec>,
    /// Registration order, so schemas reach the model deterministically.
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names are unique within a run.
    pub fn register(&mut self, spec: ToolSpec) -> Result<(), AgentError> {
        let name = spec.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(AgentError::BuildError(format!("Tool '{}' registered twice", name)));
        }
        self.order.push(name.clone());
        self.tools.insert(name, spec);
        Ok(())
    }

    /// Resolve, validate, and execute one tool call.
    /// Lookup, validation, and `Err` returns from the tool become
    /// `DispatchError`; a panicking tool function is not caught.
    pub fn dispatch(&self, call: &ToolCall) -> Result<Value, DispatchError> {
        let spec = self.tools.get(&call.name).ok_or(DispatchError::UnknownTool)?;
        spec.validate(&call.args).map_err(DispatchError::InvalidArguments)?;
        (spec.func)(&call.args).map_err(DispatchError::Failed)
    }

    /// Returns all tool schemas in registration order.
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.order.iter()
            .filter_map(|name| self.tools.get(name))
            .map(|spec| spec.schema.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

// ── Argument validation ──────────────────────────────────
//
// Covers the JSON Schema subset tool declarations use in practice:
// top-level object, `required`, per-property `type`, and
// `additionalProperties: false`.

fn validate_args(schema: &Value, args: &HashMap<String, Value>) -> Result<(), String> {
    let Some(schema) = schema.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(name) {
                return Err(format!("missing required argument '{}'", name));
            }
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));

    for (name, value) in args {
        match properties.and_then(|p| p.get(name)) {
            Some(prop) => {
                if let Some(expected) = prop.get("type") {
                    if !matches_type(expected, value) {
                        return Err(format!(
                            "argument '{}' should be {}, got {}",
                            name, expected, json_type_name(value)
                        ));
                    }
                }
            }
            None if closed => return Err(format!("unexpected argument '{}'", name)),
            None => {}
        }
    }

    Ok(())
}

fn matches_type(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(t) => matches_type_name(t, value),
        Value::Array(types) => types.iter()
            .filter_map(Value::as_str)
            .any(|t| matches_type_name(t, value)),
        _ => true,
    }
}

fn matches_type_name(expected: &str, value: &Value) -> bool {
    match expected {
        "string"  => value.is_string(),
        "integer" => value.is_i64() || value.is_u64()
            || value.as_f64().is_some_and(|f| f.fract() == 0.0),
        "number"  => value.is_number(),
        "boolean" => value.is_boolean(),
        "object"  => value.is_object(),
        "array"   => value.is_array(),
        "null"    => value.is_null(),
        _         => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null      => "null",
        Value::Bool(_)   => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_)  => "array",
        Value::Object(_) => "object",
    }
}
