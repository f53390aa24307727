// SPDX-License-Identifier: MIT

use crate::mcp::error::{McpError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Trait for tools exposed to MCP clients.
///
/// Handlers only ever see arguments that already passed validation against
/// their `ToolDefinition`; the registry rejects everything else first.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the static definition (name, description, parameters)
    fn definition(&self) -> &ToolDefinition;

    /// Returns the tool name (must be unique within a registry)
    fn name(&self) -> &str {
        &self.definition().name
    }

    /// Execute the tool with validated arguments
    async fn execute(&self, args: ToolArgs) -> Result<Value>;
}

/// Primitive parameter types a tool may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Integer,
    Boolean,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: false,
            description: description.into(),
        }
    }

    /// Coerce a raw JSON argument into this parameter's type.
    ///
    /// Returns `Ok(None)` for values that count as absent (`null`, `""`).
    fn coerce(&self, raw: &Value) -> std::result::Result<Option<ArgValue>, String> {
        if raw.is_null() || raw.as_str().is_some_and(|s| s.trim().is_empty()) {
            return Ok(None);
        }

        let value = match (self.param_type, raw) {
            (ParamType::String, Value::String(s)) => Some(ArgValue::String(s.clone())),
            (ParamType::Integer, Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_u64().map(|_| i64::MAX))
                .map(ArgValue::Integer),
            (ParamType::Integer, Value::String(s)) => parse_integer(s).map(ArgValue::Integer),
            (ParamType::Boolean, Value::Bool(b)) => Some(ArgValue::Boolean(*b)),
            (ParamType::Boolean, Value::String(s)) => match s.trim() {
                "true" => Some(ArgValue::Boolean(true)),
                "false" => Some(ArgValue::Boolean(false)),
                _ => None,
            },
            _ => None,
        };

        value.map(Some).ok_or_else(|| {
            format!(
                "parameter '{}' must be of type {}, got {}",
                self.name, self.param_type, raw
            )
        })
    }
}

/// Decimal integer with optional sign; out-of-range values saturate
fn parse_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    let (negative, digits) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(raw.parse().unwrap_or(if negative { i64::MIN } else { i64::MAX }))
}

/// Name, description and ordered parameter list of a tool
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        params: Vec<ParamSpec>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params,
        }
    }

    /// JSON Schema for the tool's input parameters
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        for param in &self.params {
            properties.insert(
                param.name.clone(),
                json!({
                    "type": param.param_type.as_str(),
                    "description": param.description,
                }),
            );
        }

        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Entry in a `tools/list` response
    pub fn to_listing(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.input_schema(),
        })
    }

    /// Validate raw arguments against the declared parameters.
    ///
    /// Undeclared arguments are dropped.
    pub fn validate(&self, arguments: &Map<String, Value>) -> Result<ToolArgs> {
        let mut values = HashMap::new();

        for param in &self.params {
            let value = match arguments.get(&param.name) {
                Some(raw) => param
                    .coerce(raw)
                    .map_err(|msg| McpError::validation(&self.name, msg))?,
                None => None,
            };

            match value {
                Some(v) => {
                    values.insert(param.name.clone(), v);
                }
                None if param.required => {
                    return Err(McpError::validation(
                        &self.name,
                        format!("missing required parameter '{}'", param.name),
                    ));
                }
                None => {}
            }
        }

        for key in arguments.keys() {
            if !self.params.iter().any(|p| &p.name == key) {
                log::debug!("Ignoring undeclared argument '{}' for {}", key, self.name);
            }
        }

        Ok(ToolArgs {
            tool: self.name.clone(),
            values,
        })
    }
}

/// A validated argument value
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

/// Arguments that passed validation against a `ToolDefinition`
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    tool: String,
    values: HashMap<String, ArgValue>,
}

impl ToolArgs {
    pub fn tool(&self) -> &str {
        &self.tool
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ArgValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ArgValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ArgValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    /// A required string; validation guarantees presence, this guards misuse
    pub fn require_str(&self, name: &str) -> Result<&str> {
        self.str(name).ok_or_else(|| {
            McpError::validation(&self.tool, format!("missing required parameter '{}'", name))
        })
    }
}

/// One request to run a named tool, as carried by `tools/call`
#[derive(Debug, Clone, Deserialize)]
pub struct ToolInvocation {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// Outcome of one invocation; errors are data, never faults
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    Success(Value),
    Error { message: String },
}

impl ToolResult {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// The bare payload: backend JSON, or `{"error": message}`
    pub fn payload(&self) -> Value {
        match self {
            Self::Success(value) => value.clone(),
            Self::Error { message } => json!({ "error": message }),
        }
    }

    /// Body of a `tools/call` response
    pub fn into_call_result(self) -> Value {
        let is_error = self.is_error();
        json!({
            "content": [{
                "type": "text",
                "text": self.payload().to_string(),
            }],
            "isError": is_error,
        })
    }
}

impl From<Result<Value>> for ToolResult {
    fn from(result: Result<Value>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) => Self::error(e.to_string()),
        }
    }
}
