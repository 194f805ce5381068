//! Tool-related types and catalog translation.

use super::ToolError;
use crate::model::ToolSpec;
use mcp::{CallToolResult, Tool};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Validated tool arguments: always a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolArguments(pub Map<String, Value>);

impl ToolArguments {
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Value> for ToolArguments {
    type Error = ToolError;

    /// `null` means "no arguments"; anything but an object is rejected.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            Value::String(raw) => Err(ToolError::InvalidInput(format!(
                "arguments are not a JSON object: {raw}"
            ))),
            other => Err(ToolError::InvalidInput(format!(
                "arguments are not a JSON object: {other}"
            ))),
        }
    }
}

impl From<Tool> for ToolSpec {
    /// Missing descriptions become empty and a missing schema means "no
    /// arguments"; a present schema is passed through unchanged.
    fn from(tool: Tool) -> Self {
        let schema = if tool.input_schema.is_null() {
            mcp::schema::empty_object_schema()
        } else {
            tool.input_schema
        };
        Self {
            name: tool.name,
            description: tool.description.unwrap_or_default(),
            schema,
        }
    }
}

/// Translate a whole catalog, keeping its order.
pub fn tool_specs(tools: impl IntoIterator<Item = Tool>) -> Vec<ToolSpec> {
    tools.into_iter().map(ToolSpec::from).collect()
}

/// Flat text for a tool result: the first block's text, or the whole
/// result serialized when the first block is not text.
pub fn result_text(result: &CallToolResult) -> String {
    match result.first_text() {
        Some(text) => text.to_string(),
        None => serde_json::to_string(result).unwrap_or_default(),
    }
}
