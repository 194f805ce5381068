//! The tool catalog: an ordered, name-unique set of capabilities.

use serde_json::{Map, Value, json};

use crate::error::{CallError, Error, Result};
use crate::protocol::{CallToolResult, Tool};
use crate::schema;

/// Prefix the `echo` capability puts in front of its input.
pub const ECHO_PREFIX: &str = "Echo: ";

/// A synchronously executable tool.
///
/// Implementations receive arguments that already passed the descriptor's
/// input schema.
pub trait Capability: Send + Sync {
    /// The descriptor advertised through `tools/list`.
    fn descriptor(&self) -> Tool;

    /// Run the tool.
    fn call(&self, arguments: &Map<String, Value>) -> std::result::Result<CallToolResult, CallError>;
}

/// Returns its `message` argument with [`ECHO_PREFIX`] in front.
#[derive(Debug, Default)]
pub struct Echo;

impl Capability for Echo {
    fn descriptor(&self) -> Tool {
        Tool {
            name: "echo".to_string(),
            description: Some("Echo back the provided message".to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "message": {
                        "type": "string",
                        "description": "The message to echo back"
                    }
                },
                "required": ["message"]
            }),
        }
    }

    fn call(&self, arguments: &Map<String, Value>) -> std::result::Result<CallToolResult, CallError> {
        let message = arguments
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| CallError::InvalidArguments("missing required field `message`".into()))?;
        Ok(CallToolResult::text(format!("{ECHO_PREFIX}{message}")))
    }
}

struct Entry {
    descriptor: Tool,
    capability: Box<dyn Capability>,
}

/// Ordered set of capabilities with unique names. Fixed once serving starts.
#[derive(Default)]
pub struct Catalog {
    entries: Vec<Entry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog shipped with the host: just `echo`.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.entries.push(Entry {
            descriptor: Echo.descriptor(),
            capability: Box::new(Echo),
        });
        catalog
    }

    /// Add a capability at the end of the catalog.
    pub fn register(&mut self, capability: impl Capability + 'static) -> Result<()> {
        let descriptor = capability.descriptor();
        if self.entries.iter().any(|e| e.descriptor.name == descriptor.name) {
            return Err(Error::DuplicateTool(descriptor.name));
        }
        self.entries.push(Entry {
            descriptor,
            capability: Box::new(capability),
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All descriptors, in registration order.
    pub fn list(&self) -> Vec<Tool> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    /// Look up, validate and execute a tool. Absent arguments count as `{}`.
    pub fn call(
        &self,
        name: &str,
        arguments: Option<Value>,
    ) -> std::result::Result<CallToolResult, CallError> {
        let entry = self
            .entries
            .iter()
            .find(|e| e.descriptor.name == name)
            .ok_or_else(|| CallError::UnknownTool(name.to_string()))?;

        let arguments = arguments.unwrap_or_else(|| Value::Object(Map::new()));
        schema::validate(&entry.descriptor.input_schema, &arguments)
            .map_err(CallError::InvalidArguments)?;

        match arguments {
            Value::Object(map) => entry.capability.call(&map),
            // validate() only accepts objects
            _ => Err(CallError::InvalidArguments("expected an object".into())),
        }
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| &e.descriptor.name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl Capability for Upper {
        fn descriptor(&self) -> Tool {
            Tool {
                name: "upper".to_string(),
                description: None,
                input_schema: schema::empty_object_schema(),
            }
        }

        fn call(&self, _: &Map<String, Value>) -> std::result::Result<CallToolResult, CallError> {
            Ok(CallToolResult::text("OK"))
        }
    }

    #[test]
    fn echo_prefixes_message_verbatim() {
        let catalog = Catalog::builtin();
        for input in ["hello world", "", "  padded  ", "Echo: twice", "ünïcødé ✓"] {
            let result = catalog
                .call("echo", Some(json!({ "message": input })))
                .unwrap();
            assert_eq!(result.first_text(), Some(format!("Echo: {input}").as_str()));
        }
    }

    #[test]
    fn unknown_tool_names_the_request() {
        let catalog = Catalog::builtin();
        let err = catalog.call("reverse", Some(json!({}))).unwrap_err();
        assert_eq!(err, CallError::UnknownTool("reverse".into()));
        assert!(err.to_string().contains("reverse"));
    }

    #[test]
    fn echo_without_message_is_invalid() {
        let catalog = Catalog::builtin();
        let err = catalog.call("echo", Some(json!({}))).unwrap_err();
        assert!(matches!(err, CallError::InvalidArguments(_)));

        let err = catalog.call("echo", None).unwrap_err();
        assert!(matches!(err, CallError::InvalidArguments(_)));
    }

    #[test]
    fn echo_rejects_non_string_message() {
        let catalog = Catalog::builtin();
        let err = catalog
            .call("echo", Some(json!({ "message": 7 })))
            .unwrap_err();
        assert!(matches!(err, CallError::InvalidArguments(_)));
    }

    #[test]
    fn list_is_stable_and_ordered() {
        let mut catalog = Catalog::builtin();
        catalog.register(Upper).unwrap();

        let first = catalog.list();
        let second = catalog.list();
        assert_eq!(first, second);
        let names: Vec<_> = first.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["echo", "upper"]);
    }

    #[test]
    fn register_rejects_duplicate_names() {
        let mut catalog = Catalog::builtin();
        let err = catalog.register(Echo).unwrap_err();
        assert!(matches!(err, Error::DuplicateTool(name) if name == "echo"));
        assert_eq!(catalog.len(), 1);
    }
}
