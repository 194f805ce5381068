//! Shallow JSON Schema checks for tool arguments.
//!
//! Covers what tool input schemas use in practice: an object with named
//! `properties`, a `required` list, primitive `type` per property and an
//! optional `additionalProperties: false`. Nested schemas are not walked.

use serde_json::{Map, Value, json};

/// Schema used when a tool declares none: an object with no properties.
pub fn empty_object_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

/// Check `arguments` against `schema`, returning a human-readable reason on
/// the first violation.
pub fn validate(schema: &Value, arguments: &Value) -> Result<(), String> {
    let Value::Object(args) = arguments else {
        return Err(format!(
            "expected an object, got {}",
            type_name(arguments)
        ));
    };

    let Some(schema) = schema.as_object() else {
        return Ok(());
    };

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for field in required.iter().filter_map(Value::as_str) {
            if !args.contains_key(field) {
                return Err(format!("missing required field `{field}`"));
            }
        }
    }

    let empty = Map::new();
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    for (key, value) in args {
        match properties.get(key) {
            Some(property) => check_type(key, property, value)?,
            None if schema.get("additionalProperties") == Some(&Value::Bool(false)) => {
                return Err(format!("unexpected field `{key}`"));
            }
            None => {}
        }
    }

    Ok(())
}

fn check_type(key: &str, property: &Value, value: &Value) -> Result<(), String> {
    let Some(expected) = property.get("type") else {
        return Ok(());
    };

    // `type` may be a single name or a list of alternatives.
    let matches = match expected {
        Value::String(name) => type_matches(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| type_matches(name, value)),
        _ => true,
    };

    if matches {
        Ok(())
    } else {
        Err(format!(
            "field `{key}` should be {expected}, got {}",
            type_name(value)
        ))
    }
}

fn type_matches(name: &str, value: &Value) -> bool {
    match name {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_schema() -> Value {
        json!({
            "type": "object",
            "properties": { "message": { "type": "string" } },
            "required": ["message"]
        })
    }

    #[test]
    fn accepts_matching_arguments() {
        assert!(validate(&message_schema(), &json!({ "message": "hi" })).is_ok());
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = validate(&message_schema(), &json!({})).unwrap_err();
        assert_eq!(err, "missing required field `message`");
    }

    #[test]
    fn rejects_wrong_type() {
        let err = validate(&message_schema(), &json!({ "message": 42 })).unwrap_err();
        assert!(err.contains("`message`"), "{err}");
        assert!(err.contains("number"), "{err}");
    }

    #[test]
    fn rejects_non_object_arguments() {
        let err = validate(&message_schema(), &json!("hi")).unwrap_err();
        assert_eq!(err, "expected an object, got string");
    }

    #[test]
    fn additional_properties_false_rejects_unknown_keys() {
        let schema = json!({
            "type": "object",
            "properties": { "a": { "type": "integer" } },
            "additionalProperties": false
        });
        assert!(validate(&schema, &json!({ "a": 1 })).is_ok());
        assert!(validate(&schema, &json!({ "a": 1, "b": 2 })).is_err());
    }

    #[test]
    fn type_lists_accept_any_alternative() {
        let schema = json!({ "properties": { "n": { "type": ["integer", "null"] } } });
        assert!(validate(&schema, &json!({ "n": null })).is_ok());
        assert!(validate(&schema, &json!({ "n": 3 })).is_ok());
        assert!(validate(&schema, &json!({ "n": "3" })).is_err());
    }

    #[test]
    fn empty_schema_accepts_any_object() {
        assert!(validate(&empty_object_schema(), &json!({ "extra": true })).is_ok());
    }
}
