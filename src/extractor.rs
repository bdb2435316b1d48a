//! Structural search for tool-call payloads in LLM responses.
//!
//! LLM providers wrap tool calls in response shapes that differ wildly and
//! change over time, so no fixed schema is assumed. The extractor serializes
//! the response into a JSON tree and searches it depth-first for an object
//! that carries both a `name` key and the provider-specific arguments key.

use crate::error::{OpenApiLlmError, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// The `{name, arguments}` pair an LLM emits to request a tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationPayload {
    /// The operationId of the operation to invoke.
    pub name: String,
    /// The arguments to bind to the operation's parameters.
    pub arguments: Map<String, Value>,
}

/// Extract a tool-call payload from an opaque LLM response.
///
/// The response may be a typed SDK struct, a raw JSON value, or any nesting
/// of maps and sequences around either; serialization to `Value` is the
/// canonical-conversion step that makes the search total. Returns `Ok(None)`
/// when no object anywhere in the tree carries both `name` and
/// `arguments_field` keys; that is an expected outcome, not an error. Fails
/// when a match is found but `name` is not a string, or the arguments are
/// neither an object nor a string parsing as a JSON object.
pub fn extract_invocation<T: Serialize>(
    response: &T,
    arguments_field: &str,
) -> Result<Option<InvocationPayload>> {
    let tree = serde_json::to_value(response)?;
    let Some(candidate) = search(&tree, arguments_field) else {
        return Ok(None);
    };

    let name = candidate
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            OpenApiLlmError::Extraction(format!(
                "'name' is not a string in tool call payload: {}",
                candidate.get("name").cloned().unwrap_or(Value::Null)
            ))
        })?
        .to_string();

    let arguments = match candidate.get(arguments_field) {
        Some(Value::Object(map)) => map.clone(),
        Some(Value::String(text)) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => map,
            _ => {
                return Err(OpenApiLlmError::Extraction(format!(
                    "'{arguments_field}' string does not parse as a JSON object: {text}"
                )))
            }
        },
        other => {
            return Err(OpenApiLlmError::Extraction(format!(
                "invalid '{arguments_field}' type for tool call, expected object or string, got {}",
                type_name(other)
            )))
        }
    };

    Ok(Some(InvocationPayload { name, arguments }))
}

/// Depth-first search for the first object containing both required keys.
/// Object values are visited in document order before array elements; the
/// first match wins.
fn search<'a>(tree: &'a Value, arguments_field: &str) -> Option<&'a Map<String, Value>> {
    match tree {
        Value::Object(map) => {
            if map.contains_key("name") && map.contains_key(arguments_field) {
                return Some(map);
            }
            map.values().find_map(|v| search(v, arguments_field))
        }
        Value::Array(items) => items.iter().find_map(|v| search(v, arguments_field)),
        // Primitives cannot contain a tool call.
        _ => None,
    }
}

fn type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "missing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "bool",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}
