//! OpenAPI operation to LLM tool-definition conversion.
//!
//! All JSON-schema-shaped providers (OpenAI, Anthropic) share one recursive
//! property walker and differ only in the envelope around the generated
//! schema. Cohere uses a separate named-type flavor.
//!
//! Also hosts tool-definition normalization: generated names and
//! descriptions are clamped to the constraints shared by all supported
//! providers (name `^[A-Za-z0-9_]+$`, max 64 chars; descriptions max 1024
//! chars at any nesting depth).

use crate::error::{OpenApiLlmError, Result};
use crate::spec::{OpenApiSpec, Operation};
use serde_json::{json, Map, Value};
use tracing::warn;

/// Maximum tool/function name length accepted by all supported providers.
const MAX_NAME_LENGTH: usize = 64;
/// Maximum description length accepted by all supported providers.
const MAX_DESCRIPTION_LENGTH: usize = 1024;

/// Controls which operations are converted and how many.
#[derive(Default)]
pub struct ConverterConfig {
    /// Predicate over operations; operations it rejects are skipped.
    pub filter: Option<Box<dyn Fn(&Operation) -> bool + Send + Sync>>,
    /// Stop converting once this many tools have been produced.
    pub max_tools: Option<usize>,
}

impl ConverterConfig {
    /// Restrict conversion to the given operation ids.
    pub fn allowed_operations(ids: Vec<String>) -> Self {
        Self {
            filter: Some(Box::new(move |op: &Operation| {
                ids.iter().any(|id| id == &op.operation_id)
            })),
            max_tools: None,
        }
    }
}

/// Convert a spec into OpenAI function-calling tool definitions:
/// `{type: "function", function: {name, description, parameters}}`.
pub fn openai_converter(spec: &OpenApiSpec, config: &ConverterConfig) -> Result<Vec<Value>> {
    let tools = openapi_to_tools(spec, config, |op| {
        convert_operation_to_json_schema(op, "parameters")
    })?;
    Ok(tools
        .into_iter()
        .map(|tool| json!({"type": "function", "function": tool}))
        .collect())
}

/// Convert a spec into Anthropic tool definitions:
/// `{name, description, input_schema}`.
pub fn anthropic_converter(spec: &OpenApiSpec, config: &ConverterConfig) -> Result<Vec<Value>> {
    openapi_to_tools(spec, config, |op| {
        convert_operation_to_json_schema(op, "input_schema")
    })
}

/// Convert a spec into Cohere tool definitions:
/// `{name, description, parameter_definitions}`.
pub fn cohere_converter(spec: &OpenApiSpec, config: &ConverterConfig) -> Result<Vec<Value>> {
    openapi_to_tools(spec, config, convert_operation_to_cohere_schema)
}

/// Shared conversion loop: declaration order, filter, early stop at
/// `max_tools`. A converter returning `Ok(None)` means the operation was
/// skipped (already logged); that never aborts the remaining conversions.
fn openapi_to_tools<F>(
    spec: &OpenApiSpec,
    config: &ConverterConfig,
    convert_operation: F,
) -> Result<Vec<Value>>
where
    F: Fn(&Operation) -> Result<Option<Value>>,
{
    let mut tools = Vec::new();
    for operation in spec.operations() {
        if let Some(filter) = &config.filter {
            if !filter(operation) {
                continue;
            }
        }
        if let Some(tool) = convert_operation(operation)? {
            tools.push(tool);
            if let Some(max) = config.max_tools {
                if tools.len() >= max {
                    break;
                }
            }
        }
    }
    Ok(tools)
}

/// Convert one operation to a JSON-schema-shaped tool definition, with the
/// generated schema placed under `parameters_field`.
///
/// Path/query/header parameters and the top-level properties of a JSON
/// request body are flattened into one parameter namespace; `required`
/// lists are unioned.
fn convert_operation_to_json_schema(
    operation: &Operation,
    parameters_field: &str,
) -> Result<Option<Value>> {
    let Some(description) = operation.description_or_summary() else {
        warn!(
            operation_id = %operation.operation_id,
            "operation has neither description nor summary, skipping tool definition"
        );
        return Ok(None);
    };

    let mut properties = Map::new();
    let mut required: Vec<Value> = Vec::new();

    if let Some(body_schema) = json_request_body_schema(operation) {
        if let Some(props) = body_schema.get("properties").and_then(Value::as_object) {
            for (prop_name, prop_schema) in props {
                properties.insert(prop_name.clone(), parse_property_attributes(prop_schema));
            }
            if let Some(body_required) = body_schema.get("required").and_then(Value::as_array) {
                required.extend(body_required.iter().cloned());
            }
        }
    }

    for param in &operation.parameters {
        let Some(param_schema) = param.get("schema") else {
            continue;
        };
        let Some(name) = param.get("name").and_then(Value::as_str) else {
            continue;
        };
        let mut prop = parse_property_attributes(param_schema);
        // description/pattern/enum may live on the parameter itself rather
        // than inside its schema; the parameter level wins.
        if let Some(prop_obj) = prop.as_object_mut() {
            for attr in ["description", "pattern", "enum"] {
                if let Some(value) = param.get(attr).filter(|v| !is_empty_attribute(v)) {
                    prop_obj.insert(attr.to_string(), value.clone());
                }
            }
        }
        properties.insert(name.to_string(), prop);
        if param.get("required").and_then(Value::as_bool).unwrap_or(false) {
            required.push(Value::String(name.to_string()));
        }
    }

    let mut schema = json!({"type": "object", "properties": properties});
    if !required.is_empty() {
        schema["required"] = Value::Array(required);
    }

    let mut tool = Map::new();
    tool.insert("name".to_string(), Value::String(operation.operation_id.clone()));
    tool.insert("description".to_string(), Value::String(description.to_string()));
    tool.insert(parameters_field.to_string(), schema);
    Ok(Some(Value::Object(tool)))
}

/// Recursively extract the subset of JSON-schema attributes the providers
/// understand: `type`, `description`, `pattern`, `enum`, and the recursive
/// `properties`/`required` (objects) and `items` (arrays) structure.
fn parse_property_attributes(property_schema: &Value) -> Value {
    let mut parsed = Map::new();
    let schema_type = property_schema.get("type").and_then(Value::as_str);
    if let Some(t) = schema_type {
        parsed.insert("type".to_string(), Value::String(t.to_string()));
    }
    for attr in ["description", "pattern", "enum"] {
        if let Some(value) = property_schema.get(attr) {
            parsed.insert(attr.to_string(), value.clone());
        }
    }
    match schema_type {
        Some("object") => {
            let properties: Map<String, Value> = property_schema
                .get("properties")
                .and_then(Value::as_object)
                .map(|props| {
                    props
                        .iter()
                        .map(|(name, schema)| (name.clone(), parse_property_attributes(schema)))
                        .collect()
                })
                .unwrap_or_default();
            parsed.insert("properties".to_string(), Value::Object(properties));
            if let Some(required) = property_schema.get("required") {
                parsed.insert("required".to_string(), required.clone());
            }
        }
        Some("array") => {
            let items = property_schema
                .get("items")
                .map(parse_property_attributes)
                .unwrap_or_else(|| Value::Object(Map::new()));
            parsed.insert("items".to_string(), items);
        }
        _ => {}
    }
    Value::Object(parsed)
}

/// Convert one operation to Cohere's named-type tool definition.
fn convert_operation_to_cohere_schema(operation: &Operation) -> Result<Option<Value>> {
    let Some(description) = operation.description_or_summary() else {
        warn!(
            operation_id = %operation.operation_id,
            "operation has neither description nor summary, skipping tool definition"
        );
        return Ok(None);
    };

    let mut parameter_definitions = Map::new();
    for param in &operation.parameters {
        let (Some(name), Some(schema)) = (
            param.get("name").and_then(Value::as_str),
            param.get("schema"),
        ) else {
            continue;
        };
        let required = param.get("required").and_then(Value::as_bool).unwrap_or(false);
        let description = param.get("description").and_then(Value::as_str).unwrap_or("");
        parameter_definitions.insert(
            name.to_string(),
            parse_cohere_schema(schema, required, description)?,
        );
    }

    if let Some(body_schema) = json_request_body_schema(operation) {
        let body_required: Vec<&str> = body_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if let Some(props) = body_schema.get("properties").and_then(Value::as_object) {
            for (name, schema) in props {
                let description = schema.get("description").and_then(Value::as_str).unwrap_or("");
                parameter_definitions.insert(
                    name.clone(),
                    parse_cohere_schema(schema, body_required.contains(&name.as_str()), description)?,
                );
            }
        }
    }

    Ok(Some(json!({
        "name": operation.operation_id,
        "description": description,
        "parameter_definitions": parameter_definitions,
    })))
}

fn parse_cohere_schema(schema: &Value, required: bool, description: &str) -> Result<Value> {
    let schema_type = cohere_type(schema)?;
    if schema_type == "object" {
        let mut nested = Map::new();
        let required_props: Vec<&str> = schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        if let Some(props) = schema.get("properties").and_then(Value::as_object) {
            for (name, prop_schema) in props {
                let prop_description = prop_schema
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                nested.insert(
                    name.clone(),
                    parse_cohere_schema(
                        prop_schema,
                        required_props.contains(&name.as_str()),
                        prop_description,
                    )?,
                );
            }
        }
        return Ok(json!({
            "type": schema_type,
            "description": description,
            "properties": nested,
            "required": required,
        }));
    }
    Ok(json!({
        "type": schema_type,
        "description": description,
        "required": required,
    }))
}

/// Map a JSON-schema type to Cohere's named-type flavor. Absent types
/// default to `object`; anything outside the mapping is a hard error.
fn cohere_type(schema: &Value) -> Result<&'static str> {
    let schema_type = schema.get("type").and_then(Value::as_str).unwrap_or("object");
    match schema_type {
        "integer" => Ok("int"),
        "string" => Ok("str"),
        "boolean" => Ok("bool"),
        "number" => Ok("float"),
        "object" => Ok("object"),
        "array" => Ok("list"),
        other => Err(OpenApiLlmError::Unsupported(format!(
            "schema type '{other}' has no Cohere named-type equivalent"
        ))),
    }
}

fn json_request_body_schema(operation: &Operation) -> Option<&Value> {
    operation
        .request_body
        .as_ref()?
        .get("content")?
        .get("application/json")?
        .get("schema")
}

fn is_empty_attribute(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

/// Clamp a generated tool definition to the naming and length constraints
/// shared by all supported providers.
///
/// Wherever a `name` key co-occurs with a `description` key in the same
/// object, the name is rewritten to match `^[A-Za-z0-9_]+$` and truncated to
/// 64 characters. Every `description` at any depth is truncated to 1024
/// characters. Idempotent.
pub fn normalize_tool_definition(definition: &Value) -> Value {
    match definition {
        Value::Object(map) => {
            let names_a_tool = map.contains_key("description");
            let normalized = map
                .iter()
                .map(|(key, value)| {
                    let value = match (key.as_str(), value) {
                        ("name", Value::String(name)) if names_a_tool => {
                            Value::String(normalize_function_name(name))
                        }
                        ("description", Value::String(text)) => {
                            Value::String(truncate_chars(text, MAX_DESCRIPTION_LENGTH))
                        }
                        _ => normalize_tool_definition(value),
                    };
                    (key.clone(), value)
                })
                .collect();
            Value::Object(normalized)
        }
        Value::Array(items) => {
            Value::Array(items.iter().map(normalize_tool_definition).collect())
        }
        other => other.clone(),
    }
}

/// Rewrite a function name to match `^[A-Za-z0-9_]+$`: runs of disallowed
/// characters collapse to a single `_`, the result is truncated to 64
/// characters, and leading/trailing `_` are stripped. Trimming happens
/// after truncation so a cut landing on `_` cannot change the result of a
/// second pass.
///
/// A name with no allowed characters at all normalizes to the empty
/// string; callers get to decide whether that is acceptable.
pub fn normalize_function_name(name: &str) -> String {
    let mut normalized = String::with_capacity(name.len());
    let mut last_was_replacement = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            normalized.push(c);
            last_was_replacement = false;
        } else if !last_was_replacement {
            normalized.push('_');
            last_was_replacement = true;
        }
    }
    normalized
        .chars()
        .take(MAX_NAME_LENGTH)
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::OpenApiSpec;

    fn pet_spec() -> OpenApiSpec {
        OpenApiSpec::from_json_value(serde_json::json!({
            "openapi": "3.0.0",
            "servers": [{"url": "https://petstore.example.com"}],
            "paths": {
                "/pets/{petId}": {
                    "get": {
                        "operationId": "getPetById",
                        "description": "Fetch a single pet by its id",
                        "parameters": [
                            {
                                "name": "petId",
                                "in": "path",
                                "required": true,
                                "description": "Id of the pet",
                                "schema": {"type": "integer"}
                            }
                        ]
                    }
                },
                "/pets": {
                    "post": {
                        "operationId": "createPet",
                        "summary": "Create a pet",
                        "requestBody": {
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "name": {"type": "string", "description": "Pet name"},
                                            "tags": {
                                                "type": "array",
                                                "items": {"type": "string"}
                                            }
                                        },
                                        "required": ["name"]
                                    }
                                }
                            }
                        }
                    },
                    "get": {
                        "operationId": "listPets"
                    }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn openai_envelope_and_schema() {
        let tools = openai_converter(&pet_spec(), &ConverterConfig::default()).unwrap();
        // listPets has no description or summary and is skipped.
        assert_eq!(tools.len(), 2);

        let tool = &tools[0];
        assert_eq!(tool["type"], "function");
        assert_eq!(tool["function"]["name"], "getPetById");
        let params = &tool["function"]["parameters"];
        assert_eq!(params["type"], "object");
        assert_eq!(params["properties"]["petId"]["type"], "integer");
        assert_eq!(params["properties"]["petId"]["description"], "Id of the pet");
        assert_eq!(params["required"][0], "petId");
    }

    #[test]
    fn anthropic_envelope_uses_input_schema() {
        let tools = anthropic_converter(&pet_spec(), &ConverterConfig::default()).unwrap();
        let tool = &tools[0];
        assert_eq!(tool["name"], "getPetById");
        assert!(tool.get("input_schema").is_some());
        assert!(tool.get("type").is_none());
    }

    #[test]
    fn request_body_properties_are_merged() {
        let tools = openai_converter(&pet_spec(), &ConverterConfig::default()).unwrap();
        let create = &tools[1]["function"];
        assert_eq!(create["name"], "createPet");
        let params = &create["parameters"];
        assert_eq!(params["properties"]["name"]["type"], "string");
        assert_eq!(params["properties"]["tags"]["items"]["type"], "string");
        assert_eq!(params["required"][0], "name");
    }

    #[test]
    fn operation_without_description_is_skipped_not_fatal() {
        let tools = openai_converter(&pet_spec(), &ConverterConfig::default()).unwrap();
        assert!(tools
            .iter()
            .all(|t| t["function"]["name"] != "listPets"));
    }

    #[test]
    fn filter_and_max_tools() {
        let config = ConverterConfig::allowed_operations(vec!["createPet".to_string()]);
        let tools = openai_converter(&pet_spec(), &config).unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["function"]["name"], "createPet");

        let config = ConverterConfig {
            filter: None,
            max_tools: Some(1),
        };
        let tools = openai_converter(&pet_spec(), &config).unwrap();
        assert_eq!(tools.len(), 1);
    }

    #[test]
    fn cohere_named_types() {
        let tools = cohere_converter(&pet_spec(), &ConverterConfig::default()).unwrap();
        let get_pet = &tools[0];
        assert_eq!(get_pet["name"], "getPetById");
        let defs = &get_pet["parameter_definitions"];
        assert_eq!(defs["petId"]["type"], "int");
        assert_eq!(defs["petId"]["required"], true);

        let create = &tools[1];
        assert_eq!(create["parameter_definitions"]["name"]["type"], "str");
        assert_eq!(create["parameter_definitions"]["tags"]["type"], "list");
    }

    #[test]
    fn cohere_unsupported_type_is_a_hard_error() {
        let spec = OpenApiSpec::from_json_value(serde_json::json!({
            "openapi": "3.0.0",
            "paths": {
                "/odd": {
                    "get": {
                        "operationId": "odd",
                        "summary": "Odd schema",
                        "parameters": [
                            {"name": "x", "in": "query", "schema": {"type": "null"}}
                        ]
                    }
                }
            }
        }))
        .unwrap();
        let err = cohere_converter(&spec, &ConverterConfig::default()).unwrap_err();
        assert!(matches!(err, OpenApiLlmError::Unsupported(_)));
    }

    #[test]
    fn nested_object_walker_copies_structure() {
        let parsed = parse_property_attributes(&serde_json::json!({
            "type": "object",
            "description": "outer",
            "properties": {
                "inner": {
                    "type": "object",
                    "properties": {"leaf": {"type": "string", "pattern": "^a+$"}},
                    "required": ["leaf"]
                }
            },
            "required": ["inner"]
        }));
        assert_eq!(parsed["properties"]["inner"]["properties"]["leaf"]["pattern"], "^a+$");
        assert_eq!(parsed["properties"]["inner"]["required"][0], "leaf");
        assert_eq!(parsed["required"][0], "inner");
    }

    #[test]
    fn normalize_function_name_pattern_and_length() {
        assert_eq!(normalize_function_name("get pets!by-id"), "get_pets_by_id");
        assert_eq!(normalize_function_name("__trimmed__"), "trimmed");
        let long = "a".repeat(100);
        assert_eq!(normalize_function_name(&long).len(), 64);
        assert!(normalize_function_name("weird🦀name")
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_'));
        // Mirrors the original behavior: nothing allowed leaves nothing.
        assert_eq!(normalize_function_name("???"), "");
    }

    #[test]
    fn normalize_function_name_is_idempotent_at_truncation_boundary() {
        // A 64-char truncation landing on '_' must not leave a trailing
        // '_' for a second pass to strip.
        let name = format!("{}_b", "a".repeat(63));
        let once = normalize_function_name(&name);
        let twice = normalize_function_name(&once);
        assert_eq!(once, twice);
        assert_eq!(once, "a".repeat(63));
    }

    #[test]
    fn normalize_tool_definition_truncates_nested_descriptions() {
        let long = "d".repeat(2000);
        let definition = serde_json::json!({
            "type": "function",
            "function": {
                "name": "my tool?",
                "description": long,
                "parameters": {
                    "type": "object",
                    "properties": {
                        "x": {"type": "string", "description": long}
                    }
                }
            }
        });
        let normalized = normalize_tool_definition(&definition);
        assert_eq!(normalized["function"]["name"], "my_tool");
        assert_eq!(
            normalized["function"]["description"].as_str().unwrap().len(),
            1024
        );
        assert_eq!(
            normalized["function"]["parameters"]["properties"]["x"]["description"]
                .as_str()
                .unwrap()
                .len(),
            1024
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let definition = serde_json::json!({
            "name": "spaced out name",
            "description": "fine",
            "input_schema": {"type": "object", "properties": {}}
        });
        let once = normalize_tool_definition(&definition);
        let twice = normalize_tool_definition(&once);
        assert_eq!(once, twice);

        // Name whose 64-char truncation lands on a '_'.
        let definition = serde_json::json!({
            "name": format!("{}_b", "a".repeat(63)),
            "description": "fine",
            "input_schema": {"type": "object", "properties": {}}
        });
        let once = normalize_tool_definition(&definition);
        let twice = normalize_tool_definition(&once);
        assert_eq!(once, twice);
        assert_eq!(once["name"], "a".repeat(63));
    }

    #[test]
    fn name_without_sibling_description_is_untouched() {
        let definition = serde_json::json!({
            "name": "not a tool name!",
            "other": 1
        });
        let normalized = normalize_tool_definition(&definition);
        assert_eq!(normalized["name"], "not a tool name!");
    }
}
