//! HTTP request synthesis from an operation and extracted arguments.

use crate::error::{OpenApiLlmError, Result};
use crate::spec::Operation;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

/// How the base URL for a request is chosen.
#[derive(Debug, Clone)]
pub enum ServerSelection {
    /// Literal base URL, overriding whatever the spec declares.
    BaseUrl(String),
    /// Index into the operation's applicable server list (operation-level,
    /// else path-level, else root-level).
    Index(usize),
}

impl Default for ServerSelection {
    fn default() -> Self {
        Self::Index(0)
    }
}

/// The canonical request shape handed to the transport. Built fresh per
/// invocation, never reused.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub url: String,
    /// Lower-cased HTTP method.
    pub method: String,
    pub headers: HashMap<String, String>,
    /// Query parameters, kept as typed JSON values.
    pub params: Map<String, Value>,
    /// Cookies injected by apiKey-in-cookie authentication.
    pub cookies: HashMap<String, String>,
    /// JSON body, when the operation declares an application/json request body.
    pub json: Option<Value>,
}

/// Bind extracted arguments to an operation's path/header/query/body
/// parameters and resolve the final URL.
///
/// Arguments the operation does not declare are silently ignored, except
/// that when a JSON request body is declared they flow into it. A declared
/// non-JSON body is a capability gap and fails.
pub fn build_request(
    operation: &Operation,
    server: &ServerSelection,
    arguments: &Map<String, Value>,
) -> Result<Request> {
    let mut consumed: Vec<&str> = Vec::new();

    let mut path = operation.path.clone();
    for parameter in operation.parameters_in("path") {
        let name = parameter_name(parameter);
        match arguments.get(name) {
            Some(value) => {
                path = path.replace(&format!("{{{name}}}"), &stringify(value));
                consumed.push(name);
            }
            None => require_optional(operation, parameter, "path")?,
        }
    }

    let base_url = match server {
        ServerSelection::BaseUrl(url) => url.clone(),
        ServerSelection::Index(selector) => operation.resolve_server(*selector)?,
    };
    let url = format!("{base_url}{path}");

    let mut headers = HashMap::new();
    for parameter in operation.parameters_in("header") {
        let name = parameter_name(parameter);
        match arguments.get(name) {
            Some(value) => {
                headers.insert(name.to_string(), stringify(value));
                consumed.push(name);
            }
            None => require_optional(operation, parameter, "header")?,
        }
    }

    let mut params = Map::new();
    for parameter in operation.parameters_in("query") {
        let name = parameter_name(parameter);
        match arguments.get(name) {
            Some(value) => {
                params.insert(name.to_string(), value.clone());
                consumed.push(name);
            }
            None => require_optional(operation, parameter, "query")?,
        }
    }

    let json = match &operation.request_body {
        Some(request_body) => {
            let content = request_body
                .get("content")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            if content.contains_key("application/json") {
                let body: Map<String, Value> = arguments
                    .iter()
                    .filter(|(key, _)| !consumed.contains(&key.as_str()))
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();
                Some(Value::Object(body))
            } else {
                return Err(OpenApiLlmError::Unsupported(format!(
                    "operation '{}' declares a non-JSON request body (content types: {:?})",
                    operation.operation_id,
                    content.keys().collect::<Vec<_>>()
                )));
            }
        }
        None => None,
    };

    debug!(
        method = %operation.method,
        url = %url,
        "synthesized request for operation '{}'",
        operation.operation_id
    );

    Ok(Request {
        url,
        method: operation.method.clone(),
        headers,
        params,
        cookies: HashMap::new(),
        json,
    })
}

fn parameter_name(parameter: &Map<String, Value>) -> &str {
    parameter.get("name").and_then(Value::as_str).unwrap_or("")
}

fn require_optional(
    operation: &Operation,
    parameter: &Map<String, Value>,
    location: &str,
) -> Result<()> {
    if parameter
        .get("required")
        .and_then(Value::as_bool)
        .unwrap_or(false)
    {
        return Err(OpenApiLlmError::MissingParameter {
            operation_id: operation.operation_id.clone(),
            location: location.to_string(),
            name: parameter_name(parameter).to_string(),
        });
    }
    Ok(())
}

/// Path and header values are substituted as bare strings; everything else
/// keeps its JSON rendering.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
