//! Indexed OpenAPI specification model.
//!
//! Parses a raw OpenAPI description (JSON or YAML) into a queryable index of
//! operations. Deliberately tolerant: no full schema validation is performed,
//! only the version and the minimal structure needed to extract operations
//! are checked, so semi-structured real-world specs still load.

use crate::error::{OpenApiLlmError, Result};
use serde_json::{Map, Value};
use tracing::debug;

/// Minimum supported OpenAPI major version.
pub const MIN_REQUIRED_OPENAPI_SPEC_VERSION: u64 = 3;

/// HTTP methods that are recognized as operations under a path item.
pub const VALID_HTTP_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Default base URL when a spec declares no servers at any level.
const DEFAULT_SERVER_URL: &str = "http://localhost";

/// An indexed view over an OpenAPI specification.
///
/// Built once at load time and read-only thereafter. Owned by the
/// [`ClientConfig`](crate::config::ClientConfig) that created it.
#[derive(Debug)]
pub struct OpenApiSpec {
    spec: Value,
    operations: Vec<Operation>,
}

/// One (path, HTTP method) entry of the specification.
#[derive(Debug, Clone)]
pub struct Operation {
    /// Unique operation id. Synthesized from path and method when the spec
    /// omits one, so lookup is always possible.
    pub operation_id: String,
    /// Path template with `{param}` placeholders.
    pub path: String,
    /// Lower-cased HTTP method.
    pub method: String,
    /// Explicit description, if any.
    pub description: Option<String>,
    /// Summary, used as description fallback.
    pub summary: Option<String>,
    /// Raw parameter objects, path-item-level parameters first, then
    /// operation-level, in document order.
    pub parameters: Vec<Map<String, Value>>,
    /// Raw `requestBody` object, if declared.
    pub request_body: Option<Map<String, Value>>,
    /// Security requirements: ordered list of scheme-name → scopes sets
    /// (OR of ANDs). Operation-level overrides the spec root level.
    pub security: Vec<Map<String, Value>>,
    servers: ServerScopes,
}

/// Server lists in scope for one operation, by precedence.
#[derive(Debug, Clone, Default)]
struct ServerScopes {
    operation: Vec<String>,
    path: Vec<String>,
    root: Vec<String>,
}

impl OpenApiSpec {
    /// Parse a specification from raw text, probing JSON first, then YAML.
    pub fn from_str(content: &str) -> Result<Self> {
        let raw: Value = match serde_json::from_str(content) {
            Ok(v) => v,
            Err(_) => serde_yaml::from_str(content)?,
        };
        Self::from_json_value(raw)
    }

    /// Index an already-decoded specification document.
    ///
    /// Fails when the declared `openapi` version is missing or below
    /// [`MIN_REQUIRED_OPENAPI_SPEC_VERSION`], or when `paths` is absent or
    /// not an object.
    pub fn from_json_value(spec: Value) -> Result<Self> {
        let version = spec
            .get("openapi")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                OpenApiLlmError::InvalidSpec(
                    "could not extract the 'openapi' version field".to_string(),
                )
            })?;
        let major: u64 = version
            .split('.')
            .next()
            .and_then(|m| m.parse().ok())
            .ok_or_else(|| {
                OpenApiLlmError::InvalidSpec(format!("malformed version '{version}'"))
            })?;
        if major < MIN_REQUIRED_OPENAPI_SPEC_VERSION {
            return Err(OpenApiLlmError::InvalidSpec(format!(
                "version {major} is unsupported, must be at least {MIN_REQUIRED_OPENAPI_SPEC_VERSION}"
            )));
        }

        let paths = spec
            .get("paths")
            .and_then(Value::as_object)
            .ok_or_else(|| {
                OpenApiLlmError::InvalidSpec("'paths' is missing or not an object".to_string())
            })?;

        let root_servers = server_urls(spec.get("servers"));
        let root_security = requirement_sets(spec.get("security"));

        let mut operations = Vec::new();
        for (path, path_item) in paths {
            let Some(path_item) = path_item.as_object() else {
                continue;
            };
            let path_servers = server_urls(path_item.get("servers"));
            let path_parameters: Vec<Map<String, Value>> = path_item
                .get("parameters")
                .and_then(Value::as_array)
                .map(|params| {
                    params
                        .iter()
                        .filter_map(Value::as_object)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();

            for (method, op_spec) in path_item {
                if !VALID_HTTP_METHODS.contains(&method.to_lowercase().as_str()) {
                    continue;
                }
                let Some(op_spec) = op_spec.as_object() else {
                    continue;
                };
                operations.push(Operation::from_spec(
                    path,
                    method,
                    op_spec,
                    &path_parameters,
                    ServerScopes {
                        operation: server_urls(op_spec.get("servers")),
                        path: path_servers.clone(),
                        root: root_servers.clone(),
                    },
                    &root_security,
                ));
            }
        }

        debug!("Indexed {} operations from OpenAPI spec", operations.len());
        Ok(Self { spec, operations })
    }

    /// All operations, in declaration order (path order, then method order
    /// within a path).
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Look up an operation by its (possibly synthesized) operationId.
    pub fn find_operation_by_id(&self, operation_id: &str) -> Result<&Operation> {
        self.operations
            .iter()
            .find(|op| op.operation_id == operation_id)
            .ok_or_else(|| OpenApiLlmError::OperationNotFound(operation_id.to_string()))
    }

    /// The `components.securitySchemes` registry, empty when absent.
    pub fn security_schemes(&self) -> Map<String, Value> {
        self.spec
            .get("components")
            .and_then(|c| c.get("securitySchemes"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }
}

impl Operation {
    fn from_spec(
        path: &str,
        method: &str,
        op_spec: &Map<String, Value>,
        path_parameters: &[Map<String, Value>],
        servers: ServerScopes,
        root_security: &[Map<String, Value>],
    ) -> Self {
        let operation_id = op_spec
            .get("operationId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| synthesize_operation_id(path, method));

        let mut parameters = path_parameters.to_vec();
        if let Some(own) = op_spec.get("parameters").and_then(Value::as_array) {
            parameters.extend(own.iter().filter_map(Value::as_object).cloned());
        }

        let security = match op_spec.get("security") {
            Some(sec) => requirement_sets(Some(sec)),
            None => root_security.to_vec(),
        };

        Self {
            operation_id,
            path: path.to_string(),
            method: method.to_lowercase(),
            description: string_field(op_spec, "description"),
            summary: string_field(op_spec, "summary"),
            parameters,
            request_body: op_spec
                .get("requestBody")
                .and_then(Value::as_object)
                .cloned(),
            security,
            servers,
        }
    }

    /// Parameters declared at the given location ("path", "query", "header").
    pub fn parameters_in<'a>(
        &'a self,
        location: &'a str,
    ) -> impl Iterator<Item = &'a Map<String, Value>> {
        self.parameters
            .iter()
            .filter(move |p| p.get("in").and_then(Value::as_str) == Some(location))
    }

    /// Effective tool description: explicit description, else summary.
    pub fn description_or_summary(&self) -> Option<&str> {
        self.description
            .as_deref()
            .or(self.summary.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Resolve the base URL for this operation.
    ///
    /// Precedence: operation-level servers, else path-level, else spec
    /// root-level, else `http://localhost`. `selector` indexes into
    /// whichever list is chosen; out of bounds is a validation error.
    pub fn resolve_server(&self, selector: usize) -> Result<String> {
        let chosen = [
            &self.servers.operation,
            &self.servers.path,
            &self.servers.root,
        ]
        .into_iter()
        .find(|list| !list.is_empty());

        match chosen {
            Some(list) => list.get(selector).cloned().ok_or_else(|| {
                OpenApiLlmError::Validation(format!(
                    "server index {selector} is out of bounds for operation '{}' ({} servers declared)",
                    self.operation_id,
                    list.len()
                ))
            }),
            None => Ok(DEFAULT_SERVER_URL.to_string()),
        }
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn server_urls(servers: Option<&Value>) -> Vec<String> {
    servers
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|s| s.get("url").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn requirement_sets(security: Option<&Value>) -> Vec<Map<String, Value>> {
    security
        .and_then(Value::as_array)
        .map(|reqs| {
            reqs.iter()
                .filter_map(Value::as_object)
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// Deterministic operation id for operations that declare none: the
/// lower-cased path with non-alphanumeric runs collapsed to `_`, suffixed
/// with the HTTP method.
fn synthesize_operation_id(path: &str, method: &str) -> String {
    let mut id = String::with_capacity(path.len());
    let mut pending_sep = false;
    for c in path.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !id.is_empty() {
                id.push('_');
            }
            pending_sep = false;
            id.push(c);
        } else {
            pending_sep = true;
        }
    }
    format!("{}_{}", id, method.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const EDGE_CASE_SPEC: &str = r#"
openapi: 3.0.0
info:
  title: Edge cases
  version: 1.0.0
paths:
  /missing_operation_id:
    get:
      summary: Operation without an id
      responses:
        '200':
          description: Success
  /servers_order/path:
    servers:
      - url: https://inpath.example.com
    get:
      operationId: servers_order_path
      summary: Path-level server
      responses:
        '200':
          description: Success
  /servers_order/operation:
    servers:
      - url: https://inpath.example.com
    get:
      operationId: servers_order_operation
      summary: Operation-level server
      servers:
        - url: https://inoperation.example.com
      responses:
        '200':
          description: Success
"#;

    #[test]
    fn synthesized_operation_ids_are_deterministic() {
        assert_eq!(
            synthesize_operation_id("/missing_operation_id", "get"),
            "missing_operation_id_get"
        );
        assert_eq!(
            synthesize_operation_id("/pets/{petId}", "GET"),
            "pets_petid_get"
        );
        // Distinct (path, method) pairs never collide.
        assert_ne!(
            synthesize_operation_id("/pets", "get"),
            synthesize_operation_id("/pets", "post")
        );
        assert_ne!(
            synthesize_operation_id("/pets", "get"),
            synthesize_operation_id("/pet", "get")
        );
    }

    #[test]
    fn missing_operation_id_is_synthesized() {
        let spec = OpenApiSpec::from_str(EDGE_CASE_SPEC).unwrap();
        let op = spec.find_operation_by_id("missing_operation_id_get").unwrap();
        assert_eq!(op.method, "get");
        assert_eq!(op.path, "/missing_operation_id");
    }

    #[test]
    fn server_precedence_operation_then_path_then_default() {
        let spec = OpenApiSpec::from_str(EDGE_CASE_SPEC).unwrap();

        let op = spec.find_operation_by_id("servers_order_operation").unwrap();
        assert_eq!(op.resolve_server(0).unwrap(), "https://inoperation.example.com");

        let op = spec.find_operation_by_id("servers_order_path").unwrap();
        assert_eq!(op.resolve_server(0).unwrap(), "https://inpath.example.com");

        let op = spec.find_operation_by_id("missing_operation_id_get").unwrap();
        assert_eq!(op.resolve_server(0).unwrap(), "http://localhost");
    }

    #[test]
    fn server_precedence_falls_back_to_root() {
        let spec = OpenApiSpec::from_json_value(json!({
            "openapi": "3.0.0",
            "servers": [{"url": "https://root.example.com"}],
            "paths": {
                "/things": {
                    "get": {"operationId": "listThings", "summary": "List"}
                }
            }
        }))
        .unwrap();
        let op = spec.find_operation_by_id("listThings").unwrap();
        assert_eq!(op.resolve_server(0).unwrap(), "https://root.example.com");
    }

    #[test]
    fn out_of_bounds_server_selector_fails() {
        let spec = OpenApiSpec::from_str(EDGE_CASE_SPEC).unwrap();
        let op = spec.find_operation_by_id("servers_order_path").unwrap();
        let err = op.resolve_server(3).unwrap_err();
        assert!(matches!(err, OpenApiLlmError::Validation(_)));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let err = OpenApiSpec::from_json_value(json!({
            "openapi": "2.0.0",
            "paths": {}
        }))
        .unwrap_err();
        assert!(matches!(err, OpenApiLlmError::InvalidSpec(_)));

        let err = OpenApiSpec::from_json_value(json!({"paths": {}})).unwrap_err();
        assert!(matches!(err, OpenApiLlmError::InvalidSpec(_)));
    }

    #[test]
    fn missing_paths_is_rejected() {
        let err =
            OpenApiSpec::from_json_value(json!({"openapi": "3.1.0"})).unwrap_err();
        assert!(matches!(err, OpenApiLlmError::InvalidSpec(_)));
    }

    #[test]
    fn path_level_parameters_are_merged_first() {
        let spec = OpenApiSpec::from_json_value(json!({
            "openapi": "3.0.0",
            "paths": {
                "/users/{id}": {
                    "parameters": [
                        {"name": "id", "in": "path", "required": true, "schema": {"type": "string"}}
                    ],
                    "get": {
                        "operationId": "getUser",
                        "summary": "Get a user",
                        "parameters": [
                            {"name": "verbose", "in": "query", "schema": {"type": "boolean"}}
                        ]
                    }
                }
            }
        }))
        .unwrap();
        let op = spec.find_operation_by_id("getUser").unwrap();
        assert_eq!(op.parameters.len(), 2);
        assert_eq!(op.parameters_in("path").count(), 1);
        assert_eq!(op.parameters_in("query").count(), 1);
    }

    #[test]
    fn unknown_operation_id_is_not_found() {
        let spec = OpenApiSpec::from_str(EDGE_CASE_SPEC).unwrap();
        let err = spec.find_operation_by_id("nope").unwrap_err();
        assert!(matches!(err, OpenApiLlmError::OperationNotFound(_)));
    }
}
