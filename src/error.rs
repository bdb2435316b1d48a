//! Error types for spec parsing, conversion, and invocation.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, OpenApiLlmError>;

/// Errors that can occur while parsing an OpenAPI spec, converting it to
/// tool definitions, or invoking an operation.
///
/// Malformed individual operations during conversion are not represented
/// here: they are logged and skipped so one bad operation does not abort the
/// whole conversion.
#[derive(Error, Debug)]
pub enum OpenApiLlmError {
    /// The specification is missing required structure or declares an
    /// unsupported version. Fatal at load time.
    #[error("Invalid OpenAPI spec: {0}")]
    InvalidSpec(String),

    /// No operation with the given operationId exists in the spec.
    #[error("No operation found with operationId '{0}'")]
    OperationNotFound(String),

    /// The payload extractor could not produce a usable `{name, arguments}`
    /// pair from the LLM response.
    #[error("Failed to extract invocation payload: {0}")]
    Extraction(String),

    /// A parameter the operation declares as required was absent from the
    /// extracted arguments.
    #[error("Missing required {location} parameter '{name}' for operation '{operation_id}'")]
    MissingParameter {
        operation_id: String,
        location: String,
        name: String,
    },

    /// Invalid request configuration, e.g. a server selector pointing past
    /// the end of the applicable server list.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A capability gap rather than a user mistake: non-JSON request body,
    /// non-bearer HTTP auth, unsupported apiKey location, unsupported
    /// schema type.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Authentication could not be applied with the configured credentials.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The HTTP request itself failed (connect, timeout, ...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote service answered with a non-success status. Always
    /// propagated, never retried.
    #[error("API request failed with status {status}: {body}")]
    ApiError { status: u16, body: String },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
