//! # OpenAPI ⇄ LLM tool-calling bridge
//!
//! Turns an OpenAPI description into LLM tool definitions and LLM tool-call
//! responses into authenticated HTTP requests against the real API.
//!
//! ## Features
//!
//! - Index OpenAPI v3+ specifications (JSON and YAML), tolerating
//!   semi-structured real-world specs
//! - Generate tool definitions for OpenAI, Anthropic, and Cohere tool
//!   calling, normalized to their shared naming constraints
//! - Extract `{name, arguments}` tool-call payloads from arbitrarily shaped
//!   provider responses
//! - Synthesize requests with path/query/header binding, JSON bodies, and
//!   apiKey/bearer authentication
//! - Blocking and async invocation modes
//!
//! ## Example
//!
//! ```no_run
//! use openapi_llm::{ClientConfig, OpenApiClient, OpenApiSpec};
//! use serde_json::json;
//!
//! # fn main() -> openapi_llm::Result<()> {
//! let spec = OpenApiSpec::from_str(include_str!("../tests/fixtures/petstore.yml"))?;
//! let client = OpenApiClient::new(ClientConfig::new(spec).with_secret("my-api-key")?);
//!
//! // Hand these to the LLM provider.
//! let tools = client.tool_definitions()?;
//!
//! // Feed the provider's tool-call response back to invoke the API.
//! let llm_response = json!({"name": "getPetById", "arguments": {"petId": 1}});
//! let api_response = client.invoke(&llm_response)?;
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod config;
mod conversion;
mod error;
mod extractor;
mod provider;
mod request;
mod spec;

pub use auth::Credentials;
pub use client::{AsyncOpenApiClient, HttpSender, OpenApiClient, SendRequest};
pub use config::ClientConfig;
pub use conversion::{normalize_function_name, normalize_tool_definition, ConverterConfig};
pub use error::{OpenApiLlmError, Result};
pub use extractor::{extract_invocation, InvocationPayload};
pub use provider::LlmProvider;
pub use request::{build_request, Request, ServerSelection};
pub use spec::{OpenApiSpec, Operation};
