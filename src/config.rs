//! Client configuration.
//!
//! All wiring (spec, credentials, provider, conversion filters, server
//! selection) is explicit and passed at construction. There is no
//! process-wide default state.

use crate::auth::Credentials;
use crate::conversion::{normalize_tool_definition, ConverterConfig};
use crate::error::Result;
use crate::provider::LlmProvider;
use crate::request::ServerSelection;
use crate::spec::{OpenApiSpec, Operation};
use serde_json::Value;

/// Configuration for converting an OpenAPI spec to LLM tools and invoking
/// its operations. Owns the indexed spec exclusively.
pub struct ClientConfig {
    pub(crate) spec: OpenApiSpec,
    pub(crate) credentials: Option<Credentials>,
    pub(crate) provider: LlmProvider,
    pub(crate) converter_config: ConverterConfig,
    pub(crate) server: ServerSelection,
}

impl ClientConfig {
    /// Create a configuration for the given spec with defaults: no
    /// credentials, OpenAI provider, no operation filter, first applicable
    /// server.
    pub fn new(spec: OpenApiSpec) -> Self {
        Self {
            spec,
            credentials: None,
            provider: LlmProvider::default(),
            converter_config: ConverterConfig::default(),
            server: ServerSelection::default(),
        }
    }

    /// Set explicit credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Derive credentials from a bare secret by inspecting the spec's first
    /// declared security scheme.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Result<Self> {
        self.credentials = Some(Credentials::from_secret(&self.spec, secret)?);
        Ok(self)
    }

    /// Select the target LLM provider.
    pub fn with_provider(mut self, provider: LlmProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Only convert the operations with the given operationIds.
    pub fn with_allowed_operations<I, S>(mut self, operation_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: Vec<String> = operation_ids.into_iter().map(Into::into).collect();
        self.converter_config.filter = ConverterConfig::allowed_operations(ids).filter;
        self
    }

    /// Only convert operations the given predicate accepts.
    pub fn with_operations_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&Operation) -> bool + Send + Sync + 'static,
    {
        self.converter_config.filter = Some(Box::new(filter));
        self
    }

    /// Stop conversion after producing this many tool definitions.
    pub fn with_max_tools(mut self, max_tools: usize) -> Self {
        self.converter_config.max_tools = Some(max_tools);
        self
    }

    /// Override the base URL for every request, bypassing the spec's server
    /// lists.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.server = ServerSelection::BaseUrl(base_url.into());
        self
    }

    /// Select a server by index from the applicable server list (operation,
    /// else path, else root level).
    pub fn with_server_index(mut self, index: usize) -> Self {
        self.server = ServerSelection::Index(index);
        self
    }

    /// The indexed specification.
    pub fn spec(&self) -> &OpenApiSpec {
        &self.spec
    }

    /// Tool definitions for the configured provider, normalized to the
    /// cross-provider naming and length constraints.
    pub fn tool_definitions(&self) -> Result<Vec<Value>> {
        let tools = self.provider.convert(&self.spec, &self.converter_config)?;
        Ok(tools.iter().map(normalize_tool_definition).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPEC: &str = r#"
openapi: 3.0.0
info:
  title: Crawler API
  version: 1.0.0
paths:
  /scrape:
    post:
      operationId: scrape
      summary: Scrape a single URL
      requestBody:
        content:
          application/json:
            schema:
              type: object
              properties:
                url:
                  type: string
              required: [url]
  /crawl:
    post:
      operationId: crawlUrls
      summary: Crawl a set of URLs
"#;

    #[test]
    fn allowed_operations_restricts_tool_definitions() {
        let spec = OpenApiSpec::from_str(SPEC).unwrap();
        let config = ClientConfig::new(spec).with_allowed_operations(["scrape"]);
        let tools = config.tool_definitions().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["function"]["name"], "scrape");
    }

    #[test]
    fn nonexistent_allowed_operations_yield_nothing() {
        let spec = OpenApiSpec::from_str(SPEC).unwrap();
        let config = ClientConfig::new(spec).with_allowed_operations(["ghost"]);
        assert!(config.tool_definitions().unwrap().is_empty());
    }

    #[test]
    fn definitions_are_normalized() {
        let spec = OpenApiSpec::from_json_value(serde_json::json!({
            "openapi": "3.0.0",
            "paths": {
                "/x": {
                    "get": {
                        "operationId": "odd name!with?chars",
                        "summary": "Odd",
                    }
                }
            }
        }))
        .unwrap();
        let config = ClientConfig::new(spec);
        let tools = config.tool_definitions().unwrap();
        assert_eq!(tools[0]["function"]["name"], "odd_name_with_chars");
    }
}
