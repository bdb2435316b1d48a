//! Blocking and async clients for invoking OpenAPI operations from LLM
//! tool-call payloads.
//!
//! Both clients run the same pipeline: extract the invocation payload from
//! the provider response, look the operation up in the spec, synthesize the
//! request, apply authentication, and hand the result to the transport. The
//! transport is the only suspension point; everything before it is pure
//! computation.

use crate::auth::apply_authentication;
use crate::config::ClientConfig;
use crate::error::{OpenApiLlmError, Result};
use crate::extractor::extract_invocation;
use crate::request::{build_request, Request};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

/// Fixed per-call transport timeout. No retries happen at this layer.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport seam: sends a synthesized request and returns the decoded
/// response body.
pub trait SendRequest: Send + Sync {
    fn send(&self, request: &Request) -> Result<Value>;
}

/// Default blocking transport backed by `reqwest`.
pub struct HttpSender {
    client: reqwest::blocking::Client,
}

impl Default for HttpSender {
    fn default() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }
}

impl SendRequest for HttpSender {
    fn send(&self, request: &Request) -> Result<Value> {
        let method = parse_method(&request.method)?;
        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(REQUEST_TIMEOUT)
            .query(&query_pairs(request));
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(cookies) = cookie_header(request) {
            builder = builder.header("Cookie", cookies);
        }
        if let Some(body) = &request.json {
            builder = builder.json(body);
        }

        let response = builder.send()?;
        let status = response.status();
        let bytes = response.bytes()?;
        decode_response(request, status, &bytes)
    }
}

/// Blocking client: each `invoke` performs lookup, synthesis, and the remote
/// call sequentially on the caller's thread.
pub struct OpenApiClient {
    config: ClientConfig,
    sender: Box<dyn SendRequest>,
}

impl OpenApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            sender: Box::new(HttpSender::default()),
        }
    }

    /// Replace the transport, e.g. with a test double.
    pub fn with_sender(mut self, sender: Box<dyn SendRequest>) -> Self {
        self.sender = sender;
        self
    }

    /// Tool definitions for the configured provider.
    pub fn tool_definitions(&self) -> Result<Vec<Value>> {
        self.config.tool_definitions()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Invoke the operation requested by an LLM tool-call response.
    pub fn invoke<T: Serialize>(&self, payload: &T) -> Result<Value> {
        let request = prepare_request(&self.config, payload)?;
        self.sender.send(&request)
    }
}

/// Async client: the same pipeline, with the network call awaited
/// cooperatively.
///
/// The underlying `reqwest::Client` connection pool may be shared: a pool
/// passed to [`setup`](Self::setup) stays owned by whoever created it and is
/// never released here. A pool this client creates lazily is its own and is
/// released exactly once, on [`cleanup`](Self::cleanup) or drop.
pub struct AsyncOpenApiClient {
    config: ClientConfig,
    http: Option<reqwest::Client>,
    owns_client: bool,
}

impl AsyncOpenApiClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http: None,
            owns_client: false,
        }
    }

    /// Tool definitions for the configured provider.
    pub fn tool_definitions(&self) -> Result<Vec<Value>> {
        self.config.tool_definitions()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Provide a shared connection pool, or none to have the client create
    /// and own one.
    pub fn setup(&mut self, client: Option<reqwest::Client>) {
        match client {
            Some(shared) => {
                self.http = Some(shared);
                self.owns_client = false;
            }
            None => {
                self.http = Some(reqwest::Client::new());
                self.owns_client = true;
            }
        }
    }

    /// Release the connection pool if this client created it. Shared pools
    /// are left untouched.
    pub fn cleanup(&mut self) {
        if self.owns_client {
            self.http = None;
            self.owns_client = false;
        }
    }

    /// Invoke the operation requested by an LLM tool-call response.
    pub async fn invoke<T: Serialize>(&mut self, payload: &T) -> Result<Value> {
        let request = prepare_request(&self.config, payload)?;

        if self.http.is_none() {
            self.owns_client = true;
        }
        let client = self.http.get_or_insert_with(reqwest::Client::new);

        let method = parse_method(&request.method)?;
        let mut builder = client
            .request(method, &request.url)
            .timeout(REQUEST_TIMEOUT)
            .query(&query_pairs(&request));
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(cookies) = cookie_header(&request) {
            builder = builder.header("Cookie", cookies);
        }
        if let Some(body) = &request.json {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        decode_response(&request, status, &bytes)
    }
}

/// Run the pure part of the pipeline: extraction, lookup, synthesis,
/// authentication.
fn prepare_request<T: Serialize>(config: &ClientConfig, payload: &T) -> Result<Request> {
    let arguments_field = config.provider.arguments_field();
    let invocation = extract_invocation(payload, arguments_field)?.ok_or_else(|| {
        OpenApiLlmError::Extraction(format!(
            "response contains no object with both 'name' and '{arguments_field}' keys; \
             the configured provider may not match the response shape"
        ))
    })?;

    debug!(
        operation = %invocation.name,
        "extracted tool invocation payload"
    );

    let operation = config.spec.find_operation_by_id(&invocation.name)?;
    let mut request = build_request(operation, &config.server, &invocation.arguments)?;
    apply_authentication(
        &config.spec,
        operation,
        config.credentials.as_ref(),
        &mut request,
    )?;
    Ok(request)
}

fn parse_method(method: &str) -> Result<reqwest::Method> {
    reqwest::Method::from_bytes(method.to_uppercase().as_bytes())
        .map_err(|_| OpenApiLlmError::Validation(format!("invalid HTTP method '{method}'")))
}

/// Query values are sent as their plain text rendering; strings keep their
/// content unquoted.
fn query_pairs(request: &Request) -> Vec<(String, String)> {
    request
        .params
        .iter()
        .map(|(name, value)| {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (name.clone(), rendered)
        })
        .collect()
}

fn cookie_header(request: &Request) -> Option<String> {
    if request.cookies.is_empty() {
        return None;
    }
    Some(
        request
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

fn decode_response(request: &Request, status: reqwest::StatusCode, bytes: &[u8]) -> Result<Value> {
    // Only 4xx/5xx are failures; 3xx responses reqwest does not follow
    // (e.g. 304 Not Modified) are handed back to the caller.
    if status.is_client_error() || status.is_server_error() {
        let body = String::from_utf8_lossy(bytes).to_string();
        warn!(
            status = status.as_u16(),
            url = %request.url,
            "API request failed"
        );
        return Err(OpenApiLlmError::ApiError {
            status: status.as_u16(),
            body,
        });
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(body) => Ok(body),
        Err(_) => Ok(json!({ "text": String::from_utf8_lossy(bytes).to_string() })),
    }
}
