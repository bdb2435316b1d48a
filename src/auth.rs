//! Authentication strategies for synthesized requests.
//!
//! Supported schemes are apiKey (header, query, or cookie) and HTTP bearer.
//! The strategy is picked once, from the credentials and the spec's declared
//! security schemes; at invocation time it is applied to the scheme the
//! operation's security requirements resolve to.

use crate::error::{OpenApiLlmError, Result};
use crate::request::Request;
use crate::spec::{OpenApiSpec, Operation};
use serde_json::Value;

/// Credentials configured by the caller. Absence of credentials makes
/// authentication a no-op, which is valid for public APIs.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// API key injected at the location the matched apiKey scheme declares.
    ApiKey(String),
    /// Token for `Authorization: Bearer <token>`.
    Bearer(String),
}

impl Credentials {
    /// Pick a credential variant for a bare secret string by inspecting the
    /// first security scheme the spec declares: apiKey schemes get an API
    /// key strategy, http schemes a bearer strategy.
    pub fn from_secret(spec: &OpenApiSpec, secret: impl Into<String>) -> Result<Self> {
        let secret = secret.into();
        let schemes = spec.security_schemes();
        let Some((_, scheme)) = schemes.iter().next() else {
            return Err(OpenApiLlmError::Auth(
                "spec declares no security schemes, cannot derive a strategy from a bare secret"
                    .to_string(),
            ));
        };
        match scheme.get("type").and_then(Value::as_str) {
            Some("apiKey") => Ok(Self::ApiKey(secret)),
            Some("http") => Ok(Self::Bearer(secret)),
            other => Err(OpenApiLlmError::Unsupported(format!(
                "authentication type {other:?} is not supported (apiKey and http only)"
            ))),
        }
    }
}

/// Apply authentication to a synthesized request per the operation's
/// security requirements.
///
/// Only the first requirement set is honored, and within it only the first
/// scheme name resolvable in the spec's scheme registry; AND-composition of
/// several schemes inside one requirement and OR-alternative sets are
/// intentionally not applied. Operations without security requirements, and
/// configurations without credentials, leave the request untouched.
pub fn apply_authentication(
    spec: &OpenApiSpec,
    operation: &Operation,
    credentials: Option<&Credentials>,
    request: &mut Request,
) -> Result<()> {
    let Some(credentials) = credentials else {
        return Ok(());
    };
    let Some(requirement) = operation.security.first() else {
        return Ok(());
    };

    let schemes = spec.security_schemes();
    let Some(scheme) = requirement
        .keys()
        .find_map(|scheme_name| schemes.get(scheme_name))
    else {
        return Ok(());
    };

    apply_scheme(credentials, scheme, request)
}

fn apply_scheme(credentials: &Credentials, scheme: &Value, request: &mut Request) -> Result<()> {
    match credentials {
        Credentials::ApiKey(key) => {
            let name = scheme
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    OpenApiLlmError::Auth("apiKey security scheme declares no name".to_string())
                })?;
            match scheme.get("in").and_then(Value::as_str) {
                Some("header") => {
                    request.headers.insert(name.to_string(), key.clone());
                }
                Some("query") => {
                    request
                        .params
                        .insert(name.to_string(), Value::String(key.clone()));
                }
                Some("cookie") => {
                    request.cookies.insert(name.to_string(), key.clone());
                }
                other => {
                    return Err(OpenApiLlmError::Unsupported(format!(
                        "apiKey location {other:?}, must be one of 'header', 'query', or 'cookie'"
                    )))
                }
            }
        }
        Credentials::Bearer(token) => {
            if scheme.get("type").and_then(Value::as_str) != Some("http") {
                return Err(OpenApiLlmError::Auth(
                    "bearer strategy received a non-HTTP security scheme".to_string(),
                ));
            }
            let sub_scheme = scheme.get("scheme").and_then(Value::as_str).unwrap_or("");
            if !sub_scheme.eq_ignore_ascii_case("bearer") {
                return Err(OpenApiLlmError::Unsupported(format!(
                    "HTTP authentication scheme '{sub_scheme}' (only 'bearer' is supported)"
                )));
            }
            if token.is_empty() {
                return Err(OpenApiLlmError::Auth(
                    "token must be provided for bearer authentication".to_string(),
                ));
            }
            request
                .headers
                .insert("Authorization".to_string(), format!("Bearer {token}"));
        }
    }
    Ok(())
}
