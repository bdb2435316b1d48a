//! Supported LLM providers.
//!
//! Each provider pairs a schema converter with the field name its responses
//! use for tool-call arguments. New providers are new variants, not dynamic
//! dispatch.

use crate::conversion::{
    anthropic_converter, cohere_converter, openai_converter, ConverterConfig,
};
use crate::error::Result;
use crate::spec::OpenApiSpec;
use serde_json::Value;

/// The LLM provider a client converts tool definitions for and extracts
/// responses from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmProvider {
    /// OpenAI function calling (`{type: "function", function: {...}}`).
    #[default]
    OpenAi,
    /// Anthropic tool use (`{name, description, input_schema}`).
    Anthropic,
    /// Cohere tool use (`{name, description, parameter_definitions}`).
    Cohere,
}

impl LlmProvider {
    /// Convert every operation of the spec into this provider's tool shape.
    pub fn convert(&self, spec: &OpenApiSpec, config: &ConverterConfig) -> Result<Vec<Value>> {
        match self {
            Self::OpenAi => openai_converter(spec, config),
            Self::Anthropic => anthropic_converter(spec, config),
            Self::Cohere => cohere_converter(spec, config),
        }
    }

    /// The key under which this provider's responses carry tool-call
    /// arguments.
    pub fn arguments_field(&self) -> &'static str {
        match self {
            Self::OpenAi => "arguments",
            Self::Anthropic => "input",
            Self::Cohere => "parameters",
        }
    }
}
