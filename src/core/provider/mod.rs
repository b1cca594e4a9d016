//! Provider capability: agent generation and execution across LLM vendors.
//!
//! The core consumes providers only through the [`Provider`] trait; vendor
//! transports are thin adapters behind it. Implementations are value types
//! held behind `Box<dyn Provider>`. The factory resolves a provider from
//! flags and environment credentials; `mock` is always available for
//! offline flows and tests.

mod anthropic;
mod mock;
mod openai_compatible;

pub use anthropic::AnthropicProvider;
pub use mock::MockProvider;
pub use openai_compatible::OpenAiCompatibleProvider;

use crate::core::cancel::CancelToken;
use crate::core::error::LudusError;
use crate::core::state::AgentDefinition;

/// Observability signals from one provider call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata {
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub tokens_used: u64,
    pub duration_ms: u64,
    pub cost_usd: f64,
    pub tool_calls: Vec<ToolCall>,
}

/// One provider-level tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub input: String,
    pub output: String,
    pub duration_ms: u64,
}

/// Identity of a provider instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderInfo {
    pub provider: String,
    pub model: String,
    pub base_url: String,
}

/// Generation and execution operations across LLM vendors.
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Generates an agent definition from a prompt.
    fn generate_agent(
        &self,
        cancel: &CancelToken,
        prompt: &str,
        directives: &[String],
    ) -> Result<(AgentDefinition, Metadata), LudusError>;

    /// Executes an agent definition on one input, yielding the output text.
    fn execute_agent(
        &self,
        cancel: &CancelToken,
        agent: &AgentDefinition,
        input: &str,
    ) -> Result<(String, Metadata), LudusError>;

    fn info(&self) -> ProviderInfo;
}

/// Provider selection from flags and environment.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub provider: String,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
}

/// Builds a provider adapter from config and environment credentials.
pub fn new_provider(cfg: &Config) -> Result<Box<dyn Provider>, LudusError> {
    match normalize_provider_name(&cfg.provider).as_str() {
        "anthropic" => {
            let key = first_non_empty(&[&cfg.api_key, &env_var("ANTHROPIC_API_KEY")]);
            if key.is_empty() {
                return Err(LudusError::Validation(
                    "missing anthropic credentials: set ANTHROPIC_API_KEY".to_string(),
                ));
            }
            Ok(Box::new(AnthropicProvider::new(
                &key,
                &cfg.model,
                &cfg.base_url,
            )?))
        }
        "openai-compatible" => {
            let key = first_non_empty(&[
                &cfg.api_key,
                &env_var("OPENAI_API_KEY"),
                &env_var("OPENAI_COMPATIBLE_API_KEY"),
                &env_var("API_KEY"),
            ]);
            if key.is_empty() {
                return Err(LudusError::Validation(
                    "missing openai-compatible credentials: set OPENAI_API_KEY or equivalent"
                        .to_string(),
                ));
            }
            Ok(Box::new(OpenAiCompatibleProvider::new(
                &key,
                &cfg.model,
                &cfg.base_url,
            )?))
        }
        "mock" => Ok(Box::new(MockProvider::new())),
        other => Err(LudusError::Validation(format!(
            "unsupported provider: {}",
            other
        ))),
    }
}

/// Canonicalizes provider names; empty defaults to `anthropic`.
pub fn normalize_provider_name(raw: &str) -> String {
    let name = raw.trim().to_lowercase();
    match name.as_str() {
        "" => "anthropic".to_string(),
        "openai" | "openai_compatible" | "openrouter" | "litellm" => {
            "openai-compatible".to_string()
        }
        _ => name,
    }
}

fn env_var(name: &str) -> String {
    std::env::var(name).unwrap_or_default()
}

fn first_non_empty(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| v.trim())
        .find(|v| !v.is_empty())
        .unwrap_or_default()
        .to_string()
}
