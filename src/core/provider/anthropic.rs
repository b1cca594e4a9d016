//! Anthropic Messages API adapter.

use crate::core::cancel::CancelToken;
use crate::core::error::LudusError;
use crate::core::provider::{Metadata, Provider, ProviderInfo};
use crate::core::state::AgentDefinition;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-sonnet-4-5";

/// Per-million-token pricing for models this adapter can cost directly.
fn pricing(model: &str) -> Option<(f64, f64)> {
    match model {
        "claude-sonnet-4-5" => Some((3.0, 15.0)),
        "claude-3-5-sonnet" => Some((3.0, 15.0)),
        _ => None,
    }
}

#[derive(Debug)]
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> Result<Self, LudusError> {
        let base_url = if base_url.trim().is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            base_url.trim_end_matches('/').to_string()
        };
        let model = if model.trim().is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            model.trim().to_string()
        };
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| LudusError::Provider(format!("build anthropic client: {}", err)))?;

        Ok(AnthropicProvider {
            api_key: api_key.to_string(),
            model,
            base_url,
            client,
        })
    }

    fn messages_call(
        &self,
        cancel: &CancelToken,
        system: &str,
        user: &str,
        max_tokens: u32,
    ) -> Result<(String, Usage, u64), LudusError> {
        if cancel.is_cancelled() {
            return Err(LudusError::Cancelled);
        }

        let start = Instant::now();
        let request = MessageRequest {
            model: self.model.clone(),
            max_tokens,
            system: if system.is_empty() {
                None
            } else {
                Some(system.to_string())
            },
            messages: vec![Message {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .map_err(|err| LudusError::Provider(format!("call anthropic API: {}", err)))?;

        let status = response.status();
        let out: MessageResponse = response
            .json()
            .map_err(|err| LudusError::Provider(format!("decode anthropic response: {}", err)))?;

        if status.as_u16() >= 300 {
            let detail = out
                .error
                .map(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("status {}", status.as_u16()));
            return Err(LudusError::Provider(format!(
                "anthropic API error: {}",
                detail
            )));
        }
        let text = out
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| {
                LudusError::Provider("anthropic response missing content".to_string())
            })?;

        Ok((text, out.usage, start.elapsed().as_millis() as u64))
    }

    fn metadata_from_usage(&self, usage: &Usage, duration_ms: u64) -> Metadata {
        let cost_usd = pricing(&self.model)
            .map(|(input, output)| {
                (usage.input_tokens as f64 * input + usage.output_tokens as f64 * output)
                    / 1_000_000.0
            })
            .unwrap_or(0.0);

        Metadata {
            tokens_input: usage.input_tokens,
            tokens_output: usage.output_tokens,
            tokens_used: usage.input_tokens + usage.output_tokens,
            duration_ms,
            cost_usd,
            tool_calls: vec![],
        }
    }
}

impl Provider for AnthropicProvider {
    fn generate_agent(
        &self,
        cancel: &CancelToken,
        prompt: &str,
        _directives: &[String],
    ) -> Result<(AgentDefinition, Metadata), LudusError> {
        let (text, usage, duration_ms) = self.messages_call(cancel, "", prompt, 4096)?;
        Ok((
            AgentDefinition {
                system_prompt: text.trim().to_string(),
                model: self.model.clone(),
                temperature: 1.0,
                max_tokens: 4096,
                tools: vec![],
            },
            self.metadata_from_usage(&usage, duration_ms),
        ))
    }

    fn execute_agent(
        &self,
        cancel: &CancelToken,
        agent: &AgentDefinition,
        input: &str,
    ) -> Result<(String, Metadata), LudusError> {
        let max_tokens = if agent.max_tokens == 0 {
            1024
        } else {
            agent.max_tokens
        };
        let (text, usage, duration_ms) =
            self.messages_call(cancel, &agent.system_prompt, input, max_tokens)?;
        Ok((text, self.metadata_from_usage(&usage, duration_ms)))
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            provider: "anthropic".to_string(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Usage,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[allow(dead_code)]
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let provider = AnthropicProvider::new("key", "", "").unwrap();
        let info = provider.info();
        assert_eq!(info.provider, "anthropic");
        assert_eq!(info.model, DEFAULT_MODEL);
        assert_eq!(info.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let provider = AnthropicProvider::new("key", "m", "http://localhost:9999/").unwrap();
        assert_eq!(provider.info().base_url, "http://localhost:9999");
    }

    #[test]
    fn test_metadata_costs_known_model() {
        let provider = AnthropicProvider::new("key", "claude-sonnet-4-5", "").unwrap();
        let usage = Usage {
            input_tokens: 1_000_000,
            output_tokens: 1_000_000,
        };
        let meta = provider.metadata_from_usage(&usage, 10);
        assert!((meta.cost_usd - 18.0).abs() < 1e-9);
        assert_eq!(meta.tokens_used, 2_000_000);
    }

    #[test]
    fn test_metadata_unknown_model_has_zero_cost() {
        let provider = AnthropicProvider::new("key", "claude-experimental", "").unwrap();
        let meta = provider.metadata_from_usage(
            &Usage {
                input_tokens: 10,
                output_tokens: 10,
            },
            1,
        );
        assert_eq!(meta.cost_usd, 0.0);
    }

    #[test]
    fn test_cancelled_call_short_circuits() {
        let provider = AnthropicProvider::new("key", "", "http://localhost:1").unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = provider
            .messages_call(&cancel, "", "hello", 16)
            .unwrap_err();
        assert!(matches!(err, LudusError::Cancelled));
    }
}
