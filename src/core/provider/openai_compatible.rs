//! OpenAI-compatible chat-completions adapter (OpenAI, OpenRouter, LiteLLM).

use crate::core::cancel::CancelToken;
use crate::core::error::LudusError;
use crate::core::provider::{Metadata, Provider, ProviderInfo};
use crate::core::state::AgentDefinition;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

fn pricing(model: &str) -> Option<(f64, f64)> {
    match model {
        "gpt-4o-mini" => Some((0.15, 0.60)),
        _ => None,
    }
}

#[derive(Debug)]
pub struct OpenAiCompatibleProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::blocking::Client,
}

impl OpenAiCompatibleProvider {
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
            .map_err(|err| {
                LudusError::Provider(format!("build openai-compatible client: {}", err))
            })?;

        Ok(OpenAiCompatibleProvider {
            api_key: api_key.to_string(),
            model,
            base_url,
            client,
        })
    }

    fn chat_completion_call(
        &self,
        cancel: &CancelToken,
        system: &str,
        user: &str,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<(String, Usage, u64), LudusError> {
        if cancel.is_cancelled() {
            return Err(LudusError::Cancelled);
        }

        let start = Instant::now();
        let mut messages = Vec::with_capacity(2);
        if !system.trim().is_empty() {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: user.to_string(),
        });

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(|err| LudusError::Provider(format!("call openai-compatible API: {}", err)))?;

        let status = response.status();
        let out: ChatResponse = response.json().map_err(|err| {
            LudusError::Provider(format!("decode openai-compatible response: {}", err))
        })?;

        if status.as_u16() >= 300 {
            let detail = out
                .error
                .map(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("status {}", status.as_u16()));
            return Err(LudusError::Provider(format!(
                "openai-compatible API error: {}",
                detail
            )));
        }
        let text = out
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| {
                LudusError::Provider("openai-compatible response missing choices".to_string())
            })?;

        Ok((text, out.usage, start.elapsed().as_millis() as u64))
    }

    fn metadata_from_usage(&self, usage: &Usage, duration_ms: u64) -> Metadata {
        let tokens_used = if usage.total_tokens == 0 {
            usage.prompt_tokens + usage.completion_tokens
        } else {
            usage.total_tokens
        };
        let cost_usd = pricing(&self.model)
            .map(|(input, output)| {
                (usage.prompt_tokens as f64 * input + usage.completion_tokens as f64 * output)
                    / 1_000_000.0
            })
            .unwrap_or(0.0);

        Metadata {
            tokens_input: usage.prompt_tokens,
            tokens_output: usage.completion_tokens,
            tokens_used,
            duration_ms,
            cost_usd,
            tool_calls: vec![],
        }
    }
}

impl Provider for OpenAiCompatibleProvider {
    fn generate_agent(
        &self,
        cancel: &CancelToken,
        prompt: &str,
        _directives: &[String],
    ) -> Result<(AgentDefinition, Metadata), LudusError> {
        let (text, usage, duration_ms) = self.chat_completion_call(cancel, "", prompt, 4096, 1.0)?;
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
        let temperature = if agent.temperature == 0.0 {
            1.0
        } else {
            agent.temperature
        };
        let (text, usage, duration_ms) = self.chat_completion_call(
            cancel,
            &agent.system_prompt,
            input,
            max_tokens,
            temperature,
        )?;
        Ok((text, self.metadata_from_usage(&usage, duration_ms)))
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            provider: "openai-compatible".to_string(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Usage,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
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
        let provider = OpenAiCompatibleProvider::new("key", "", "").unwrap();
        let info = provider.info();
        assert_eq!(info.provider, "openai-compatible");
        assert_eq!(info.model, DEFAULT_MODEL);
        assert_eq!(info.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_metadata_total_tokens_fallback() {
        let provider = OpenAiCompatibleProvider::new("key", "other-model", "").unwrap();
        let meta = provider.metadata_from_usage(
            &Usage {
                prompt_tokens: 25,
                completion_tokens: 15,
                total_tokens: 0,
            },
            3,
        );
        assert_eq!(meta.tokens_used, 40);
        assert_eq!(meta.cost_usd, 0.0);
    }

    #[test]
    fn test_metadata_costs_known_model() {
        let provider = OpenAiCompatibleProvider::new("key", "gpt-4o-mini", "").unwrap();
        let meta = provider.metadata_from_usage(
            &Usage {
                prompt_tokens: 1_000_000,
                completion_tokens: 1_000_000,
                total_tokens: 2_000_000,
            },
            3,
        );
        assert!((meta.cost_usd - 0.75).abs() < 1e-9);
    }
}
