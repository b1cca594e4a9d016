//! Execution-metadata capture and cost normalization.
//!
//! The core bakes a pricing table for anthropic-class models. When the
//! execution is tagged `anthropic` and the model is listed, the computed
//! cost overrides whatever the provider reported; every other provider tag
//! passes the reported cost through verbatim.

use crate::core::provider::Metadata;
use crate::core::state::{ExecutionMetadata, ToolCall};

/// Per-million-token pricing for anthropic models (2026 rates).
fn anthropic_pricing(model: &str) -> Option<(f64, f64)> {
    match model {
        "claude-sonnet-4-5" => Some((3.0, 15.0)),
        "claude-opus-4-6" => Some((15.0, 75.0)),
        "claude-haiku-4-5" => Some((0.80, 4.0)),
        _ => None,
    }
}

/// Normalized response payload used for metadata capture.
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub mode: String,
    pub provider: Option<String>,
    pub model: String,
    pub metadata: Metadata,
}

/// Extracts execution signals into state metadata fields.
pub fn capture_execution_metadata(response: ProviderResponse) -> ExecutionMetadata {
    let tokens_input = response.metadata.tokens_input;
    let mut tokens_output = response.metadata.tokens_output;
    if tokens_input == 0 && tokens_output == 0 && response.metadata.tokens_used > 0 {
        tokens_output = response.metadata.tokens_used;
    }

    ExecutionMetadata {
        mode: response.mode,
        provider: response.provider.clone(),
        executor: None,
        executor_command: None,
        tokens_input,
        tokens_output,
        duration_ms: response.metadata.duration_ms,
        cost_usd: calculate_execution_cost(
            response.provider.as_deref(),
            &response.model,
            tokens_input,
            tokens_output,
            response.metadata.cost_usd,
        ),
        tool_calls: to_state_tool_calls(&response.metadata.tool_calls),
    }
}

fn calculate_execution_cost(
    provider: Option<&str>,
    model: &str,
    tokens_input: u64,
    tokens_output: u64,
    fallback: f64,
) -> f64 {
    let provider = match provider {
        Some(name) => name.trim(),
        None => return fallback,
    };
    if provider != "anthropic" {
        return fallback;
    }

    match anthropic_pricing(model.trim()) {
        Some((input_rate, output_rate)) => {
            (tokens_input as f64 * input_rate + tokens_output as f64 * output_rate) / 1_000_000.0
        }
        None => fallback,
    }
}

fn to_state_tool_calls(tool_calls: &[crate::core::provider::ToolCall]) -> Vec<ToolCall> {
    tool_calls
        .iter()
        .map(|call| ToolCall {
            name: call.name.clone(),
            input: call.input.clone(),
            output: call.output.clone(),
            duration_ms: call.duration_ms,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(provider: Option<&str>, model: &str, reported_cost: f64) -> ProviderResponse {
        ProviderResponse {
            mode: "api".into(),
            provider: provider.map(|p| p.to_string()),
            model: model.into(),
            metadata: Metadata {
                tokens_input: 1_000_000,
                tokens_output: 1_000_000,
                tokens_used: 2_000_000,
                duration_ms: 42,
                cost_usd: reported_cost,
                tool_calls: vec![],
            },
        }
    }

    #[test]
    fn test_anthropic_listed_model_overrides_reported_cost() {
        let meta = capture_execution_metadata(response(Some("anthropic"), "claude-opus-4-6", 0.01));
        assert!((meta.cost_usd - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_anthropic_unlisted_model_falls_back() {
        let meta = capture_execution_metadata(response(Some("anthropic"), "claude-unknown", 0.01));
        assert!((meta.cost_usd - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_other_providers_pass_cost_through() {
        let meta =
            capture_execution_metadata(response(Some("openai-compatible"), "claude-opus-4-6", 0.25));
        assert!((meta.cost_usd - 0.25).abs() < 1e-12);

        let meta = capture_execution_metadata(response(None, "claude-opus-4-6", 0.5));
        assert!((meta.cost_usd - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_tokens_used_fallback_lands_on_output() {
        let mut resp = response(Some("anthropic"), "claude-haiku-4-5", 0.0);
        resp.metadata.tokens_input = 0;
        resp.metadata.tokens_output = 0;
        resp.metadata.tokens_used = 500;
        let meta = capture_execution_metadata(resp);
        assert_eq!(meta.tokens_input, 0);
        assert_eq!(meta.tokens_output, 500);
    }
}
