//! Agent definition generation.
//!
//! The generation prompt is a deterministic template over the stated need
//! and any directives; the provider fills in the system prompt. Defaults are
//! applied for model, temperature, and max tokens when the provider leaves
//! them unset.

use crate::core::cancel::CancelToken;
use crate::core::error::LudusError;
use crate::core::provider::Provider;
use crate::core::state::{AgentDefinition, GenerationMetadata};

pub const DEFAULT_AGENT_MODEL: &str = "claude-sonnet-4-5";
pub const DEFAULT_AGENT_TEMPERATURE: f64 = 1.0;
pub const DEFAULT_AGENT_MAX_TOKENS: u32 = 4096;

/// Builds the deterministic template used for agent generation.
pub fn build_generation_prompt(need: &str, directives: &[String]) -> String {
    let mut formatted_directives = "(none)".to_string();
    let lines: Vec<String> = directives
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .map(|d| format!("- {}", d))
        .collect();
    if !lines.is_empty() {
        formatted_directives = lines.join("\n");
    }

    format!(
        r#"You are a master AI agent trainer. Generate a high-quality system prompt for an AI agent.

User Need: {}

Directives (constraints/guidance):
{}

Output a JSON object with the following structure:
{{
  "system_prompt": "the complete system prompt for the agent",
  "reasoning": "brief explanation of your design choices"
}}

Focus on clarity, specificity, and task alignment. The agent will use Claude Sonnet 4.5."#,
        need.trim(),
        formatted_directives
    )
}

/// Generates an agent definition plus generation metadata.
pub fn generate_agent_definition(
    cancel: &CancelToken,
    need: &str,
    directives: &[String],
    provider: &dyn Provider,
) -> Result<(AgentDefinition, GenerationMetadata), LudusError> {
    if need.trim().is_empty() {
        return Err(LudusError::Validation("need is required".to_string()));
    }

    let prompt = build_generation_prompt(need, directives);
    let (generated, meta) = provider
        .generate_agent(cancel, &prompt, &[])
        .map_err(|err| match err {
            LudusError::Cancelled => LudusError::Cancelled,
            other => LudusError::Provider(format!("generate agent: {}", other)),
        })?;

    let system_prompt = generated.system_prompt.trim().to_string();
    if system_prompt.is_empty() {
        return Err(LudusError::Provider(
            "provider returned empty system prompt".to_string(),
        ));
    }

    let model = if generated.model.trim().is_empty() {
        DEFAULT_AGENT_MODEL.to_string()
    } else {
        generated.model.trim().to_string()
    };
    let temperature = if generated.temperature == 0.0 {
        DEFAULT_AGENT_TEMPERATURE
    } else {
        generated.temperature
    };
    let max_tokens = if generated.max_tokens == 0 {
        DEFAULT_AGENT_MAX_TOKENS
    } else {
        generated.max_tokens
    };

    let info = provider.info();
    let meta_model = if info.model.trim().is_empty() {
        model.clone()
    } else {
        info.model.trim().to_string()
    };
    let meta_provider = if info.provider.trim().is_empty() {
        "unknown".to_string()
    } else {
        info.provider.trim().to_string()
    };

    Ok((
        AgentDefinition {
            system_prompt,
            model,
            temperature,
            max_tokens,
            tools: vec![],
        },
        GenerationMetadata {
            provider: meta_provider,
            model: meta_model,
            tokens_used: meta.tokens_used,
            duration_ms: meta.duration_ms,
            cost_usd: meta.cost_usd,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provider::MockProvider;

    #[test]
    fn test_prompt_includes_need_and_directives() {
        let prompt =
            build_generation_prompt("  support agent ", &["be brief".into(), "  ".into()]);
        assert!(prompt.contains("User Need: support agent"));
        assert!(prompt.contains("- be brief"));
        assert!(!prompt.contains("(none)"));
    }

    #[test]
    fn test_prompt_without_directives_is_deterministic() {
        let a = build_generation_prompt("support agent", &[]);
        let b = build_generation_prompt("support agent", &[]);
        assert_eq!(a, b);
        assert!(a.contains("(none)"));
    }

    #[test]
    fn test_empty_need_is_rejected_before_provider_call() {
        let provider = MockProvider::new();
        let err = generate_agent_definition(&CancelToken::new(), "  ", &[], &provider).unwrap_err();
        assert!(matches!(err, LudusError::Validation(_)));
    }

    #[test]
    fn test_generation_applies_metadata() {
        let provider = MockProvider::new().with_generate(["Baseline v1"]);
        let (definition, meta) =
            generate_agent_definition(&CancelToken::new(), "support agent", &[], &provider)
                .unwrap();
        assert_eq!(definition.system_prompt, "Baseline v1");
        assert_eq!(meta.provider, "mock");
        assert_eq!(meta.tokens_used, 200);
        assert!(definition.max_tokens > 0);
        assert!(definition.temperature > 0.0);
    }
}
