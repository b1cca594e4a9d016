//! Mutation operators over agent definitions.
//!
//! Each operator builds a fixed instruction string and asks the provider for
//! a rewritten system prompt. Model, temperature, max_tokens, and tools of
//! the input definition are always preserved; only the prompt text evolves.

use crate::core::cancel::CancelToken;
use crate::core::error::LudusError;
use crate::core::provider::Provider;
use crate::core::state::AgentDefinition;
use rand::Rng;
use serde::Deserialize;

pub const OP_REPHRASE: &str = "rephrase";
pub const OP_EXPAND: &str = "expand";
pub const OP_SIMPLIFY: &str = "simplify";
pub const OP_CROSSOVER: &str = "crossover";
pub const OP_TARGETED: &str = "targeted";

/// All available mutation operator names.
pub const ALL_OPERATORS: [&str; 5] = [OP_REPHRASE, OP_EXPAND, OP_SIMPLIFY, OP_CROSSOVER, OP_TARGETED];

/// Mutates an agent definition to produce a variant.
pub trait Operator {
    fn name(&self) -> &'static str;
    fn mutate(
        &self,
        cancel: &CancelToken,
        agent: &AgentDefinition,
        provider: &dyn Provider,
    ) -> Result<AgentDefinition, LudusError>;
}

/// Rewrites the prompt with different wording while preserving intent.
#[derive(Debug, Default)]
pub struct RephraseOp;

impl Operator for RephraseOp {
    fn name(&self) -> &'static str {
        OP_REPHRASE
    }

    fn mutate(
        &self,
        cancel: &CancelToken,
        agent: &AgentDefinition,
        provider: &dyn Provider,
    ) -> Result<AgentDefinition, LudusError> {
        mutate_with_prompt(
            cancel,
            agent,
            provider,
            &format!(
                r#"Rephrase this system prompt using different wording while preserving the exact same intent and instructions.
Keep the same level of detail. Change sentence structure, vocabulary, and phrasing.

Original prompt:
{}

Output JSON: {{"system_prompt": "the rephrased prompt"}}"#,
                agent.system_prompt
            ),
        )
    }
}

/// Adds more detail, examples, and edge cases to the prompt.
#[derive(Debug, Default)]
pub struct ExpandOp;

impl Operator for ExpandOp {
    fn name(&self) -> &'static str {
        OP_EXPAND
    }

    fn mutate(
        &self,
        cancel: &CancelToken,
        agent: &AgentDefinition,
        provider: &dyn Provider,
    ) -> Result<AgentDefinition, LudusError> {
        mutate_with_prompt(
            cancel,
            agent,
            provider,
            &format!(
                r#"Expand this system prompt by adding more detail, examples, and edge case handling.
Make it more thorough without changing the core instructions.

Original prompt:
{}

Output JSON: {{"system_prompt": "the expanded prompt"}}"#,
                agent.system_prompt
            ),
        )
    }
}

/// Makes the prompt shorter and more direct.
#[derive(Debug, Default)]
pub struct SimplifyOp;

impl Operator for SimplifyOp {
    fn name(&self) -> &'static str {
        OP_SIMPLIFY
    }

    fn mutate(
        &self,
        cancel: &CancelToken,
        agent: &AgentDefinition,
        provider: &dyn Provider,
    ) -> Result<AgentDefinition, LudusError> {
        mutate_with_prompt(
            cancel,
            agent,
            provider,
            &format!(
                r#"Simplify this system prompt. Remove redundancy, tighten wording, keep only essential instructions.
The result should be shorter but equally effective.

Original prompt:
{}

Output JSON: {{"system_prompt": "the simplified prompt"}}"#,
                agent.system_prompt
            ),
        )
    }
}

/// Combines elements from two prompts.
#[derive(Debug)]
pub struct CrossoverOp {
    pub partner: AgentDefinition,
}

impl Operator for CrossoverOp {
    fn name(&self) -> &'static str {
        OP_CROSSOVER
    }

    fn mutate(
        &self,
        cancel: &CancelToken,
        agent: &AgentDefinition,
        provider: &dyn Provider,
    ) -> Result<AgentDefinition, LudusError> {
        mutate_with_prompt(
            cancel,
            agent,
            provider,
            &format!(
                r#"Combine the best elements of these two system prompts into a single improved prompt.
Take the strongest instructions from each.

Prompt A:
{}

Prompt B:
{}

Output JSON: {{"system_prompt": "the combined prompt"}}"#,
                agent.system_prompt, self.partner.system_prompt
            ),
        )
    }
}

/// Applies a specific improvement directive.
#[derive(Debug)]
pub struct TargetedOp {
    pub directive: String,
}

impl Operator for TargetedOp {
    fn name(&self) -> &'static str {
        OP_TARGETED
    }

    fn mutate(
        &self,
        cancel: &CancelToken,
        agent: &AgentDefinition,
        provider: &dyn Provider,
    ) -> Result<AgentDefinition, LudusError> {
        mutate_with_prompt(
            cancel,
            agent,
            provider,
            &format!(
                r#"Improve this system prompt based on the following specific directive:
{}

Original prompt:
{}

Output JSON: {{"system_prompt": "the improved prompt"}}"#,
                self.directive, agent.system_prompt
            ),
        )
    }
}

/// Sends a mutation prompt to the provider and extracts the rewritten
/// system prompt, preserving the remaining definition fields.
fn mutate_with_prompt(
    cancel: &CancelToken,
    agent: &AgentDefinition,
    provider: &dyn Provider,
    prompt: &str,
) -> Result<AgentDefinition, LudusError> {
    let (generated, _) = provider
        .generate_agent(cancel, prompt, &[])
        .map_err(|err| match err {
            LudusError::Cancelled => LudusError::Cancelled,
            other => LudusError::Provider(format!("mutation failed: {}", other)),
        })?;

    let mut new_prompt = generated.system_prompt.trim().to_string();
    if new_prompt.is_empty() {
        // The provider may have answered with raw JSON instead of text.
        #[derive(Deserialize)]
        struct Parsed {
            #[serde(default)]
            system_prompt: String,
        }
        if let Ok(parsed) = serde_json::from_str::<Parsed>(&generated.system_prompt) {
            new_prompt = parsed.system_prompt;
        }
    }

    if new_prompt.is_empty() {
        return Err(LudusError::MutationEmpty);
    }

    Ok(AgentDefinition {
        system_prompt: new_prompt,
        model: agent.model.clone(),
        temperature: agent.temperature,
        max_tokens: agent.max_tokens,
        tools: agent.tools.clone(),
    })
}

/// Returns a uniformly random unparameterized operator (crossover and
/// targeted are excluded because they carry parameters).
pub fn random_operator(rng: &mut impl Rng) -> Box<dyn Operator> {
    match rng.gen_range(0..3) {
        0 => Box::new(RephraseOp),
        1 => Box::new(ExpandOp),
        _ => Box::new(SimplifyOp),
    }
}

/// Creates an unparameterized operator by name. Crossover and targeted
/// require their parameter and are constructed directly.
pub fn operator_by_name(name: &str) -> Result<Box<dyn Operator>, LudusError> {
    match name {
        OP_REPHRASE => Ok(Box::new(RephraseOp)),
        OP_EXPAND => Ok(Box::new(ExpandOp)),
        OP_SIMPLIFY => Ok(Box::new(SimplifyOp)),
        OP_CROSSOVER | OP_TARGETED => Err(LudusError::Validation(format!(
            "operator {:?} requires a parameter; construct it directly",
            name
        ))),
        other => Err(LudusError::Validation(format!(
            "unknown operator {:?}; choose from: {}",
            other,
            ALL_OPERATORS.join(", ")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provider::MockProvider;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn base_agent() -> AgentDefinition {
        AgentDefinition {
            system_prompt: "You are a support agent.".into(),
            model: "claude-sonnet-4-5".into(),
            temperature: 0.7,
            max_tokens: 2048,
            tools: vec![serde_json::json!({"name": "search"})],
        }
    }

    #[test]
    fn test_rephrase_preserves_parameters() {
        let provider = MockProvider::new().with_generate(["You are a helpdesk agent."]);
        let mutated = RephraseOp
            .mutate(&CancelToken::new(), &base_agent(), &provider)
            .unwrap();
        assert_eq!(mutated.system_prompt, "You are a helpdesk agent.");
        assert_eq!(mutated.model, "claude-sonnet-4-5");
        assert_eq!(mutated.temperature, 0.7);
        assert_eq!(mutated.max_tokens, 2048);
        assert_eq!(mutated.tools.len(), 1);
    }

    #[test]
    fn test_blank_output_without_json_is_empty_mutation() {
        let provider = MockProvider::new().with_generate(["   "]);
        let err = SimplifyOp
            .mutate(&CancelToken::new(), &base_agent(), &provider)
            .unwrap_err();
        assert!(matches!(err, LudusError::MutationEmpty));
    }

    #[test]
    fn test_empty_output_fails_mutation() {
        let provider = MockProvider::new().with_generate([""]);
        let err = ExpandOp
            .mutate(&CancelToken::new(), &base_agent(), &provider)
            .unwrap_err();
        assert!(matches!(err, LudusError::MutationEmpty));
    }

    #[test]
    fn test_crossover_includes_both_prompts() {
        let partner = AgentDefinition {
            system_prompt: "You escalate billing issues.".into(),
            ..base_agent()
        };
        let provider = MockProvider::new().with_generate(["Blended prompt"]);
        let mutated = CrossoverOp { partner }
            .mutate(&CancelToken::new(), &base_agent(), &provider)
            .unwrap();
        assert_eq!(mutated.system_prompt, "Blended prompt");
    }

    #[test]
    fn test_targeted_applies_directive() {
        let provider = MockProvider::new().with_generate(["Directed prompt"]);
        let op = TargetedOp {
            directive: "always cite the knowledge base".into(),
        };
        assert_eq!(op.name(), OP_TARGETED);
        let mutated = op
            .mutate(&CancelToken::new(), &base_agent(), &provider)
            .unwrap();
        assert_eq!(mutated.system_prompt, "Directed prompt");
    }

    #[test]
    fn test_random_operator_excludes_parameterized() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..32 {
            let op = random_operator(&mut rng);
            assert!(matches!(
                op.name(),
                OP_REPHRASE | OP_EXPAND | OP_SIMPLIFY
            ));
        }
    }

    #[test]
    fn test_random_operator_is_seed_deterministic() {
        let names_a: Vec<&str> = {
            let mut rng = StdRng::seed_from_u64(9);
            (0..8).map(|_| random_operator(&mut rng).name()).collect()
        };
        let names_b: Vec<&str> = {
            let mut rng = StdRng::seed_from_u64(9);
            (0..8).map(|_| random_operator(&mut rng).name()).collect()
        };
        assert_eq!(names_a, names_b);
    }

    #[test]
    fn test_operator_by_name() {
        assert_eq!(operator_by_name(OP_REPHRASE).unwrap().name(), OP_REPHRASE);
        assert!(operator_by_name(OP_CROSSOVER).is_err());
        assert!(operator_by_name("scramble").is_err());
    }
}
