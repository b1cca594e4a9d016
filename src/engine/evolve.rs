//! Evolution-prompt synthesis.
//!
//! A pure function of the lineage's agents, artifacts, and directives. Same
//! inputs always yield the same string, so tests can assert contents
//! byte-exactly apart from provider-supplied text.

use crate::core::state::{Agent, Artifact, Directive};
use std::collections::BTreeMap;

/// Synthesizes artifact evaluations and directives into the instruction used
/// to produce the next agent version.
pub fn generate_evolution_prompt(
    agents: &[Agent],
    artifacts: &[Artifact],
    directives: &[Directive],
) -> String {
    let (current_version, current_system_prompt) = latest_agent_prompt(agents);
    let evaluated: Vec<&Artifact> = artifacts
        .iter()
        .filter(|a| a.evaluation.is_some())
        .collect();

    let mut avg_score = "N/A".to_string();
    let mut score_histogram = "No evaluation yet".to_string();
    let mut feedback_list =
        "- No evaluation yet. Use current prompt and directives as baseline improvements."
            .to_string();
    let mut low_patterns = "- None yet".to_string();
    let mut high_patterns = "- None yet".to_string();

    if !evaluated.is_empty() {
        let mut total = 0i64;
        let mut histogram: BTreeMap<i64, usize> = BTreeMap::new();
        let mut feedback_lines = Vec::with_capacity(evaluated.len());
        let mut low_lines = Vec::new();
        let mut high_lines = Vec::new();

        for artifact in &evaluated {
            let evaluation = artifact.evaluation.as_ref().expect("filtered above");
            let score = evaluation.score;
            let mut comment = evaluation.comment.trim().to_string();
            if comment.is_empty() {
                comment = "(no comment)".to_string();
            }

            total += score;
            *histogram.entry(score).or_insert(0) += 1;
            feedback_lines.push(format!("- [{}/10] {}", score, comment));

            if score < 5 {
                low_lines.push(format!("- {}", comment));
            }
            if score >= 8 {
                high_lines.push(format!("- {}", comment));
            }
        }

        avg_score = format!("{:.2}", total as f64 / evaluated.len() as f64);
        score_histogram = histogram
            .iter()
            .map(|(score, count)| format!("{}:{}", score, count))
            .collect::<Vec<_>>()
            .join(", ");
        feedback_list = feedback_lines.join("\n");

        if !low_lines.is_empty() {
            low_patterns = low_lines.join("\n");
        }
        if !high_lines.is_empty() {
            high_patterns = high_lines.join("\n");
        }
    }

    let directive_text = format_directives(directives);

    format!(
        r#"You are a master AI agent trainer. Improve the following agent based on evaluation feedback.

CURRENT AGENT (version {}):
System Prompt: {}

EVALUATION SUMMARY:
- Total artifacts: {}
- Evaluated artifacts: {}
- Average score: {}/10
- Score distribution: {}

FEEDBACK:
{}

LOW-SCORING PATTERNS (score < 5):
{}

HIGH-SCORING PATTERNS (score >= 8):
{}

DIRECTIVES:
{}

Output a JSON object with the following structure:
{{
  "system_prompt": "the improved system prompt",
  "reasoning": "brief explanation of changes made"
}}

Focus on addressing low-scoring feedback while preserving high-scoring behaviors."#,
        current_version,
        current_system_prompt,
        artifacts.len(),
        evaluated.len(),
        avg_score,
        score_histogram,
        feedback_list,
        low_patterns,
        high_patterns,
        directive_text,
    )
}

fn latest_agent_prompt(agents: &[Agent]) -> (u32, String) {
    let latest = match agents.iter().max_by_key(|a| a.version) {
        Some(agent) => agent,
        None => return (0, "(none)".to_string()),
    };

    let prompt = latest.definition.system_prompt.trim();
    if prompt.is_empty() {
        (latest.version, "(none)".to_string())
    } else {
        (latest.version, prompt.to_string())
    }
}

fn format_directives(directives: &[Directive]) -> String {
    let lines: Vec<String> = directives
        .iter()
        .map(|d| d.text.trim())
        .filter(|text| !text.is_empty())
        .map(|text| format!("- {}", text))
        .collect();

    if lines.is_empty() {
        "(none)".to_string()
    } else {
        lines.join("\n")
    }
}
