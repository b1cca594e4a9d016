//! Challenge schema and provider-backed challenge generation.

use crate::arena::harness::{TestCase, TestSuite};
use crate::core::cancel::CancelToken;
use crate::core::error::LudusError;
use crate::core::id::new_prefixed_id;
use crate::core::provider::Provider;
use crate::core::time::now_rfc3339;
use serde::{Deserialize, Serialize};

pub const TYPE_FEATURE: &str = "feature";
pub const TYPE_BUGFIX: &str = "bugfix";
pub const TYPE_REFACTOR: &str = "refactor";
pub const TYPE_REVIEW: &str = "review";

/// All recognized challenge types.
pub const VALID_TYPES: [&str; 4] = [TYPE_FEATURE, TYPE_BUGFIX, TYPE_REFACTOR, TYPE_REVIEW];

pub const DIFFICULTY_EASY: &str = "easy";
pub const DIFFICULTY_MEDIUM: &str = "medium";
pub const DIFFICULTY_HARD: &str = "hard";

/// A synthetic evaluation task for agent training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Challenge {
    pub id: String,
    pub name: String,
    /// feature, bugfix, refactor, or review.
    #[serde(rename = "type")]
    pub kind: String,
    pub difficulty: String,
    pub description: String,
    /// The input/prompt given to the agent.
    pub input: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
    pub test_suite: TestSuite,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub created_at: String,
    /// Expected time budget for efficiency scoring; 0 means unset.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_duration_ms: u64,
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Groups challenges for a tournament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChallengeSet {
    pub id: String,
    pub name: String,
    pub challenges: Vec<Challenge>,
    pub created_at: String,
}

impl Challenge {
    /// Checks required fields and the challenge type.
    pub fn validate(&self) -> Result<(), LudusError> {
        if self.id.trim().is_empty() {
            return Err(LudusError::Validation(
                "challenge id is required".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(LudusError::Validation(
                "challenge name is required".to_string(),
            ));
        }
        if !is_valid_type(&self.kind) {
            return Err(LudusError::Validation(format!(
                "invalid challenge type {:?}; must be one of: {}",
                self.kind,
                VALID_TYPES.join(", ")
            )));
        }
        if self.description.trim().is_empty() {
            return Err(LudusError::Validation(
                "challenge description is required".to_string(),
            ));
        }
        if self.input.trim().is_empty() {
            return Err(LudusError::Validation(
                "challenge input is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Sum of test case weights, with non-positive weights counting as 1.
    pub fn total_weight(&self) -> f64 {
        self.test_suite
            .test_cases
            .iter()
            .map(|tc| if tc.weight <= 0.0 { 1.0 } else { tc.weight })
            .sum()
    }
}

fn is_valid_type(kind: &str) -> bool {
    VALID_TYPES.contains(&kind)
}

/// What kind of challenge to generate.
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub kind: String,
    pub difficulty: String,
    pub domain: String,
    pub tags: Vec<String>,
}

/// JSON structure the provider returns for a generated challenge.
#[derive(Debug, Deserialize)]
struct GeneratedChallenge {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    input: String,
    #[serde(default)]
    context: String,
    #[serde(default)]
    test_cases: Vec<GeneratedTestCase>,
}

#[derive(Debug, Deserialize)]
struct GeneratedTestCase {
    #[serde(default)]
    name: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    expected: String,
    #[serde(default)]
    weight: f64,
}

/// Creates a synthetic challenge using an LLM provider. The type is
/// validated before any provider call.
pub fn generate(
    cancel: &CancelToken,
    req: &GenerateRequest,
    provider: &dyn Provider,
) -> Result<Challenge, LudusError> {
    let kind = match req.kind.trim() {
        "" => TYPE_FEATURE.to_string(),
        trimmed => trimmed.to_string(),
    };
    if !is_valid_type(&kind) {
        return Err(LudusError::Validation(format!(
            "invalid challenge type {:?}",
            kind
        )));
    }

    let difficulty = match req.difficulty.trim() {
        "" => DIFFICULTY_MEDIUM.to_string(),
        trimmed => trimmed.to_string(),
    };
    let domain = match req.domain.trim() {
        "" => "general software engineering".to_string(),
        trimmed => trimmed.to_string(),
    };

    let prompt = build_generation_prompt(&kind, &difficulty, &domain);
    let (generated, _) = provider
        .generate_agent(cancel, &prompt, &[])
        .map_err(|err| match err {
            LudusError::Cancelled => LudusError::Cancelled,
            other => LudusError::Provider(format!("generate challenge: {}", other)),
        })?;

    let parsed: GeneratedChallenge = serde_json::from_str(&generated.system_prompt)
        .map_err(|err| LudusError::ChallengeDecode(err.to_string()))?;

    let test_cases = parsed
        .test_cases
        .into_iter()
        .map(|tc| TestCase {
            id: new_prefixed_id("tc"),
            name: tc.name,
            kind: if tc.kind.is_empty() {
                "contains".to_string()
            } else {
                tc.kind
            },
            expected: tc.expected,
            weight: if tc.weight <= 0.0 { 1.0 } else { tc.weight },
            description: String::new(),
        })
        .collect();

    Ok(Challenge {
        id: new_prefixed_id("ch"),
        name: parsed.name.clone(),
        kind,
        difficulty,
        description: parsed.description,
        input: parsed.input,
        context: parsed.context,
        test_suite: TestSuite {
            id: new_prefixed_id("ts"),
            name: format!("Tests for {}", parsed.name),
            test_cases,
        },
        tags: req.tags.clone(),
        created_at: now_rfc3339(),
        max_duration_ms: 0,
    })
}

fn build_generation_prompt(kind: &str, difficulty: &str, domain: &str) -> String {
    format!(
        r#"Generate a synthetic {} challenge for AI agent evaluation.

Domain: {}
Difficulty: {}

Create a challenge that tests an AI agent's ability to handle a {} task.
The challenge should be realistic and have clear evaluation criteria.

Output a JSON object:
{{
  "name": "short challenge name",
  "description": "detailed description of what the agent must do",
  "input": "the exact prompt/input the agent will receive",
  "context": "any code or context the agent needs (can be empty string)",
  "test_cases": [
    {{
      "name": "test case name",
      "type": "contains|not_contains|regex|equals",
      "expected": "the expected pattern or value",
      "weight": 1.0
    }}
  ]
}}

Include 3-5 test cases that verify the agent's output quality.
For {} difficulty, calibrate complexity accordingly."#,
        kind, domain, difficulty, kind, difficulty
    )
}

/// Creates multiple challenges, stopping at the first error and returning
/// the partial set alongside it.
pub fn generate_batch(
    cancel: &CancelToken,
    count: usize,
    req: &GenerateRequest,
    provider: &dyn Provider,
) -> (Vec<Challenge>, Option<LudusError>) {
    if count == 0 {
        return (
            vec![],
            Some(LudusError::Validation("count must be positive".to_string())),
        );
    }

    let mut challenges = Vec::with_capacity(count);
    for index in 0..count {
        match generate(cancel, req, provider) {
            Ok(challenge) => challenges.push(challenge),
            Err(err) => {
                let wrapped = LudusError::Provider(format!(
                    "generate challenge {}/{}: {}",
                    index + 1,
                    count,
                    err
                ));
                return (challenges, Some(wrapped));
            }
        }
    }
    (challenges, None)
}
