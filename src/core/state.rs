//! Persisted state schema.
//!
//! The root `State` document lives at `.ludus-magnus/state.json` and owns the
//! full tree: sessions → lineages → agents/artifacts/directives. Agents and
//! artifacts are append-only; directives are the only mutable collections on
//! a lineage. Transient aggregates (tournaments, training loops) are owned by
//! their callers and never enter this tree.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current state schema version written by this binary.
pub const CURRENT_VERSION: &str = "1.0";

/// Session mode before promotion.
pub const MODE_QUICKSTART: &str = "quickstart";
/// Session mode after promotion (or `training init`).
pub const MODE_TRAINING: &str = "training";

/// Root JSON document stored at `.ludus-magnus/state.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub version: String,
    #[serde(default)]
    pub sessions: BTreeMap<String, Session>,
}

impl State {
    /// Returns an initialized v1 state document.
    pub fn new() -> Self {
        State {
            version: CURRENT_VERSION.to_string(),
            sessions: BTreeMap::new(),
        }
    }
}

impl Default for State {
    fn default() -> Self {
        State::new()
    }
}

/// One quickstart or training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub mode: String,
    pub need: String,
    pub created_at: String,
    pub status: String,
    #[serde(default)]
    pub lineages: BTreeMap<String, Lineage>,
}

impl Session {
    /// Returns the map key of the lineage with the given name.
    pub fn lineage_key_by_name(&self, name: &str) -> Option<String> {
        self.lineages
            .iter()
            .find(|(_, lineage)| lineage.name == name)
            .map(|(key, _)| key.clone())
    }

    /// Returns the lineage with the given name.
    pub fn lineage_by_name(&self, name: &str) -> Option<&Lineage> {
        self.lineages.values().find(|lineage| lineage.name == name)
    }
}

/// A branch within a session carrying a monotonically versioned agent chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineage {
    pub id: String,
    pub session_id: String,
    pub name: String,
    pub locked: bool,
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub directives: Directives,
}

impl Lineage {
    /// Returns the agent with the highest version, if any.
    pub fn latest_agent(&self) -> Option<&Agent> {
        self.agents.iter().max_by_key(|a| a.version)
    }
}

/// One generated agent definition version. Appended only, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub lineage_id: String,
    pub version: u32,
    pub definition: AgentDefinition,
    pub created_at: String,
    pub generation_metadata: GenerationMetadata,
}

/// The prompt/model/tools payload used for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AgentDefinition {
    pub system_prompt: String,
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    #[serde(default)]
    pub tools: Vec<serde_json::Value>,
}

/// Generation-level observability for one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GenerationMetadata {
    pub provider: String,
    pub model: String,
    pub tokens_used: u64,
    pub duration_ms: u64,
    pub cost_usd: f64,
}

/// One execution result for an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub id: String,
    pub agent_id: String,
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub created_at: String,
    pub execution_metadata: ExecutionMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<Evaluation>,
}

/// Runtime signals and tool calls for one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecutionMetadata {
    pub mode: String,
    pub provider: Option<String>,
    pub executor: Option<String>,
    pub executor_command: Option<String>,
    pub tokens_input: u64,
    pub tokens_output: u64,
    pub duration_ms: u64,
    pub cost_usd: f64,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

/// A single tool invocation made by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub input: String,
    pub output: String,
    pub duration_ms: u64,
}

/// Reviewer feedback for one artifact. Set once, then immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: i64,
    pub comment: String,
    pub evaluated_at: String,
}

/// Per-lineage one-shot and sticky instructions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Directives {
    #[serde(default)]
    pub oneshot: Vec<Directive>,
    #[serde(default)]
    pub sticky: Vec<Directive>,
}

/// One operator instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub id: String,
    pub text: String,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_current_version() {
        let st = State::new();
        assert_eq!(st.version, CURRENT_VERSION);
        assert!(st.sessions.is_empty());
    }

    #[test]
    fn test_latest_agent_picks_highest_version() {
        let mut lineage = Lineage {
            id: "lin_00000001".into(),
            session_id: "ses_00000001".into(),
            name: "main".into(),
            locked: false,
            agents: vec![],
            artifacts: vec![],
            directives: Directives::default(),
        };
        assert!(lineage.latest_agent().is_none());

        for version in [1, 3, 2] {
            lineage.agents.push(Agent {
                id: format!("agt_{:08x}", version),
                lineage_id: lineage.id.clone(),
                version,
                definition: AgentDefinition::default(),
                created_at: String::new(),
                generation_metadata: GenerationMetadata::default(),
            });
        }
        assert_eq!(lineage.latest_agent().unwrap().version, 3);
    }

    #[test]
    fn test_artifact_evaluation_skipped_when_absent() {
        let artifact = Artifact {
            id: "art_00000001".into(),
            agent_id: "agt_00000001".into(),
            input: "in".into(),
            output: "out".into(),
            created_at: String::new(),
            execution_metadata: ExecutionMetadata::default(),
            evaluation: None,
        };
        let encoded = serde_json::to_string(&artifact).unwrap();
        assert!(!encoded.contains("evaluation"));
    }
}
