//! `artifact list` / `artifact inspect`.

use crate::commands::{print_json, OutputMode};
use crate::core::error::LudusError;
use crate::core::state::Lineage;
use crate::core::store::Store;
use serde::Serialize;

/// One row of `artifact list` output.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactRow {
    pub id: String,
    pub agent_version: u32,
    /// Evaluation score, or None when unevaluated.
    pub score: Option<i64>,
    pub created_at: String,
}

/// Lists all artifacts of a session across its lineages.
pub fn artifact_list(store: &Store, session_id: &str) -> Result<Vec<ArtifactRow>, LudusError> {
    let st = store.load()?;
    let session = st
        .sessions
        .get(session_id.trim())
        .ok_or_else(|| LudusError::NotFound(format!("session {:?}", session_id.trim())))?;

    let mut rows = Vec::new();
    for lineage in session.lineages.values() {
        for artifact in &lineage.artifacts {
            rows.push(ArtifactRow {
                id: artifact.id.clone(),
                agent_version: agent_version_for_artifact(lineage, &artifact.agent_id),
                score: artifact.evaluation.as_ref().map(|e| e.score),
                created_at: artifact.created_at.clone(),
            });
        }
    }
    Ok(rows)
}

fn agent_version_for_artifact(lineage: &Lineage, agent_id: &str) -> u32 {
    lineage
        .agents
        .iter()
        .find(|agent| agent.id == agent_id)
        .map(|agent| agent.version)
        .unwrap_or(0)
}

pub fn run_list_cli(store: &Store, session_id: &str, output: OutputMode) -> Result<(), LudusError> {
    let rows = artifact_list(store, session_id)?;
    match output {
        OutputMode::Json => print_json(&rows),
        OutputMode::Text => {
            println!("ID\tAgent Version\tScore\tCreated At");
            for row in rows {
                let score = row
                    .score
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}\t{}\t{}\t{}",
                    row.id, row.agent_version, score, row.created_at
                );
            }
            Ok(())
        }
    }
}

pub fn run_inspect_cli(
    store: &Store,
    artifact_id: &str,
    _output: OutputMode,
) -> Result<(), LudusError> {
    let artifact_id = artifact_id.trim();
    if artifact_id.is_empty() {
        return Err(LudusError::Validation(
            "artifact id is required".to_string(),
        ));
    }
    let artifact = store.lookup_artifact(artifact_id)?;
    print_json(&artifact)
}
