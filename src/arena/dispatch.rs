//! Prompt manifest: the production-facing document listing deployable
//! prompts produced by a training loop.

use crate::arena::report::TrainingReport;
use crate::core::error::LudusError;
use crate::core::store::write_json_atomic;
use crate::core::time::now_rfc3339;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_DISPATCH_DIR: &str = "state/dispatch";
const MANIFEST_VERSION: &str = "1.0";

/// What production dispatch consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptManifest {
    pub version: String,
    pub prompts: Vec<DeployedPrompt>,
    pub generated_at: String,
    pub source_loop: String,
}

/// A single prompt ready for production use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployedPrompt {
    pub id: String,
    pub system_prompt: String,
    pub model: String,
    pub score: f64,
    pub lineage_id: String,
    pub deployed_at: String,
}

impl PromptManifest {
    /// Highest-scoring prompt; ties go to the first listed.
    pub fn best_prompt(&self) -> Result<&DeployedPrompt, LudusError> {
        let mut best = self
            .prompts
            .first()
            .ok_or_else(|| LudusError::Validation("manifest has no prompts".to_string()))?;
        for prompt in &self.prompts[1..] {
            if prompt.score > best.score {
                best = prompt;
            }
        }
        Ok(best)
    }
}

/// Creates a production-ready manifest from a training report.
pub fn generate_manifest(report: &TrainingReport) -> Result<PromptManifest, LudusError> {
    if report.trained_prompts.is_empty() {
        return Err(LudusError::Validation(
            "report has no trained prompts".to_string(),
        ));
    }

    let now = now_rfc3339();
    let prompts = report
        .trained_prompts
        .iter()
        .map(|tp| DeployedPrompt {
            id: tp.prompt_id.clone(),
            system_prompt: tp.system_prompt.clone(),
            model: tp.model.clone(),
            score: tp.avg_score,
            lineage_id: tp.lineage_id.clone(),
            deployed_at: now.clone(),
        })
        .collect();

    Ok(PromptManifest {
        version: MANIFEST_VERSION.to_string(),
        prompts,
        generated_at: now,
        source_loop: report.loop_id.clone(),
    })
}

/// Saves a manifest under `<dir>/manifest_<loop_id>.json` (atomic; directory
/// created). An empty dir selects the default dispatch directory.
pub fn write_manifest(manifest: &PromptManifest, dir: &str) -> Result<PathBuf, LudusError> {
    let dir = if dir.is_empty() {
        DEFAULT_DISPATCH_DIR
    } else {
        dir
    };
    let path = Path::new(dir).join(format!("manifest_{}.json", manifest.source_loop));
    write_json_atomic(&path, manifest)?;
    Ok(path)
}

/// Loads a manifest from disk.
pub fn read_manifest(path: &Path) -> Result<PromptManifest, LudusError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data)
        .map_err(|err| LudusError::StoreCorrupt(format!("{}: {}", path.display(), err)))
}
