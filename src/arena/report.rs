//! Training report: the winners of a finished loop, ready for consumption.

use crate::arena::runner::Contestant;
use crate::arena::training::Loop;
use crate::core::error::LudusError;
use crate::core::store::write_json_atomic;
use crate::core::time::now_rfc3339;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_REPORT_DIR: &str = "state/trained-prompts";

/// One prompt that survived training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedPrompt {
    pub prompt_id: String,
    pub system_prompt: String,
    pub model: String,
    pub avg_score: f64,
    pub bouts_played: usize,
    pub bouts_won: usize,
    pub generation: u32,
    pub lineage_id: String,
    pub trained_at: String,
}

/// Summary of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub loop_id: String,
    pub generations: usize,
    pub best_score: f64,
    pub trained_prompts: Vec<TrainedPrompt>,
    pub created_at: String,
}

/// Builds a training report from a finished loop. The last generation's
/// winners are joined back to the contestant pool to recover definitions.
pub fn export_report(training_loop: &Loop) -> Result<TrainingReport, LudusError> {
    if !training_loop.is_complete() {
        return Err(LudusError::Validation(format!(
            "loop is not complete (status: {})",
            training_loop.status
        )));
    }
    let last_generation = training_loop
        .generations
        .last()
        .ok_or_else(|| LudusError::Validation("loop has no generations".to_string()))?;

    let now = now_rfc3339();
    let mut prompts = Vec::with_capacity(last_generation.winners.len());
    for winner in &last_generation.winners {
        let contestant =
            match find_contestant(&training_loop.contestants, &winner.contestant_id) {
                Some(contestant) => contestant,
                None => continue,
            };

        prompts.push(TrainedPrompt {
            prompt_id: format!("{}_{}", training_loop.id, winner.contestant_id),
            system_prompt: contestant.agent.definition.system_prompt.clone(),
            model: contestant.agent.definition.model.clone(),
            avg_score: winner.avg_score,
            bouts_played: winner.bouts_played,
            bouts_won: winner.bouts_won,
            generation: last_generation.number,
            lineage_id: winner.lineage_id.clone(),
            trained_at: now.clone(),
        });
    }

    Ok(TrainingReport {
        loop_id: training_loop.id.clone(),
        generations: training_loop.generations.len(),
        best_score: training_loop.best_score,
        trained_prompts: prompts,
        created_at: now,
    })
}

/// Saves a report under `<dir>/report_<loop_id>.json` (atomic; directory
/// created). An empty dir selects the default report directory.
pub fn write_report(report: &TrainingReport, dir: &str) -> Result<PathBuf, LudusError> {
    let dir = if dir.is_empty() {
        DEFAULT_REPORT_DIR
    } else {
        dir
    };
    let path = Path::new(dir).join(format!("report_{}.json", report.loop_id));
    write_json_atomic(&path, report)?;
    Ok(path)
}

/// Loads a report from disk.
pub fn read_report(path: &Path) -> Result<TrainingReport, LudusError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data)
        .map_err(|err| LudusError::StoreCorrupt(format!("{}: {}", path.display(), err)))
}

fn find_contestant<'a>(contestants: &'a [Contestant], id: &str) -> Option<&'a Contestant> {
    contestants.iter().find(|c| c.id == id)
}
