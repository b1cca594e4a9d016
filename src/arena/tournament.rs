//! Tournament lifecycle and standings.
//!
//! A tournament is a contestants × challenges matrix run to completion.
//! Status moves one direction: pending → running → scoring → complete, or to
//! failed. Tournaments are transient aggregates owned by the caller; the
//! store never holds them.

use crate::arena::challenge::Challenge;
use crate::arena::runner::{run_all, Contestant, Executor, Round, RunOptions};
use crate::arena::scoring::Weights;
use crate::core::error::LudusError;
use crate::core::id::new_prefixed_id;
use crate::core::time::now_rfc3339;
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_RUNNING: &str = "running";
pub const STATUS_SCORING: &str = "scoring";
pub const STATUS_COMPLETE: &str = "complete";
pub const STATUS_FAILED: &str = "failed";

/// A full competition between prompt variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: String,
    pub name: String,
    pub status: String,
    pub contestants: Vec<Contestant>,
    pub challenges: Vec<Challenge>,
    pub rounds: Vec<Round>,
    pub standings: Vec<Standing>,
    pub weights: Weights,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub completed_at: String,
    pub duration_ms: u64,
}

/// A contestant's aggregate tournament performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Standing {
    pub contestant_id: String,
    pub lineage_id: String,
    pub total_score: f64,
    pub avg_score: f64,
    pub bouts_played: usize,
    pub bouts_won: usize,
    pub rank: usize,
}

/// Tournament creation knobs.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub name: String,
    pub weights: Weights,
}

impl Tournament {
    /// Creates a tournament in pending state. Requires at least two
    /// contestants and one challenge.
    pub fn new(
        cfg: Config,
        contestants: Vec<Contestant>,
        challenges: Vec<Challenge>,
    ) -> Result<Tournament, LudusError> {
        if contestants.len() < 2 {
            return Err(LudusError::Validation(format!(
                "tournament requires at least 2 contestants, got {}",
                contestants.len()
            )));
        }
        if challenges.is_empty() {
            return Err(LudusError::Validation(
                "tournament requires at least 1 challenge".to_string(),
            ));
        }

        let id = new_prefixed_id("trn");
        let name = if cfg.name.is_empty() {
            format!("Tournament {}", id)
        } else {
            cfg.name
        };

        Ok(Tournament {
            id,
            name,
            status: STATUS_PENDING.to_string(),
            contestants,
            challenges,
            rounds: vec![],
            standings: vec![],
            weights: cfg.weights,
            created_at: now_rfc3339(),
            completed_at: String::new(),
            duration_ms: 0,
        })
    }

    /// Executes the full tournament: all rounds in order, then standings.
    pub fn run(&mut self, exec: &dyn Executor, opts: &RunOptions<'_>) -> Result<(), LudusError> {
        if self.status != STATUS_PENDING {
            return Err(LudusError::Validation(format!(
                "tournament {:?} is {}, not pending",
                self.id, self.status
            )));
        }

        self.status = STATUS_RUNNING.to_string();
        let start = Instant::now();

        let rounds = match run_all(
            &self.contestants,
            &self.challenges,
            exec,
            &self.weights,
            opts,
        ) {
            Ok(rounds) => rounds,
            Err(err) => {
                self.status = STATUS_FAILED.to_string();
                return Err(err);
            }
        };

        self.rounds = rounds;
        self.status = STATUS_SCORING.to_string();
        self.standings = compute_standings(&self.contestants, &self.rounds);
        self.status = STATUS_COMPLETE.to_string();
        self.duration_ms = start.elapsed().as_millis() as u64;
        self.completed_at = now_rfc3339();

        Ok(())
    }

    /// Returns the top-ranked contestant. Fails on a non-complete
    /// tournament.
    pub fn winner(&self) -> Result<&Standing, LudusError> {
        if self.status != STATUS_COMPLETE {
            return Err(LudusError::Validation(format!(
                "tournament not complete (status: {})",
                self.status
            )));
        }
        self.standings
            .first()
            .ok_or_else(|| LudusError::Validation("no standings".to_string()))
    }

    /// Returns the top N standings by rank, clamped to the available count.
    pub fn top_n(&self, n: usize) -> &[Standing] {
        let n = n.min(self.standings.len());
        &self.standings[..n]
    }
}

/// Aggregates bout scores into ranked standings.
///
/// Per round, the bout with the maximum composite `final_score` strictly
/// above zero earns one win; ties go to the first-encountered bout in the
/// round's order. Standings sort by average score descending, then wins
/// descending.
fn compute_standings(contestants: &[Contestant], rounds: &[Round]) -> Vec<Standing> {
    let mut standings: Vec<Standing> = contestants
        .iter()
        .map(|c| Standing {
            contestant_id: c.id.clone(),
            lineage_id: c.lineage_id.clone(),
            ..Standing::default()
        })
        .collect();

    for round in rounds {
        let mut best_score = 0.0;
        let mut best_id: Option<&str> = None;
        for bout in &round.bouts {
            if let Some(standing) = standings
                .iter_mut()
                .find(|s| s.contestant_id == bout.contestant_id)
            {
                standing.total_score += bout.composite_score.final_score;
                standing.bouts_played += 1;
            }
            if bout.composite_score.final_score > best_score {
                best_score = bout.composite_score.final_score;
                best_id = Some(&bout.contestant_id);
            }
        }
        if let Some(winner_id) = best_id {
            if let Some(standing) = standings
                .iter_mut()
                .find(|s| s.contestant_id == winner_id)
            {
                standing.bouts_won += 1;
            }
        }
    }

    for standing in &mut standings {
        if standing.bouts_played > 0 {
            standing.avg_score = standing.total_score / standing.bouts_played as f64;
        }
    }

    standings.sort_by(|a, b| {
        b.avg_score
            .partial_cmp(&a.avg_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.bouts_won.cmp(&a.bouts_won))
    });
    for (index, standing) in standings.iter_mut().enumerate() {
        standing.rank = index + 1;
    }

    standings
}
