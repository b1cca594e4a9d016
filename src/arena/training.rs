//! Training loop: generations of tournament → selection → termination.
//!
//! Mutation between generations is an external step: the caller produces the
//! next contestant set (winners plus mutations) and installs it with
//! [`Loop::set_contestants`] before the next generation runs. That keeps
//! mutation policy swappable without touching the loop.

use crate::arena::challenge::Challenge;
use crate::arena::runner::{Contestant, Executor, RunOptions};
use crate::arena::scoring::Weights;
use crate::arena::selection::{self, STRATEGY_TRUNCATION};
use crate::arena::tournament::{self, Standing, Tournament};
use crate::core::error::LudusError;
use crate::core::id::new_prefixed_id;
use crate::core::time::now_rfc3339;
use serde::{Deserialize, Serialize};
use std::time::Instant;

pub const STATUS_IDLE: &str = "idle";
pub const STATUS_RUNNING: &str = "running";
pub const STATUS_PAUSED: &str = "paused";
pub const STATUS_COMPLETE: &str = "complete";
pub const STATUS_FAILED: &str = "failed";

/// Training loop behavior knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub max_generations: u32,
    /// How many winners to keep each generation.
    pub selection_count: usize,
    pub selection_strategy: String,
    pub weights: Weights,
    /// Stop once the best average score reaches this.
    pub target_score: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            max_generations: 10,
            selection_count: 2,
            selection_strategy: STRATEGY_TRUNCATION.to_string(),
            weights: Weights::default(),
            target_score: 9.0,
        }
    }
}

/// One generation of the training loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    pub number: u32,
    pub tournament: Tournament,
    pub winners: Vec<Standing>,
    pub eliminated: Vec<Standing>,
    pub best_score: f64,
    pub avg_score: f64,
    pub duration_ms: u64,
    pub completed_at: String,
}

/// A complete training run. Checkpointable; never persisted in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loop {
    pub id: String,
    pub status: String,
    pub config: Config,
    pub generations: Vec<Generation>,
    pub contestants: Vec<Contestant>,
    pub best_score: f64,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub completed_at: String,
}

impl Loop {
    /// Creates a training loop ready to run.
    pub fn new(cfg: Config, contestants: Vec<Contestant>) -> Result<Loop, LudusError> {
        if contestants.len() < 2 {
            return Err(LudusError::Validation(format!(
                "training requires at least 2 contestants, got {}",
                contestants.len()
            )));
        }
        if cfg.max_generations == 0 {
            return Err(LudusError::Validation(
                "max_generations must be > 0".to_string(),
            ));
        }
        if cfg.selection_count == 0 || cfg.selection_count >= contestants.len() {
            return Err(LudusError::Validation(format!(
                "selection_count must be between 1 and {}",
                contestants.len() - 1
            )));
        }

        Ok(Loop {
            id: new_prefixed_id("loop"),
            status: STATUS_IDLE.to_string(),
            config: cfg,
            generations: vec![],
            contestants,
            best_score: 0.0,
            created_at: now_rfc3339(),
            completed_at: String::new(),
        })
    }

    /// Executes one generation: tournament, selection, stats, termination.
    pub fn run_generation(
        &mut self,
        challenges: &[Challenge],
        exec: &dyn Executor,
        opts: &RunOptions<'_>,
    ) -> Result<Generation, LudusError> {
        if self.is_complete() {
            return Err(LudusError::Validation(format!("loop is {}", self.status)));
        }

        self.status = STATUS_RUNNING.to_string();
        let gen_number = self.generations.len() as u32 + 1;
        let start = Instant::now();

        if let Some(tracker) = opts.tracker {
            if let Err(err) = tracker.check_budget(0.0) {
                self.status = STATUS_FAILED.to_string();
                return Err(err);
            }
        }

        let mut trn = match Tournament::new(
            tournament::Config {
                name: format!("Generation {}", gen_number),
                weights: self.config.weights,
            },
            self.contestants.clone(),
            challenges.to_vec(),
        ) {
            Ok(trn) => trn,
            Err(err) => {
                self.status = STATUS_FAILED.to_string();
                return Err(err);
            }
        };

        if let Err(err) = trn.run(exec, opts) {
            self.status = STATUS_FAILED.to_string();
            return Err(err);
        }

        let mut selector = match selection::new_selector(&self.config.selection_strategy) {
            Ok(selector) => selector,
            Err(err) => {
                self.status = STATUS_FAILED.to_string();
                return Err(err);
            }
        };

        let winners = selector.select(&trn.standings, self.config.selection_count);
        let (_, eliminated) = selection::partition(&trn.standings, &winners);

        let best_score = trn
            .standings
            .iter()
            .map(|s| s.avg_score)
            .fold(0.0, f64::max);
        let avg_score = if trn.standings.is_empty() {
            0.0
        } else {
            trn.standings.iter().map(|s| s.avg_score).sum::<f64>() / trn.standings.len() as f64
        };

        if best_score > self.best_score {
            self.best_score = best_score;
        }

        let generation = Generation {
            number: gen_number,
            tournament: trn,
            winners,
            eliminated,
            best_score,
            avg_score,
            duration_ms: start.elapsed().as_millis() as u64,
            completed_at: now_rfc3339(),
        };
        self.generations.push(generation.clone());

        if gen_number >= self.config.max_generations {
            self.status = STATUS_COMPLETE.to_string();
            self.completed_at = now_rfc3339();
        } else if best_score >= self.config.target_score {
            self.status = STATUS_COMPLETE.to_string();
            self.completed_at = now_rfc3339();
        } else {
            self.status = STATUS_PAUSED.to_string();
        }

        Ok(generation)
    }

    /// Replaces the contestant pool (used after mutation).
    pub fn set_contestants(&mut self, contestants: Vec<Contestant>) {
        self.contestants = contestants;
    }

    /// Whether the loop has reached a terminal status.
    pub fn is_complete(&self) -> bool {
        self.status == STATUS_COMPLETE || self.status == STATUS_FAILED
    }

    /// Number of generations run so far.
    pub fn current_generation(&self) -> u32 {
        self.generations.len() as u32
    }
}
