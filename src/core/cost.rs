//! Cost tracking and budget enforcement.
//!
//! Every provider call records an event here. The tracker is shared across
//! concurrent bouts within a tournament, so the ledger sits behind a mutex.
//! It is never global: each run owns one tracker and passes it explicitly.

use crate::core::error::LudusError;
use crate::core::time::now_rfc3339;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Operation tags for cost events.
pub const OP_GENERATE: &str = "generate";
pub const OP_EXECUTE: &str = "execute";
pub const OP_MUTATE: &str = "mutate";
pub const OP_CHALLENGE: &str = "challenge";

/// A single cost-generating operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Event {
    pub operation: String,
    pub model: String,
    pub tokens_in: u64,
    pub tokens_out: u64,
    pub cost_usd: f64,
    pub duration_ms: u64,
    #[serde(default)]
    pub timestamp: String,
}

/// Aggregate cost report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Summary {
    pub total_cost_usd: f64,
    pub total_tokens_in: u64,
    pub total_tokens_out: u64,
    pub total_duration_ms: u64,
    pub event_count: usize,
    pub by_operation: BTreeMap<String, f64>,
    pub by_model: BTreeMap<String, f64>,
    pub budget_usd: f64,
    pub remaining: f64,
    pub over_budget: bool,
}

/// Thread-safe cost ledger with pre-flight budget admission.
///
/// A budget of 0 means unlimited.
#[derive(Debug)]
pub struct Tracker {
    events: Mutex<Vec<Event>>,
    budget_usd: f64,
}

impl Tracker {
    pub fn new(budget_usd: f64) -> Self {
        Tracker {
            events: Mutex::new(Vec::new()),
            budget_usd,
        }
    }

    /// Adds a cost event, stamping the timestamp when missing.
    pub fn record(&self, mut event: Event) {
        if event.timestamp.is_empty() {
            event.timestamp = now_rfc3339();
        }
        self.lock().push(event);
    }

    /// Returns the current total cost.
    pub fn total_cost(&self) -> f64 {
        self.lock().iter().map(|e| e.cost_usd).sum()
    }

    /// Returns how much budget is left.
    pub fn remaining(&self) -> f64 {
        self.budget_usd - self.total_cost()
    }

    /// Returns whether total cost exceeds the budget.
    pub fn over_budget(&self) -> bool {
        self.budget_usd > 0.0 && self.total_cost() > self.budget_usd
    }

    /// Fails `BudgetExceeded` when the projected total would exceed the
    /// budget. A budget of 0 admits everything.
    pub fn check_budget(&self, estimated_cost_usd: f64) -> Result<(), LudusError> {
        if self.budget_usd <= 0.0 {
            return Ok(());
        }
        let projected = self.total_cost() + estimated_cost_usd;
        if projected > self.budget_usd {
            return Err(LudusError::BudgetExceeded(format!(
                "projected ${:.4} > budget ${:.4} (remaining: ${:.4})",
                projected,
                self.budget_usd,
                self.remaining()
            )));
        }
        Ok(())
    }

    /// Returns an aggregate cost report with per-operation and per-model
    /// breakdowns.
    pub fn summarize(&self) -> Summary {
        let events = self.lock();
        let mut summary = Summary {
            budget_usd: self.budget_usd,
            ..Summary::default()
        };

        for event in events.iter() {
            summary.total_cost_usd += event.cost_usd;
            summary.total_tokens_in += event.tokens_in;
            summary.total_tokens_out += event.tokens_out;
            summary.total_duration_ms += event.duration_ms;
            summary.event_count += 1;
            *summary
                .by_operation
                .entry(event.operation.clone())
                .or_insert(0.0) += event.cost_usd;
            if !event.model.is_empty() {
                *summary.by_model.entry(event.model.clone()).or_insert(0.0) += event.cost_usd;
            }
        }

        summary.remaining = self.budget_usd - summary.total_cost_usd;
        summary.over_budget = self.budget_usd > 0.0 && summary.total_cost_usd > self.budget_usd;
        summary
    }

    /// Returns a copy of all recorded events.
    pub fn events(&self) -> Vec<Event> {
        self.lock().clone()
    }

    /// Clears all events, keeping the budget.
    pub fn reset(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Event>> {
        // A poisoned ledger only means a panicking bout thread; the events
        // themselves are still consistent.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
