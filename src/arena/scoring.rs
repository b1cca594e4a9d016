//! Composite scoring: weighted blend of harness, quality, manual, and
//! efficiency components with availability-aware renormalization.

use crate::arena::analyzer::ScanResult;
use crate::arena::harness::SuiteResult;
use serde::{Deserialize, Serialize};

/// Component weights for the composite blend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub harness: f64,
    pub quality: f64,
    pub manual: f64,
    pub efficiency: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            harness: 0.35,
            quality: 0.25,
            manual: 0.30,
            efficiency: 0.10,
        }
    }
}

/// Raw inputs from each evaluation component. Absent inputs drop their
/// component from the blend.
#[derive(Debug, Clone, Default)]
pub struct Input {
    pub harness_result: Option<SuiteResult>,
    pub quality_result: Option<ScanResult>,
    pub manual_score: Option<i64>,
    pub duration_ms: u64,
    pub max_duration_ms: u64,
}

/// One component's contribution to the blend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ComponentScore {
    pub name: String,
    pub raw_score: i64,
    pub weight: f64,
    pub weighted: f64,
    pub available: bool,
}

/// Composite scoring output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Result {
    pub components: Vec<ComponentScore>,
    /// Weighted average over available components; 0 when none.
    pub final_score: f64,
    /// `final_score` rounded and clamped to 1..10.
    pub normalized: i64,
    pub total_weight: f64,
}

/// Computes a composite score from all available evaluation components.
pub fn score(input: &Input, weights: &Weights) -> Result {
    let mut components = Vec::with_capacity(4);
    let mut total_weighted = 0.0;
    let mut total_weight = 0.0;

    let mut push = |name: &str, raw: Option<i64>, weight: f64| {
        match raw {
            Some(raw) => {
                components.push(ComponentScore {
                    name: name.to_string(),
                    raw_score: raw,
                    weight,
                    weighted: raw as f64 * weight,
                    available: true,
                });
                total_weighted += raw as f64 * weight;
                total_weight += weight;
            }
            None => components.push(ComponentScore {
                name: name.to_string(),
                weight,
                available: false,
                ..ComponentScore::default()
            }),
        };
    };

    push(
        "harness",
        input.harness_result.as_ref().map(|r| r.normalized_score()),
        weights.harness,
    );
    push(
        "quality",
        input.quality_result.as_ref().map(|r| r.quality_score()),
        weights.quality,
    );
    push(
        "manual",
        input.manual_score.map(|raw| raw.clamp(1, 10)),
        weights.manual,
    );
    push(
        "efficiency",
        efficiency_score(input.duration_ms, input.max_duration_ms),
        weights.efficiency,
    );

    let final_score = if total_weight > 0.0 {
        total_weighted / total_weight
    } else {
        0.0
    };

    Result {
        components,
        final_score,
        normalized: ((final_score + 0.5) as i64).clamp(1, 10),
        total_weight,
    }
}

/// Maps the duration/budget ratio onto 1-10: at or under budget is 10,
/// double the budget is 1, linear decay (truncated) in between. Unavailable
/// when either duration is unset.
fn efficiency_score(duration_ms: u64, max_duration_ms: u64) -> Option<i64> {
    if max_duration_ms == 0 || duration_ms == 0 {
        return None;
    }
    let ratio = duration_ms as f64 / max_duration_ms as f64;
    if ratio <= 1.0 {
        return Some(10);
    }
    let score = (10.0 - (ratio - 1.0) * 9.0) as i64;
    Some(score.clamp(1, 10))
}
