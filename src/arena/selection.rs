//! Selection strategies over tournament standings.

use crate::arena::tournament::Standing;
use crate::core::error::LudusError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const STRATEGY_TRUNCATION: &str = "truncation";
pub const STRATEGY_PAIRWISE: &str = "pairwise";
pub const STRATEGY_ELITIST: &str = "elitist";

/// Picks winners from tournament standings.
pub trait Selector: std::fmt::Debug {
    fn select(&mut self, standings: &[Standing], n: usize) -> Vec<Standing>;
}

/// Keeps the top N by rank.
#[derive(Debug, Default)]
pub struct TruncationSelector;

impl Selector for TruncationSelector {
    fn select(&mut self, standings: &[Standing], n: usize) -> Vec<Standing> {
        if n == 0 || standings.is_empty() {
            return vec![];
        }
        let mut sorted = standings.to_vec();
        sorted.sort_by_key(|s| s.rank);
        sorted.truncate(n);
        sorted
    }
}

/// Draws two uniform standings and keeps the higher average, repeating until
/// N distinct contestants accrue or the pool is exhausted. Deterministic for
/// a given RNG.
#[derive(Debug)]
pub struct PairwiseSelector {
    rng: StdRng,
}

impl PairwiseSelector {
    /// Default RNG seed; supply your own rng for reproducible variation.
    pub fn new() -> Self {
        PairwiseSelector {
            rng: StdRng::seed_from_u64(42),
        }
    }

    pub fn with_rng(rng: StdRng) -> Self {
        PairwiseSelector { rng }
    }
}

impl Default for PairwiseSelector {
    fn default() -> Self {
        PairwiseSelector::new()
    }
}

impl Selector for PairwiseSelector {
    fn select(&mut self, standings: &[Standing], n: usize) -> Vec<Standing> {
        if n == 0 || standings.is_empty() {
            return vec![];
        }

        let mut selected: Vec<Standing> = Vec::with_capacity(n);
        let mut used: std::collections::HashSet<String> = std::collections::HashSet::new();

        while selected.len() < n && used.len() < standings.len() {
            let a = &standings[self.rng.gen_range(0..standings.len())];
            let b = &standings[self.rng.gen_range(0..standings.len())];
            let winner = if b.avg_score > a.avg_score { b } else { a };

            if used.insert(winner.contestant_id.clone()) {
                selected.push(winner.clone());
            }
        }

        selected
    }
}

/// Identical behavior to truncation; the name preserves the intent that the
/// rank-1 contestant is always kept.
#[derive(Debug, Default)]
pub struct ElitistSelector;

impl Selector for ElitistSelector {
    fn select(&mut self, standings: &[Standing], n: usize) -> Vec<Standing> {
        TruncationSelector.select(standings, n)
    }
}

/// Creates a selector by strategy name.
pub fn new_selector(strategy: &str) -> Result<Box<dyn Selector>, LudusError> {
    match strategy {
        STRATEGY_TRUNCATION => Ok(Box::new(TruncationSelector)),
        STRATEGY_PAIRWISE => Ok(Box::new(PairwiseSelector::new())),
        STRATEGY_ELITIST => Ok(Box::new(ElitistSelector)),
        other => Err(LudusError::Validation(format!(
            "unknown selection strategy {:?}; choose from: {}, {}, {}",
            other, STRATEGY_TRUNCATION, STRATEGY_PAIRWISE, STRATEGY_ELITIST
        ))),
    }
}

/// Splits standings into (selected, eliminated) by winner-id membership.
pub fn partition(standings: &[Standing], winners: &[Standing]) -> (Vec<Standing>, Vec<Standing>) {
    let winner_ids: std::collections::HashSet<&str> = winners
        .iter()
        .map(|w| w.contestant_id.as_str())
        .collect();

    let mut selected = Vec::new();
    let mut eliminated = Vec::new();
    for standing in standings {
        if winner_ids.contains(standing.contestant_id.as_str()) {
            selected.push(standing.clone());
        } else {
            eliminated.push(standing.clone());
        }
    }
    (selected, eliminated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(id: &str, rank: usize, avg: f64) -> Standing {
        Standing {
            contestant_id: id.to_string(),
            lineage_id: format!("lin_{}", id),
            total_score: avg,
            avg_score: avg,
            bouts_played: 1,
            bouts_won: 0,
            rank,
        }
    }

    fn field() -> Vec<Standing> {
        vec![
            standing("c3", 3, 4.0),
            standing("c1", 1, 9.0),
            standing("c4", 4, 2.0),
            standing("c2", 2, 7.0),
        ]
    }

    #[test]
    fn test_truncation_takes_top_ranks() {
        let winners = TruncationSelector.select(&field(), 2);
        let ids: Vec<&str> = winners.iter().map(|w| w.contestant_id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[test]
    fn test_truncation_clamps_to_available() {
        assert_eq!(TruncationSelector.select(&field(), 100).len(), 4);
        assert!(TruncationSelector.select(&field(), 0).is_empty());
        assert!(TruncationSelector.select(&[], 2).is_empty());
    }

    #[test]
    fn test_elitist_always_includes_rank_one() {
        let winners = ElitistSelector.select(&field(), 3);
        assert_eq!(winners[0].contestant_id, "c1");
    }

    #[test]
    fn test_pairwise_is_deterministic_under_seed() {
        let a = PairwiseSelector::with_rng(StdRng::seed_from_u64(7)).select(&field(), 2);
        let b = PairwiseSelector::with_rng(StdRng::seed_from_u64(7)).select(&field(), 2);
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_pairwise_yields_distinct_contestants() {
        let winners = PairwiseSelector::new().select(&field(), 4);
        let mut ids: Vec<&str> = winners.iter().map(|w| w.contestant_id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), winners.len());
    }

    #[test]
    fn test_new_selector_rejects_unknown_strategy() {
        assert!(new_selector(STRATEGY_TRUNCATION).is_ok());
        assert!(new_selector(STRATEGY_PAIRWISE).is_ok());
        assert!(new_selector(STRATEGY_ELITIST).is_ok());
        let err = new_selector("roulette").unwrap_err();
        assert!(matches!(err, LudusError::Validation(_)));
    }

    #[test]
    fn test_partition_by_winner_membership() {
        let standings = field();
        let winners = TruncationSelector.select(&standings, 2);
        let (selected, eliminated) = partition(&standings, &winners);
        assert_eq!(selected.len(), 2);
        assert_eq!(eliminated.len(), 2);
        assert!(eliminated
            .iter()
            .all(|s| s.contestant_id == "c3" || s.contestant_id == "c4"));
    }
}
