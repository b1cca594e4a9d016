//! Bout and round execution.
//!
//! A bout runs one contestant against one challenge through an [`Executor`].
//! Bouts within a round are independent and dispatched on a bounded worker
//! pool; the round result preserves the contestant input order regardless of
//! completion order. Round order is strict.

use crate::arena::challenge::Challenge;
use crate::arena::harness::{run_suite, SuiteResult};
use crate::arena::scoring::{self, Weights};
use crate::core::cancel::CancelToken;
use crate::core::cost::{self, Tracker};
use crate::core::error::LudusError;
use crate::core::provider::Metadata;
use crate::core::state::{Agent, AgentDefinition};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Wall-clock bound for a bout when the challenge carries no time budget.
const DEFAULT_BOUT_TIMEOUT_MS: u64 = 30_000;

/// One prompt variant competing in a tournament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contestant {
    pub id: String,
    pub lineage_id: String,
    pub agent: Agent,
}

/// Result of one contestant against one challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Bout {
    pub contestant_id: String,
    pub challenge_id: String,
    pub output: String,
    pub harness_result: SuiteResult,
    pub composite_score: scoring::Result,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// All bouts for one challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Round {
    pub challenge_id: String,
    pub bouts: Vec<Bout>,
}

/// Context handed to the executor for one bout.
pub struct ExecContext<'a> {
    pub cancel: &'a CancelToken,
    /// Wall-clock bound for the external call; executors honor it
    /// best-effort.
    pub timeout_ms: u64,
}

/// Outcome of one executor call.
#[derive(Debug, Clone, Default)]
pub struct Execution {
    pub output: String,
    pub duration_ms: u64,
    /// Provider usage signals when the executor is provider-backed.
    pub metadata: Option<Metadata>,
}

/// Runs an agent definition on an input. Implemented by provider adapters,
/// external executors, and test closures.
pub trait Executor: Sync {
    fn execute(
        &self,
        ctx: &ExecContext<'_>,
        agent: &AgentDefinition,
        input: &str,
    ) -> Result<Execution, LudusError>;
}

impl<F> Executor for F
where
    F: Fn(&ExecContext<'_>, &AgentDefinition, &str) -> Result<Execution, LudusError> + Sync,
{
    fn execute(
        &self,
        ctx: &ExecContext<'_>,
        agent: &AgentDefinition,
        input: &str,
    ) -> Result<Execution, LudusError> {
        self(ctx, agent, input)
    }
}

/// Wraps a provider as a bout executor (api-mode execution). Usage metadata
/// flows through so bouts can record cost events.
pub fn provider_executor(provider: &dyn crate::core::provider::Provider) -> impl Executor + '_ {
    move |ctx: &ExecContext<'_>, agent: &AgentDefinition, input: &str| {
        let (output, metadata) = provider.execute_agent(ctx.cancel, agent, input)?;
        Ok(Execution {
            output,
            duration_ms: metadata.duration_ms,
            metadata: Some(metadata),
        })
    }
}

/// Shared knobs for a tournament run.
pub struct RunOptions<'a> {
    pub cancel: &'a CancelToken,
    pub tracker: Option<&'a Tracker>,
    /// Bout worker count; 0 picks the hardware parallelism, capped at the
    /// contestant count.
    pub workers: usize,
}

impl<'a> RunOptions<'a> {
    pub fn new(cancel: &'a CancelToken) -> Self {
        RunOptions {
            cancel,
            tracker: None,
            workers: 0,
        }
    }
}

/// Executes one contestant against one challenge and scores the result.
pub fn run_bout(
    contestant: &Contestant,
    challenge: &Challenge,
    exec: &dyn Executor,
    weights: &Weights,
    cancel: &CancelToken,
    tracker: Option<&Tracker>,
) -> Bout {
    let timeout_ms = if challenge.max_duration_ms > 0 {
        challenge.max_duration_ms * 3
    } else {
        DEFAULT_BOUT_TIMEOUT_MS
    };
    let ctx = ExecContext { cancel, timeout_ms };

    let start = Instant::now();
    let outcome = exec.execute(&ctx, &contestant.agent.definition, &challenge.input);

    let mut bout = Bout {
        contestant_id: contestant.id.clone(),
        challenge_id: challenge.id.clone(),
        ..Bout::default()
    };

    match outcome {
        Err(err) => {
            bout.duration_ms = start.elapsed().as_millis() as u64;
            bout.error = err.to_string();
            bout.composite_score = scoring::score(&scoring::Input::default(), weights);
            bout.harness_result = SuiteResult {
                suite_id: challenge.test_suite.id.clone(),
                ..SuiteResult::default()
            };
        }
        Ok(execution) => {
            bout.duration_ms = if execution.duration_ms > 0 {
                execution.duration_ms
            } else {
                start.elapsed().as_millis() as u64
            };
            bout.output = execution.output;

            let harness_result = run_suite(&challenge.test_suite, &bout.output);
            bout.composite_score = scoring::score(
                &scoring::Input {
                    harness_result: Some(harness_result.clone()),
                    duration_ms: bout.duration_ms,
                    max_duration_ms: challenge.max_duration_ms,
                    ..scoring::Input::default()
                },
                weights,
            );
            bout.harness_result = harness_result;

            if let (Some(tracker), Some(metadata)) = (tracker, execution.metadata.as_ref()) {
                tracker.record(cost::Event {
                    operation: cost::OP_EXECUTE.to_string(),
                    model: contestant.agent.definition.model.clone(),
                    tokens_in: metadata.tokens_input,
                    tokens_out: metadata.tokens_output,
                    cost_usd: metadata.cost_usd,
                    duration_ms: bout.duration_ms,
                    timestamp: String::new(),
                });
            }
        }
    }

    bout
}

/// Executes all contestants against one challenge on the given pool. Bout
/// results come back in contestant input order.
fn run_round(
    pool: &rayon::ThreadPool,
    contestants: &[Contestant],
    challenge: &Challenge,
    exec: &dyn Executor,
    weights: &Weights,
    opts: &RunOptions<'_>,
) -> Round {
    let bouts = pool.install(|| {
        contestants
            .par_iter()
            .map(|contestant| {
                run_bout(contestant, challenge, exec, weights, opts.cancel, opts.tracker)
            })
            .collect()
    });

    Round {
        challenge_id: challenge.id.clone(),
        bouts,
    }
}

/// Executes all contestants against all challenges, one round per challenge
/// in the supplied order.
pub fn run_all(
    contestants: &[Contestant],
    challenges: &[Challenge],
    exec: &dyn Executor,
    weights: &Weights,
    opts: &RunOptions<'_>,
) -> Result<Vec<Round>, LudusError> {
    if contestants.is_empty() {
        return Err(LudusError::Validation("no contestants".to_string()));
    }
    if challenges.is_empty() {
        return Err(LudusError::Validation("no challenges".to_string()));
    }

    let workers = effective_workers(opts.workers, contestants.len());
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|err| LudusError::ExecutionFailed(format!("build bout pool: {}", err)))?;

    let mut rounds = Vec::with_capacity(challenges.len());
    for challenge in challenges {
        if opts.cancel.is_cancelled() {
            return Err(LudusError::Cancelled);
        }
        if let Some(tracker) = opts.tracker {
            tracker.check_budget(0.0)?;
        }
        rounds.push(run_round(&pool, contestants, challenge, exec, weights, opts));
    }
    Ok(rounds)
}

fn effective_workers(requested: usize, contestants: usize) -> usize {
    let hardware = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let base = if requested == 0 { hardware } else { requested };
    base.min(contestants).max(1)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::arena::harness::{TestCase, TestSuite};
    use crate::core::state::GenerationMetadata;

    pub(crate) fn contestant(id: &str, lineage: &str) -> Contestant {
        Contestant {
            id: id.to_string(),
            lineage_id: lineage.to_string(),
            agent: Agent {
                id: format!("agt_{}", id),
                lineage_id: lineage.to_string(),
                version: 1,
                definition: AgentDefinition {
                    system_prompt: format!("prompt for {}", id),
                    model: "claude-sonnet-4-5".into(),
                    temperature: 1.0,
                    max_tokens: 1024,
                    tools: vec![],
                },
                created_at: "2026-01-01T00:00:00Z".into(),
                generation_metadata: GenerationMetadata::default(),
            },
        }
    }

    pub(crate) fn hello_world_challenge(id: &str) -> Challenge {
        Challenge {
            id: id.to_string(),
            name: "hello".into(),
            kind: "feature".into(),
            difficulty: "easy".into(),
            description: "say hello".into(),
            input: "greet the world".into(),
            test_suite: TestSuite {
                id: format!("ts_{}", id),
                name: "greeting".into(),
                test_cases: vec![
                    TestCase {
                        kind: "contains".into(),
                        expected: "hello".into(),
                        weight: 1.0,
                        ..TestCase::default()
                    },
                    TestCase {
                        kind: "contains".into(),
                        expected: "world".into(),
                        weight: 1.0,
                        ..TestCase::default()
                    },
                ],
            },
            ..Challenge::default()
        }
    }

    fn echo_prompt_executor(
    ) -> impl Fn(&ExecContext<'_>, &AgentDefinition, &str) -> Result<Execution, LudusError> {
        |_ctx: &ExecContext<'_>, agent: &AgentDefinition, _input: &str| {
            Ok(Execution {
                output: if agent.system_prompt.contains("c1") {
                    "hello world".to_string()
                } else {
                    "nope".to_string()
                },
                duration_ms: 7,
                metadata: None,
            })
        }
    }

    #[test]
    fn test_bout_success_scores_harness() {
        let exec = echo_prompt_executor();
        let bout = run_bout(
            &contestant("c1", "lin_a"),
            &hello_world_challenge("ch_1"),
            &exec,
            &Weights::default(),
            &CancelToken::new(),
            None,
        );
        assert!(bout.error.is_empty());
        assert_eq!(bout.output, "hello world");
        assert_eq!(bout.harness_result.passed, 2);
        assert!((bout.composite_score.final_score - 10.0).abs() < 1e-9);
        assert_eq!(bout.duration_ms, 7);
    }

    #[test]
    fn test_bout_error_records_floor_score() {
        let exec = |_ctx: &ExecContext<'_>, _agent: &AgentDefinition, _input: &str| {
            Err(LudusError::ExecutionFailed("boom".to_string()))
        };
        let bout = run_bout(
            &contestant("c1", "lin_a"),
            &hello_world_challenge("ch_1"),
            &exec,
            &Weights::default(),
            &CancelToken::new(),
            None,
        );
        assert!(bout.error.contains("boom"));
        assert!(bout.output.is_empty());
        assert_eq!(bout.composite_score.normalized, 1);
        assert_eq!(bout.composite_score.total_weight, 0.0);
        assert_eq!(bout.harness_result.suite_id, "ts_ch_1");
    }

    #[test]
    fn test_round_preserves_contestant_order() {
        let contestants: Vec<Contestant> = (0..8)
            .map(|i| contestant(&format!("c{}", i), "lin_a"))
            .collect();
        let exec = |_ctx: &ExecContext<'_>, agent: &AgentDefinition, _input: &str| {
            // Vary the work a little so completion order scrambles.
            let pause = agent.system_prompt.len() % 3;
            std::thread::sleep(std::time::Duration::from_millis(pause as u64));
            Ok(Execution {
                output: agent.system_prompt.clone(),
                duration_ms: 1,
                metadata: None,
            })
        };

        let cancel = CancelToken::new();
        let rounds = run_all(
            &contestants,
            &[hello_world_challenge("ch_1")],
            &exec,
            &Weights::default(),
            &RunOptions::new(&cancel),
        )
        .unwrap();

        let ids: Vec<&str> = rounds[0]
            .bouts
            .iter()
            .map(|b| b.contestant_id.as_str())
            .collect();
        assert_eq!(ids, vec!["c0", "c1", "c2", "c3", "c4", "c5", "c6", "c7"]);
    }

    #[test]
    fn test_run_all_rejects_empty_inputs() {
        let exec = echo_prompt_executor();
        let cancel = CancelToken::new();
        let err = run_all(
            &[],
            &[hello_world_challenge("ch_1")],
            &exec,
            &Weights::default(),
            &RunOptions::new(&cancel),
        )
        .unwrap_err();
        assert!(matches!(err, LudusError::Validation(msg) if msg == "no contestants"));

        let err = run_all(
            &[contestant("c1", "lin_a")],
            &[],
            &exec,
            &Weights::default(),
            &RunOptions::new(&cancel),
        )
        .unwrap_err();
        assert!(matches!(err, LudusError::Validation(msg) if msg == "no challenges"));
    }

    #[test]
    fn test_cancellation_aborts_between_rounds() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let exec = echo_prompt_executor();
        let err = run_all(
            &[contestant("c1", "lin_a")],
            &[hello_world_challenge("ch_1")],
            &exec,
            &Weights::default(),
            &RunOptions::new(&cancel),
        )
        .unwrap_err();
        assert!(matches!(err, LudusError::Cancelled));
    }

    #[test]
    fn test_bout_records_cost_event_with_metadata() {
        let tracker = Tracker::new(0.0);
        let exec = |_ctx: &ExecContext<'_>, _agent: &AgentDefinition, _input: &str| {
            Ok(Execution {
                output: "hello world".to_string(),
                duration_ms: 3,
                metadata: Some(Metadata {
                    tokens_input: 10,
                    tokens_output: 20,
                    tokens_used: 30,
                    duration_ms: 3,
                    cost_usd: 0.002,
                    tool_calls: vec![],
                }),
            })
        };
        run_bout(
            &contestant("c1", "lin_a"),
            &hello_world_challenge("ch_1"),
            &exec,
            &Weights::default(),
            &CancelToken::new(),
            Some(&tracker),
        );
        let events = tracker.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].operation, "execute");
        assert!((events[0].cost_usd - 0.002).abs() < 1e-12);
    }

    #[test]
    fn test_budget_exhaustion_stops_round_dispatch() {
        let tracker = Tracker::new(0.001);
        tracker.record(crate::core::cost::Event {
            operation: "execute".into(),
            cost_usd: 0.01,
            ..crate::core::cost::Event::default()
        });
        let cancel = CancelToken::new();
        let exec = echo_prompt_executor();
        let mut opts = RunOptions::new(&cancel);
        opts.tracker = Some(&tracker);
        let err = run_all(
            &[contestant("c1", "lin_a")],
            &[hello_world_challenge("ch_1")],
            &exec,
            &Weights::default(),
            &opts,
        )
        .unwrap_err();
        assert!(matches!(err, LudusError::BudgetExceeded(_)));
    }

    #[test]
    fn test_effective_workers_bounds() {
        assert_eq!(effective_workers(4, 2), 2);
        assert_eq!(effective_workers(1, 10), 1);
        assert!(effective_workers(0, 10) >= 1);
    }
}
