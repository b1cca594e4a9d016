//! Full pipeline: contestants → training loop → mutation hand-off →
//! report → manifest → checkpoint round-trip.

use ludus_magnus::arena::challenge::Challenge;
use ludus_magnus::arena::checkpoint;
use ludus_magnus::arena::dispatch;
use ludus_magnus::arena::harness::{TestCase, TestSuite};
use ludus_magnus::arena::mutation::{Operator, RephraseOp};
use ludus_magnus::arena::report;
use ludus_magnus::arena::runner::{provider_executor, Contestant, RunOptions};
use ludus_magnus::arena::training::{Config as LoopConfig, Loop};
use ludus_magnus::core::cancel::CancelToken;
use ludus_magnus::core::cost::Tracker;
use ludus_magnus::core::provider::MockProvider;
use ludus_magnus::core::state::{Agent, AgentDefinition, GenerationMetadata};
use tempfile::tempdir;

fn contestant(id: &str, lineage: &str, prompt: &str) -> Contestant {
    Contestant {
        id: id.to_string(),
        lineage_id: lineage.to_string(),
        agent: Agent {
            id: format!("agt_{}", id),
            lineage_id: lineage.to_string(),
            version: 1,
            definition: AgentDefinition {
                system_prompt: prompt.to_string(),
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

fn greeting_challenge(id: &str) -> Challenge {
    Challenge {
        id: id.to_string(),
        name: "greeting".into(),
        kind: "feature".into(),
        difficulty: "easy".into(),
        description: "produce a greeting".into(),
        input: "greet the world".into(),
        test_suite: TestSuite {
            id: format!("ts_{}", id),
            name: "greeting checks".into(),
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
        max_duration_ms: 1000,
        ..Challenge::default()
    }
}

#[test]
fn loop_to_manifest_with_mutation_handoff() {
    // Two scripted outputs per generation run: the mock replays execute
    // responses FIFO per bout (4 contestants x 1 challenge x 2 generations).
    let provider = MockProvider::new().with_execute([
        "hello world", "nope", "hello", "nothing", // generation 1
        "hello world", "hello world", "nope", "nope", // generation 2
    ]);
    let exec = provider_executor(&provider);

    let contestants = vec![
        contestant("c1", "lin_a", "prompt one"),
        contestant("c2", "lin_b", "prompt two"),
        contestant("c3", "lin_c", "prompt three"),
        contestant("c4", "lin_d", "prompt four"),
    ];

    let mut lp = Loop::new(
        LoopConfig {
            max_generations: 2,
            selection_count: 2,
            target_score: 100.0, // unreachable, runs to the budget
            ..LoopConfig::default()
        },
        contestants.clone(),
    )
    .unwrap();

    let cancel = CancelToken::new();
    let tracker = Tracker::new(0.0);
    let challenges = [greeting_challenge("ch_1")];

    let mut opts = RunOptions::new(&cancel);
    opts.tracker = Some(&tracker);

    // Generation 1.
    let first = lp.run_generation(&challenges, &exec, &opts).unwrap();
    assert_eq!(first.number, 1);
    assert_eq!(first.winners.len(), 2);
    assert_eq!(lp.status, "paused");

    // External mutation hand-off: keep the winners, refill the pool with
    // rephrased variants.
    let mutation_provider = MockProvider::new().with_generate(["variant prompt"]);
    let mut next_pool: Vec<Contestant> = first
        .winners
        .iter()
        .filter_map(|winner| {
            contestants
                .iter()
                .find(|c| c.id == winner.contestant_id)
                .cloned()
        })
        .collect();
    let mut counter = 0;
    while next_pool.len() < 4 {
        counter += 1;
        let base = next_pool[0].clone();
        let mutated = RephraseOp
            .mutate(&cancel, &base.agent.definition, &mutation_provider)
            .unwrap();
        let mut fresh = base;
        fresh.id = format!("m{}", counter);
        fresh.agent.definition = mutated;
        next_pool.push(fresh);
    }
    lp.set_contestants(next_pool);

    // Generation 2 hits the generation budget and completes.
    let second = lp.run_generation(&challenges, &exec, &opts).unwrap();
    assert_eq!(second.number, 2);
    assert_eq!(lp.status, "complete");
    assert!(lp.best_score > 9.0);

    // Bout execution went through the shared tracker.
    assert_eq!(tracker.events().len(), 8);
    assert!(tracker
        .events()
        .iter()
        .all(|event| event.operation == "execute"));

    // Report and manifest come off the last generation's winners.
    let report = report::export_report(&lp).unwrap();
    assert_eq!(report.generations, 2);
    assert_eq!(report.trained_prompts.len(), 2);
    assert!(report
        .trained_prompts
        .iter()
        .all(|tp| tp.prompt_id.starts_with(&format!("{}_", lp.id))));

    let tmp = tempdir().unwrap();
    let report_dir = tmp.path().join("state/trained-prompts");
    let report_path =
        report::write_report(&report, report_dir.to_str().unwrap()).unwrap();
    assert!(report_path.to_string_lossy().contains("report_"));

    let manifest = dispatch::generate_manifest(&report).unwrap();
    assert_eq!(manifest.version, "1.0");
    assert_eq!(manifest.source_loop, lp.id);
    let best = manifest.best_prompt().unwrap();
    assert!(manifest.prompts.iter().all(|p| p.score <= best.score));

    let manifest_dir = tmp.path().join("state/dispatch");
    let manifest_path =
        dispatch::write_manifest(&manifest, manifest_dir.to_str().unwrap()).unwrap();
    let restored = dispatch::read_manifest(&manifest_path).unwrap();
    assert_eq!(restored, manifest);

    // Checkpoint round-trip preserves the loop exactly.
    let checkpoint_path = tmp.path().join("checkpoint_pipeline.json");
    checkpoint::save_to(&checkpoint_path, &lp, checkpoint::REASON_GENERATION_COMPLETE).unwrap();
    let restored = checkpoint::load_from(&checkpoint_path).unwrap();
    assert_eq!(restored.training_loop, lp);
    assert_eq!(restored.reason, "generation_complete");
}
