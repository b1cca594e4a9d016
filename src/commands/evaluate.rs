//! `evaluate`: attach a one-time score and comment to an artifact.

use crate::commands::{print_json, OutputMode};
use crate::core::error::LudusError;
use crate::core::store::Store;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct EvaluateOutcome {
    pub artifact_id: String,
    pub score: i64,
    pub comment: String,
}

pub fn evaluate(
    store: &Store,
    artifact_id: &str,
    score: i64,
    comment: &str,
) -> Result<EvaluateOutcome, LudusError> {
    let artifact_id = artifact_id.trim();
    if artifact_id.is_empty() {
        return Err(LudusError::Validation(
            "artifact id is required".to_string(),
        ));
    }

    store.evaluate_artifact(artifact_id, score, comment)?;
    Ok(EvaluateOutcome {
        artifact_id: artifact_id.to_string(),
        score,
        comment: comment.to_string(),
    })
}

pub fn run_evaluate_cli(
    store: &Store,
    artifact_id: &str,
    score: i64,
    comment: &str,
    output: OutputMode,
) -> Result<(), LudusError> {
    let outcome = evaluate(store, artifact_id, score, comment)?;
    match output {
        OutputMode::Json => print_json(&outcome),
        OutputMode::Text => {
            println!(
                "Artifact {} evaluated: {}/10",
                outcome.artifact_id, outcome.score
            );
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::quickstart::quickstart_init;
    use crate::commands::MockSource;
    use crate::core::provider::{Config, MockProvider};
    use tempfile::tempdir;

    #[test]
    fn test_evaluate_command_round_trip() {
        let tmp = tempdir().unwrap();
        let store = Store::new(tmp.path().join("state.json"));
        let source = MockSource(
            MockProvider::new()
                .with_generate(["Baseline v1"])
                .with_execute(["execution-output-v1"]),
        );
        let session =
            quickstart_init(&store, "support agent", &Config::default(), &source).unwrap();
        let run = crate::commands::run::run(
            &store,
            &session.session_id,
            None,
            "question",
            "api",
            "",
            &Config::default(),
            &source,
        )
        .unwrap();

        let outcome = evaluate(&store, &run.artifact_id, 3, "too generic").unwrap();
        assert_eq!(outcome.score, 3);

        let err = evaluate(&store, &run.artifact_id, 9, "better").unwrap_err();
        assert!(matches!(err, LudusError::AlreadyEvaluated));
    }

    #[test]
    fn test_evaluate_requires_artifact_id() {
        let tmp = tempdir().unwrap();
        let store = Store::new(tmp.path().join("state.json"));
        let err = evaluate(&store, "  ", 5, "").unwrap_err();
        assert!(matches!(err, LudusError::Validation(_)));
    }
}
