//! `promote`: one-way transition from quickstart to training mode.
//!
//! The latest `main` agent seeds four fresh lineages A/B/C/D, one per
//! strategy variant. The previous `main` lineage is discarded; promoting a
//! session twice fails rather than guessing intent.

use crate::commands::training::{
    TrainingVariant, ALTERNATIVE_TRAINING_VARIANTS, DEFAULT_TRAINING_VARIANTS,
};
use crate::commands::{print_json, provider_config, OutputMode, ProviderSource};
use crate::core::cancel::CancelToken;
use crate::core::error::LudusError;
use crate::core::id::new_prefixed_id;
use crate::core::provider::Config;
use crate::core::state::{Agent, Directives, Lineage, MODE_QUICKSTART, MODE_TRAINING};
use crate::core::store::Store;
use crate::core::time::now_rfc3339;
use crate::engine::generate::generate_agent_definition;
use serde::Serialize;
use std::collections::BTreeMap;

pub const STRATEGY_VARIATIONS: &str = "variations";
pub const STRATEGY_ALTERNATIVES: &str = "alternatives";

#[derive(Debug, Clone, Serialize)]
pub struct PromoteOutcome {
    pub session_id: String,
    pub mode: String,
    pub lineages: Vec<String>,
}

fn variants_for_strategy(strategy: &str) -> Result<&'static [TrainingVariant; 4], LudusError> {
    match strategy.trim() {
        "" | STRATEGY_VARIATIONS => Ok(&DEFAULT_TRAINING_VARIANTS),
        STRATEGY_ALTERNATIVES => Ok(&ALTERNATIVE_TRAINING_VARIANTS),
        other => Err(LudusError::Validation(format!(
            "invalid --strategy {:?} (expected {} or {})",
            other, STRATEGY_VARIATIONS, STRATEGY_ALTERNATIVES
        ))),
    }
}

/// Promotes a quickstart session into training mode with four generated
/// lineages.
pub fn promote(
    store: &Store,
    session_id: &str,
    strategy: &str,
    flags: &Config,
    source: &dyn ProviderSource,
) -> Result<PromoteOutcome, LudusError> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(LudusError::Validation("session id is required".to_string()));
    }

    let mut st = store.load()?;
    let session = st
        .sessions
        .get(session_id)
        .ok_or_else(|| LudusError::NotFound(format!("session {:?}", session_id)))?;
    if session.mode != MODE_QUICKSTART {
        return Err(LudusError::WrongMode(format!(
            "session {:?} is not in quickstart mode",
            session_id
        )));
    }

    let main_lineage = session
        .lineage_by_name("main")
        .ok_or_else(|| LudusError::NotFound("lineage \"main\"".to_string()))?;
    let base_agent = main_lineage
        .latest_agent()
        .ok_or_else(|| LudusError::Validation("lineage \"main\" has no agents".to_string()))?
        .clone();
    let need = session.need.clone();

    let variants = variants_for_strategy(strategy)?;
    let cfg = provider_config(
        flags,
        &base_agent.generation_metadata.provider,
        &base_agent.definition.model,
    );
    let provider = source.provider_for(&cfg)?;

    let now = now_rfc3339();
    let mut lineages = BTreeMap::new();
    for variant in variants {
        let lineage_id = new_prefixed_id("lin");
        let agent_id = new_prefixed_id("agt");

        let promotion_prompt = format!(
            "{}\n\nOriginal system prompt:\n{}\n\nPromotion strategy: {}",
            need, base_agent.definition.system_prompt, variant.strategy
        );

        let (definition, generation_metadata) = generate_agent_definition(
            &CancelToken::new(),
            &promotion_prompt,
            &[],
            provider.as_ref(),
        )?;

        lineages.insert(
            lineage_id.clone(),
            Lineage {
                id: lineage_id.clone(),
                session_id: session_id.to_string(),
                name: variant.name.to_string(),
                locked: false,
                agents: vec![Agent {
                    id: agent_id,
                    lineage_id,
                    version: 1,
                    definition,
                    created_at: now.clone(),
                    generation_metadata,
                }],
                artifacts: vec![],
                directives: Directives::default(),
            },
        );
    }

    let session = st.sessions.get_mut(session_id).expect("session located");
    session.mode = MODE_TRAINING.to_string();
    session.lineages = lineages;

    store.save(&st)?;
    Ok(PromoteOutcome {
        session_id: session_id.to_string(),
        mode: MODE_TRAINING.to_string(),
        lineages: vec!["A".into(), "B".into(), "C".into(), "D".into()],
    })
}

pub fn run_promote_cli(
    store: &Store,
    session_id: &str,
    strategy: &str,
    flags: &Config,
    source: &dyn ProviderSource,
    output: OutputMode,
) -> Result<(), LudusError> {
    let outcome = promote(store, session_id, strategy, flags, source)?;
    match output {
        OutputMode::Json => print_json(&outcome),
        OutputMode::Text => {
            println!("Session promoted to training mode with 4 lineages");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::quickstart::quickstart_init;
    use crate::commands::MockSource;
    use crate::core::provider::MockProvider;
    use tempfile::tempdir;

    fn quickstart_store() -> (tempfile::TempDir, Store, String) {
        let tmp = tempdir().unwrap();
        let store = Store::new(tmp.path().join("state.json"));
        let source = MockSource(MockProvider::new().with_generate(["Baseline v1"]));
        let outcome =
            quickstart_init(&store, "support agent", &Config::default(), &source).unwrap();
        (tmp, store, outcome.session_id)
    }

    #[test]
    fn test_promote_replaces_main_with_four_lineages() {
        let (_tmp, store, session_id) = quickstart_store();
        let source = MockSource(MockProvider::new().with_generate([
            "Variant A",
            "Variant B",
            "Variant C",
            "Variant D",
        ]));

        let outcome = promote(
            &store,
            &session_id,
            STRATEGY_VARIATIONS,
            &Config::default(),
            &source,
        )
        .unwrap();
        assert_eq!(outcome.lineages, vec!["A", "B", "C", "D"]);

        let st = store.load().unwrap();
        let session = &st.sessions[&session_id];
        assert_eq!(session.mode, MODE_TRAINING);
        assert!(session.lineage_by_name("main").is_none());
        for name in ["A", "B", "C", "D"] {
            let lineage = session.lineage_by_name(name).unwrap();
            assert_eq!(lineage.agents.len(), 1);
            assert_eq!(lineage.agents[0].version, 1);
        }
    }

    #[test]
    fn test_promote_rejects_second_promotion() {
        let (_tmp, store, session_id) = quickstart_store();
        let source = MockSource(MockProvider::new().with_generate(["V"]));
        promote(&store, &session_id, "", &Config::default(), &source).unwrap();

        let err =
            promote(&store, &session_id, "", &Config::default(), &source).unwrap_err();
        assert!(matches!(err, LudusError::WrongMode(_)));
    }

    #[test]
    fn test_promote_rejects_unknown_strategy() {
        let (_tmp, store, session_id) = quickstart_store();
        let source = MockSource(MockProvider::new());
        let err = promote(
            &store,
            &session_id,
            "hybrid",
            &Config::default(),
            &source,
        )
        .unwrap_err();
        assert!(matches!(err, LudusError::Validation(_)));
    }

    #[test]
    fn test_promote_alternatives_strategy_accepted() {
        let (_tmp, store, session_id) = quickstart_store();
        let source = MockSource(MockProvider::new().with_generate(["V"]));
        let outcome = promote(
            &store,
            &session_id,
            STRATEGY_ALTERNATIVES,
            &Config::default(),
            &source,
        )
        .unwrap();
        assert_eq!(outcome.mode, MODE_TRAINING);
    }
}
