//! `training init` and `training iterate`.
//!
//! Training sessions carry four lineages A/B/C/D, each seeded from the need
//! plus a per-lineage variation strategy. `training iterate` re-evolves the
//! unlocked lineages and reports the locked ones.

use crate::commands::iterate::next_agent_for_lineage;
use crate::commands::session::STATUS_ACTIVE;
use crate::commands::{print_json, OutputMode, ProviderSource};
use crate::core::cancel::CancelToken;
use crate::core::error::LudusError;
use crate::core::id::new_prefixed_id;
use crate::core::provider::Config;
use crate::core::state::{Agent, Directives, Lineage, Session, MODE_TRAINING};
use crate::core::store::Store;
use crate::core::time::now_rfc3339;
use crate::engine::generate::generate_agent_definition;
use serde::Serialize;
use std::collections::BTreeMap;

/// One named lineage seed.
pub(crate) struct TrainingVariant {
    pub name: &'static str,
    pub strategy: &'static str,
}

/// The four variation seeds used by `training init` and by promote with the
/// `variations` strategy.
pub(crate) const DEFAULT_TRAINING_VARIANTS: [TrainingVariant; 4] = [
    TrainingVariant {
        name: "A",
        strategy: "conservative approach, prioritize safety",
    },
    TrainingVariant {
        name: "B",
        strategy: "balanced approach, equal priority to effectiveness and safety",
    },
    TrainingVariant {
        name: "C",
        strategy: "creative approach, prioritize novel solutions",
    },
    TrainingVariant {
        name: "D",
        strategy: "aggressive approach, prioritize speed and efficiency",
    },
];

/// The four methodology seeds used by promote with the `alternatives`
/// strategy.
pub(crate) const ALTERNATIVE_TRAINING_VARIANTS: [TrainingVariant; 4] = [
    TrainingVariant {
        name: "A",
        strategy: "fundamentally different methodology: deterministic rule-based workflow",
    },
    TrainingVariant {
        name: "B",
        strategy: "fundamentally different methodology: retrieval-first evidence-driven workflow",
    },
    TrainingVariant {
        name: "C",
        strategy: "fundamentally different methodology: planning-first decomposition workflow",
    },
    TrainingVariant {
        name: "D",
        strategy: "fundamentally different methodology: critique-and-revise self-review workflow",
    },
];

#[derive(Debug, Clone, Serialize)]
pub struct TrainingInitOutcome {
    pub session_id: String,
    /// Lineage ids keyed by lineage name.
    pub lineages: BTreeMap<String, String>,
}

/// Creates a training-mode session with lineages A/B/C/D, one generated
/// v1 agent each.
pub fn training_init(
    store: &Store,
    need: &str,
    flags: &Config,
    source: &dyn ProviderSource,
) -> Result<TrainingInitOutcome, LudusError> {
    let mut st = store.load()?;

    let now = now_rfc3339();
    let session_id = new_prefixed_id("ses");
    let provider = source.provider_for(flags)?;

    let mut lineages = BTreeMap::new();
    let mut ids_by_name = BTreeMap::new();

    for variant in &DEFAULT_TRAINING_VARIANTS {
        let lineage_id = new_prefixed_id("lin");
        let agent_id = new_prefixed_id("agt");
        let variant_need = format!("{}\n\nVariation strategy: {}", need, variant.strategy);

        let (definition, generation_metadata) =
            generate_agent_definition(&CancelToken::new(), &variant_need, &[], provider.as_ref())?;

        lineages.insert(
            lineage_id.clone(),
            Lineage {
                id: lineage_id.clone(),
                session_id: session_id.clone(),
                name: variant.name.to_string(),
                locked: false,
                agents: vec![Agent {
                    id: agent_id,
                    lineage_id: lineage_id.clone(),
                    version: 1,
                    definition,
                    created_at: now.clone(),
                    generation_metadata,
                }],
                artifacts: vec![],
                directives: Directives::default(),
            },
        );
        ids_by_name.insert(variant.name.to_string(), lineage_id);
    }

    st.sessions.insert(
        session_id.clone(),
        Session {
            id: session_id.clone(),
            mode: MODE_TRAINING.to_string(),
            need: need.to_string(),
            created_at: now,
            status: STATUS_ACTIVE.to_string(),
            lineages,
        },
    );

    store.save(&st)?;
    Ok(TrainingInitOutcome {
        session_id,
        lineages: ids_by_name,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingIterateOutcome {
    pub regenerated: Vec<String>,
    pub locked: Vec<String>,
}

impl TrainingIterateOutcome {
    /// The status line of the text renderer.
    pub fn summary(&self) -> String {
        let regenerated = if self.regenerated.is_empty() {
            "none".to_string()
        } else {
            self.regenerated.join(", ")
        };
        let locked = if self.locked.is_empty() {
            "none".to_string()
        } else {
            self.locked.join(", ")
        };
        format!(
            "Regenerated {} lineages: {}. Locked: {}.",
            self.regenerated.len(),
            regenerated,
            locked
        )
    }
}

/// Evolves every unlocked lineage A..D of a training session by one agent
/// version; locked lineages are recorded and skipped.
pub fn training_iterate(
    store: &Store,
    session_id: &str,
    flags: &Config,
    source: &dyn ProviderSource,
) -> Result<TrainingIterateOutcome, LudusError> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(LudusError::Validation("session id is required".to_string()));
    }

    let mut st = store.load()?;
    let session = st
        .sessions
        .get_mut(session_id)
        .ok_or_else(|| LudusError::NotFound(format!("session {:?}", session_id)))?;
    if session.mode != MODE_TRAINING {
        return Err(LudusError::WrongMode(format!(
            "session {:?} is not in training mode",
            session_id
        )));
    }

    let mut regenerated = Vec::new();
    let mut locked = Vec::new();

    for variant in &DEFAULT_TRAINING_VARIANTS {
        let lineage_key = match session.lineage_key_by_name(variant.name) {
            Some(key) => key,
            None => continue,
        };
        let lineage = session.lineages.get_mut(&lineage_key).expect("key located");

        if lineage.locked {
            locked.push(lineage.name.clone());
            continue;
        }

        let next_agent = next_agent_for_lineage(lineage, flags, source)?;
        lineage.agents.push(next_agent);
        lineage.directives.oneshot.clear();
        regenerated.push(lineage.name.clone());
    }

    store.save(&st)?;
    Ok(TrainingIterateOutcome {
        regenerated,
        locked,
    })
}

pub fn run_init_cli(
    store: &Store,
    need: &str,
    flags: &Config,
    source: &dyn ProviderSource,
    output: OutputMode,
) -> Result<(), LudusError> {
    let outcome = training_init(store, need, flags, source)?;
    match output {
        OutputMode::Json => {
            let mut payload = serde_json::Map::new();
            payload.insert(
                "session_id".to_string(),
                serde_json::json!(outcome.session_id),
            );
            for (name, id) in &outcome.lineages {
                payload.insert(format!("lineage_{}_id", name), serde_json::json!(id));
            }
            print_json(&payload)
        }
        OutputMode::Text => {
            println!("session_id={}", outcome.session_id);
            for (name, id) in &outcome.lineages {
                println!("lineage_{}_id={}", name, id);
            }
            Ok(())
        }
    }
}

pub fn run_iterate_cli(
    store: &Store,
    session_id: &str,
    flags: &Config,
    source: &dyn ProviderSource,
    output: OutputMode,
) -> Result<(), LudusError> {
    let outcome = training_iterate(store, session_id, flags, source)?;
    match output {
        OutputMode::Json => print_json(&serde_json::json!({
            "regenerated_count": outcome.regenerated.len(),
            "regenerated": outcome.regenerated,
            "locked": outcome.locked,
        })),
        OutputMode::Text => {
            println!("{}", outcome.summary());
            Ok(())
        }
    }
}
