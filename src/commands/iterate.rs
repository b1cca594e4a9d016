//! `iterate`: single-lineage evolution.
//!
//! Synthesizes the evolution prompt from the lineage's agents, artifacts,
//! and directives (sticky first, then one-shot), asks the provider for the
//! next definition, appends it as version+1, and clears the one-shot
//! directives. Sticky directives persist.

use crate::commands::{print_json, provider_config, OutputMode, ProviderSource};
use crate::core::cancel::CancelToken;
use crate::core::error::LudusError;
use crate::core::id::new_prefixed_id;
use crate::core::provider::Config;
use crate::core::state::{Agent, Directive, Lineage, MODE_QUICKSTART};
use crate::core::store::Store;
use crate::core::time::now_rfc3339;
use crate::engine::evolve::generate_evolution_prompt;
use crate::engine::generate::generate_agent_definition;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct IterateOutcome {
    pub agent_id: String,
    pub version: u32,
}

/// Builds the next agent version for one lineage from its evolution
/// feedback. The caller appends it and clears the one-shot directives.
pub(crate) fn next_agent_for_lineage(
    lineage: &Lineage,
    flags: &Config,
    source: &dyn ProviderSource,
) -> Result<Agent, LudusError> {
    let prev_agent = lineage.latest_agent().ok_or_else(|| {
        LudusError::Validation(format!("lineage {:?} has no agents", lineage.name))
    })?;

    let mut directives: Vec<Directive> = lineage.directives.sticky.clone();
    directives.extend(lineage.directives.oneshot.iter().cloned());

    let evolution_prompt =
        generate_evolution_prompt(&lineage.agents, &lineage.artifacts, &directives);

    let cfg = provider_config(
        flags,
        &prev_agent.generation_metadata.provider,
        &prev_agent.definition.model,
    );
    let provider = source.provider_for(&cfg)?;
    let (definition, generation_metadata) =
        generate_agent_definition(&CancelToken::new(), &evolution_prompt, &[], provider.as_ref())?;

    Ok(Agent {
        id: new_prefixed_id("agt"),
        lineage_id: lineage.id.clone(),
        version: prev_agent.version + 1,
        definition,
        created_at: now_rfc3339(),
        generation_metadata,
    })
}

/// Evolves one lineage of a session by one agent version.
pub fn iterate(
    store: &Store,
    session_id: &str,
    lineage_name: Option<&str>,
    flags: &Config,
    source: &dyn ProviderSource,
) -> Result<IterateOutcome, LudusError> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(LudusError::Validation("session id is required".to_string()));
    }

    let mut st = store.load()?;
    let session = st
        .sessions
        .get_mut(session_id)
        .ok_or_else(|| LudusError::NotFound(format!("session {:?}", session_id)))?;

    let selected = match lineage_name.map(str::trim).filter(|name| !name.is_empty()) {
        Some(name) => name.to_string(),
        None if session.mode == MODE_QUICKSTART => "main".to_string(),
        None => {
            return Err(LudusError::Validation(
                "--lineage is required for non-quickstart sessions".to_string(),
            ))
        }
    };

    let lineage_key = session
        .lineage_key_by_name(&selected)
        .ok_or_else(|| LudusError::NotFound(format!("lineage {:?}", selected)))?;
    let lineage = session.lineages.get_mut(&lineage_key).expect("key located");

    let next_agent = next_agent_for_lineage(lineage, flags, source)?;
    let outcome = IterateOutcome {
        agent_id: next_agent.id.clone(),
        version: next_agent.version,
    };

    lineage.agents.push(next_agent);
    lineage.directives.oneshot.clear();

    store.save(&st)?;
    Ok(outcome)
}

pub fn run_iterate_cli(
    store: &Store,
    session_id: &str,
    lineage_name: Option<&str>,
    flags: &Config,
    source: &dyn ProviderSource,
    output: OutputMode,
) -> Result<(), LudusError> {
    let outcome = iterate(store, session_id, lineage_name, flags, source)?;
    match output {
        OutputMode::Json => print_json(&outcome),
        OutputMode::Text => {
            println!("agent_id={}", outcome.agent_id);
            println!("version={}", outcome.version);
            Ok(())
        }
    }
}
