//! `run`: execute the latest agent of a lineage on one input and store the
//! resulting artifact.

use crate::commands::{print_json, provider_config, OutputMode, ProviderSource};
use crate::core::cancel::CancelToken;
use crate::core::error::LudusError;
use crate::core::provider::Config;
use crate::core::state::{Artifact, MODE_QUICKSTART};
use crate::core::store::Store;
use crate::engine::execute::{execute, ExecuteRequest, MODE_API};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub artifact_id: String,
}

/// Executes the latest agent and appends an artifact with full execution
/// metadata.
#[allow(clippy::too_many_arguments)]
pub fn run(
    store: &Store,
    session_id: &str,
    lineage_name: Option<&str>,
    input: &str,
    mode: &str,
    executor: &str,
    flags: &Config,
    source: &dyn ProviderSource,
) -> Result<RunOutcome, LudusError> {
    let st = store.load()?;
    let session = st
        .sessions
        .get(session_id)
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

    let lineage = session
        .lineage_by_name(&selected)
        .ok_or_else(|| LudusError::NotFound(format!("lineage {:?}", selected)))?;
    let agent = lineage
        .latest_agent()
        .ok_or_else(|| LudusError::Validation(format!("lineage {:?} has no agents", selected)))?;

    let provider;
    let mut request = ExecuteRequest {
        mode: mode.to_string(),
        input: input.to_string(),
        definition: agent.definition.clone(),
        provider: None,
        executor: executor.to_string(),
        timeout_ms: 0,
    };

    if mode.trim().is_empty() || mode.trim() == MODE_API {
        let cfg = provider_config(
            flags,
            &agent.generation_metadata.provider,
            &agent.definition.model,
        );
        provider = source.provider_for(&cfg)?;
        request.provider = Some(provider.as_ref());
    }

    let result = execute(&CancelToken::new(), &request)?;

    let artifact = Artifact {
        id: String::new(),
        agent_id: agent.id.clone(),
        input: input.to_string(),
        output: result.output,
        created_at: String::new(),
        execution_metadata: result.metadata,
        evaluation: None,
    };

    let artifact_id = store.add_artifact(session_id, &lineage.id, artifact)?;
    Ok(RunOutcome { artifact_id })
}

#[allow(clippy::too_many_arguments)]
pub fn run_run_cli(
    store: &Store,
    session_id: &str,
    lineage_name: Option<&str>,
    input: &str,
    mode: &str,
    executor: &str,
    flags: &Config,
    source: &dyn ProviderSource,
    output: OutputMode,
) -> Result<(), LudusError> {
    let outcome = run(
        store,
        session_id,
        lineage_name,
        input,
        mode,
        executor,
        flags,
        source,
    )?;
    match output {
        OutputMode::Json => print_json(&outcome),
        OutputMode::Text => {
            println!("artifact_id={}", outcome.artifact_id);
            Ok(())
        }
    }
}
