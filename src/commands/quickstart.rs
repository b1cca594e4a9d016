//! `quickstart init`: create a session with a single generated agent on
//! lineage `main`.

use crate::commands::session::STATUS_ACTIVE;
use crate::commands::{print_json, OutputMode, ProviderSource};
use crate::core::cancel::CancelToken;
use crate::core::error::LudusError;
use crate::core::id::new_prefixed_id;
use crate::core::provider::Config;
use crate::core::state::{
    Agent, Directives, Lineage, Session, MODE_QUICKSTART,
};
use crate::core::store::Store;
use crate::core::time::now_rfc3339;
use crate::engine::generate::generate_agent_definition;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct QuickstartOutcome {
    pub session_id: String,
    pub lineage_id: String,
}

/// Creates a quickstart session whose `main` lineage holds the generated
/// v1 agent.
pub fn quickstart_init(
    store: &Store,
    need: &str,
    flags: &Config,
    source: &dyn ProviderSource,
) -> Result<QuickstartOutcome, LudusError> {
    let mut st = store.load()?;

    let now = now_rfc3339();
    let session_id = new_prefixed_id("ses");
    let lineage_id = new_prefixed_id("lin");
    let agent_id = new_prefixed_id("agt");

    let provider = source.provider_for(flags)?;
    let (definition, generation_metadata) =
        generate_agent_definition(&CancelToken::new(), need, &[], provider.as_ref())?;

    let main_lineage = Lineage {
        id: lineage_id.clone(),
        session_id: session_id.clone(),
        name: "main".to_string(),
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
    };

    st.sessions.insert(
        session_id.clone(),
        Session {
            id: session_id.clone(),
            mode: MODE_QUICKSTART.to_string(),
            need: need.to_string(),
            created_at: now,
            status: STATUS_ACTIVE.to_string(),
            lineages: [(lineage_id.clone(), main_lineage)].into_iter().collect(),
        },
    );

    store.save(&st)?;
    Ok(QuickstartOutcome {
        session_id,
        lineage_id,
    })
}

pub fn run_init_cli(
    store: &Store,
    need: &str,
    flags: &Config,
    source: &dyn ProviderSource,
    output: OutputMode,
) -> Result<(), LudusError> {
    let outcome = quickstart_init(store, need, flags, source)?;
    match output {
        OutputMode::Json => print_json(&outcome),
        OutputMode::Text => {
            println!("session_id={}", outcome.session_id);
            println!("lineage_id={}", outcome.lineage_id);
            Ok(())
        }
    }
}
