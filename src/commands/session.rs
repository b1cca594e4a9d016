//! `session new` / `session list` / `session inspect`.

use crate::commands::{print_json, OutputMode};
use crate::core::error::LudusError;
use crate::core::id::new_prefixed_id;
use crate::core::state::{Session, MODE_QUICKSTART, MODE_TRAINING};
use crate::core::store::Store;
use crate::core::time::now_rfc3339;
use serde::Serialize;
use std::collections::BTreeMap;

pub const STATUS_ACTIVE: &str = "active";

/// Creates a bare session (no lineages) and returns its id.
pub fn session_new(store: &Store, mode: &str, need: &str) -> Result<String, LudusError> {
    let mode = mode.trim();
    if mode != MODE_QUICKSTART && mode != MODE_TRAINING {
        return Err(LudusError::Validation(format!(
            "unsupported mode {:?}",
            mode
        )));
    }

    let mut st = store.load()?;
    let session_id = new_prefixed_id("ses");
    st.sessions.insert(
        session_id.clone(),
        Session {
            id: session_id.clone(),
            mode: mode.to_string(),
            need: need.trim().to_string(),
            created_at: now_rfc3339(),
            status: STATUS_ACTIVE.to_string(),
            lineages: BTreeMap::new(),
        },
    );
    store.save(&st)?;
    Ok(session_id)
}

/// One row of `session list` output.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRow {
    pub id: String,
    pub mode: String,
    pub status: String,
    pub created_at: String,
}

/// Lists sessions sorted by id.
pub fn session_list(store: &Store) -> Result<Vec<SessionRow>, LudusError> {
    let st = store.load()?;
    Ok(st
        .sessions
        .values()
        .map(|session| SessionRow {
            id: session.id.clone(),
            mode: session.mode.clone(),
            status: session.status.clone(),
            created_at: session.created_at.clone(),
        })
        .collect())
}

/// Returns one session by id.
pub fn session_inspect(store: &Store, session_id: &str) -> Result<Session, LudusError> {
    let st = store.load()?;
    st.sessions
        .get(session_id)
        .cloned()
        .ok_or_else(|| LudusError::NotFound(format!("session {:?}", session_id)))
}

pub fn run_new_cli(
    store: &Store,
    mode: &str,
    need: &str,
    output: OutputMode,
) -> Result<(), LudusError> {
    let session_id = session_new(store, mode, need)?;
    match output {
        OutputMode::Json => print_json(&serde_json::json!({ "session_id": session_id })),
        OutputMode::Text => {
            println!("{}", session_id);
            Ok(())
        }
    }
}

pub fn run_list_cli(store: &Store, output: OutputMode) -> Result<(), LudusError> {
    let rows = session_list(store)?;
    match output {
        OutputMode::Json => print_json(&rows),
        OutputMode::Text => {
            println!("ID\tMODE\tSTATUS\tCREATED_AT");
            for row in rows {
                println!(
                    "{}\t{}\t{}\t{}",
                    row.id, row.mode, row.status, row.created_at
                );
            }
            Ok(())
        }
    }
}

pub fn run_inspect_cli(
    store: &Store,
    session_id: &str,
    _output: OutputMode,
) -> Result<(), LudusError> {
    let session = session_inspect(store, session_id)?;
    print_json(&session)
}
