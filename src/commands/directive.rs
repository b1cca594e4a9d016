//! `directive set` / `directive clear`.

use crate::commands::{print_json, OutputMode};
use crate::core::error::LudusError;
use crate::core::store::{DirectiveKind, Store};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DirectiveSetOutcome {
    pub directive_id: String,
    pub lineage: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Adds a directive to one lineage; exactly one of oneshot/sticky must be
/// requested.
pub fn directive_set(
    store: &Store,
    session_id: &str,
    lineage_name: &str,
    text: &str,
    oneshot: bool,
    sticky: bool,
) -> Result<DirectiveSetOutcome, LudusError> {
    let session_id = session_id.trim();
    let lineage_name = lineage_name.trim();
    if session_id.is_empty() || lineage_name.is_empty() {
        return Err(LudusError::Validation(
            "session id and lineage name are required".to_string(),
        ));
    }
    if !oneshot && !sticky {
        return Err(LudusError::Validation(
            "must specify --oneshot or --sticky".to_string(),
        ));
    }
    if oneshot && sticky {
        return Err(LudusError::Validation(
            "must specify exactly one of --oneshot or --sticky".to_string(),
        ));
    }

    let kind = if oneshot {
        DirectiveKind::Oneshot
    } else {
        DirectiveKind::Sticky
    };
    let directive = store.set_directive(session_id, lineage_name, text, kind)?;

    Ok(DirectiveSetOutcome {
        directive_id: directive.id,
        lineage: lineage_name.to_string(),
        kind: if oneshot { "oneshot" } else { "sticky" }.to_string(),
    })
}

/// Removes a directive from one lineage.
pub fn directive_clear(
    store: &Store,
    session_id: &str,
    lineage_name: &str,
    directive_id: &str,
) -> Result<(), LudusError> {
    let session_id = session_id.trim();
    let lineage_name = lineage_name.trim();
    let directive_id = directive_id.trim();
    if session_id.is_empty() || lineage_name.is_empty() || directive_id.is_empty() {
        return Err(LudusError::Validation(
            "session id, lineage name, and directive id are required".to_string(),
        ));
    }
    store.clear_directive(session_id, lineage_name, directive_id)
}

#[allow(clippy::too_many_arguments)]
pub fn run_set_cli(
    store: &Store,
    session_id: &str,
    lineage_name: &str,
    text: &str,
    oneshot: bool,
    sticky: bool,
    output: OutputMode,
) -> Result<(), LudusError> {
    let outcome = directive_set(store, session_id, lineage_name, text, oneshot, sticky)?;
    match output {
        OutputMode::Json => print_json(&outcome),
        OutputMode::Text => {
            println!("directive_id={}", outcome.directive_id);
            Ok(())
        }
    }
}

pub fn run_clear_cli(
    store: &Store,
    session_id: &str,
    lineage_name: &str,
    directive_id: &str,
    _output: OutputMode,
) -> Result<(), LudusError> {
    directive_clear(store, session_id, lineage_name, directive_id)?;
    println!("directive_id={} cleared", directive_id.trim());
    Ok(())
}
