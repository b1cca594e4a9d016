//! `lineage lock` / `lineage unlock`.

use crate::commands::{print_json, OutputMode};
use crate::core::error::LudusError;
use crate::core::store::Store;

/// Sets the locked flag on one lineage.
pub fn set_lock(
    store: &Store,
    session_id: &str,
    lineage_name: &str,
    locked: bool,
) -> Result<(), LudusError> {
    let session_id = session_id.trim();
    let lineage_name = lineage_name.trim();
    if session_id.is_empty() || lineage_name.is_empty() {
        return Err(LudusError::Validation(
            "session id and lineage name are required".to_string(),
        ));
    }
    store.set_lineage_lock(session_id, lineage_name, locked)
}

pub fn run_lock_cli(
    store: &Store,
    session_id: &str,
    lineage_name: &str,
    locked: bool,
    output: OutputMode,
) -> Result<(), LudusError> {
    set_lock(store, session_id, lineage_name, locked)?;
    match output {
        OutputMode::Json => print_json(&serde_json::json!({
            "session_id": session_id.trim(),
            "lineage": lineage_name.trim(),
            "locked": locked,
        })),
        OutputMode::Text => {
            if locked {
                println!("Lineage {} locked", lineage_name.trim());
            } else {
                println!("Lineage {} unlocked", lineage_name.trim());
            }
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
    fn test_lock_and_unlock() {
        let tmp = tempdir().unwrap();
        let store = Store::new(tmp.path().join("state.json"));
        let source = MockSource(MockProvider::new().with_generate(["Baseline v1"]));
        let session =
            quickstart_init(&store, "support agent", &Config::default(), &source).unwrap();

        set_lock(&store, &session.session_id, "main", true).unwrap();
        assert!(
            store.load().unwrap().sessions[&session.session_id]
                .lineage_by_name("main")
                .unwrap()
                .locked
        );

        set_lock(&store, &session.session_id, "main", false).unwrap();
        assert!(
            !store.load().unwrap().sessions[&session.session_id]
                .lineage_by_name("main")
                .unwrap()
                .locked
        );

        let err = set_lock(&store, &session.session_id, "Z", true).unwrap_err();
        assert!(matches!(err, LudusError::NotFound(_)));
    }
}
