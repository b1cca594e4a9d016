//! Training-loop checkpoints: persisted snapshots allowing exact resumption.

use crate::arena::training::Loop;
use crate::core::error::LudusError;
use crate::core::store::write_json_atomic;
use crate::core::time::now_rfc3339;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CHECKPOINT_DIR: &str = ".ludus-magnus";
const CHECKPOINT_PREFIX: &str = "checkpoint_";

pub const REASON_GENERATION_COMPLETE: &str = "generation_complete";
pub const REASON_PAUSED: &str = "paused";
pub const REASON_ERROR: &str = "error";

/// Full training-loop snapshot wrapped with save metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    #[serde(rename = "loop")]
    pub training_loop: Loop,
    pub saved_at: String,
    /// "generation_complete", "paused", or "error".
    pub reason: String,
}

/// Persists a checkpoint at the default location for the loop.
pub fn save(training_loop: &Loop, reason: &str) -> Result<PathBuf, LudusError> {
    let path = default_path(&training_loop.id);
    save_to(&path, training_loop, reason)?;
    Ok(path)
}

/// Persists a checkpoint to a specific path. The write is atomic.
pub fn save_to(path: &Path, training_loop: &Loop, reason: &str) -> Result<(), LudusError> {
    let checkpoint = Checkpoint {
        training_loop: training_loop.clone(),
        saved_at: now_rfc3339(),
        reason: reason.to_string(),
    };
    write_json_atomic(path, &checkpoint)
}

/// Reads a checkpoint from the default location.
pub fn load(loop_id: &str) -> Result<Checkpoint, LudusError> {
    load_from(&default_path(loop_id))
}

/// Reads a checkpoint from a specific path.
pub fn load_from(path: &Path) -> Result<Checkpoint, LudusError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data)
        .map_err(|err| LudusError::StoreCorrupt(format!("{}: {}", path.display(), err)))
}

/// Whether a checkpoint exists for the given loop.
pub fn exists(loop_id: &str) -> bool {
    default_path(loop_id).is_file()
}

/// Deletes a checkpoint; missing files are fine.
pub fn remove(loop_id: &str) -> Result<(), LudusError> {
    remove_at(&default_path(loop_id))
}

pub fn remove_at(path: &Path) -> Result<(), LudusError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(LudusError::Io(err)),
    }
}

/// Standard checkpoint location for a loop.
pub fn default_path(loop_id: &str) -> PathBuf {
    Path::new(CHECKPOINT_DIR).join(format!("{}{}.json", CHECKPOINT_PREFIX, loop_id))
}

/// All checkpoint files in the default directory.
pub fn list() -> Result<Vec<PathBuf>, LudusError> {
    list_in(Path::new(CHECKPOINT_DIR))
}

/// All checkpoint files in a directory: regular `checkpoint_*.json` files
/// only. A missing directory yields an empty list, not an error.
pub fn list_in(dir: &Path) -> Result<Vec<PathBuf>, LudusError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
        Err(err) => return Err(LudusError::Io(err)),
    };

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(CHECKPOINT_PREFIX) && name.ends_with(".json") {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::runner::tests::contestant;
    use crate::arena::training::Config;
    use tempfile::tempdir;

    fn sample_loop() -> Loop {
        Loop::new(
            Config::default(),
            vec![
                contestant("c1", "lin_a"),
                contestant("c2", "lin_b"),
                contestant("c3", "lin_c"),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_checkpoint_round_trip() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("checkpoint_loop_1.json");
        let lp = sample_loop();

        save_to(&path, &lp, REASON_PAUSED).unwrap();
        let restored = load_from(&path).unwrap();
        assert_eq!(restored.reason, REASON_PAUSED);
        assert_eq!(restored.training_loop, lp);
        assert!(!restored.saved_at.is_empty());

        // The snapshot is keyed "loop" on disk.
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"loop\""));
        assert!(raw.ends_with('\n'));
    }

    #[test]
    fn test_list_in_missing_dir_is_empty() {
        let tmp = tempdir().unwrap();
        let listed = list_in(&tmp.path().join("no-such-dir")).unwrap();
        assert!(listed.is_empty());
    }

    #[test]
    fn test_list_in_filters_checkpoint_files() {
        let tmp = tempdir().unwrap();
        let lp = sample_loop();
        save_to(&tmp.path().join("checkpoint_loop_a.json"), &lp, REASON_ERROR).unwrap();
        std::fs::write(tmp.path().join("state.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("checkpoint_loop_b.txt"), "nope").unwrap();
        std::fs::create_dir(tmp.path().join("checkpoint_dir.json")).unwrap();

        let listed = list_in(tmp.path()).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0]
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("checkpoint_loop_a"));
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let tmp = tempdir().unwrap();
        remove_at(&tmp.path().join("checkpoint_gone.json")).unwrap();
    }

    #[test]
    fn test_corrupt_checkpoint_fails_decode() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("checkpoint_bad.json");
        std::fs::write(&path, "{broken").unwrap();
        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, LudusError::StoreCorrupt(_)));
    }
}
