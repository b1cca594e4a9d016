//! State persistence and transactional mutators.
//!
//! The store is a value type holding the state file path. Every mutator is
//! optimistic: load → modify → save. The save path is atomic (serialize to a
//! temp file in the target directory, then rename), so a crash mid-write
//! leaves the prior version intact. There is no in-process locking; callers
//! must not run two commands concurrently against the same state file.

use crate::core::error::LudusError;
use crate::core::id::new_prefixed_id;
use crate::core::migration::migrate_state;
use crate::core::state::{Artifact, Evaluation, State};
use crate::core::time::now_rfc3339;
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const STATE_DIR_NAME: &str = ".ludus-magnus";
const STATE_FILE_NAME: &str = "state.json";

/// Which directive list a mutation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveKind {
    Oneshot,
    Sticky,
}

/// Handle to the on-disk state document.
#[derive(Debug, Clone)]
pub struct Store {
    pub path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Store { path: path.into() }
    }

    /// Returns the default on-disk state location (`.ludus-magnus/state.json`).
    pub fn default_path() -> PathBuf {
        Path::new(STATE_DIR_NAME).join(STATE_FILE_NAME)
    }

    /// Reads and decodes state from disk. A missing file yields a fresh empty
    /// state; an undecodable file fails `StoreCorrupt`. Migration runs on
    /// every load.
    pub fn load(&self) -> Result<State, LudusError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(State::new());
            }
            Err(err) => return Err(LudusError::Io(err)),
        };

        let mut st: State = serde_json::from_str(&content)
            .map_err(|err| LudusError::StoreCorrupt(format!("{}: {}", self.path.display(), err)))?;
        migrate_state(&mut st)?;
        Ok(st)
    }

    /// Encodes and writes state to disk atomically.
    pub fn save(&self, st: &State) -> Result<(), LudusError> {
        let mut st = st.clone();
        if st.version.is_empty() {
            st.version = crate::core::state::CURRENT_VERSION.to_string();
        }
        write_json_atomic(&self.path, &st)
    }

    /// Appends one artifact to a lineage, generating a globally unique id
    /// when the artifact carries none. Returns the artifact id.
    pub fn add_artifact(
        &self,
        session_id: &str,
        lineage_id: &str,
        mut artifact: Artifact,
    ) -> Result<String, LudusError> {
        let mut st = self.load()?;

        if !st.sessions.contains_key(session_id) {
            return Err(LudusError::NotFound(format!("session {:?}", session_id)));
        }

        if artifact.id.trim().is_empty() {
            artifact.id = new_unique_artifact_id(&st)?;
        } else if artifact_id_exists(&st, &artifact.id) {
            return Err(LudusError::Validation(format!(
                "duplicate artifact id {:?}",
                artifact.id
            )));
        }
        if artifact.created_at.trim().is_empty() {
            artifact.created_at = now_rfc3339();
        }

        let session = st
            .sessions
            .get_mut(session_id)
            .expect("session presence checked above");
        let lineage = session
            .lineages
            .values_mut()
            .find(|lineage| lineage.id == lineage_id)
            .ok_or_else(|| {
                LudusError::NotFound(format!(
                    "lineage {:?} in session {:?}",
                    lineage_id, session_id
                ))
            })?;

        let id = artifact.id.clone();
        lineage.artifacts.push(artifact);
        self.save(&st)?;
        Ok(id)
    }

    /// Stores immutable single-score feedback for one artifact.
    pub fn evaluate_artifact(
        &self,
        artifact_id: &str,
        score: i64,
        comment: &str,
    ) -> Result<(), LudusError> {
        if !(1..=10).contains(&score) {
            return Err(LudusError::Validation(
                "score must be between 1-10".to_string(),
            ));
        }

        let mut st = self.load()?;
        let (session_id, lineage_key, index) = find_unique_artifact(&st, artifact_id)?;

        let artifact = &mut st
            .sessions
            .get_mut(&session_id)
            .expect("session located above")
            .lineages
            .get_mut(&lineage_key)
            .expect("lineage located above")
            .artifacts[index];

        if artifact.evaluation.is_some() {
            return Err(LudusError::AlreadyEvaluated);
        }
        artifact.evaluation = Some(Evaluation {
            score,
            comment: comment.trim().to_string(),
            evaluated_at: now_rfc3339(),
        });

        self.save(&st)
    }

    /// Finds one artifact by globally unique id.
    pub fn lookup_artifact(&self, artifact_id: &str) -> Result<Artifact, LudusError> {
        let st = self.load()?;
        let (session_id, lineage_key, index) = find_unique_artifact(&st, artifact_id)?;
        Ok(st.sessions[&session_id].lineages[&lineage_key].artifacts[index].clone())
    }

    /// Finds one agent by globally unique id.
    pub fn lookup_agent(&self, agent_id: &str) -> Result<crate::core::state::Agent, LudusError> {
        let target = agent_id.trim();
        if target.is_empty() {
            return Err(LudusError::Validation("agent id is required".to_string()));
        }

        let st = self.load()?;
        let mut found = None;
        for session in st.sessions.values() {
            for lineage in session.lineages.values() {
                for agent in &lineage.agents {
                    if agent.id != target {
                        continue;
                    }
                    if found.is_some() {
                        return Err(LudusError::NotUnique(format!(
                            "agent id {:?} is not unique",
                            target
                        )));
                    }
                    found = Some(agent.clone());
                }
            }
        }

        found.ok_or_else(|| LudusError::NotFound(format!("agent {:?}", target)))
    }

    /// Appends a directive to one lineage. Returns the stored directive.
    pub fn set_directive(
        &self,
        session_id: &str,
        lineage_name: &str,
        text: &str,
        kind: DirectiveKind,
    ) -> Result<crate::core::state::Directive, LudusError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(LudusError::Validation(
                "directive text is required".to_string(),
            ));
        }

        let mut st = self.load()?;
        let lineage = lineage_by_name_mut(&mut st, session_id, lineage_name)?;
        let directive = crate::core::state::Directive {
            id: new_prefixed_id("dir"),
            text: trimmed.to_string(),
            created_at: now_rfc3339(),
        };
        match kind {
            DirectiveKind::Oneshot => lineage.directives.oneshot.push(directive.clone()),
            DirectiveKind::Sticky => lineage.directives.sticky.push(directive.clone()),
        }
        self.save(&st)?;
        Ok(directive)
    }

    /// Removes one directive from a lineage, searching sticky then oneshot.
    pub fn clear_directive(
        &self,
        session_id: &str,
        lineage_name: &str,
        directive_id: &str,
    ) -> Result<(), LudusError> {
        let mut st = self.load()?;
        let lineage = lineage_by_name_mut(&mut st, session_id, lineage_name)?;

        let sticky_len = lineage.directives.sticky.len();
        lineage.directives.sticky.retain(|d| d.id != directive_id);
        let mut removed = lineage.directives.sticky.len() != sticky_len;

        if !removed {
            let oneshot_len = lineage.directives.oneshot.len();
            lineage.directives.oneshot.retain(|d| d.id != directive_id);
            removed = lineage.directives.oneshot.len() != oneshot_len;
        }
        if !removed {
            return Err(LudusError::NotFound(format!(
                "directive {:?}",
                directive_id
            )));
        }

        self.save(&st)
    }

    /// Sets the locked flag on one lineage.
    pub fn set_lineage_lock(
        &self,
        session_id: &str,
        lineage_name: &str,
        locked: bool,
    ) -> Result<(), LudusError> {
        let mut st = self.load()?;
        let lineage = lineage_by_name_mut(&mut st, session_id, lineage_name)?;
        lineage.locked = locked;
        self.save(&st)
    }

    /// Appends one agent version to a lineage. The version must extend the
    /// chain by exactly one.
    pub fn add_agent(
        &self,
        session_id: &str,
        lineage_name: &str,
        agent: crate::core::state::Agent,
    ) -> Result<(), LudusError> {
        let mut st = self.load()?;
        let lineage = lineage_by_name_mut(&mut st, session_id, lineage_name)?;
        let prior_max = lineage.latest_agent().map(|a| a.version).unwrap_or(0);
        if agent.version != prior_max + 1 {
            return Err(LudusError::Validation(format!(
                "agent version {} does not extend lineage at version {}",
                agent.version, prior_max
            )));
        }
        lineage.agents.push(agent);
        self.save(&st)
    }
}

impl Default for Store {
    fn default() -> Self {
        Store::new(Store::default_path())
    }
}

/// Serializes a value as pretty-printed JSON with a trailing newline and
/// writes it atomically (temp file in the target directory + rename).
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), LudusError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut content = serde_json::to_vec_pretty(value)?;
    content.push(b'\n');

    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(&content)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))?;
    }
    tmp.persist(path).map_err(|err| LudusError::Io(err.error))?;
    Ok(())
}

fn lineage_by_name_mut<'a>(
    st: &'a mut State,
    session_id: &str,
    lineage_name: &str,
) -> Result<&'a mut crate::core::state::Lineage, LudusError> {
    let session = st
        .sessions
        .get_mut(session_id)
        .ok_or_else(|| LudusError::NotFound(format!("session {:?}", session_id)))?;
    session
        .lineages
        .values_mut()
        .find(|lineage| lineage.name == lineage_name)
        .ok_or_else(|| LudusError::NotFound(format!("lineage {:?}", lineage_name)))
}

fn new_unique_artifact_id(st: &State) -> Result<String, LudusError> {
    const MAX_ATTEMPTS: usize = 256;
    for _ in 0..MAX_ATTEMPTS {
        let candidate = new_prefixed_id("art");
        if !artifact_id_exists(st, &candidate) {
            return Ok(candidate);
        }
    }
    Err(LudusError::Validation(format!(
        "failed to generate globally unique artifact id after {} attempts",
        MAX_ATTEMPTS
    )))
}

fn artifact_id_exists(st: &State, artifact_id: &str) -> bool {
    st.sessions.values().any(|session| {
        session.lineages.values().any(|lineage| {
            lineage
                .artifacts
                .iter()
                .any(|artifact| artifact.id == artifact_id)
        })
    })
}

/// Locates one artifact by globally unique id, failing when the id is blank,
/// missing, or ambiguous.
fn find_unique_artifact(
    st: &State,
    artifact_id: &str,
) -> Result<(String, String, usize), LudusError> {
    let target = artifact_id.trim();
    if target.is_empty() {
        return Err(LudusError::Validation(
            "artifact id is required".to_string(),
        ));
    }

    let mut found: Option<(String, String, usize)> = None;
    for (session_id, session) in &st.sessions {
        for (lineage_key, lineage) in &session.lineages {
            for (index, artifact) in lineage.artifacts.iter().enumerate() {
                if artifact.id != target {
                    continue;
                }
                if found.is_some() {
                    return Err(LudusError::NotUnique(format!(
                        "artifact id {:?} is not unique",
                        target
                    )));
                }
                found = Some((session_id.clone(), lineage_key.clone(), index));
            }
        }
    }

    found.ok_or_else(|| LudusError::NotFound(format!("artifact {:?}", target)))
}
