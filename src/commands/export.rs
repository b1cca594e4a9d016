//! `export agent` / `export evidence`: deterministic renderings of stored
//! agents and session evidence packs.

use crate::commands::OutputMode;
use crate::core::error::LudusError;
use crate::core::state::{AgentDefinition, Artifact, Directives, Session};
use crate::core::store::Store;
use serde::Serialize;
use serde_json::Value;

pub const FORMAT_JSON: &str = "json";
pub const FORMAT_PYTHON: &str = "python";
pub const FORMAT_TYPESCRIPT: &str = "typescript";

/// Renders one stored agent definition in the requested format.
pub fn agent_definition(
    store: &Store,
    agent_id: &str,
    format: &str,
) -> Result<String, LudusError> {
    let agent = store.lookup_agent(agent_id)?;

    match normalize_format(format).as_str() {
        FORMAT_JSON => render_json(&agent.definition),
        FORMAT_PYTHON => Ok(render_python(&agent.definition)),
        FORMAT_TYPESCRIPT => Ok(render_typescript(&agent.definition)),
        other => Err(LudusError::Validation(format!(
            "unsupported export format {:?}",
            other
        ))),
    }
}

fn normalize_format(format: &str) -> String {
    let trimmed = format.trim();
    if trimmed.is_empty() {
        FORMAT_JSON.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

fn render_json(definition: &AgentDefinition) -> Result<String, LudusError> {
    Ok(format!(
        "{}\n",
        serde_json::to_string_pretty(definition)?
    ))
}

fn render_python(definition: &AgentDefinition) -> String {
    format!(
        "agent_definition = {{\n    \"system_prompt\": {},\n    \"model\": {},\n    \"temperature\": {},\n    \"max_tokens\": {},\n    \"tools\": {}\n}}\n",
        json_string(&definition.system_prompt),
        json_string(&definition.model),
        format_float(definition.temperature),
        definition.max_tokens,
        python_literal(&Value::Array(definition.tools.clone())),
    )
}

fn render_typescript(definition: &AgentDefinition) -> String {
    format!(
        "type AgentDefinition = {{\n  systemPrompt: string;\n  model: string;\n  temperature: number;\n  maxTokens: number;\n  tools: unknown[];\n}};\n\nconst agentDefinition: AgentDefinition = {{\n  systemPrompt: {},\n  model: {},\n  temperature: {},\n  maxTokens: {},\n  tools: {}\n}};\n\nexport default agentDefinition;\n",
        json_string(&definition.system_prompt),
        json_string(&definition.model),
        format_float(definition.temperature),
        definition.max_tokens,
        serde_json::to_string(&definition.tools).unwrap_or_else(|_| "null".to_string()),
    )
}

fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Renders a JSON value as a Python literal (None/True/False, sorted map
/// keys).
fn python_literal(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => json_string(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(python_literal).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|key| format!("{}: {}", json_string(key), python_literal(&map[key])))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}

/// One session's evidence bundle.
#[derive(Debug, Serialize)]
struct EvidencePack {
    session_id: String,
    mode: String,
    need: String,
    created_at: String,
    lineages: Vec<EvidenceLineage>,
}

#[derive(Debug, Serialize)]
struct EvidenceLineage {
    name: String,
    locked: bool,
    agent_versions: Vec<EvidenceAgent>,
    artifacts: Vec<Artifact>,
    directives: Directives,
}

#[derive(Debug, Serialize)]
struct EvidenceAgent {
    id: String,
    version: u32,
    system_prompt: String,
    created_at: String,
}

/// Renders one session's evidence pack as JSON. Lineages come out sorted by
/// id so the rendering is deterministic.
pub fn evidence_pack(
    store: &Store,
    session_id: &str,
    format: &str,
) -> Result<String, LudusError> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(LudusError::Validation("session id is required".to_string()));
    }

    let st = store.load()?;
    let session = st
        .sessions
        .get(session_id)
        .ok_or_else(|| LudusError::NotFound(format!("session {:?}", session_id)))?;

    match normalize_format(format).as_str() {
        FORMAT_JSON => {
            let pack = build_evidence_pack(session);
            Ok(format!("{}\n", serde_json::to_string_pretty(&pack)?))
        }
        other => Err(LudusError::Validation(format!(
            "unsupported export format {:?}",
            other
        ))),
    }
}

fn build_evidence_pack(session: &Session) -> EvidencePack {
    // BTreeMap iteration is already id-sorted.
    let lineages = session
        .lineages
        .values()
        .map(|lineage| EvidenceLineage {
            name: lineage.name.clone(),
            locked: lineage.locked,
            agent_versions: lineage
                .agents
                .iter()
                .map(|agent| EvidenceAgent {
                    id: agent.id.clone(),
                    version: agent.version,
                    system_prompt: agent.definition.system_prompt.clone(),
                    created_at: agent.created_at.clone(),
                })
                .collect(),
            artifacts: lineage.artifacts.clone(),
            directives: lineage.directives.clone(),
        })
        .collect();

    EvidencePack {
        session_id: session.id.clone(),
        mode: session.mode.clone(),
        need: session.need.clone(),
        created_at: session.created_at.clone(),
        lineages,
    }
}

pub fn run_agent_cli(
    store: &Store,
    agent_id: &str,
    format: &str,
    _output: OutputMode,
) -> Result<(), LudusError> {
    let agent_id = agent_id.trim();
    if agent_id.is_empty() {
        return Err(LudusError::Validation("agent id is required".to_string()));
    }
    print!("{}", agent_definition(store, agent_id, format)?);
    Ok(())
}

pub fn run_evidence_cli(
    store: &Store,
    session_id: &str,
    format: &str,
    _output: OutputMode,
) -> Result<(), LudusError> {
    print!("{}", evidence_pack(store, session_id, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::quickstart::quickstart_init;
    use crate::commands::MockSource;
    use crate::core::provider::{Config, MockProvider};
    use tempfile::tempdir;

    fn store_with_agent() -> (tempfile::TempDir, Store, String, String) {
        let tmp = tempdir().unwrap();
        let store = Store::new(tmp.path().join("state.json"));
        let source = MockSource(MockProvider::new().with_generate(["Baseline \"v1\""]));
        let session =
            quickstart_init(&store, "support agent", &Config::default(), &source).unwrap();
        let st = store.load().unwrap();
        let agent_id = st.sessions[&session.session_id]
            .lineage_by_name("main")
            .unwrap()
            .agents[0]
            .id
            .clone();
        (tmp, store, session.session_id, agent_id)
    }

    #[test]
    fn test_export_agent_json() {
        let (_tmp, store, _session, agent_id) = store_with_agent();
        let rendered = agent_definition(&store, &agent_id, "json").unwrap();
        assert!(rendered.contains("\"system_prompt\""));
        assert!(rendered.ends_with('\n'));

        let decoded: AgentDefinition = serde_json::from_str(rendered.trim()).unwrap();
        assert_eq!(decoded.system_prompt, "Baseline \"v1\"");
    }

    #[test]
    fn test_export_agent_python_and_typescript() {
        let (_tmp, store, _session, agent_id) = store_with_agent();

        let python = agent_definition(&store, &agent_id, "python").unwrap();
        assert!(python.starts_with("agent_definition = {"));
        assert!(python.contains("\"system_prompt\": \"Baseline \\\"v1\\\"\""));
        assert!(python.contains("\"tools\": []"));

        let ts = agent_definition(&store, &agent_id, "TypeScript").unwrap();
        assert!(ts.contains("const agentDefinition: AgentDefinition"));
        assert!(ts.contains("export default agentDefinition;"));
    }

    #[test]
    fn test_export_agent_unknown_format() {
        let (_tmp, store, _session, agent_id) = store_with_agent();
        let err = agent_definition(&store, &agent_id, "yaml").unwrap_err();
        assert!(matches!(err, LudusError::Validation(_)));
    }

    #[test]
    fn test_evidence_pack_includes_lineages() {
        let (_tmp, store, session_id, _agent) = store_with_agent();
        let rendered = evidence_pack(&store, &session_id, "json").unwrap();
        let value: serde_json::Value = serde_json::from_str(rendered.trim()).unwrap();
        assert_eq!(value["session_id"], session_id.as_str());
        assert_eq!(value["lineages"][0]["name"], "main");
        assert_eq!(value["lineages"][0]["agent_versions"][0]["version"], 1);
    }

    #[test]
    fn test_python_literal_shapes() {
        let value = serde_json::json!([{"b": true, "a": null}, "text", 3]);
        assert_eq!(
            python_literal(&value),
            r#"[{"a": None, "b": True}, "text", 3]"#
        );
    }
}
