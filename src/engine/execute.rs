//! Agent execution: api mode via a provider, cli mode via an external
//! executor binary.
//!
//! CLI mode writes the combined prompt document to the executor's stdin and
//! reads the response from stdout. The child is polled so a deadline or a
//! cancellation can kill it instead of blocking forever.

use crate::core::cancel::CancelToken;
use crate::core::error::LudusError;
use crate::core::provider::Provider;
use crate::core::state::{AgentDefinition, ExecutionMetadata};
use crate::engine::observability::{capture_execution_metadata, ProviderResponse};
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

pub const MODE_API: &str = "api";
pub const MODE_CLI: &str = "cli";

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// One execution request against the latest agent of a lineage.
pub struct ExecuteRequest<'a> {
    pub mode: String,
    pub input: String,
    pub definition: AgentDefinition,
    pub provider: Option<&'a dyn Provider>,
    pub executor: String,
    /// Wall-clock bound for cli-mode executions; 0 means unbounded.
    pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ExecuteResult {
    pub output: String,
    pub metadata: ExecutionMetadata,
}

pub fn execute(cancel: &CancelToken, req: &ExecuteRequest) -> Result<ExecuteResult, LudusError> {
    let mode = req.mode.trim();
    let mode = if mode.is_empty() { MODE_API } else { mode };

    match mode {
        MODE_API => execute_api(cancel, req),
        MODE_CLI => execute_cli(cancel, req),
        other => Err(LudusError::Validation(format!(
            "unsupported mode {:?}",
            other
        ))),
    }
}

fn execute_api(cancel: &CancelToken, req: &ExecuteRequest) -> Result<ExecuteResult, LudusError> {
    let provider = req.provider.ok_or_else(|| {
        LudusError::Validation("provider is required for api mode".to_string())
    })?;

    let (output, meta) = provider.execute_agent(cancel, &req.definition, &req.input)?;

    let info = provider.info();
    let provider_name = if info.provider.trim().is_empty() {
        "unknown".to_string()
    } else {
        info.provider.trim().to_string()
    };

    Ok(ExecuteResult {
        output,
        metadata: capture_execution_metadata(ProviderResponse {
            mode: MODE_API.to_string(),
            provider: Some(provider_name),
            model: info.model,
            metadata: meta,
        }),
    })
}

fn execute_cli(cancel: &CancelToken, req: &ExecuteRequest) -> Result<ExecuteResult, LudusError> {
    let executor = req.executor.trim();
    match executor {
        "codex" | "claude" => {}
        _ => {
            return Err(LudusError::Validation(
                "executor must be one of: codex, claude".to_string(),
            ))
        }
    }

    let command_path = find_in_path(executor).ok_or_else(|| {
        LudusError::ExecutionFailed(format!("resolve executor {:?}: not found in PATH", executor))
    })?;

    if cancel.is_cancelled() {
        return Err(LudusError::Cancelled);
    }

    let cli_input = format!(
        "system_prompt:\n{}\n\nuser_input:\n{}\n",
        req.definition.system_prompt, req.input
    );

    let start = Instant::now();
    let mut child = Command::new(&command_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| {
            LudusError::ExecutionFailed(format!("run executor {:?}: {}", executor, err))
        })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(cli_input.as_bytes())?;
    }

    // Drain pipes off-thread so a chatty executor cannot deadlock the poll loop.
    let stdout_reader = spawn_pipe_reader(child.stdout.take());
    let stderr_reader = spawn_pipe_reader(child.stderr.take());

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            return Err(LudusError::Cancelled);
        }
        if req.timeout_ms > 0 && start.elapsed() >= Duration::from_millis(req.timeout_ms) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(LudusError::ExecutionFailed(format!(
                "executor {:?} timed out after {}ms",
                executor, req.timeout_ms
            )));
        }
        std::thread::sleep(POLL_INTERVAL);
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();
    let duration_ms = start.elapsed().as_millis() as u64;

    if !status.success() {
        let detail = if stderr.trim().is_empty() {
            format!("{}", status)
        } else {
            stderr.trim().to_string()
        };
        return Err(LudusError::ExecutionFailed(format!(
            "run executor {:?}: {}",
            executor, detail
        )));
    }

    let mut combined = stdout;
    combined.push_str(&stderr);

    Ok(ExecuteResult {
        output: combined.trim().to_string(),
        metadata: ExecutionMetadata {
            mode: MODE_CLI.to_string(),
            provider: None,
            executor: Some(executor.to_string()),
            executor_command: Some(command_path.to_string_lossy().to_string()),
            tokens_input: 0,
            tokens_output: 0,
            duration_ms,
            cost_usd: 0.0,
            tool_calls: vec![],
        },
    })
}

fn spawn_pipe_reader<R: Read + Send + 'static>(
    pipe: Option<R>,
) -> std::thread::JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buffer = String::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_string(&mut buffer);
        }
        buffer
    })
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provider::MockProvider;

    fn request<'a>(mode: &str, provider: Option<&'a dyn Provider>) -> ExecuteRequest<'a> {
        ExecuteRequest {
            mode: mode.into(),
            input: "How do I reset my password?".into(),
            definition: AgentDefinition {
                system_prompt: "Baseline v1".into(),
                model: "claude-sonnet-4-5".into(),
                temperature: 1.0,
                max_tokens: 1024,
                tools: vec![],
            },
            provider,
            executor: String::new(),
            timeout_ms: 0,
        }
    }

    #[test]
    fn test_api_mode_requires_provider() {
        let err = execute(&CancelToken::new(), &request(MODE_API, None)).unwrap_err();
        assert!(matches!(err, LudusError::Validation(_)));
    }

    #[test]
    fn test_blank_mode_defaults_to_api() {
        let provider = MockProvider::new().with_execute(["execution-output-v1"]);
        let result = execute(&CancelToken::new(), &request("", Some(&provider))).unwrap();
        assert_eq!(result.output, "execution-output-v1");
        assert_eq!(result.metadata.mode, MODE_API);
        assert_eq!(result.metadata.provider.as_deref(), Some("mock"));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let err = execute(&CancelToken::new(), &request("batch", None)).unwrap_err();
        assert!(matches!(err, LudusError::Validation(_)));
    }

    #[test]
    fn test_cli_mode_rejects_unknown_executor() {
        let mut req = request(MODE_CLI, None);
        req.executor = "bash".into();
        let err = execute(&CancelToken::new(), &req).unwrap_err();
        assert!(matches!(err, LudusError::Validation(_)));
    }

    #[test]
    fn test_find_in_path_resolves_common_binary() {
        // `sh` exists on every unix test host; the lookup logic is the same
        // one used for the real executors.
        assert!(find_in_path("sh").is_some());
        assert!(find_in_path("definitely-not-a-binary-qqq").is_none());
    }
}
