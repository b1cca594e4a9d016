//! Quality probe: wraps the external static-analysis binary.
//!
//! The analyzer is invoked as `<binary> scan <path> --format json`. Exit
//! codes 0 and 1 both mean "findings reported"; exit 2 is a tool error and
//! propagates. The quality score deducts 2 points per error and 1 per
//! warning from a base of 10, floored at 1.

use crate::core::error::LudusError;
use crate::core::time::now_rfc3339;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use std::time::Instant;

/// Default analyzer binary name; override with the `*_with_binary` variants.
pub const DEFAULT_ANALYZER_BINARY: &str = "truthsayer";

/// One anti-pattern detected by the analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Finding {
    #[serde(default)]
    pub rule: String,
    /// "error", "warn", or "info".
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: u64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub category: String,
}

/// Structured output of one analyzer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScanResult {
    pub findings: Vec<Finding>,
    pub errors: u64,
    pub warnings: u64,
    pub info: u64,
    pub exit_code: i32,
    pub duration_ms: u64,
    pub scanned_at: String,
}

impl ScanResult {
    /// Converts findings to a 1-10 quality score.
    pub fn quality_score(&self) -> i64 {
        let score = 10 - (self.errors as i64 * 2) - self.warnings as i64;
        score.max(1)
    }
}

/// JSON document the analyzer emits with `--format json`.
#[derive(Debug, Deserialize, Default)]
struct ScanOutput {
    #[serde(default)]
    summary: ScanSummary,
    #[serde(default)]
    findings: Vec<Finding>,
}

#[derive(Debug, Deserialize, Default)]
struct ScanSummary {
    #[serde(default)]
    errors: u64,
    #[serde(default)]
    warnings: u64,
    #[serde(default)]
    info: u64,
}

/// Runs the default analyzer binary against a file or directory.
pub fn scan(path: &Path) -> Result<ScanResult, LudusError> {
    scan_with_binary(DEFAULT_ANALYZER_BINARY, path)
}

/// Runs a specific analyzer binary against a path.
pub fn scan_with_binary(binary: &str, path: &Path) -> Result<ScanResult, LudusError> {
    let abs_path = path
        .canonicalize()
        .map_err(|err| LudusError::ExecutionFailed(format!("resolve path {:?}: {}", path, err)))?;

    let start = Instant::now();
    let output = Command::new(binary)
        .arg("scan")
        .arg(&abs_path)
        .args(["--format", "json"])
        .output()
        .map_err(|err| {
            LudusError::ExecutionFailed(format!("analyzer binary not found: {}", err))
        })?;
    let duration_ms = start.elapsed().as_millis() as u64;

    let exit_code = output.status.code().unwrap_or(-1);
    let mut combined = output.stdout;
    combined.extend_from_slice(&output.stderr);

    // Exit code 2 means tool error, not findings.
    if exit_code == 2 {
        return Err(LudusError::ExecutionFailed(format!(
            "analyzer tool error (exit 2): {}",
            String::from_utf8_lossy(&combined).trim()
        )));
    }

    let mut result = ScanResult {
        exit_code,
        duration_ms,
        scanned_at: now_rfc3339(),
        ..ScanResult::default()
    };

    if !combined.is_empty() {
        if let Ok(decoded) = serde_json::from_slice::<ScanOutput>(&combined) {
            result.findings = decoded.findings;
            result.errors = decoded.summary.errors;
            result.warnings = decoded.summary.warnings;
            result.info = decoded.summary.info;
        }
    }

    Ok(result)
}

/// Writes content to a temp file and scans it with the default binary.
pub fn scan_string(content: &str, filename: &str) -> Result<ScanResult, LudusError> {
    scan_string_with_binary(DEFAULT_ANALYZER_BINARY, content, filename)
}

/// Writes content to a temp file and scans it with a specific binary.
pub fn scan_string_with_binary(
    binary: &str,
    content: &str,
    filename: &str,
) -> Result<ScanResult, LudusError> {
    let tmp_dir = tempfile::Builder::new()
        .prefix("ludus-magnus-scan-")
        .tempdir()?;
    let tmp_file = tmp_dir.path().join(filename);
    std::fs::write(&tmp_file, content)?;
    scan_with_binary(binary, &tmp_file)
}
