//! `doctor`: read-only environment diagnostics.
//!
//! Required checks cover provider credentials and initialization plus state
//! file readability; executor and analyzer binaries are optional. The
//! command exits non-zero when any required check fails.

use crate::arena::analyzer::DEFAULT_ANALYZER_BINARY;
use crate::commands::{print_json, OutputMode};
use crate::core::error::LudusError;
use crate::core::provider::{self, Config};
use crate::core::store::Store;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DoctorCheck {
    pub required: bool,
    pub passed: bool,
    pub message: String,
}

/// Runs all diagnostics and returns the check list.
pub fn run_checks(store: &Store, flags: &Config) -> Vec<DoctorCheck> {
    let mut checks = Vec::new();
    checks.push(check_provider_credentials(flags));
    checks.push(check_provider_initialization(flags));
    checks.push(check_state_file_readable(store));
    checks.push(check_optional_binary("claude"));
    checks.push(check_optional_binary("codex"));
    checks.push(check_optional_binary(DEFAULT_ANALYZER_BINARY));
    checks
}

fn check_provider_credentials(flags: &Config) -> DoctorCheck {
    let normalized = provider::normalize_provider_name(&flags.provider);
    let supplied = !flags.api_key.trim().is_empty();

    match normalized.as_str() {
        "anthropic" => {
            if supplied || env_set("ANTHROPIC_API_KEY") {
                check(true, true, "✓ ANTHROPIC_API_KEY set")
            } else {
                check(
                    true,
                    false,
                    "✗ missing ANTHROPIC_API_KEY for provider anthropic",
                )
            }
        }
        "openai-compatible" => {
            if supplied
                || env_set("OPENAI_API_KEY")
                || env_set("OPENAI_COMPATIBLE_API_KEY")
                || env_set("API_KEY")
            {
                check(true, true, "✓ OPENAI_API_KEY (or equivalent) set")
            } else {
                check(
                    true,
                    false,
                    "✗ missing OPENAI_API_KEY (or equivalent) for provider openai-compatible",
                )
            }
        }
        "mock" => check(true, true, "✓ mock provider requires no credentials"),
        other => check(
            true,
            false,
            &format!("✗ unsupported provider: {}", other),
        ),
    }
}

fn check_provider_initialization(flags: &Config) -> DoctorCheck {
    match provider::new_provider(flags) {
        Ok(_) => check(
            true,
            true,
            &format!(
                "✓ Provider initialization ok: {}",
                provider::normalize_provider_name(&flags.provider)
            ),
        ),
        Err(err) => check(
            true,
            false,
            &format!("✗ Provider initialization failed: {}", err),
        ),
    }
}

fn check_state_file_readable(store: &Store) -> DoctorCheck {
    let path = &store.path;
    if !path.exists() {
        return check(
            false,
            true,
            &format!("✓ State file not found (optional): {}", path.display()),
        );
    }

    match std::fs::read_to_string(path) {
        Ok(_) => check(
            true,
            true,
            &format!("✓ State file readable: {}", path.display()),
        ),
        Err(err) => check(
            true,
            false,
            &format!("✗ State file not readable: {} ({})", path.display(), err),
        ),
    }
}

fn check_optional_binary(name: &str) -> DoctorCheck {
    match find_in_path(name) {
        Some(path) => check(
            false,
            true,
            &format!("✓ {} binary found (optional): {}", name, path.display()),
        ),
        None => check(
            false,
            true,
            &format!("✓ {} binary not found (optional)", name),
        ),
    }
}

fn find_in_path(name: &str) -> Option<std::path::PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

fn env_set(name: &str) -> bool {
    std::env::var(name)
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false)
}

fn check(required: bool, passed: bool, message: &str) -> DoctorCheck {
    DoctorCheck {
        required,
        passed,
        message: message.to_string(),
    }
}

pub fn run_doctor_cli(store: &Store, flags: &Config, output: OutputMode) -> Result<(), LudusError> {
    let checks = run_checks(store, flags);
    let has_required_failures = checks.iter().any(|c| c.required && !c.passed);

    match output {
        OutputMode::Json => print_json(&serde_json::json!({ "checks": checks }))?,
        OutputMode::Text => {
            use colored::Colorize;
            for c in &checks {
                if c.passed {
                    println!("{}", c.message.green());
                } else {
                    println!("{}", c.message.red());
                }
            }
        }
    }

    if has_required_failures {
        return Err(LudusError::Validation(
            "doctor found failed required checks".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_mock_provider_passes_credential_check() {
        let flags = Config {
            provider: "mock".into(),
            ..Config::default()
        };
        let result = check_provider_credentials(&flags);
        assert!(result.passed);
        assert!(result.required);
    }

    #[test]
    fn test_flag_key_satisfies_credentials() {
        let flags = Config {
            provider: "anthropic".into(),
            api_key: "flag-key".into(),
            ..Config::default()
        };
        assert!(check_provider_credentials(&flags).passed);
    }

    #[test]
    fn test_unknown_provider_fails_required_check() {
        let flags = Config {
            provider: "frontier-x".into(),
            ..Config::default()
        };
        let result = check_provider_credentials(&flags);
        assert!(result.required);
        assert!(!result.passed);
    }

    #[test]
    fn test_missing_state_file_is_optional_pass() {
        let tmp = tempdir().unwrap();
        let store = Store::new(tmp.path().join("state.json"));
        let result = check_state_file_readable(&store);
        assert!(!result.required);
        assert!(result.passed);
    }

    #[test]
    fn test_present_state_file_is_required_pass() {
        let tmp = tempdir().unwrap();
        let store = Store::new(tmp.path().join("state.json"));
        store.save(&crate::core::state::State::new()).unwrap();
        let result = check_state_file_readable(&store);
        assert!(result.required);
        assert!(result.passed);
    }

    #[test]
    fn test_optional_binaries_never_fail() {
        for name in ["claude", "codex", "definitely-not-here-qqq"] {
            let result = check_optional_binary(name);
            assert!(!result.required);
            assert!(result.passed);
        }
    }
}
