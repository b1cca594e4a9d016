//! The session commands layer.
//!
//! Every command is a transaction against the store (load → mutate → save)
//! with a pure operation function returning a typed outcome, plus a thin
//! `run_*_cli` renderer that honors the global `--json` flag. Provider
//! construction goes through [`ProviderSource`] so tests can substitute a
//! scripted mock for the real factory.

pub mod artifact;
pub mod directive;
pub mod doctor;
pub mod evaluate;
pub mod export;
pub mod iterate;
pub mod lineage;
pub mod promote;
pub mod quickstart;
pub mod run;
pub mod session;
pub mod training;

use crate::core::error::LudusError;
use crate::core::provider::{self, Config, Provider};
use serde::Serialize;

/// How command output is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Text,
    Json,
}

/// Prints a payload as pretty JSON with a trailing newline.
pub fn print_json<T: Serialize>(payload: &T) -> Result<(), LudusError> {
    println!("{}", serde_json::to_string_pretty(payload)?);
    Ok(())
}

/// Yields providers for commands. The production source is the factory;
/// tests swap in scripted mocks.
pub trait ProviderSource {
    fn provider_for(&self, cfg: &Config) -> Result<Box<dyn Provider>, LudusError>;
}

/// Builds real adapters from config and environment.
pub struct FactorySource;

impl ProviderSource for FactorySource {
    fn provider_for(&self, cfg: &Config) -> Result<Box<dyn Provider>, LudusError> {
        provider::new_provider(cfg)
    }
}

/// A source that always yields a clone of one scripted mock.
pub struct MockSource(pub provider::MockProvider);

impl ProviderSource for MockSource {
    fn provider_for(&self, _cfg: &Config) -> Result<Box<dyn Provider>, LudusError> {
        Ok(Box::new(self.0.clone()))
    }
}

/// Picks the override when set, the fallback otherwise.
pub(crate) fn model_or_default(overridden: &str, fallback: &str) -> String {
    let trimmed = overridden.trim();
    if trimmed.is_empty() {
        fallback.trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Merges provider flags with per-agent fallbacks into a factory config.
pub(crate) fn provider_config(
    flags: &Config,
    fallback_provider: &str,
    fallback_model: &str,
) -> Config {
    let provider = if flags.provider.trim().is_empty() {
        fallback_provider.trim().to_string()
    } else {
        flags.provider.trim().to_string()
    };
    Config {
        provider,
        model: model_or_default(&flags.model, fallback_model),
        base_url: flags.base_url.clone(),
        api_key: flags.api_key.clone(),
    }
}
