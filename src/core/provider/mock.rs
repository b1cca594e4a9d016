//! Scripted in-memory provider for tests and offline flows.

use crate::core::cancel::CancelToken;
use crate::core::error::LudusError;
use crate::core::provider::{Metadata, Provider, ProviderInfo};
use crate::core::state::AgentDefinition;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

const MOCK_MODEL: &str = "mock-model";

/// Provider that replays scripted responses.
///
/// Responses are consumed FIFO; the final response repeats once the queue
/// would otherwise run dry, so a single scripted value behaves like a fixed
/// answer. Clones share the same script, so a mock handed out repeatedly
/// (e.g. through a provider source) keeps consuming one sequence. Usage
/// metadata is deterministic.
#[derive(Clone, Debug)]
pub struct MockProvider {
    generate: Arc<Mutex<VecDeque<String>>>,
    execute: Arc<Mutex<VecDeque<String>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        MockProvider {
            generate: Arc::new(Mutex::new(VecDeque::new())),
            execute: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Scripts the responses returned by `generate_agent`, in order.
    pub fn with_generate<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut queue = self.generate.lock().unwrap();
            queue.extend(responses.into_iter().map(Into::into));
        }
        self
    }

    /// Scripts the responses returned by `execute_agent`, in order.
    pub fn with_execute<I, S>(self, responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut queue = self.execute.lock().unwrap();
            queue.extend(responses.into_iter().map(Into::into));
        }
        self
    }

    fn next_response(queue: &Mutex<VecDeque<String>>, fallback: &str) -> String {
        let mut queue = queue.lock().unwrap();
        match queue.len() {
            0 => fallback.to_string(),
            1 => queue.front().cloned().unwrap_or_default(),
            _ => queue.pop_front().unwrap_or_default(),
        }
    }

    fn metadata() -> Metadata {
        Metadata {
            tokens_input: 120,
            tokens_output: 80,
            tokens_used: 200,
            duration_ms: 5,
            cost_usd: 0.0,
            tool_calls: vec![],
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        MockProvider::new()
    }
}

impl Provider for MockProvider {
    fn generate_agent(
        &self,
        cancel: &CancelToken,
        _prompt: &str,
        _directives: &[String],
    ) -> Result<(AgentDefinition, Metadata), LudusError> {
        if cancel.is_cancelled() {
            return Err(LudusError::Cancelled);
        }
        let response = Self::next_response(&self.generate, "Mock system prompt");
        Ok((
            AgentDefinition {
                system_prompt: response,
                model: MOCK_MODEL.to_string(),
                temperature: 1.0,
                max_tokens: 4096,
                tools: vec![],
            },
            Self::metadata(),
        ))
    }

    fn execute_agent(
        &self,
        cancel: &CancelToken,
        _agent: &AgentDefinition,
        _input: &str,
    ) -> Result<(String, Metadata), LudusError> {
        if cancel.is_cancelled() {
            return Err(LudusError::Cancelled);
        }
        Ok((
            Self::next_response(&self.execute, "mock output"),
            Self::metadata(),
        ))
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            provider: "mock".to_string(),
            model: MOCK_MODEL.to_string(),
            base_url: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_responses_replay_in_order_then_repeat() {
        let provider = MockProvider::new().with_execute(["one", "two"]);
        let cancel = CancelToken::new();
        let agent = AgentDefinition::default();

        let (first, _) = provider.execute_agent(&cancel, &agent, "x").unwrap();
        let (second, _) = provider.execute_agent(&cancel, &agent, "x").unwrap();
        let (third, _) = provider.execute_agent(&cancel, &agent, "x").unwrap();
        assert_eq!(first, "one");
        assert_eq!(second, "two");
        assert_eq!(third, "two");
    }

    #[test]
    fn test_unscripted_generate_has_fallback() {
        let provider = MockProvider::new();
        let (agent, meta) = provider
            .generate_agent(&CancelToken::new(), "need", &[])
            .unwrap();
        assert_eq!(agent.system_prompt, "Mock system prompt");
        assert_eq!(meta.tokens_used, 200);
    }

    #[test]
    fn test_cancelled_token_rejects_calls() {
        let provider = MockProvider::new();
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = provider.generate_agent(&cancel, "need", &[]).unwrap_err();
        assert!(matches!(err, LudusError::Cancelled));
    }
}
