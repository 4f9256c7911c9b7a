//! Opaque LLM client — the model itself is out of scope; this
//! module defines only the narrow text-generation contract tools and the
//! Grounding Validator invoke it through.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("llm provider unavailable: {0}")]
    Unavailable(String),
    #[error("llm returned an unparseable response: {0}")]
    Unparseable(String),
}

/// A text generator invoked by claim extraction and narrative composition.
/// Implementations own their own provider, auth, and retry policy.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: Option<&str>, prompt: &str) -> Result<String, LlmError>;
}

/// Always-unavailable client used when no provider is configured. Callers
/// fall back to heuristic claim extraction rather than failing outright.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnconfiguredLlmClient;

#[async_trait]
impl LlmClient for UnconfiguredLlmClient {
    async fn complete(&self, _system: Option<&str>, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Unavailable("no LLM provider configured".into()))
    }
}
