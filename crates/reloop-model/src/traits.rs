use async_trait::async_trait;
use thiserror::Error;

use crate::GeneratedText;

/// Errors that can occur during a model invocation
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to spawn model process: {0}")]
    SpawnFailed(#[from] std::io::Error),

    #[error("Model backend not found at path: {0}")]
    NotFound(String),

    #[error("Model invocation failed: {0}")]
    InvocationFailed(String),

    #[error("Model returned an empty response")]
    EmptyResponse,
}

/// A single text-generation request
///
/// The temperature is always supplied by the caller; backends that cannot
/// control sampling temperature ignore it.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    pub system_prompt: Option<&'a str>,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
}

impl<'a> GenerationRequest<'a> {
    pub fn new(prompt: &'a str, temperature: f64) -> Self {
        Self {
            prompt,
            system_prompt: None,
            temperature,
            max_tokens: None,
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: Option<&'a str>) -> Self {
        self.system_prompt = system_prompt;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Supported backend kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    ClaudeCli,
    LlmCli,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::ClaudeCli => write!(f, "claude"),
            BackendKind::LlmCli => write!(f, "llm"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "claude" | "claude-cli" | "claudecli" => Ok(BackendKind::ClaudeCli),
            "llm" | "llm-cli" => Ok(BackendKind::LlmCli),
            _ => Err(format!("Unknown backend kind: {}", s)),
        }
    }
}

/// The core abstraction for text-generation backends
///
/// One `TextModel` corresponds to one configured model handle; the refinement
/// loop treats each call as an atomic request/response. Retry and transport
/// concerns live behind this trait, not in front of it.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Identifier used in iteration records and logs (e.g. "claude:sonnet")
    fn name(&self) -> &str;

    /// Generate text for the given request
    async fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<GeneratedText, ModelError>;

    /// Check if the backend is reachable before a run starts
    async fn is_available(&self) -> bool;
}
