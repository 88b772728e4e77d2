//! LLM dispatch.
//!
//! One [`LlmBackend`] is chosen at startup from `llm.backend` and serves every prompt:
//! an OpenAI-compatible cloud API, a local llama.cpp binary, or an Ollama server.

mod cloud;
mod local;
mod ollama;

pub use cloud::CloudBackend;
pub use local::LocalBackend;
pub use ollama::OllamaBackend;

use crate::config::{LlmBackendKind, Settings};
use crate::error::{LingoError, Result};
use crate::models::ChatMessage;
use crate::process::ProcessLimiter;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// A single generation request.
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    /// Instructions and background placed before the conversation.
    pub system: Option<String>,
    /// Earlier turns, oldest first.
    pub history: Vec<ChatMessage>,
    pub prompt: String,
}

impl LlmRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    /// Reject requests without a prompt before they reach a backend.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(LingoError::InvalidInput("Prompt must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Text generation backend.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Generate a reply to the request.
    async fn generate(&self, request: &LlmRequest) -> Result<String>;
}

/// Build the backend selected in the configuration.
pub fn create_backend(settings: &Settings, limiter: ProcessLimiter) -> Result<Arc<dyn LlmBackend>> {
    let backend: Arc<dyn LlmBackend> = match settings.llm.backend {
        LlmBackendKind::Cloud => Arc::new(CloudBackend::new(&settings.llm.cloud)?),
        LlmBackendKind::Local => Arc::new(LocalBackend::new(&settings.llm.local, limiter)),
        LlmBackendKind::Ollama => Arc::new(OllamaBackend::new(&settings.llm.ollama)?),
    };

    info!("Using LLM backend: {}", backend.name());
    Ok(backend)
}
