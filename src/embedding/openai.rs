//! Embeddings from an OpenAI-compatible endpoint.

use super::Embedder;
use crate::config::{require_env, EmbeddingSettings};
use crate::error::{LingoError, Result};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Texts per embeddings request.
const BATCH_SIZE: usize = 100;

/// OpenAI-compatible embedder.
pub struct OpenAIEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
    dimensions: usize,
}

impl OpenAIEmbedder {
    /// Create an embedder from settings. Fails when the API key variable is unset.
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let api_key = require_env(&settings.api_key_env)?;
        let client = create_client(&settings.api_base, &api_key, Duration::from_secs(60))?;
        Ok(Self::with_client(client, &settings.model, settings.dimensions as usize))
    }

    pub fn with_client(client: Client<OpenAIConfig>, model: &str, dimensions: usize) -> Self {
        Self {
            client,
            model: model.to_string(),
            dimensions,
        }
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| LingoError::Embedding("Empty embedding response".to_string()))
    }

    #[instrument(skip(self, texts), fields(count = texts.len()))]
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let request = CreateEmbeddingRequestArgs::default()
                .model(&self.model)
                .input(EmbeddingInput::StringArray(chunk.to_vec()))
                .dimensions(self.dimensions as u32)
                .build()
                .map_err(|e| LingoError::Embedding(format!("Failed to build request: {}", e)))?;

            let response = self
                .client
                .embeddings()
                .create(request)
                .await
                .map_err(|e| LingoError::OpenAI(format!("Embedding API error: {}", e)))?;

            let mut data = response.data;
            data.sort_by_key(|e| e.index);
            all_embeddings.extend(data.into_iter().map(|e| e.embedding));
        }

        if all_embeddings.len() != texts.len() {
            return Err(LingoError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                all_embeddings.len()
            )));
        }

        debug!("Generated {} embeddings", all_embeddings.len());
        Ok(all_embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
