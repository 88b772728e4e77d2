//! Application wiring.
//!
//! Builds the stores, transcript strategies, LLM backend and retrieval pipeline from
//! [`Settings`] and assembles them into a [`Tutor`].

use crate::chunking::ChunkingConfig;
use crate::config::{Prompts, Settings};
use crate::embedding::{Embedder, OpenAIEmbedder};
use crate::error::Result;
use crate::llm::create_backend;
use crate::process::ProcessLimiter;
use crate::rag::{ContextBuilder, Indexer};
use crate::store::SqliteStore;
use crate::transcript::TranscriptService;
use crate::tts::TtsUrlBuilder;
use crate::tutor::Tutor;
use crate::vector_store::{SqliteVectorStore, VectorStore};
use std::sync::Arc;
use tracing::{info, warn};

/// Everything a request handler or CLI command needs.
pub struct App {
    pub settings: Settings,
    pub tutor: Arc<Tutor>,
    pub tts: TtsUrlBuilder,
    pub store: Arc<SqliteStore>,
}

impl App {
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        std::fs::create_dir_all(settings.temp_dir())?;

        let limiter = ProcessLimiter::new(settings.general.max_concurrent_processes);
        let store = Arc::new(SqliteStore::new(&settings.sqlite_path())?);

        let transcripts = Arc::new(TranscriptService::from_settings(
            &settings,
            store.clone(),
            limiter.clone(),
        )?);
        info!("Transcript strategies: {}", transcripts.strategy_names().join(", "));

        let llm = create_backend(&settings, limiter)?;

        let mut tutor = Tutor::new(transcripts, store.clone(), llm)
            .with_prompts(prompts)
            .with_settings(settings.chat.clone());

        if settings.rag.enabled {
            match Self::retrieval(&settings) {
                Ok((indexer, context)) => tutor = tutor.with_retrieval(indexer, context),
                Err(e) => warn!(error = %e, "Retrieval disabled"),
            }
        }

        let tts = TtsUrlBuilder::new(&settings.tts);

        Ok(Self {
            settings,
            tutor: Arc::new(tutor),
            tts,
            store,
        })
    }

    fn retrieval(settings: &Settings) -> Result<(Arc<Indexer>, ContextBuilder)> {
        let embedder: Arc<dyn Embedder> = Arc::new(OpenAIEmbedder::new(&settings.embedding)?);
        let vector_store: Arc<dyn VectorStore> =
            Arc::new(SqliteVectorStore::new(&settings.sqlite_path())?);

        let chunking = ChunkingConfig {
            chunk_size: settings.rag.chunk_size,
            chunk_overlap: settings.rag.chunk_overlap,
        };

        let indexer = Arc::new(Indexer::new(vector_store.clone(), embedder.clone(), chunking));
        let context = ContextBuilder::new(vector_store, embedder)
            .with_max_chunks(settings.rag.top_k)
            .with_min_score(settings.rag.min_score);

        Ok((indexer, context))
    }
}
