//! Configuration module for Lingo.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{ChatPrompts, ExplainPrompts, PodcastPrompts, Prompts, QaPrompts};
pub use settings::{
    require_env, ChatSettings, CloudLlmSettings, EmbeddingSettings, GeneralSettings,
    LlmBackendKind, LlmSettings, LocalLlmSettings, OllamaSettings, PromptSettings, RagSettings,
    ServerSettings, Settings, StoreSettings, TranscriptSettings, TtsSettings,
};
