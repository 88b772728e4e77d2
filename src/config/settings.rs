//! Configuration settings for Lingo.

use crate::error::{LingoError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub transcript: TranscriptSettings,
    pub llm: LlmSettings,
    pub embedding: EmbeddingSettings,
    pub store: StoreSettings,
    pub rag: RagSettings,
    pub chat: ChatSettings,
    pub tts: TtsSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Directory for temporary files (subtitle downloads).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Upper bound on external processes (yt-dlp, llama-cli) running at once.
    pub max_concurrent_processes: usize,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.lingo".to_string(),
            temp_dir: "/tmp/lingo".to_string(),
            log_level: "info".to_string(),
            max_concurrent_processes: 4,
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Transcript acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Preferred caption languages, most preferred first.
    pub languages: Vec<String>,
    /// yt-dlp executable.
    pub ytdlp_path: String,
    /// Hard timeout for a single yt-dlp run.
    pub ytdlp_timeout_seconds: u64,
    /// Timeout for caption scraping HTTP requests.
    pub http_timeout_seconds: u64,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            ytdlp_path: "yt-dlp".to_string(),
            ytdlp_timeout_seconds: 60,
            http_timeout_seconds: 30,
        }
    }
}

/// Which LLM backend serves all prompts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackendKind {
    /// OpenAI-compatible chat completion API (Groq by default).
    #[default]
    Cloud,
    /// llama.cpp `llama-cli` subprocess.
    Local,
    /// Ollama HTTP server.
    Ollama,
}

impl std::str::FromStr for LlmBackendKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cloud" | "groq" | "openai" => Ok(LlmBackendKind::Cloud),
            "local" | "llama" | "llama-cli" => Ok(LlmBackendKind::Local),
            "ollama" => Ok(LlmBackendKind::Ollama),
            _ => Err(format!("Unknown LLM backend: {}", s)),
        }
    }
}

impl std::fmt::Display for LlmBackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmBackendKind::Cloud => write!(f, "cloud"),
            LlmBackendKind::Local => write!(f, "local"),
            LlmBackendKind::Ollama => write!(f, "ollama"),
        }
    }
}

/// LLM backend selection and per-backend settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LlmSettings {
    pub backend: LlmBackendKind,
    pub cloud: CloudLlmSettings,
    pub local: LocalLlmSettings,
    pub ollama: OllamaSettings,
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudLlmSettings {
    pub api_base: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for CloudLlmSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.groq.com/openai/v1".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.7,
            timeout_seconds: 120,
        }
    }
}

/// llama.cpp command line settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalLlmSettings {
    pub executable: String,
    pub model_path: String,
    pub gpu_layers: u32,
    pub context_size: u32,
    pub threads: u32,
    pub max_tokens: i32,
    pub temperature: f32,
    pub repeat_penalty: f32,
    pub timeout_seconds: u64,
    /// Cap on captured stdout/stderr, each.
    pub max_output_bytes: usize,
    /// Markers after which generated text is no longer part of the answer.
    pub stop_markers: Vec<String>,
}

impl Default for LocalLlmSettings {
    fn default() -> Self {
        Self {
            executable: "llama-cli".to_string(),
            model_path: "~/.lingo/models/qwen2.5-7b-q4_k_m.gguf".to_string(),
            gpu_layers: 32,
            context_size: 4096,
            threads: 8,
            max_tokens: 512,
            temperature: 0.1,
            repeat_penalty: 1.1,
            timeout_seconds: 300,
            max_output_bytes: 10 * 1024 * 1024,
            stop_markers: vec![
                "[end of text]".to_string(),
                "<|im_end|>".to_string(),
                "<|eot_id|>".to_string(),
                "\nUser:".to_string(),
            ],
        }
    }
}

/// Ollama server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "qwen2.5:7b".to_string(),
            timeout_seconds: 300,
        }
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub api_base: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub model: String,
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: 384,
        }
    }
}

/// Persistent storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// SQLite database holding the transcript cache, chat log and vectors.
    pub sqlite_path: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            sqlite_path: "~/.lingo/lingo.db".to_string(),
        }
    }
}

/// Retrieval-augmented context settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub enabled: bool,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    /// Excerpts scoring below this cosine similarity are left out of chat prompts.
    pub min_score: f32,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 3,
            min_score: 0.0,
        }
    }
}

/// Chat and Q&A settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Number of prior messages replayed into each chat turn.
    pub history_limit: usize,
    /// Transcript characters included in the chat system context.
    pub transcript_context_chars: usize,
    /// Transcript characters given to the Q&A generator.
    pub qa_context_chars: usize,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_limit: 6,
            transcript_context_chars: 2000,
            qa_context_chars: 6000,
        }
    }
}

/// Text-to-speech URL settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsSettings {
    pub lang: String,
    pub slow: bool,
    pub host: String,
    pub max_segment_chars: usize,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            lang: "en".to_string(),
            slow: false,
            host: "https://translate.google.com".to_string(),
            max_segment_chars: 200,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lingo")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    pub fn sqlite_path(&self) -> PathBuf {
        Self::expand_path(&self.store.sqlite_path)
    }

    /// Render the settings as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| LingoError::Config(e.to_string()))
    }
}

/// Read a required secret from the named environment variable.
pub fn require_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => Err(LingoError::Config(format!("{} is set but empty", var))),
        Err(_) => Err(LingoError::Config(format!(
            "{} is not set. Export it before starting lingo.",
            var
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let settings: Settings = toml::from_str(
            r#"
            [llm]
            backend = "local"

            [llm.local]
            timeout_seconds = 30
            "#,
        )
        .unwrap();

        assert_eq!(settings.llm.backend, LlmBackendKind::Local);
        assert_eq!(settings.llm.local.timeout_seconds, 30);
        assert_eq!(settings.llm.local.max_output_bytes, 10 * 1024 * 1024);
        assert_eq!(settings.transcript.ytdlp_timeout_seconds, 60);
        assert_eq!(settings.chat.history_limit, 6);
        assert_eq!(settings.rag.min_score, 0.0);
    }

    #[test]
    fn test_rag_min_score() {
        let settings: Settings = toml::from_str("[rag]\nmin_score = 0.35\n").unwrap();
        assert_eq!(settings.rag.min_score, 0.35);
        assert_eq!(settings.rag.top_k, 3);
    }

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("groq".parse::<LlmBackendKind>(), Ok(LlmBackendKind::Cloud));
        assert_eq!("llama-cli".parse::<LlmBackendKind>(), Ok(LlmBackendKind::Local));
        assert!("gpt".parse::<LlmBackendKind>().is_err());
    }

    #[test]
    fn test_require_env_missing() {
        let err = require_env("LINGO_TEST_SURELY_UNSET_VAR").unwrap_err();
        assert!(matches!(err, LingoError::Config(_)));
    }
}
