//! Error types for Lingo.

use thiserror::Error;

/// Library-level error type for Lingo operations.
#[derive(Error, Debug)]
pub enum LingoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No captions available: {0}")]
    NoCaptionsAvailable(String),

    #[error("Upstream timed out: {0}")]
    UpstreamTimeout(String),

    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl LingoError {
    /// Short machine-readable name of the error class, used in API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            LingoError::Config(_) => "configuration_error",
            LingoError::InvalidUrl(_) => "invalid_url",
            LingoError::InvalidInput(_) => "invalid_input",
            LingoError::NoCaptionsAvailable(_) => "no_captions",
            LingoError::UpstreamTimeout(_) => "upstream_timeout",
            LingoError::UpstreamFailure(_)
            | LingoError::ToolNotFound(_)
            | LingoError::OpenAI(_)
            | LingoError::Http(_) => "upstream_failure",
            LingoError::Storage(_)
            | LingoError::Embedding(_)
            | LingoError::VectorStore(_)
            | LingoError::Io(_)
            | LingoError::Json(_)
            | LingoError::TomlParse(_)
            | LingoError::Database(_) => "internal_error",
        }
    }

    /// Whether the caller can fix this by changing the request.
    pub fn is_user_error(&self) -> bool {
        matches!(self, LingoError::InvalidUrl(_) | LingoError::InvalidInput(_))
    }
}

/// Result type alias for Lingo operations.
pub type Result<T> = std::result::Result<T, LingoError>;
