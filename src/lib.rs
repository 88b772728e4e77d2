//! Lingo - language learning from YouTube videos
//!
//! A tutor service that turns a video's captions into study material: generated Q&A
//! pairs, a chat about the video, word explanations and short podcast scripts.
//!
//! # Architecture
//!
//! - `transcript` - Caption acquisition with ordered fallback strategies and a cache
//! - `llm` - Text generation backends (cloud API, local llama.cpp, Ollama)
//! - `tutor` - Q&A, chat, explanations and podcast scripts
//! - `rag` - Transcript indexing and retrieval of relevant excerpts for chat
//! - `store` - Transcript cache and chat history persistence
//! - `server` - HTTP API
//! - `app` - Wiring everything together from [`config::Settings`]
//!
//! # Example
//!
//! ```rust,no_run
//! use lingo::app::App;
//! use lingo::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::new(Settings::load()?)?;
//!
//!     let outcome = app.tutor.process_transcript("https://youtu.be/dQw4w9WgXcQ").await?;
//!     if let Some(record) = outcome.record() {
//!         for pair in &record.qa_pairs {
//!             println!("Q: {}\nA: {}", pair.question, pair.answer);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod llm;
pub mod models;
pub mod openai;
pub mod process;
pub mod rag;
pub mod server;
pub mod store;
pub mod transcript;
pub mod tts;
pub mod tutor;
pub mod vector_store;
pub mod youtube;

pub use error::{LingoError, Result};
