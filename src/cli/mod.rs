//! CLI module for Lingo.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Lingo - language learning from YouTube videos
///
/// Serves the tutor API and exposes transcript and explanation helpers on the command line.
#[derive(Parser, Debug)]
#[command(name = "lingo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "LINGO_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Host to bind to (defaults to server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Fetch the transcript of a video
    Transcript {
        /// YouTube URL or video ID
        input: String,

        /// Print the cached record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Explain a word as used in a sentence
    Explain {
        /// The word to explain
        word: String,

        /// Sentence the word appears in
        #[arg(default_value = "")]
        sentence: String,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
