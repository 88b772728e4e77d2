//! Serve command - run the HTTP API.

use crate::app::App;
use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::server::{self, AppState};
use crate::transcript::sweep_stale_workdirs;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    preflight::check_llm(&settings)?;

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let temp_root = settings.temp_dir();
    let stale_after = Duration::from_secs(settings.transcript.ytdlp_timeout_seconds);

    let app = App::new(settings)?;

    match sweep_stale_workdirs(&temp_root, stale_after) {
        Ok(0) => {}
        Ok(removed) => info!(removed, "Removed stale subtitle scratch directories"),
        Err(e) => warn!(error = %e, "Failed to sweep scratch directories"),
    }
    let state = Arc::new(AppState {
        tutor: app.tutor.clone(),
        tts: app.tts.clone(),
    });

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Lingo API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    Output::kv("LLM backend", app.tutor.llm_name());
    Output::kv("Cached transcripts", &app.store.transcript_count()?.to_string());
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Process transcript", "POST   /chat/process_transcript");
    Output::kv("Chat", "POST   /chat/process_input");
    Output::kv("History", "GET    /chat/history/{video_id}");
    Output::kv("Clear history", "DELETE /chat/history/{video_id}");
    Output::kv("Player transcript", "POST   /player/process_video");
    Output::kv("Explain word", "POST   /player/explain");
    Output::kv("Podcast script", "POST   /podcast/generate_script");
    Output::kv("Podcast audio", "POST   /podcast/generate_audio");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    server::serve(listener, state).await?;

    Ok(())
}
