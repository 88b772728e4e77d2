//! Transcript command - fetch (or read cached) captions for a video.

use crate::app::App;
use crate::cli::output::content_preview;
use crate::cli::Output;
use crate::config::Settings;
use crate::transcript::TranscriptOutcome;
use anyhow::Result;

/// Captions printed before the listing is cut short.
const MAX_LISTED_CAPTIONS: usize = 20;

pub async fn run_transcript(input: &str, json: bool, settings: Settings) -> Result<()> {
    let app = App::new(settings)?;

    let spinner = Output::spinner("Fetching transcript...");
    let outcome = app.tutor.load_video(input).await;
    spinner.finish_and_clear();

    let record = match outcome? {
        TranscriptOutcome::Found { record, from_cache } => {
            if !json {
                let source = if from_cache { "cache" } else { record.strategy.as_str() };
                Output::success(&format!("Transcript for {} (from {})", record.video_id, source));
            }
            record
        }
        TranscriptOutcome::NoCaptions { video_id } => {
            Output::warning(&format!("No captions available for {}", video_id));
            return Ok(());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    Output::kv("Characters", &record.full_text.chars().count().to_string());
    Output::kv("Caption lines", &record.items.len().to_string());
    Output::kv("Preview", &content_preview(&record.full_text, 200));

    if !record.items.is_empty() {
        Output::header("Captions");
        for item in record.items.iter().take(MAX_LISTED_CAPTIONS) {
            Output::caption(item);
        }
        if record.items.len() > MAX_LISTED_CAPTIONS {
            Output::info(&format!(
                "... {} more (use --json for everything)",
                record.items.len() - MAX_LISTED_CAPTIONS
            ));
        }
    }

    if !record.qa_pairs.is_empty() {
        Output::header("Q&A");
        for pair in &record.qa_pairs {
            Output::qa_pair(pair);
        }
    }

    Ok(())
}
