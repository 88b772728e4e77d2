//! Transcript acquisition.
//!
//! A video URL is resolved to caption text by trying a fixed list of strategies in
//! priority order, with results cached per video ID.
//!
//! # Strategies
//!
//! - **yt-dlp**: downloads manual or auto-generated VTT subtitles in a scratch directory.
//! - **caption-scraper**: reads caption tracks from the watch page (JSON3 format).
//! - **transcript-api**: the `yt-transcript-rs` client library.

mod library;
mod scraper;
mod service;
mod vtt;
mod ytdlp;

pub use library::LibraryStrategy;
pub use scraper::CaptionScraper;
pub use service::TranscriptService;
pub use vtt::{decode_entities, parse_vtt};
pub use ytdlp::{sweep_stale_workdirs, YtDlpStrategy};

use crate::error::Result;
use crate::models::{CaptionItem, TranscriptRecord};
use async_trait::async_trait;

/// One way of obtaining captions for a video.
#[async_trait]
pub trait TranscriptStrategy: Send + Sync {
    /// Short name recorded on transcripts this strategy produced.
    fn name(&self) -> &str;

    /// Fetch caption items for a video. An empty list means "no captions here".
    async fn fetch(&self, video_id: &str) -> Result<Vec<CaptionItem>>;
}

/// Result of a transcript lookup.
#[derive(Debug, Clone)]
pub enum TranscriptOutcome {
    Found {
        record: TranscriptRecord,
        /// True when served from the cache without running any strategy.
        from_cache: bool,
    },
    /// Every strategy came back empty or failed.
    NoCaptions { video_id: String },
}

impl TranscriptOutcome {
    pub fn video_id(&self) -> &str {
        match self {
            TranscriptOutcome::Found { record, .. } => &record.video_id,
            TranscriptOutcome::NoCaptions { video_id } => video_id,
        }
    }

    pub fn record(&self) -> Option<&TranscriptRecord> {
        match self {
            TranscriptOutcome::Found { record, .. } => Some(record),
            TranscriptOutcome::NoCaptions { .. } => None,
        }
    }
}
