//! Transcript retrieval through the `yt-transcript-rs` client library.

use super::vtt::decode_entities;
use super::TranscriptStrategy;
use crate::config::TranscriptSettings;
use crate::error::{LingoError, Result};
use crate::models::CaptionItem;
use async_trait::async_trait;
use tracing::instrument;
use yt_transcript_rs::api::YouTubeTranscriptApi;

/// Last-resort strategy backed by the transcript API library.
pub struct LibraryStrategy {
    languages: Vec<String>,
}

impl LibraryStrategy {
    pub fn new(settings: &TranscriptSettings) -> Self {
        Self {
            languages: settings.languages.clone(),
        }
    }
}

#[async_trait]
impl TranscriptStrategy for LibraryStrategy {
    fn name(&self) -> &str {
        "transcript-api"
    }

    #[instrument(skip(self))]
    async fn fetch(&self, video_id: &str) -> Result<Vec<CaptionItem>> {
        let api = YouTubeTranscriptApi::new(None, None, None).map_err(|e| {
            LingoError::UpstreamFailure(format!("Failed to initialize transcript API: {}", e))
        })?;

        let languages: Vec<&str> = self.languages.iter().map(String::as_str).collect();

        let fetched = api
            .fetch_transcript(video_id, &languages, false)
            .await
            .map_err(|e| LingoError::UpstreamFailure(format!("Transcript API: {}", e)))?;

        Ok(fetched
            .parts()
            .iter()
            .map(|part| {
                CaptionItem::new(decode_entities(part.text.trim()), part.start, part.duration)
            })
            .filter(|item| !item.text.is_empty())
            .collect())
    }
}
