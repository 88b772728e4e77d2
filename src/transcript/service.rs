//! Cache-first transcript lookup with ordered strategy fallback.

use super::{CaptionScraper, LibraryStrategy, TranscriptOutcome, TranscriptStrategy, YtDlpStrategy};
use crate::config::Settings;
use crate::error::Result;
use crate::models::{join_caption_text, QaPair, TranscriptRecord};
use crate::process::ProcessLimiter;
use crate::store::TranscriptCache;
use crate::youtube::require_video_id;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Resolves video URLs to transcripts.
pub struct TranscriptService {
    cache: Arc<dyn TranscriptCache>,
    strategies: Vec<Box<dyn TranscriptStrategy>>,
}

impl TranscriptService {
    pub fn new(cache: Arc<dyn TranscriptCache>, strategies: Vec<Box<dyn TranscriptStrategy>>) -> Self {
        Self { cache, strategies }
    }

    /// Build the standard chain: yt-dlp, caption scraper, transcript API library.
    pub fn from_settings(
        settings: &Settings,
        cache: Arc<dyn TranscriptCache>,
        limiter: ProcessLimiter,
    ) -> Result<Self> {
        let strategies: Vec<Box<dyn TranscriptStrategy>> = vec![
            Box::new(YtDlpStrategy::new(&settings.transcript, settings.temp_dir(), limiter)),
            Box::new(CaptionScraper::new(&settings.transcript)?),
            Box::new(LibraryStrategy::new(&settings.transcript)),
        ];
        Ok(Self::new(cache, strategies))
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Resolve a URL (or bare video ID) to its transcript.
    ///
    /// Only an unrecognisable URL is an error. Strategy and cache failures are logged;
    /// when nothing yields text the outcome is [`TranscriptOutcome::NoCaptions`].
    #[instrument(skip(self))]
    pub async fn lookup(&self, url: &str) -> Result<TranscriptOutcome> {
        let video_id = require_video_id(url)?;

        if let Some(record) = self.cached(&video_id).await {
            info!(video_id = %video_id, "Transcript served from cache");
            return Ok(TranscriptOutcome::Found {
                record,
                from_cache: true,
            });
        }

        for strategy in &self.strategies {
            let items = match strategy.fetch(&video_id).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "Transcript strategy failed");
                    continue;
                }
            };

            let full_text = join_caption_text(&items);
            if full_text.is_empty() {
                info!(strategy = strategy.name(), "Strategy returned no captions");
                continue;
            }

            info!(
                strategy = strategy.name(),
                chars = full_text.len(),
                items = items.len(),
                "Transcript acquired"
            );

            let record = TranscriptRecord::new(&video_id, url.trim(), full_text, strategy.name(), items);
            if let Err(e) = self.cache.put(&record).await {
                warn!(error = %e, "Failed to cache transcript");
            }

            return Ok(TranscriptOutcome::Found {
                record,
                from_cache: false,
            });
        }

        warn!(video_id = %video_id, "No captions available from any strategy");
        Ok(TranscriptOutcome::NoCaptions { video_id })
    }

    /// Cached transcript for a video, treating read failures as a miss.
    pub async fn cached(&self, video_id: &str) -> Option<TranscriptRecord> {
        match self.cache.get(video_id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Transcript cache read failed");
                None
            }
        }
    }

    /// Store generated Q&A pairs on a cached transcript.
    pub async fn save_qa_pairs(&self, video_id: &str, qa_pairs: &[QaPair]) -> Result<bool> {
        self.cache.set_qa_pairs(video_id, qa_pairs).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LingoError;
    use crate::models::CaptionItem;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeStrategy {
        name: &'static str,
        text: Option<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    impl FakeStrategy {
        fn new(name: &'static str, text: Option<&'static str>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    name,
                    text,
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl TranscriptStrategy for FakeStrategy {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, _video_id: &str) -> Result<Vec<CaptionItem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.text {
                Some("") => Ok(Vec::new()),
                Some(text) => Ok(vec![CaptionItem::new(text, 0.0, 1.0)]),
                None => Err(LingoError::UpstreamFailure("boom".into())),
            }
        }
    }

    #[tokio::test]
    async fn test_second_lookup_hits_cache() {
        let (strategy, calls) = FakeStrategy::new("a", Some("hello world"));
        let service = TranscriptService::new(Arc::new(MemoryStore::new()), vec![Box::new(strategy)]);

        let url = "https://www.youtube.com/watch?v=abc12345678";
        let first = service.lookup(url).await.unwrap();
        let second = service.lookup(url).await.unwrap();

        assert!(matches!(first, TranscriptOutcome::Found { from_cache: false, .. }));
        assert!(matches!(second, TranscriptOutcome::Found { from_cache: true, .. }));
        assert_eq!(second.record().unwrap().full_text, "hello world");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_falls_back_in_order() {
        let (a, a_calls) = FakeStrategy::new("a", Some(""));
        let (b, b_calls) = FakeStrategy::new("b", Some("from b"));
        let (c, c_calls) = FakeStrategy::new("c", Some("from c"));
        let service = TranscriptService::new(
            Arc::new(MemoryStore::new()),
            vec![Box::new(a), Box::new(b), Box::new(c)],
        );

        let outcome = service.lookup("https://youtu.be/abc12345678").await.unwrap();
        let record = outcome.record().unwrap();

        assert_eq!(record.strategy, "b");
        assert_eq!(record.full_text, "from b");
        assert_eq!(a_calls.load(Ordering::SeqCst), 1);
        assert_eq!(b_calls.load(Ordering::SeqCst), 1);
        assert_eq!(c_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_strategy_errors_are_swallowed() {
        let (a, _) = FakeStrategy::new("a", None);
        let (b, _) = FakeStrategy::new("b", Some("still works"));
        let service = TranscriptService::new(Arc::new(MemoryStore::new()), vec![Box::new(a), Box::new(b)]);

        let outcome = service.lookup("abc12345678").await.unwrap();
        assert_eq!(outcome.record().unwrap().strategy, "b");
    }

    #[tokio::test]
    async fn test_no_captions_is_not_an_error() {
        let (a, _) = FakeStrategy::new("a", Some(""));
        let (b, _) = FakeStrategy::new("b", None);
        let (c, _) = FakeStrategy::new("c", Some("   "));
        let cache = Arc::new(MemoryStore::new());
        let service = TranscriptService::new(cache.clone(), vec![Box::new(a), Box::new(b), Box::new(c)]);

        let outcome = service
            .lookup("https://www.youtube.com/watch?v=dIUEwTn6VWw")
            .await
            .unwrap();

        match outcome {
            TranscriptOutcome::NoCaptions { video_id } => assert_eq!(video_id, "dIUEwTn6VWw"),
            other => panic!("expected no captions, got {:?}", other),
        }
        assert!(cache.get("dIUEwTn6VWw").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cached_record_returns_stored_qa_pairs() {
        let cache = Arc::new(MemoryStore::new());
        let mut record = TranscriptRecord::new("abc12345678", "u", "hello world", "yt-dlp", vec![]);
        record.qa_pairs = vec![QaPair::new("Q1", "A1")];
        cache.put(&record).await.unwrap();

        let (strategy, calls) = FakeStrategy::new("a", Some("other"));
        let service = TranscriptService::new(cache, vec![Box::new(strategy)]);

        let outcome = service.lookup("abc12345678").await.unwrap();
        let found = outcome.record().unwrap();

        assert_eq!(found.full_text, "hello world");
        assert_eq!(found.qa_pairs, vec![QaPair::new("Q1", "A1")]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let service = TranscriptService::new(Arc::new(MemoryStore::new()), Vec::new());
        let err = service.lookup("https://example.com/nothing").await.unwrap_err();
        assert!(matches!(err, LingoError::InvalidUrl(_)));
    }
}
