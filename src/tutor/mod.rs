//! The language tutor: Q&A generation, chat about a video, word explanations and
//! podcast scripts.
//!
//! Every chat call names its conversation explicitly through a [`ConversationKey`];
//! nothing about "the current video" is kept between requests.

mod qa;

pub use qa::{fallback_pair, parse_qa_pairs};

use crate::config::{ChatSettings, Prompts};
use crate::error::{LingoError, Result};
use crate::llm::{LlmBackend, LlmRequest};
use crate::models::{ChatMessage, ConversationKey, QaPair};
use crate::rag::{format_context_for_prompt, ContextBuilder, Indexer};
use crate::store::ChatHistory;
use crate::transcript::{TranscriptOutcome, TranscriptService};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Upper bound on messages returned by [`Tutor::history`].
const MAX_HISTORY_MESSAGES: usize = 500;

pub struct Tutor {
    transcripts: Arc<TranscriptService>,
    history: Arc<dyn ChatHistory>,
    llm: Arc<dyn LlmBackend>,
    context: Option<ContextBuilder>,
    indexer: Option<Arc<Indexer>>,
    prompts: Prompts,
    settings: ChatSettings,
}

impl Tutor {
    pub fn new(
        transcripts: Arc<TranscriptService>,
        history: Arc<dyn ChatHistory>,
        llm: Arc<dyn LlmBackend>,
    ) -> Self {
        Self {
            transcripts,
            history,
            llm,
            context: None,
            indexer: None,
            prompts: Prompts::default(),
            settings: ChatSettings::default(),
        }
    }

    /// Enable retrieval: index fresh transcripts and add relevant excerpts to chat.
    pub fn with_retrieval(mut self, indexer: Arc<Indexer>, context: ContextBuilder) -> Self {
        self.indexer = Some(indexer);
        self.context = Some(context);
        self
    }

    pub fn with_prompts(mut self, prompts: Prompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_settings(mut self, settings: ChatSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn llm_name(&self) -> &str {
        self.llm.name()
    }

    /// Resolve a URL to its transcript, scheduling indexing for freshly fetched ones.
    #[instrument(skip(self))]
    pub async fn load_video(&self, url: &str) -> Result<TranscriptOutcome> {
        let outcome = self.transcripts.lookup(url).await?;

        if let (TranscriptOutcome::Found { record, from_cache: false }, Some(indexer)) =
            (&outcome, &self.indexer)
        {
            indexer.spawn_index(record.video_id.clone(), record.full_text.clone());
        }

        Ok(outcome)
    }

    /// Load a video and make sure its transcript carries Q&A pairs.
    ///
    /// Pairs are generated once and cached on the transcript. When generation fails or
    /// yields nothing parseable, a fallback pair is returned and nothing is cached.
    #[instrument(skip(self))]
    pub async fn process_transcript(&self, url: &str) -> Result<TranscriptOutcome> {
        let outcome = self.load_video(url).await?;

        let (mut record, from_cache) = match outcome {
            TranscriptOutcome::Found { record, from_cache } => (record, from_cache),
            no_captions => return Ok(no_captions),
        };

        if record.qa_pairs.is_empty() {
            record.qa_pairs = match self.generate_qa_pairs(&record.full_text).await {
                Ok(pairs) if !pairs.is_empty() => {
                    if let Err(e) = self.transcripts.save_qa_pairs(&record.video_id, &pairs).await {
                        warn!(error = %e, "Failed to cache Q&A pairs");
                    }
                    pairs
                }
                Ok(_) => {
                    warn!("No Q&A pairs parsed from LLM response");
                    vec![fallback_pair()]
                }
                Err(e) => {
                    warn!(error = %e, "Q&A generation failed");
                    vec![fallback_pair()]
                }
            };
        }

        Ok(TranscriptOutcome::Found { record, from_cache })
    }

    async fn generate_qa_pairs(&self, transcript: &str) -> Result<Vec<QaPair>> {
        let excerpt = truncate_chars(transcript, self.settings.qa_context_chars);
        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.qa.user, &[("transcript", excerpt)]);

        let response = self.llm.generate(&LlmRequest::new(prompt)).await?;
        let pairs = parse_qa_pairs(&response);
        debug!("Parsed {} Q&A pairs", pairs.len());
        Ok(pairs)
    }

    /// Answer a chat message about a processed video.
    #[instrument(skip(self, message), fields(video_id = %key.video_id, user_id = %key.user_id))]
    pub async fn chat(&self, key: &ConversationKey, message: &str) -> Result<String> {
        let message = message.trim();
        if message.is_empty() {
            return Err(LingoError::InvalidInput("Message is required".to_string()));
        }

        let record = self.transcripts.cached(&key.video_id).await.ok_or_else(|| {
            LingoError::InvalidInput("Please process a transcript for this video first".to_string())
        })?;

        let (history, context) = futures::join!(
            self.recent_history(key),
            self.retrieve_context(&key.video_id, message)
        );

        let excerpt = truncate_chars(&record.full_text, self.settings.transcript_context_chars);
        let mut system = self
            .prompts
            .render_with_custom(&self.prompts.chat.system, &[("transcript", excerpt)]);
        if !context.is_empty() {
            system.push_str(
                &self
                    .prompts
                    .render_with_custom(&self.prompts.chat.retrieved, &[("context", context.as_str())]),
            );
        }

        let request = LlmRequest::new(message)
            .with_system(system)
            .with_history(history);
        let answer = self.llm.generate(&request).await?;

        for entry in [ChatMessage::user(message), ChatMessage::assistant(answer.clone())] {
            if let Err(e) = self.history.append(key, &entry).await {
                warn!(error = %e, "Failed to record chat message");
            }
        }

        info!(chars = answer.len(), "Chat reply generated");
        Ok(answer)
    }

    async fn recent_history(&self, key: &ConversationKey) -> Vec<ChatMessage> {
        match self.history.recent(key, self.settings.history_limit).await {
            Ok(messages) => messages,
            Err(e) => {
                warn!(error = %e, "Failed to load chat history");
                Vec::new()
            }
        }
    }

    async fn retrieve_context(&self, video_id: &str, query: &str) -> String {
        match &self.context {
            Some(builder) => format_context_for_prompt(&builder.build(video_id, query).await),
            None => String::new(),
        }
    }

    /// Messages of a conversation, oldest first.
    pub async fn history(&self, key: &ConversationKey) -> Result<Vec<ChatMessage>> {
        self.history.recent(key, MAX_HISTORY_MESSAGES).await
    }

    /// Delete a conversation. Returns the number of removed messages.
    pub async fn clear_history(&self, key: &ConversationKey) -> Result<usize> {
        self.history.clear(key).await
    }

    /// Explain a word as used in a sentence.
    #[instrument(skip(self, sentence))]
    pub async fn explain_word(&self, word: &str, sentence: &str) -> Result<String> {
        let word = word.trim();
        if word.is_empty() {
            return Err(LingoError::InvalidInput("Word is required".to_string()));
        }

        let prompt = self.prompts.render_with_custom(
            &self.prompts.explain.user,
            &[("word", word), ("sentence", sentence.trim())],
        );
        self.llm.generate(&LlmRequest::new(prompt)).await
    }

    /// Write a short podcast script about a topic.
    #[instrument(skip(self))]
    pub async fn podcast_script(&self, topic: &str) -> Result<String> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(LingoError::InvalidInput("Topic is required".to_string()));
        }

        let prompt = self
            .prompts
            .render_with_custom(&self.prompts.podcast.user, &[("topic", topic)]);
        self.llm.generate(&LlmRequest::new(prompt)).await
    }
}

/// The first `max_chars` characters of `text`.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::error::{LingoError, Result};
    use crate::llm::{LlmBackend, LlmRequest};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// LLM double that replies with a fixed answer and records every request.
    pub struct ScriptedLlm {
        reply: Option<String>,
        pub requests: Mutex<Vec<LlmRequest>>,
    }

    impl ScriptedLlm {
        pub fn replying(reply: &str) -> Self {
            Self {
                reply: Some(reply.to_string()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn failing() -> Self {
            Self {
                reply: None,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn last_request(&self) -> LlmRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedLlm {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &LlmRequest) -> Result<String> {
            request.validate()?;
            self.requests.lock().unwrap().push(request.clone());
            self.reply
                .clone()
                .ok_or_else(|| LingoError::UpstreamTimeout("llm did not answer".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedLlm;
    use super::*;
    use crate::models::{CaptionItem, Role, TranscriptRecord};
    use crate::store::{MemoryStore, TranscriptCache};
    use crate::transcript::TranscriptStrategy;
    use async_trait::async_trait;

    struct StaticStrategy(&'static str);

    #[async_trait]
    impl TranscriptStrategy for StaticStrategy {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch(&self, _video_id: &str) -> Result<Vec<CaptionItem>> {
            if self.0.is_empty() {
                return Ok(Vec::new());
            }
            Ok(vec![CaptionItem::new(self.0, 0.0, 1.0)])
        }
    }

    fn tutor(store: Arc<MemoryStore>, captions: &'static str, llm: Arc<ScriptedLlm>) -> Tutor {
        let transcripts = Arc::new(TranscriptService::new(
            store.clone(),
            vec![Box::new(StaticStrategy(captions))],
        ));
        Tutor::new(transcripts, store, llm)
    }

    #[tokio::test]
    async fn test_qa_pairs_generated_once() {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(ScriptedLlm::replying("Q: What is said?\nA: Hello world."));
        let tutor = tutor(store.clone(), "hello world", llm.clone());

        let first = tutor.process_transcript("abc12345678").await.unwrap();
        let expected = vec![QaPair::new("What is said?", "Hello world.")];
        assert_eq!(first.record().unwrap().qa_pairs, expected);
        assert!(llm.last_request().prompt.contains("hello world"));

        let second = tutor.process_transcript("abc12345678").await.unwrap();
        assert!(matches!(second, TranscriptOutcome::Found { from_cache: true, .. }));
        assert_eq!(second.record().unwrap().qa_pairs, expected);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_cached_qa_pairs_served_verbatim() {
        let store = Arc::new(MemoryStore::new());
        let mut record = TranscriptRecord::new("abc12345678", "u", "hello world", "yt-dlp", vec![]);
        record.qa_pairs = vec![QaPair::new("Q1", "A1")];
        store.put(&record).await.unwrap();

        let llm = Arc::new(ScriptedLlm::replying("unused"));
        let tutor = tutor(store, "", llm.clone());

        let outcome = tutor
            .process_transcript("https://www.youtube.com/watch?v=abc12345678")
            .await
            .unwrap();
        let record = outcome.record().unwrap();
        assert_eq!(record.full_text, "hello world");
        assert_eq!(record.qa_pairs, vec![QaPair::new("Q1", "A1")]);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_qa_fallback_is_not_cached() {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(ScriptedLlm::failing());
        let tutor = tutor(store.clone(), "hello world", llm);

        let outcome = tutor.process_transcript("abc12345678").await.unwrap();
        assert_eq!(outcome.record().unwrap().qa_pairs, vec![fallback_pair()]);

        let cached = store.get("abc12345678").await.unwrap().unwrap();
        assert!(cached.qa_pairs.is_empty());
    }

    #[tokio::test]
    async fn test_no_captions_passes_through() {
        let llm = Arc::new(ScriptedLlm::replying("unused"));
        let tutor = tutor(Arc::new(MemoryStore::new()), "", llm.clone());

        let outcome = tutor
            .process_transcript("https://www.youtube.com/watch?v=dIUEwTn6VWw")
            .await
            .unwrap();
        assert!(matches!(outcome, TranscriptOutcome::NoCaptions { .. }));
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_chat_requires_processed_transcript() {
        let llm = Arc::new(ScriptedLlm::replying("hi"));
        let tutor = tutor(Arc::new(MemoryStore::new()), "hello world", llm);

        let key = ConversationKey::new("abc12345678", None);
        let err = tutor.chat(&key, "What does it mean?").await.unwrap_err();
        assert!(matches!(err, LingoError::InvalidInput(_)));

        let err = tutor.chat(&key, "  ").await.unwrap_err();
        assert!(matches!(err, LingoError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_chat_replays_history_and_records_turns() {
        let store = Arc::new(MemoryStore::new());
        let llm = Arc::new(ScriptedLlm::replying("It means hi."));
        let tutor = tutor(store.clone(), "hola amigos", llm.clone());
        tutor.load_video("abc12345678").await.unwrap();

        let key = ConversationKey::new("abc12345678", Some("ana"));
        tutor.chat(&key, "What is hola?").await.unwrap();
        tutor.chat(&key, "And amigos?").await.unwrap();

        let request = llm.last_request();
        assert_eq!(request.prompt, "And amigos?");
        assert!(request.system.unwrap().contains("hola amigos"));
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.history[0].role, Role::User);
        assert_eq!(request.history[0].content, "What is hola?");
        assert_eq!(request.history[1].role, Role::Assistant);

        let history = tutor.history(&key).await.unwrap();
        assert_eq!(history.len(), 4);

        let other = ConversationKey::new("abc12345678", Some("ben"));
        assert!(tutor.history(&other).await.unwrap().is_empty());

        assert_eq!(tutor.clear_history(&key).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_chat_failure_records_nothing() {
        let store = Arc::new(MemoryStore::new());
        let tutor = tutor(store, "hello world", Arc::new(ScriptedLlm::failing()));
        tutor.load_video("abc12345678").await.unwrap();

        let key = ConversationKey::new("abc12345678", None);
        let err = tutor.chat(&key, "hi").await.unwrap_err();
        assert!(matches!(err, LingoError::UpstreamTimeout(_)));
        assert!(tutor.history(&key).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_explain_word_prompt() {
        let llm = Arc::new(ScriptedLlm::replying("**Word Focus**: run"));
        let tutor = tutor(Arc::new(MemoryStore::new()), "", llm.clone());

        let answer = tutor.explain_word(" run ", "I run every morning.").await.unwrap();
        assert_eq!(answer, "**Word Focus**: run");

        let prompt = llm.last_request().prompt;
        assert!(prompt.contains("\"run\""));
        assert!(prompt.contains("I run every morning."));

        let err = tutor.explain_word("", "x").await.unwrap_err();
        assert!(matches!(err, LingoError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_podcast_script_prompt() {
        let llm = Arc::new(ScriptedLlm::replying("Welcome to the show!"));
        let tutor = tutor(Arc::new(MemoryStore::new()), "", llm.clone());

        assert_eq!(tutor.podcast_script("street food").await.unwrap(), "Welcome to the show!");
        assert!(llm.last_request().prompt.contains("about street food"));
        assert!(tutor.podcast_script(" ").await.is_err());
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
        assert_eq!(truncate_chars("hi", 0), "");
    }
}
