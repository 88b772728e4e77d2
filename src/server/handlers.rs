//! Route handlers.

use super::{ApiError, AppState, JsonOrForm};
use crate::error::LingoError;
use crate::models::{CaptionItem, ChatMessage, ConversationKey, QaPair};
use crate::transcript::TranscriptOutcome;
use crate::youtube::require_video_id;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const USER_ID_HEADER: &str = "x-user-id";
const TRACE_ID_HEADER: &str = "x-trace-id";

type ApiResult<T> = Result<T, ApiError>;

// === Request/Response Types ===

#[derive(Deserialize)]
pub(super) struct VideoRequest {
    #[serde(default)]
    youtube_url: String,
}

#[derive(Deserialize)]
pub(super) struct ChatInputRequest {
    #[serde(default)]
    video_id: Option<String>,
    #[serde(default)]
    youtube_url: Option<String>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    input_type: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct ExplainRequest {
    #[serde(default)]
    word: String,
    #[serde(default)]
    sentence: Option<String>,
    /// Older clients send the sentence as `context`.
    #[serde(default)]
    context: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct TopicRequest {
    #[serde(default)]
    topic: String,
}

#[derive(Deserialize)]
pub(super) struct AudioRequest {
    #[serde(default)]
    text: String,
    /// Overrides the configured speech language.
    #[serde(default)]
    lang: Option<String>,
}

#[derive(Serialize)]
pub(super) struct TranscriptResponse {
    status: &'static str,
    message: &'static str,
    video_id: String,
    strategy: String,
    from_cache: bool,
    transcript: String,
    qa_pairs: Vec<QaPair>,
}

#[derive(Serialize)]
pub(super) struct VideoResponse {
    status: &'static str,
    video_id: String,
    transcript: Vec<CaptionItem>,
}

#[derive(Serialize)]
pub(super) struct NoCaptionsResponse {
    status: &'static str,
    video_id: String,
    message: &'static str,
}

#[derive(Serialize)]
pub(super) struct ChatResponse {
    user_input: String,
    bot_response: String,
    input_type: String,
}

#[derive(Serialize)]
pub(super) struct HistoryResponse {
    video_id: String,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
pub(super) struct ClearedResponse {
    cleared: usize,
}

#[derive(Serialize)]
pub(super) struct ExplainResponse {
    explanation: String,
}

#[derive(Serialize)]
pub(super) struct ScriptResponse {
    script: String,
}

#[derive(Serialize)]
pub(super) struct AudioResponse {
    audio_url: String,
    audio_urls: Vec<String>,
}

// === Helpers ===

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn conversation_key(headers: &HeaderMap, video_id: &str) -> ConversationKey {
    ConversationKey::new(video_id, header(headers, USER_ID_HEADER))
}

fn require_url(url: &str) -> Result<&str, LingoError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(LingoError::InvalidInput("YouTube URL is required".to_string()));
    }
    Ok(url)
}

fn no_captions(video_id: &str) -> Response {
    Json(NoCaptionsResponse {
        status: "no_captions",
        video_id: video_id.to_string(),
        message: "Video has no transcript or captions are disabled.",
    })
    .into_response()
}

// === Handlers ===

pub(super) async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

pub(super) async fn process_transcript(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonOrForm(req): JsonOrForm<VideoRequest>,
) -> ApiResult<Response> {
    let url = require_url(&req.youtube_url)?;
    info!(
        trace_id = header(&headers, TRACE_ID_HEADER).unwrap_or("no-trace"),
        url, "Processing transcript"
    );

    let response = match state.tutor.process_transcript(url).await? {
        TranscriptOutcome::Found { record, from_cache } => Json(TranscriptResponse {
            status: "ok",
            message: "Transcript processed",
            video_id: record.video_id,
            strategy: record.strategy,
            from_cache,
            transcript: record.full_text,
            qa_pairs: record.qa_pairs,
        })
        .into_response(),
        TranscriptOutcome::NoCaptions { video_id } => no_captions(&video_id),
    };
    Ok(response)
}

pub(super) async fn process_input(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    JsonOrForm(req): JsonOrForm<ChatInputRequest>,
) -> ApiResult<Json<ChatResponse>> {
    let target = req
        .video_id
        .filter(|id| !id.trim().is_empty())
        .or(req.youtube_url.filter(|url| !url.trim().is_empty()))
        .ok_or_else(|| LingoError::InvalidInput("video_id or youtube_url is required".to_string()))?;
    let video_id = require_video_id(&target)?;

    let key = conversation_key(&headers, &video_id);
    let input_type = req.input_type.unwrap_or_else(|| "text".to_string());
    info!(video_id = %key.video_id, user_id = %key.user_id, input_type = %input_type, "Chat input");

    let reply = state.tutor.chat(&key, &req.message).await?;

    Ok(Json(ChatResponse {
        user_input: req.message,
        bot_response: reply,
        input_type,
    }))
}

pub(super) async fn chat_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(video_id): Path<String>,
) -> ApiResult<Json<HistoryResponse>> {
    let video_id = require_video_id(&video_id)?;
    let key = conversation_key(&headers, &video_id);
    let messages = state.tutor.history(&key).await?;

    Ok(Json(HistoryResponse { video_id, messages }))
}

pub(super) async fn clear_history(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(video_id): Path<String>,
) -> ApiResult<Json<ClearedResponse>> {
    let video_id = require_video_id(&video_id)?;
    let key = conversation_key(&headers, &video_id);
    let cleared = state.tutor.clear_history(&key).await?;

    Ok(Json(ClearedResponse { cleared }))
}

pub(super) async fn process_video(
    State(state): State<Arc<AppState>>,
    JsonOrForm(req): JsonOrForm<VideoRequest>,
) -> ApiResult<Response> {
    let url = require_url(&req.youtube_url)?;

    let response = match state.tutor.load_video(url).await? {
        TranscriptOutcome::Found { record, .. } => Json(VideoResponse {
            status: "ok",
            video_id: record.video_id,
            transcript: record.items,
        })
        .into_response(),
        TranscriptOutcome::NoCaptions { video_id } => no_captions(&video_id),
    };
    Ok(response)
}

pub(super) async fn explain(
    State(state): State<Arc<AppState>>,
    JsonOrForm(req): JsonOrForm<ExplainRequest>,
) -> ApiResult<Json<ExplainResponse>> {
    let sentence = req.sentence.or(req.context).unwrap_or_default();
    let explanation = state.tutor.explain_word(&req.word, &sentence).await?;

    Ok(Json(ExplainResponse { explanation }))
}

pub(super) async fn generate_script(
    State(state): State<Arc<AppState>>,
    JsonOrForm(req): JsonOrForm<TopicRequest>,
) -> ApiResult<Json<ScriptResponse>> {
    let script = state.tutor.podcast_script(&req.topic).await?;

    Ok(Json(ScriptResponse { script }))
}

pub(super) async fn generate_audio(
    State(state): State<Arc<AppState>>,
    JsonOrForm(req): JsonOrForm<AudioRequest>,
) -> ApiResult<Json<AudioResponse>> {
    let audio_urls = match req.lang.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        Some(lang) => state.tts.clone().with_lang(lang).urls(&req.text)?,
        None => state.tts.urls(&req.text)?,
    };
    let audio_url = audio_urls.first().cloned().unwrap_or_default();

    Ok(Json(AudioResponse {
        audio_url,
        audio_urls,
    }))
}
