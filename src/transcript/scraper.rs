//! Caption track scraping over plain HTTP.
//!
//! Reads the `captionTracks` list embedded in the watch page and downloads the chosen
//! track as JSON3. When the page exposes no usable track, the public `timedtext`
//! endpoint is tried per preferred language.

use super::vtt::decode_entities;
use super::TranscriptStrategy;
use crate::config::TranscriptSettings;
use crate::error::Result;
use crate::models::CaptionItem;
use crate::youtube::watch_url;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// One entry of the watch page's `captionTracks` array.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    /// `"asr"` for auto-generated tracks.
    #[serde(default)]
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }
}

#[derive(Debug, Deserialize)]
struct Json3 {
    #[serde(default)]
    events: Vec<Json3Event>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Json3Event {
    #[serde(default)]
    t_start_ms: u64,
    #[serde(default)]
    d_duration_ms: u64,
    #[serde(default)]
    segs: Option<Vec<Json3Seg>>,
}

#[derive(Debug, Deserialize)]
struct Json3Seg {
    #[serde(default)]
    utf8: String,
}

/// Scrapes caption tracks from YouTube's public pages.
pub struct CaptionScraper {
    client: Client,
    languages: Vec<String>,
}

impl CaptionScraper {
    pub fn new(settings: &TranscriptSettings) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.http_timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            languages: settings.languages.clone(),
        })
    }

    async fn caption_tracks(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        let page = self
            .client
            .get(watch_url(video_id))
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let Some(raw) = extract_json_array(&page, "\"captionTracks\":") else {
            debug!("Watch page has no captionTracks");
            return Ok(Vec::new());
        };

        Ok(serde_json::from_str(raw)?)
    }

    async fn download_json3(&self, url: &str) -> Result<Vec<CaptionItem>> {
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        // timedtext answers 200 with an empty body when the language does not exist.
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        let data: Json3 = serde_json::from_str(&body)?;
        Ok(parse_json3(&data))
    }

    async fn from_timedtext(&self, video_id: &str) -> Result<Vec<CaptionItem>> {
        for lang in &self.languages {
            for kind in ["", "&kind=asr"] {
                let url = format!(
                    "https://www.youtube.com/api/timedtext?v={}&lang={}{}&fmt=json3",
                    video_id, lang, kind
                );
                let items = self.download_json3(&url).await?;
                if !items.is_empty() {
                    return Ok(items);
                }
            }
        }
        Ok(Vec::new())
    }
}

#[async_trait]
impl TranscriptStrategy for CaptionScraper {
    fn name(&self) -> &str {
        "caption-scraper"
    }

    #[instrument(skip(self))]
    async fn fetch(&self, video_id: &str) -> Result<Vec<CaptionItem>> {
        let tracks = self.caption_tracks(video_id).await?;

        if let Some(track) = choose_track(&tracks, &self.languages) {
            debug!(
                language = %track.language_code,
                generated = track.is_generated(),
                "Downloading caption track"
            );
            let url = json3_url(&track.base_url);
            let items = self.download_json3(&url).await?;
            if !items.is_empty() {
                return Ok(items);
            }
        }

        debug!("Falling back to timedtext endpoint");
        self.from_timedtext(video_id).await
    }
}

fn json3_url(base_url: &str) -> String {
    let base = base_url.replace("&fmt=srv3", "");
    format!("{}&fmt=json3", base)
}

/// Pick the preferred track: for each language in order, a manual track before an
/// auto-generated one, exact code before regional variants. Falls back to the first track.
fn choose_track<'a>(tracks: &'a [CaptionTrack], languages: &[String]) -> Option<&'a CaptionTrack> {
    for lang in languages {
        let regional = format!("{}-", lang);
        let matches = |t: &&CaptionTrack| t.language_code == *lang || t.language_code.starts_with(&regional);

        let manual = tracks.iter().filter(matches).find(|t| !t.is_generated());
        if let Some(track) = manual.or_else(|| tracks.iter().find(matches)) {
            return Some(track);
        }
    }
    tracks.first()
}

fn parse_json3(data: &Json3) -> Vec<CaptionItem> {
    data.events
        .iter()
        .filter_map(|event| {
            let segs = event.segs.as_ref()?;
            let text: String = segs.iter().map(|seg| seg.utf8.as_str()).collect();
            let text = decode_entities(&text.replace('\n', " "));
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.is_empty() {
                return None;
            }
            Some(CaptionItem::new(
                text,
                event.t_start_ms as f64 / 1000.0,
                event.d_duration_ms as f64 / 1000.0,
            ))
        })
        .collect()
}

/// Find the JSON array that follows `key` in `haystack`, matching brackets while
/// skipping over string literals.
fn extract_json_array<'a>(haystack: &'a str, key: &str) -> Option<&'a str> {
    let start = haystack.find(key)? + key.len();
    let rest = haystack[start..].trim_start();
    let offset = haystack.len() - rest.len();
    if !rest.starts_with('[') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in rest.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&haystack[offset..offset + i + 1]);
                }
            }
            _ => {}
        }
    }

    None
}
