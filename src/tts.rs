//! Google Translate text-to-speech URLs.
//!
//! No audio is fetched or stored here; the browser plays the returned URLs directly.

use crate::config::TtsSettings;
use crate::error::{LingoError, Result};
use url::Url;

/// Characters after which a long text may be split.
const SPLIT_PUNCTUATION: &[char] = &[',', '.', '!', '?', ';', ':', '。', '、'];

/// Builds `translate_tts` URLs.
#[derive(Debug, Clone)]
pub struct TtsUrlBuilder {
    lang: String,
    slow: bool,
    host: String,
    max_segment_chars: usize,
}

impl TtsUrlBuilder {
    pub fn new(settings: &TtsSettings) -> Self {
        Self {
            lang: settings.lang.clone(),
            slow: settings.slow,
            host: settings.host.trim_end_matches('/').to_string(),
            max_segment_chars: settings.max_segment_chars.max(1),
        }
    }

    pub fn with_lang(mut self, lang: &str) -> Self {
        self.lang = lang.to_string();
        self
    }

    /// URL for a single segment of at most `max_segment_chars` characters.
    pub fn segment_url(&self, segment: &str) -> Result<String> {
        let base = format!("{}/translate_tts", self.host);
        let textlen = segment.chars().count().to_string();
        let speed = if self.slow { "0.24" } else { "1" };

        let url = Url::parse_with_params(
            &base,
            &[
                ("ie", "UTF-8"),
                ("q", segment),
                ("tl", self.lang.as_str()),
                ("total", "1"),
                ("idx", "0"),
                ("textlen", textlen.as_str()),
                ("client", "tw-ob"),
                ("prev", "input"),
                ("ttsspeed", speed),
            ],
        )
        .map_err(|e| LingoError::Config(format!("Invalid TTS host {}: {}", self.host, e)))?;

        Ok(url.to_string())
    }

    /// URLs that together speak the whole text, in order.
    pub fn urls(&self, text: &str) -> Result<Vec<String>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(LingoError::InvalidInput("No text provided".to_string()));
        }

        split_text(text, self.max_segment_chars)
            .iter()
            .map(|segment| self.segment_url(segment))
            .collect()
    }
}

/// Split text into segments of at most `max_chars` characters, preferring to break after
/// punctuation or at whitespace. A run with no break point is cut at the limit.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut segments = Vec::new();
    let mut rest = text.trim();

    while !rest.is_empty() {
        if rest.chars().count() <= max_chars {
            segments.push(rest.to_string());
            break;
        }

        // Byte offset just past the `max_chars`-th character.
        let limit = rest
            .char_indices()
            .nth(max_chars)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let window = &rest[..limit];

        let cut = match window.rfind(|c: char| SPLIT_PUNCTUATION.contains(&c)) {
            Some(idx) => idx + window[idx..].chars().next().map_or(1, char::len_utf8),
            None if rest[limit..].starts_with(char::is_whitespace) => limit,
            None => window.rfind(char::is_whitespace).unwrap_or(limit),
        };

        let segment = rest[..cut].trim();
        if !segment.is_empty() {
            segments.push(segment.to_string());
        }
        rest = rest[cut..].trim_start();
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn builder() -> TtsUrlBuilder {
        TtsUrlBuilder::new(&TtsSettings::default())
    }

    #[test]
    fn test_short_text_single_url() {
        let urls = assert_ok!(builder().urls("Hello world"));
        assert_eq!(urls.len(), 1);

        let url = Url::parse(&urls[0]).unwrap();
        assert_eq!(url.host_str(), Some("translate.google.com"));
        assert_eq!(url.path(), "/translate_tts");

        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(params.contains(&("q".to_string(), "Hello world".to_string())));
        assert!(params.contains(&("tl".to_string(), "en".to_string())));
        assert!(params.contains(&("client".to_string(), "tw-ob".to_string())));
        assert!(params.contains(&("textlen".to_string(), "11".to_string())));
        assert!(params.contains(&("ttsspeed".to_string(), "1".to_string())));
    }

    #[test]
    fn test_slow_speed() {
        let settings = TtsSettings {
            slow: true,
            ..Default::default()
        };
        let url = TtsUrlBuilder::new(&settings).segment_url("hi").unwrap();
        assert!(url.contains("ttsspeed=0.24"));
    }

    #[test]
    fn test_empty_text_rejected() {
        let err = assert_err!(builder().urls("   "));
        assert!(matches!(err, LingoError::InvalidInput(_)));
    }

    #[test]
    fn test_long_text_split_at_punctuation() {
        let sentence = "This sentence is part of a podcast script. ";
        let text = sentence.repeat(10);

        let segments = split_text(&text, 200);
        assert!(segments.len() > 1);
        for segment in &segments {
            assert!(segment.chars().count() <= 200);
            assert!(segment.ends_with('.'));
        }
        assert_eq!(segments.join(" "), text.trim());

        assert_eq!(builder().urls(&text).unwrap().len(), segments.len());
    }

    #[test]
    fn test_split_at_whitespace_and_hard_limit() {
        assert_eq!(split_text("aaa bbb ccc", 7), vec!["aaa bbb", "ccc"]);
        assert_eq!(split_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }
}
