//! YouTube URL handling.

use crate::error::{LingoError, Result};
use regex::Regex;
use std::sync::LazyLock;

static VIDEO_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?:
            # Query parameter (watch?v=, &v=) or a path prefix that precedes the ID
            (?:[?&]v=|youtu\.be/|/embed/|/v/|/shorts/|/live/|/e/)
            ([a-zA-Z0-9_-]{11})
        )
        |
        # Bare video ID (11 characters)
        ^([a-zA-Z0-9_-]{11})$
    ",
    )
    .expect("video id regex is valid")
});

/// Extract the 11-character video ID from a YouTube URL or bare ID.
pub fn extract_video_id(input: &str) -> Option<String> {
    let caps = VIDEO_ID_REGEX.captures(input.trim())?;

    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Like [`extract_video_id`], failing with `InvalidUrl`.
pub fn require_video_id(input: &str) -> Result<String> {
    extract_video_id(input).ok_or_else(|| LingoError::InvalidUrl(input.trim().to_string()))
}

/// Canonical watch URL for a video ID.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_video_id() {
        let cases = [
            "https://www.youtube.com/watch?v=dIUEwTn6VWw",
            "https://youtube.com/watch?feature=share&v=dIUEwTn6VWw",
            "https://www.youtube.com/watch?v=dIUEwTn6VWw&t=42s",
            "https://youtu.be/dIUEwTn6VWw",
            "https://youtu.be/dIUEwTn6VWw?si=abc",
            "https://www.youtube.com/embed/dIUEwTn6VWw",
            "https://www.youtube.com/v/dIUEwTn6VWw",
            "https://www.youtube.com/shorts/dIUEwTn6VWw",
            "https://www.youtube.com/live/dIUEwTn6VWw",
            "https://m.youtube.com/watch?v=dIUEwTn6VWw",
            "www.youtube-nocookie.com/embed/dIUEwTn6VWw",
            "  dIUEwTn6VWw  ",
        ];

        for url in cases {
            assert_eq!(extract_video_id(url).as_deref(), Some("dIUEwTn6VWw"), "{}", url);
        }
    }

    #[test]
    fn test_no_identifier() {
        let cases = [
            "",
            "not-a-video-id",
            "https://www.youtube.com/",
            "https://www.youtube.com/watch?v=short",
            "https://www.youtube.com/channel/UC",
            "https://example.com/page",
        ];

        for url in cases {
            assert_eq!(extract_video_id(url), None, "{}", url);
        }
    }

    #[test]
    fn test_require_video_id_error() {
        let err = require_video_id("https://example.com").unwrap_err();
        assert!(matches!(err, LingoError::InvalidUrl(_)));
        assert!(err.is_user_error());
    }

    #[test]
    fn test_watch_url() {
        assert_eq!(watch_url("abc12345678"), "https://www.youtube.com/watch?v=abc12345678");
    }
}
