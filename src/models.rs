//! Core data models shared across the crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default user for conversations when the request does not name one.
pub const DEFAULT_USER: &str = "default_user";

/// A timestamped caption line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionItem {
    pub text: String,
    /// Start time in seconds.
    pub start: f64,
    /// Duration in seconds.
    pub duration: f64,
}

impl CaptionItem {
    pub fn new(text: impl Into<String>, start: f64, duration: f64) -> Self {
        Self {
            text: text.into(),
            start,
            duration,
        }
    }
}

/// Join caption items into the full transcript text.
pub fn join_caption_text(items: &[CaptionItem]) -> String {
    items
        .iter()
        .map(|item| item.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A generated question/answer pair about a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// A cached transcript, keyed by video ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptRecord {
    /// 11-character YouTube video ID.
    pub video_id: String,
    /// URL the transcript was requested with.
    pub url: String,
    /// Full concatenated transcript text.
    pub full_text: String,
    /// Name of the strategy that produced the text.
    pub strategy: String,
    /// Timestamped caption items, when the strategy provides them.
    #[serde(default)]
    pub items: Vec<CaptionItem>,
    /// Q&A pairs generated for this transcript (empty until generated).
    #[serde(default)]
    pub qa_pairs: Vec<QaPair>,
    pub created_at: DateTime<Utc>,
}

impl TranscriptRecord {
    pub fn new(
        video_id: impl Into<String>,
        url: impl Into<String>,
        full_text: impl Into<String>,
        strategy: impl Into<String>,
        items: Vec<CaptionItem>,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            url: url.into(),
            full_text: full_text.into(),
            strategy: strategy.into(),
            items,
            qa_pairs: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" | "human" => Ok(Role::User),
            "assistant" | "ai" => Ok(Role::Assistant),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation about a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Identifies one user's conversation about one video.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub video_id: String,
    pub user_id: String,
}

impl ConversationKey {
    pub fn new(video_id: impl Into<String>, user_id: Option<&str>) -> Self {
        let user_id = user_id
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .unwrap_or(DEFAULT_USER);
        Self {
            video_id: video_id.into(),
            user_id: user_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_caption_text_skips_blanks() {
        let items = vec![
            CaptionItem::new(" hello ", 0.0, 1.0),
            CaptionItem::new("", 1.0, 1.0),
            CaptionItem::new("world", 2.0, 1.0),
        ];
        assert_eq!(join_caption_text(&items), "hello world");
    }

    #[test]
    fn test_conversation_key_defaults_user() {
        assert_eq!(ConversationKey::new("abc12345678", None).user_id, DEFAULT_USER);
        assert_eq!(ConversationKey::new("abc12345678", Some("  ")).user_id, DEFAULT_USER);
        assert_eq!(ConversationKey::new("abc12345678", Some("ana")).user_id, "ana");
    }

    #[test]
    fn test_role_accepts_legacy_names() {
        assert_eq!("human".parse::<Role>(), Ok(Role::User));
        assert_eq!("ai".parse::<Role>(), Ok(Role::Assistant));
    }
}
