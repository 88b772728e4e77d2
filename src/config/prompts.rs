//! Prompt templates for Lingo.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory
//! (`qa.toml`, `chat.toml`, `explain.toml`, `podcast.toml`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Prompts {
    pub qa: QaPrompts,
    pub chat: ChatPrompts,
    pub explain: ExplainPrompts,
    pub podcast: PodcastPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: HashMap<String, String>,
}

/// Prompt for generating Q&A pairs from a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QaPrompts {
    pub user: String,
}

impl Default for QaPrompts {
    fn default() -> Self {
        Self {
            user: "Based on this video transcript, generate 3 thought-provoking Q&A pairs. \
                   Format each pair on two lines: 'Q: ...' then 'A: ...'.\n\nContext: {{transcript}}"
                .to_string(),
        }
    }
}

/// Prompts for chatting about a video.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatPrompts {
    /// System context when a transcript is available.
    pub system: String,
    /// Appended to the system context when retrieval found relevant excerpts.
    pub retrieved: String,
}

impl Default for ChatPrompts {
    fn default() -> Self {
        Self {
            system: "You are a helpful language learning assistant. \
                     Use this video transcript as context: {{transcript}}"
                .to_string(),
            retrieved: "\n\nExcerpts from the video most relevant to the question:\n{{context}}"
                .to_string(),
        }
    }
}

/// Prompt for explaining a clicked word.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplainPrompts {
    pub user: String,
}

impl Default for ExplainPrompts {
    fn default() -> Self {
        Self {
            user: r#"You are an expert English tutor specializing in ESL (English as a Second Language).
The student clicked on the word "{{word}}" in this sentence:
"{{sentence}}"

Provide an explanation using exactly these sections:

**Word Focus**: {{word}}
   - Pronunciation (phonetic if possible)
   - Part of Speech

**Core Meanings**:
1. Primary Definition
2. Secondary Definition

**In This Sentence**:
   - How the word functions here
   - Any idioms or phrasal verbs it belongs to

**Learning Tips**:
   - Memory Trick
   - Common Mistakes
   - Related Words (synonyms, antonyms, word family)

**Usage Examples**:
   - Formal
   - Casual
   - Academic

**Practice Exercise**:
   A fill-in-the-blank sentence using the word.

Keep the language simple and encouraging."#
                .to_string(),
        }
    }
}

/// Prompt for podcast script generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PodcastPrompts {
    pub user: String,
}

impl Default for PodcastPrompts {
    fn default() -> Self {
        Self {
            user: "Write a short, engaging podcast script about {{topic}}. Keep it under 200 words."
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let qa_path = custom_path.join("qa.toml");
            if qa_path.exists() {
                prompts.qa = toml::from_str(&std::fs::read_to_string(&qa_path)?)?;
            }

            let chat_path = custom_path.join("chat.toml");
            if chat_path.exists() {
                prompts.chat = toml::from_str(&std::fs::read_to_string(&chat_path)?)?;
            }

            let explain_path = custom_path.join("explain.toml");
            if explain_path.exists() {
                prompts.explain = toml::from_str(&std::fs::read_to_string(&explain_path)?)?;
            }

            let podcast_path = custom_path.join("podcast.toml");
            if podcast_path.exists() {
                prompts.podcast = toml::from_str(&std::fs::read_to_string(&podcast_path)?)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(&self, template: &str, vars: &[(&str, &str)]) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.to_string(), value.to_string());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_template() {
        let template = "Hello {{name}}, you have {{count}} messages.";
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "Alice".to_string());
        vars.insert("count".to_string(), "5".to_string());

        assert_eq!(Prompts::render(template, &vars), "Hello Alice, you have 5 messages.");
    }

    #[test]
    fn test_provided_vars_override_custom() {
        let mut prompts = Prompts::default();
        prompts.variables.insert("topic".to_string(), "cooking".to_string());
        prompts.variables.insert("level".to_string(), "B1".to_string());

        let rendered = prompts.render_with_custom("{{topic}} at {{level}}", &[("topic", "travel")]);
        assert_eq!(rendered, "travel at B1");
    }

    #[test]
    fn test_custom_dir_overrides_one_section() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("podcast.toml"),
            "user = \"A podcast about {{topic}}\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.podcast.user, "A podcast about {{topic}}");
        assert!(prompts.qa.user.contains("Q&A"));
    }
}
