//! Ollama HTTP backend (`POST /api/chat`, non-streaming).

use super::{LlmBackend, LlmRequest};
use crate::config::OllamaSettings;
use crate::error::{LingoError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

pub struct OllamaBackend {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    pub fn new(settings: &OllamaSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        })
    }
}

fn wire_messages(request: &LlmRequest) -> Vec<WireMessage<'_>> {
    let mut messages = Vec::with_capacity(request.history.len() + 2);

    if let Some(system) = &request.system {
        messages.push(WireMessage {
            role: "system",
            content: system,
        });
    }
    for message in &request.history {
        messages.push(WireMessage {
            role: message.role.as_str(),
            content: &message.content,
        });
    }
    messages.push(WireMessage {
        role: "user",
        content: &request.prompt,
    });

    messages
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    fn name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn generate(&self, request: &LlmRequest) -> Result<String> {
        request.validate()?;

        let body = ChatRequest {
            model: &self.model,
            messages: wire_messages(request),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LingoError::UpstreamTimeout(format!("Ollama: {}", e))
                } else {
                    LingoError::UpstreamFailure(format!("Ollama request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LingoError::UpstreamFailure(format!(
                "Ollama returned {}: {}",
                status, text
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        let answer = parsed.message.content.trim().to_string();
        if answer.is_empty() {
            return Err(LingoError::UpstreamFailure("Empty response from Ollama".to_string()));
        }

        debug!("Generated {} chars", answer.len());
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatMessage;

    #[test]
    fn test_request_body() {
        let request = LlmRequest::new("explain 'gato'")
            .with_system("tutor")
            .with_history(vec![ChatMessage::assistant("hola")]);

        let body = ChatRequest {
            model: "qwen2.5:7b",
            messages: wire_messages(&request),
            stream: false,
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "assistant");
        assert_eq!(json["messages"][2]["content"], "explain 'gato'");
    }

    #[test]
    fn test_parse_response() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"model":"m","message":{"role":"assistant","content":" hi "},"done":true}"#)
                .unwrap();
        assert_eq!(parsed.message.content.trim(), "hi");
    }
}
